//! Episode templates
//!
//! A template is read-only input to the engine. The JSON shape matches the
//! template editor's format (`segment_type`, `source_type`,
//! `background_music_rules`, `apply_to_segments`).
//!
//! Template invariants are checked once, in [`Template::validate`], before a
//! template reaches any pipeline stage:
//! - exactly one `content` segment (the anchor)
//! - segment ids are unique
//! - segment order is `intro* content outro*`
//! - offsets are finite, fades non-negative, `volume_db` within -40..=0

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Voice used when a template does not name one
pub const DEFAULT_VOICE_ID: &str = "19B4gjtpL5m876wS3Dfg";

/// Lowest accepted music rule volume
pub const MIN_VOLUME_DB: f64 = -40.0;

/// Highest accepted music rule volume
pub const MAX_VOLUME_DB: f64 = 0.0;

/// Largest accepted magnitude for any offset (24 hours)
pub const MAX_OFFSET_S: f64 = 24.0 * 60.0 * 60.0;

fn default_voice_id() -> String {
    DEFAULT_VOICE_ID.to_string()
}

/// Segment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Intro,
    Content,
    Outro,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Intro => "intro",
            SegmentKind::Content => "content",
            SegmentKind::Outro => "outro",
        }
    }
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a segment's audio comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "snake_case")]
pub enum Source {
    /// Pre-recorded file in the asset store
    Static { filename: String },

    /// Script written by the text generator from `prompt`, then synthesized
    AiGenerated {
        prompt: String,
        #[serde(default = "default_voice_id")]
        voice_id: String,
    },

    /// Fixed script synthesized directly; overridable per run
    Tts {
        #[serde(default)]
        script: String,
        #[serde(default = "default_voice_id")]
        voice_id: String,
    },
}

impl Source {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Source::Static { .. } => "static",
            Source::AiGenerated { .. } => "ai_generated",
            Source::Tts { .. } => "tts",
        }
    }
}

/// One ordered block of an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    #[serde(rename = "segment_type")]
    pub kind: SegmentKind,

    /// Ignored for the content segment, which always plays the run's main recording
    pub source: Source,
}

/// Background music overlay applied to every segment of the listed types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicRule {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    pub music_filename: String,

    pub apply_to_segments: Vec<SegmentKind>,

    /// Trim from the target segment's start
    #[serde(default)]
    pub start_offset_s: f64,

    /// Trim from the target segment's end
    #[serde(default)]
    pub end_offset_s: f64,

    #[serde(default = "MusicRule::default_fade_in_s")]
    pub fade_in_s: f64,

    #[serde(default = "MusicRule::default_fade_out_s")]
    pub fade_out_s: f64,

    #[serde(default = "MusicRule::default_volume_db")]
    pub volume_db: f64,
}

impl MusicRule {
    fn default_fade_in_s() -> f64 {
        2.0
    }

    fn default_fade_out_s() -> f64 {
        3.0
    }

    fn default_volume_db() -> f64 {
        -15.0
    }

    /// Linear gain for this rule's volume: `10^(volume_db / 20)`
    pub fn gain(&self) -> f32 {
        db_to_linear(self.volume_db)
    }

    pub fn applies_to(&self, kind: SegmentKind) -> bool {
        self.apply_to_segments.contains(&kind)
    }
}

/// Convert dB to linear amplitude
pub fn db_to_linear(db: f64) -> f32 {
    10.0_f64.powf(db / 20.0) as f32
}

/// Overlap/gap between the major blocks
///
/// Negative values overlap the blocks, positive values leave a gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Content start relative to the end of the last intro
    pub content_start_offset_s: f64,

    /// First outro start relative to the end of content
    pub outro_start_offset_s: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            content_start_offset_s: -2.0,
            outro_start_offset_s: -5.0,
        }
    }
}

/// Reusable episode template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Owner reference (opaque to the engine)
    pub user_id: Uuid,

    pub name: String,

    pub segments: Vec<Segment>,

    #[serde(default)]
    pub background_music_rules: Vec<MusicRule>,

    #[serde(default)]
    pub timing: Timing,
}

impl Template {
    /// Parse a template from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let template: Template = serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("Malformed template JSON: {}", e)))?;
        template.validate()?;
        Ok(template)
    }

    /// The content anchor
    ///
    /// Only meaningful on a validated template; returns a validation error otherwise.
    pub fn content_segment(&self) -> Result<&Segment> {
        self.segments
            .iter()
            .find(|s| s.kind == SegmentKind::Content)
            .ok_or_else(|| Error::Validation(format!("Template '{}' has no content segment", self.name)))
    }

    /// Check every template invariant
    pub fn validate(&self) -> Result<()> {
        let content_count = self
            .segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Content)
            .count();

        match content_count {
            0 => {
                return Err(Error::Validation(format!(
                    "Template '{}' has no content segment",
                    self.name
                )))
            }
            1 => {}
            n => {
                return Err(Error::Validation(format!(
                    "Template '{}' has {} content segments, expected exactly one",
                    self.name, n
                )))
            }
        }

        let mut seen = HashSet::new();
        for segment in &self.segments {
            if !seen.insert(segment.id) {
                return Err(Error::Validation(format!(
                    "Duplicate segment id {}",
                    segment.id
                )));
            }
        }

        self.validate_order()?;

        for segment in self.segments.iter().filter(|s| s.kind != SegmentKind::Content) {
            Self::validate_source(segment)?;
        }

        check_offset("content_start_offset_s", self.timing.content_start_offset_s)?;
        check_offset("outro_start_offset_s", self.timing.outro_start_offset_s)?;

        for rule in &self.background_music_rules {
            Self::validate_music_rule(rule)?;
        }

        Ok(())
    }

    /// Segment order must be `intro* content outro*`
    fn validate_order(&self) -> Result<()> {
        let mut passed_content = false;

        for (index, segment) in self.segments.iter().enumerate() {
            match segment.kind {
                SegmentKind::Intro if passed_content => {
                    return Err(Error::Validation(format!(
                        "Intro segment {} at position {} follows the content segment",
                        segment.id, index
                    )))
                }
                SegmentKind::Outro if !passed_content => {
                    return Err(Error::Validation(format!(
                        "Outro segment {} at position {} precedes the content segment",
                        segment.id, index
                    )))
                }
                SegmentKind::Content => passed_content = true,
                _ => {}
            }
        }

        Ok(())
    }

    fn validate_source(segment: &Segment) -> Result<()> {
        let problem = match &segment.source {
            Source::Static { filename } if filename.trim().is_empty() => {
                Some("static source has no filename")
            }
            Source::AiGenerated { prompt, .. } if prompt.trim().is_empty() => {
                Some("AI source has an empty prompt")
            }
            Source::AiGenerated { voice_id, .. } | Source::Tts { voice_id, .. }
                if voice_id.trim().is_empty() =>
            {
                Some("voice id is empty")
            }
            _ => None,
        };

        match problem {
            Some(msg) => Err(Error::Validation(format!("Segment {}: {}", segment.id, msg))),
            None => Ok(()),
        }
    }

    fn validate_music_rule(rule: &MusicRule) -> Result<()> {
        if rule.music_filename.trim().is_empty() {
            return Err(Error::Validation(format!(
                "Music rule {} has no music filename",
                rule.id
            )));
        }

        check_offset("start_offset_s", rule.start_offset_s)?;
        check_offset("end_offset_s", rule.end_offset_s)?;
        check_offset("fade_in_s", rule.fade_in_s)?;
        check_offset("fade_out_s", rule.fade_out_s)?;

        if rule.fade_in_s < 0.0 || rule.fade_out_s < 0.0 {
            return Err(Error::Validation(format!(
                "Music rule {} has a negative fade",
                rule.id
            )));
        }

        if !(MIN_VOLUME_DB..=MAX_VOLUME_DB).contains(&rule.volume_db) {
            return Err(Error::Validation(format!(
                "Music rule {} volume {}dB outside {}..{}dB",
                rule.id, rule.volume_db, MIN_VOLUME_DB, MAX_VOLUME_DB
            )));
        }

        Ok(())
    }
}

fn check_offset(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::Validation(format!("{} must be a finite number of seconds", name)));
    }
    if value.abs() > MAX_OFFSET_S {
        return Err(Error::Validation(format!(
            "{} of {}s exceeds the {}s limit",
            name, value, MAX_OFFSET_S
        )));
    }
    Ok(())
}
