//! Content cleanup
//!
//! Turns the raw main recording into the clip placed at the anchor:
//!
//! 1. Transcribe (only when a transcript-based step is enabled)
//! 2. Collect pause intervals (`removePauses`) and filler word spans
//!    (`removeFillers`), all in original time
//! 3. Merge them into one sorted, non-overlapping set and excise it in a
//!    single pass
//! 4. Remap the transcript onto the edited audio and scan it for flag
//!    keywords (`checkForFlubber`, `checkForIntern`); flags never cut audio
//!
//! With nothing to cut the input clip is returned as is, so running cleanup
//! on already-cleaned audio leaves it bit-identical.

use crate::assembly::log::{AssemblyLog, Stage};
use crate::assembly::silence_detector::SilenceDetector;
use crate::audio::types::AudioClip;
use crate::config::CleanupConfig;
use crate::error::{Error, Result};
use crate::model::CleanupOptions;
use crate::services::transcription::{Transcriber, Word};
use ppp_common::time::{format_timestamp, frames_to_seconds, seconds_to_frames};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Frame span `[start, end)` removed from the content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sort and merge overlapping or touching intervals, dropping empty ones
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|i| !i.is_empty());
    intervals.sort_by_key(|i| (i.start, i.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => last.end = last.end.max(interval.end),
            _ => merged.push(interval),
        }
    }
    merged
}

/// Remove `cuts` (sorted, merged) from `clip` in one pass
pub fn excise(clip: AudioClip, cuts: &[Interval]) -> AudioClip {
    if cuts.is_empty() {
        return clip;
    }

    let ch = clip.channels as usize;
    let frames = clip.frames();
    let removed: usize = cuts.iter().map(|c| c.end.min(frames).saturating_sub(c.start)).sum();
    let mut samples = Vec::with_capacity((frames - removed.min(frames)) * ch);

    let mut cursor = 0;
    for cut in cuts {
        let start = cut.start.min(frames);
        if start > cursor {
            samples.extend_from_slice(&clip.samples[cursor * ch..start * ch]);
        }
        cursor = cursor.max(cut.end.min(frames));
    }
    samples.extend_from_slice(&clip.samples[cursor * ch..frames * ch]);

    AudioClip::new(samples, clip.sample_rate, clip.channels)
}

/// Move a transcript onto the edited timeline
///
/// Words touching a cut are dropped; the rest shift left by the cut length
/// before them.
pub fn remap_transcript(words: &[Word], cuts: &[Interval], sample_rate: u32) -> Vec<Word> {
    words
        .iter()
        .filter_map(|word| {
            let start = seconds_to_frames(word.start_s, sample_rate).max(0) as usize;
            let end = seconds_to_frames(word.end_s, sample_rate).max(0) as usize;

            let overlaps = cuts.iter().any(|c| start < c.end && end > c.start);
            if overlaps {
                return None;
            }

            let shift: usize = cuts
                .iter()
                .take_while(|c| c.end <= start)
                .map(|c| c.len())
                .sum();
            let shift_s = frames_to_seconds(shift as i64, sample_rate);

            Some(Word::new(
                word.text.clone(),
                word.start_s - shift_s,
                word.end_s - shift_s,
            ))
        })
        .collect()
}

/// Output of cleanup
#[derive(Debug, Clone)]
pub struct CleanedContent {
    pub clip: AudioClip,

    /// Transcript aligned to `clip`; empty when no transcript was needed
    pub transcript: Vec<Word>,

    pub log: AssemblyLog,
}

/// Content cleanup pipeline
pub struct ContentCleaner {
    config: CleanupConfig,
    detector: SilenceDetector,
    fillers: HashSet<String>,
}

impl ContentCleaner {
    pub fn new(config: CleanupConfig) -> Result<Self> {
        if !config.pause_retain_s.is_finite() || config.pause_retain_s < 0.0 {
            return Err(Error::Config(
                "pause_retain_s must be a non-negative number".to_string(),
            ));
        }

        let detector = SilenceDetector::new()
            .with_threshold_db(config.silence_threshold_db)?
            .with_min_duration(config.min_pause_s)?
            .with_window_ms(config.analysis_window_ms)?;

        let fillers = config
            .filler_words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        Ok(Self {
            config,
            detector,
            fillers,
        })
    }

    /// Transcribe if needed, then clean
    ///
    /// The transcription call is bounded by `timeout` and abandoned when
    /// `cancel` fires.
    pub async fn clean(
        &self,
        clip: AudioClip,
        options: &CleanupOptions,
        transcriber: &dyn Transcriber,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<CleanedContent> {
        let words = if options.needs_transcript() {
            let transcribe = tokio::time::timeout(timeout, transcriber.transcribe(&clip));
            let words = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = transcribe => result.map_err(|_| {
                    Error::Transcription(format!("Timed out after {}s", timeout.as_secs()))
                })??,
            };
            Some(words)
        } else {
            None
        };

        Ok(self.apply(clip, words.as_deref(), options))
    }

    /// Clean `clip` given its transcript (`None` when no step needs one)
    pub fn apply(
        &self,
        clip: AudioClip,
        words: Option<&[Word]>,
        options: &CleanupOptions,
    ) -> CleanedContent {
        let mut log = AssemblyLog::new();
        let rate = clip.sample_rate;
        let words = words.unwrap_or(&[]);

        let filler_cuts: Vec<(Interval, &Word)> = if options.remove_fillers {
            words
                .iter()
                .filter(|w| self.fillers.contains(&w.normalized()))
                .filter_map(|w| {
                    let interval = self.word_interval(w, rate, clip.frames());
                    (!interval.is_empty()).then_some((interval, w))
                })
                .collect()
        } else {
            Vec::new()
        };

        let pause_cuts = if options.remove_pauses {
            self.pause_cuts(&clip, filler_cuts.iter().map(|(i, _)| *i))
        } else {
            Vec::new()
        };

        for (region, cut) in &pause_cuts {
            log.info(
                Stage::Cleanup,
                format!(
                    "Removed pause at {} ({:.2}s of {:.2}s silence)",
                    format_timestamp(frames_to_seconds(cut.start as i64, rate)),
                    frames_to_seconds(cut.len() as i64, rate),
                    frames_to_seconds(region.len() as i64, rate),
                ),
            );
        }
        for (cut, word) in &filler_cuts {
            log.info(
                Stage::Cleanup,
                format!(
                    "Removed filler '{}' at {} ({:.2}s)",
                    word.text,
                    format_timestamp(frames_to_seconds(cut.start as i64, rate)),
                    frames_to_seconds(cut.len() as i64, rate),
                ),
            );
        }

        let cuts = merge_intervals(
            pause_cuts
                .iter()
                .map(|(_, cut)| *cut)
                .chain(filler_cuts.iter().map(|(cut, _)| *cut))
                .collect(),
        );

        let original_frames = clip.frames();
        let clip = excise(clip, &cuts);
        let transcript = remap_transcript(words, &cuts, rate);

        if !cuts.is_empty() {
            debug!(
                cuts = cuts.len(),
                removed_frames = original_frames - clip.frames(),
                "Content excised"
            );
            log.info(
                Stage::Cleanup,
                format!(
                    "Cleanup removed {:.2}s in {} cut(s); content is now {}",
                    frames_to_seconds((original_frames - clip.frames()) as i64, rate),
                    cuts.len(),
                    format_timestamp(clip.duration_seconds()),
                ),
            );
        }

        if options.check_for_flubber {
            self.flag_keywords(&transcript, &self.config.flubber_keywords, "Flubber", &mut log);
        }
        if options.check_for_intern {
            self.flag_keywords(&transcript, &self.config.intern_keywords, "Intern", &mut log);
        }

        CleanedContent {
            clip,
            transcript,
            log,
        }
    }

    fn word_interval(&self, word: &Word, rate: u32, frames: usize) -> Interval {
        let start = seconds_to_frames(word.start_s, rate).clamp(0, frames as i64) as usize;
        let end = seconds_to_frames(word.end_s, rate).clamp(0, frames as i64) as usize;
        Interval::new(start, end)
    }

    /// Long silences and the part of each to cut
    ///
    /// Filler spans count as silence during analysis, so a pause interrupted
    /// only by a filler is treated as one pause.
    fn pause_cuts(
        &self,
        clip: &AudioClip,
        fillers: impl Iterator<Item = Interval>,
    ) -> Vec<(Interval, Interval)> {
        let mut mono = clip.mono_mix();
        for filler in fillers {
            mono[filler.start..filler.end].fill(0.0);
        }

        let retain = seconds_to_frames(self.config.pause_retain_s, clip.sample_rate).max(0) as usize;
        let lead = retain / 2;
        let tail = retain - lead;

        self.detector
            .detect(&mono, clip.sample_rate)
            .into_iter()
            .filter_map(|region| {
                let cut = Interval::new(
                    region.start_frame + lead,
                    region.end_frame.saturating_sub(tail),
                );
                (!cut.is_empty()).then_some((Interval::new(region.start_frame, region.end_frame), cut))
            })
            .collect()
    }

    /// Warn for every occurrence of any of `keywords` in `transcript`
    fn flag_keywords(&self, transcript: &[Word], keywords: &[String], label: &str, log: &mut AssemblyLog) {
        let normalized: Vec<String> = transcript.iter().map(Word::normalized).collect();

        for keyword in keywords {
            let parts: Vec<String> = keyword
                .split_whitespace()
                .map(|p| Word::new(p, 0.0, 0.0).normalized())
                .filter(|p| !p.is_empty())
                .collect();
            if parts.is_empty() || parts.len() > normalized.len() {
                continue;
            }

            for (index, window) in normalized.windows(parts.len()).enumerate() {
                if window == parts.as_slice() {
                    log.warn(
                        Stage::Cleanup,
                        format!(
                            "{} keyword '{}' found at {}",
                            label,
                            keyword,
                            format_timestamp(transcript[index].start_s),
                        ),
                    );
                }
            }
        }
    }
}
