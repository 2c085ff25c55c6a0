//! Background music layers
//!
//! For every rule and every placed segment of a type the rule applies to, the
//! mixer cuts one region out of that segment:
//!
//! ```text
//! [seg_start + start_offset, seg_end - end_offset]  clamped into the segment
//! ```
//!
//! The bed is looped or truncated to exactly the region length, scaled by
//! the rule's gain, then faded in and out. Fade lengths are capped at half
//! the region so the two ramps never cross.

use crate::assembly::compositor::Placement;
use crate::assembly::log::{AssemblyLog, Stage};
use crate::audio::types::AudioClip;
use crate::model::MusicRule;
use ppp_common::time::{format_timestamp, frames_to_seconds, seconds_to_frames};
use ppp_common::FadeCurve;
use std::collections::HashMap;
use uuid::Uuid;

/// One music region ready to be summed under the foreground
#[derive(Debug, Clone, PartialEq)]
pub struct MusicLayer {
    pub rule_id: Uuid,
    pub segment_id: Uuid,

    /// Absolute timeline position of the first frame
    pub start_frame: usize,

    /// Interleaved samples at the working format, gain and fades applied
    pub samples: Vec<f32>,
}

impl MusicLayer {
    pub fn frames(&self, channels: u16) -> usize {
        self.samples.len() / channels.max(1) as usize
    }
}

/// Region a rule covers on one placement, in frames
///
/// `None` when offsets leave nothing.
pub fn music_region(rule: &MusicRule, placement: &Placement, sample_rate: u32) -> Option<(usize, usize)> {
    let seg_start = placement.start_frame as i64;
    let seg_end = placement.end_frame as i64;

    let start = seg_start
        .saturating_add(seconds_to_frames(rule.start_offset_s, sample_rate))
        .clamp(seg_start, seg_end);
    let end = seg_end
        .saturating_sub(seconds_to_frames(rule.end_offset_s, sample_rate))
        .clamp(seg_start, seg_end);

    (end > start).then_some((start as usize, end as usize))
}

/// Builds music layers at a fixed working format
pub struct MusicMixer {
    sample_rate: u32,
    channels: u16,
    curve: FadeCurve,
}

impl MusicMixer {
    pub fn new(sample_rate: u32, channels: u16, curve: FadeCurve) -> Self {
        Self {
            sample_rate,
            channels,
            curve,
        }
    }

    /// Layers for every applicable rule/placement pair
    ///
    /// `beds` maps music filenames to decoded audio already at the working
    /// format. A rule whose bed is missing is skipped with a warning.
    pub fn mix(
        &self,
        rules: &[MusicRule],
        placements: &[Placement],
        beds: &HashMap<String, AudioClip>,
        log: &mut AssemblyLog,
    ) -> Vec<MusicLayer> {
        let mut layers = Vec::new();

        for rule in rules {
            let targets: Vec<&Placement> = placements
                .iter()
                .filter(|p| rule.applies_to(p.kind))
                .collect();
            if targets.is_empty() {
                continue;
            }

            let bed = match beds.get(&rule.music_filename) {
                Some(bed) if !bed.is_empty() => bed,
                Some(_) => {
                    log.warn(
                        Stage::Music,
                        format!("Music file '{}' is empty, skipping rule", rule.music_filename),
                    );
                    continue;
                }
                None => {
                    log.warn(
                        Stage::Music,
                        format!("Music file not found, skipping rule: {}", rule.music_filename),
                    );
                    continue;
                }
            };

            for placement in targets {
                let Some((start, end)) = music_region(rule, placement, self.sample_rate) else {
                    log.warn(
                        Stage::Music,
                        format!(
                            "Mixing region empty: '{}' on {} segment {} at {} (offsets {:.2}s/{:.2}s exceed {:.2}s)",
                            rule.music_filename,
                            placement.kind,
                            placement.segment_id,
                            format_timestamp(frames_to_seconds(placement.start_frame as i64, self.sample_rate)),
                            rule.start_offset_s,
                            rule.end_offset_s,
                            frames_to_seconds(placement.len() as i64, self.sample_rate),
                        ),
                    );
                    continue;
                };

                let samples = self.render_region(bed, rule, end - start);
                log.info(
                    Stage::Music,
                    format!(
                        "Music '{}' under {} from {} to {} at {:.1}dB",
                        rule.music_filename,
                        placement.kind,
                        format_timestamp(frames_to_seconds(start as i64, self.sample_rate)),
                        format_timestamp(frames_to_seconds(end as i64, self.sample_rate)),
                        rule.volume_db,
                    ),
                );

                layers.push(MusicLayer {
                    rule_id: rule.id,
                    segment_id: placement.segment_id,
                    start_frame: start,
                    samples,
                });
            }
        }

        tracing::debug!(layers = layers.len(), "Music layers built");
        layers
    }

    /// Loop or truncate `bed` to `frames`, then apply gain and fades
    fn render_region(&self, bed: &AudioClip, rule: &MusicRule, frames: usize) -> Vec<f32> {
        let ch = self.channels as usize;
        let mut samples: Vec<f32> = bed.samples.iter().copied().cycle().take(frames * ch).collect();

        let gain = rule.gain();
        let fade_in = (seconds_to_frames(rule.fade_in_s, self.sample_rate).max(0) as usize).min(frames / 2);
        let fade_out = (seconds_to_frames(rule.fade_out_s, self.sample_rate).max(0) as usize).min(frames / 2);
        let fade_out_start = frames - fade_out;

        for (j, frame) in samples.chunks_exact_mut(ch).enumerate() {
            let mut g = gain;
            if j < fade_in {
                g *= self.curve.calculate_fade_in(j as f32 / fade_in as f32);
            }
            if j >= fade_out_start {
                g *= self
                    .curve
                    .calculate_fade_out((j - fade_out_start + 1) as f32 / fade_out as f32);
            }
            for sample in frame {
                *sample *= g;
            }
        }

        samples
    }
}
