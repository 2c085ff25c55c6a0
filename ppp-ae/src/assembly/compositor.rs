//! Timeline compositor
//!
//! Places resolved clips on one time axis and sums them into the foreground
//! buffer. Placement rules, in template order:
//!
//! - the first segment starts at 0
//! - an intro starts where the previous segment ends
//! - content starts at the end of the last intro plus `content_start_offset_s`
//! - the first outro starts at the end of content plus `outro_start_offset_s`;
//!   later outros follow back to back
//!
//! A start before 0, before the previous segment's start, or before the end
//! of any earlier non-adjacent segment is clamped to the latest such bound
//! and logged. Overlapping clips are summed sample by sample; there is no
//! crossfade.

use crate::assembly::log::{AssemblyLog, Stage};
use crate::audio::types::{AudioClip, ResolvedClip};
use crate::error::Result;
use crate::model::{SegmentKind, Timing};
use ppp_common::time::{format_timestamp, frames_to_seconds, seconds_to_frames};
use uuid::Uuid;

/// Absolute position of one segment on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub segment_id: Uuid,
    pub kind: SegmentKind,
    pub start_frame: usize,
    pub end_frame: usize,
}

impl Placement {
    pub fn len(&self) -> usize {
        self.end_frame - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Composed foreground and where each segment landed
#[derive(Debug, Clone)]
pub struct Timeline {
    pub foreground: AudioClip,
    pub placements: Vec<Placement>,
}

impl Timeline {
    pub fn frames(&self) -> usize {
        self.foreground.frames()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.foreground.duration_seconds()
    }

    /// Frame spans where consecutive segments overlap
    pub fn overlaps(&self) -> Vec<(usize, usize)> {
        self.placements
            .windows(2)
            .filter_map(|pair| {
                let start = pair[1].start_frame;
                let end = pair[0].end_frame.min(pair[1].end_frame);
                (end > start).then_some((start, end))
            })
            .collect()
    }
}

/// Lays segments out at a fixed working format
pub struct Compositor {
    sample_rate: u32,
    channels: u16,
}

impl Compositor {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Place `segments` (template order) and sum them
    pub fn compose(
        &self,
        segments: Vec<(SegmentKind, ResolvedClip)>,
        timing: &Timing,
        log: &mut AssemblyLog,
    ) -> Result<Timeline> {
        let content_offset = seconds_to_frames(timing.content_start_offset_s, self.sample_rate);
        let outro_offset = seconds_to_frames(timing.outro_start_offset_s, self.sample_rate);

        let mut clips = Vec::with_capacity(segments.len());
        let mut placements: Vec<Placement> = Vec::with_capacity(segments.len());
        // Latest end among segments before the previous one
        let mut earlier_end: i64 = 0;

        for (kind, resolved) in segments {
            let clip = resolved.clip.conform(self.sample_rate, self.channels)?;
            let previous = placements.last().copied();

            let requested = match previous {
                None => 0,
                Some(prev) => {
                    let prev_end = prev.end_frame as i64;
                    match (prev.kind, kind) {
                        (_, SegmentKind::Content) => prev_end.saturating_add(content_offset),
                        (SegmentKind::Content, SegmentKind::Outro) => prev_end.saturating_add(outro_offset),
                        _ => prev_end,
                    }
                }
            };

            let floor = previous
                .map(|p| (p.start_frame as i64).max(earlier_end))
                .unwrap_or(0)
                .max(0);

            let start = if requested < floor {
                log.warn(
                    Stage::Timeline,
                    format!(
                        "Timing clamped: {} segment {} requested start {} moved to {}",
                        kind,
                        resolved.segment_id,
                        format_timestamp(frames_to_seconds(requested, self.sample_rate)),
                        format_timestamp(frames_to_seconds(floor, self.sample_rate)),
                    ),
                );
                floor
            } else {
                requested
            };
            let start = start as usize;

            if let Some(prev) = previous {
                if start < prev.end_frame {
                    let overlap = prev.end_frame.min(start + clip.frames()) - start;
                    log.info(
                        Stage::Timeline,
                        format!(
                            "{} overlaps {} by {:.2}s",
                            kind,
                            prev.kind,
                            frames_to_seconds(overlap as i64, self.sample_rate),
                        ),
                    );
                }
                earlier_end = earlier_end.max(prev.end_frame as i64);
            }

            placements.push(Placement {
                segment_id: resolved.segment_id,
                kind,
                start_frame: start,
                end_frame: start + clip.frames(),
            });
            clips.push(clip);
        }

        let total_frames = placements.iter().map(|p| p.end_frame).max().unwrap_or(0);
        let ch = self.channels as usize;
        let mut foreground = vec![0.0f32; total_frames * ch];

        for (placement, clip) in placements.iter().zip(&clips) {
            let offset = placement.start_frame * ch;
            for (dst, src) in foreground[offset..offset + clip.samples.len()]
                .iter_mut()
                .zip(&clip.samples)
            {
                *dst += *src;
            }
        }

        tracing::debug!(
            segments = placements.len(),
            frames = total_frames,
            "Timeline composed"
        );

        Ok(Timeline {
            foreground: AudioClip::new(foreground, self.sample_rate, self.channels),
            placements,
        })
    }
}
