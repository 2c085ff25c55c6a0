//! Core audio data types
//!
//! Samples are f32 (-1.0 to 1.0), interleaved: `[L, R, L, R, ...]` for stereo.
//! A clip is owned by whichever stage produced it and moved into the next;
//! stages never share mutable access to a buffer.

use crate::audio::resampler::Resampler;
use crate::error::Result;
use uuid::Uuid;

/// Decoded PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Interleaved samples
    pub samples: Vec<f32>,

    pub sample_rate: u32,

    pub channels: u16,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Silent clip of `frames` frames
    pub fn silence(frames: usize, sample_rate: u32, channels: u16) -> Self {
        Self::new(vec![0.0; frames * channels as usize], sample_rate, channels)
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Samples of one frame (one value per channel)
    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let ch = self.channels as usize;
        self.samples.get(index * ch..(index + 1) * ch)
    }

    /// Convert to the given sample rate and channel count
    ///
    /// Returns the clip unchanged when it already matches, so an untouched
    /// clip stays bit-identical through the pipeline.
    pub fn conform(self, sample_rate: u32, channels: u16) -> Result<AudioClip> {
        if self.sample_rate == sample_rate && self.channels == channels {
            return Ok(self);
        }

        let remapped = self.remap_channels(channels);
        if remapped.sample_rate == sample_rate {
            return Ok(remapped);
        }

        let samples = Resampler::resample(
            &remapped.samples,
            remapped.sample_rate,
            sample_rate,
            channels,
        )?;
        Ok(AudioClip::new(samples, sample_rate, channels))
    }

    /// Up-mix or down-mix to `channels`
    ///
    /// - N → 1: average of all channels
    /// - 1 → N: duplicate the mono channel
    /// - N → M otherwise: output channel `c` takes input channel `c % N`
    pub fn remap_channels(self, channels: u16) -> AudioClip {
        if self.channels == channels || self.channels == 0 {
            return self;
        }

        let in_ch = self.channels as usize;
        let out_ch = channels as usize;
        let frames = self.frames();
        let mut samples = Vec::with_capacity(frames * out_ch);

        for frame in self.samples.chunks_exact(in_ch) {
            if out_ch == 1 {
                samples.push(frame.iter().sum::<f32>() / in_ch as f32);
            } else {
                for c in 0..out_ch {
                    samples.push(frame[c % in_ch]);
                }
            }
        }

        AudioClip::new(samples, self.sample_rate, channels)
    }

    /// Mono mix of the clip, one value per frame
    pub fn mono_mix(&self) -> Vec<f32> {
        let ch = self.channels.max(1) as usize;
        self.samples
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect()
    }
}

/// Audio resolved for one template segment, ready for timeline placement
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedClip {
    pub segment_id: Uuid,
    pub clip: AudioClip,
}

impl ResolvedClip {
    pub fn new(segment_id: Uuid, clip: AudioClip) -> Self {
        Self { segment_id, clip }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.clip.duration_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_and_duration() {
        let clip = AudioClip::new(vec![0.0; 8000 * 2], 8000, 2);
        assert_eq!(clip.frames(), 8000);
        assert_eq!(clip.duration_seconds(), 1.0);
        assert_eq!(clip.frame(0), Some(&[0.0, 0.0][..]));
        assert_eq!(clip.frame(8000), None);
    }

    #[test]
    fn test_mono_to_stereo() {
        let clip = AudioClip::new(vec![0.1, 0.2, 0.3], 8000, 1).remap_channels(2);
        assert_eq!(clip.samples, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
        assert_eq!(clip.channels, 2);
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let clip = AudioClip::new(vec![0.2, 0.4, -1.0, 1.0], 8000, 2).remap_channels(1);
        assert_eq!(clip.channels, 1);
        assert!((clip.samples[0] - 0.3).abs() < 1e-6);
        assert!(clip.samples[1].abs() < 1e-6);
    }

    #[test]
    fn test_conform_same_format_is_identity() {
        let clip = AudioClip::new(vec![0.5, -0.5, 0.25, -0.25], 44100, 2);
        let conformed = clip.clone().conform(44100, 2).unwrap();
        assert_eq!(conformed, clip);
    }

    #[test]
    fn test_conform_changes_rate_and_channels() {
        let clip = AudioClip::new(vec![0.25; 48000], 48000, 1);
        let conformed = clip.conform(44100, 2).unwrap();
        assert_eq!(conformed.sample_rate, 44100);
        assert_eq!(conformed.channels, 2);
        assert_eq!(conformed.frames(), 44100);
    }

    #[test]
    fn test_mono_mix() {
        let clip = AudioClip::new(vec![1.0, 0.0, 0.5, 0.5], 8000, 2);
        assert_eq!(clip.mono_mix(), vec![0.5, 0.5]);
    }
}
