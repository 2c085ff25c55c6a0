//! Silence detection for pause removal
//!
//! Windowed RMS over the mono mix of a clip. Regions are reported in frames
//! so cleanup can cut them without a seconds round trip.

use thiserror::Error;

/// Silence detection errors
#[derive(Debug, Error)]
pub enum SilenceError {
    /// Invalid silence threshold value
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    /// Invalid detection parameters
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

impl From<SilenceError> for crate::error::Error {
    fn from(err: SilenceError) -> Self {
        crate::error::Error::Config(err.to_string())
    }
}

/// Silent span `[start_frame, end_frame)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceRegion {
    pub start_frame: usize,
    pub end_frame: usize,
}

impl SilenceRegion {
    pub fn new(start_frame: usize, end_frame: usize) -> Self {
        Self {
            start_frame,
            end_frame,
        }
    }

    /// Length in frames
    pub fn len(&self) -> usize {
        self.end_frame - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Silence detector
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    /// Silence threshold in dB (default: -45dB, speech room tone)
    threshold_db: f32,

    /// Minimum silence duration in seconds (default: 1.0s)
    min_duration_sec: f64,

    /// RMS window length in milliseconds (default: 20ms)
    window_ms: u32,
}

impl SilenceDetector {
    pub fn new() -> Self {
        Self {
            threshold_db: -45.0,
            min_duration_sec: 1.0,
            window_ms: 20,
        }
    }

    /// Set silence threshold in dB
    pub fn with_threshold_db(mut self, threshold_db: f32) -> Result<Self, SilenceError> {
        if !threshold_db.is_finite() || threshold_db > 0.0 {
            return Err(SilenceError::InvalidThreshold(
                "Threshold must be negative dB".to_string(),
            ));
        }
        self.threshold_db = threshold_db;
        Ok(self)
    }

    /// Set minimum silence duration
    pub fn with_min_duration(mut self, min_duration_sec: f64) -> Result<Self, SilenceError> {
        if !min_duration_sec.is_finite() || min_duration_sec < 0.0 {
            return Err(SilenceError::InvalidParameters(
                "Min duration must be >= 0".to_string(),
            ));
        }
        self.min_duration_sec = min_duration_sec;
        Ok(self)
    }

    /// Set RMS analysis window
    pub fn with_window_ms(mut self, window_ms: u32) -> Result<Self, SilenceError> {
        if window_ms == 0 {
            return Err(SilenceError::InvalidParameters(
                "Window must be at least 1ms".to_string(),
            ));
        }
        self.window_ms = window_ms;
        Ok(self)
    }

    /// Detect silent regions in a mono signal
    ///
    /// Regions start and end on window boundaries (the last one may end at
    /// the signal's end) and are at least the minimum duration long.
    pub fn detect(&self, mono: &[f32], sample_rate: u32) -> Vec<SilenceRegion> {
        if mono.is_empty() || sample_rate == 0 {
            return Vec::new();
        }

        let threshold_linear = Self::db_to_linear(self.threshold_db);
        let window_frames = ((self.window_ms as u64 * sample_rate as u64) / 1000).max(1) as usize;
        let min_frames = (self.min_duration_sec * sample_rate as f64).round() as usize;

        let mut regions = Vec::new();
        let mut silence_start: Option<usize> = None;

        for (window_idx, chunk) in mono.chunks(window_frames).enumerate() {
            let position = window_idx * window_frames;

            if Self::calculate_rms(chunk) < threshold_linear {
                silence_start.get_or_insert(position);
            } else if let Some(start) = silence_start.take() {
                if position - start >= min_frames {
                    regions.push(SilenceRegion::new(start, position));
                }
            }
        }

        // Silence running to the end of the clip
        if let Some(start) = silence_start {
            if mono.len() - start >= min_frames {
                regions.push(SilenceRegion::new(start, mono.len()));
            }
        }

        regions
    }

    fn calculate_rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }

        let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
        (sum_squares / samples.len() as f32).sqrt()
    }

    fn db_to_linear(db: f32) -> f32 {
        10.0_f32.powf(db / 20.0)
    }
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self::new()
    }
}
