//! ppp-ae specific configuration
//!
//! Loaded from the `[engine]` table of the shared TOML config file. Every field
//! has a default, so an empty or missing file yields a working engine.

use ppp_common::config::TomlConfig;
use ppp_common::FadeCurve;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Whole config file: shared settings plus the `[engine]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub common: TomlConfig,
    pub engine: EngineConfig,
}

/// Assembly engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Working sample rate for the timeline and rendered output
    pub sample_rate: u32,

    /// Working channel count
    pub channels: u16,

    /// Concurrent source resolutions per request
    pub resolver_workers: usize,

    /// Timeout for one text generation call
    pub generation_timeout_s: u64,

    /// Timeout for one speech synthesis call
    pub synthesis_timeout_s: u64,

    /// Timeout for one transcription call
    pub transcription_timeout_s: u64,

    /// Attempts per asset fetch (1 = no retry)
    pub asset_fetch_attempts: u32,

    /// Delay before the first asset fetch retry; doubles per retry
    pub asset_retry_backoff_ms: u64,

    /// Directory receiving rendered episodes
    pub output_dir: PathBuf,

    /// Where synthesized AI segments are kept for inspection (disabled when unset)
    pub ai_cache_dir: Option<PathBuf>,

    pub cleanup: CleanupConfig,

    pub render: RenderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            resolver_workers: 4,
            generation_timeout_s: 60,
            synthesis_timeout_s: 120,
            transcription_timeout_s: 300,
            asset_fetch_attempts: 3,
            asset_retry_backoff_ms: 100,
            output_dir: PathBuf::from("final_episodes"),
            ai_cache_dir: None,
            cleanup: CleanupConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_s)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_s)
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_timeout_s)
    }
}

/// Content cleanup tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleanupConfig {
    /// RMS level below which audio counts as silence
    pub silence_threshold_db: f32,

    /// Silence shorter than this is a natural pause and stays
    pub min_pause_s: f64,

    /// Silence left in place of each removed pause, split across both edges
    pub pause_retain_s: f64,

    /// RMS analysis window
    pub analysis_window_ms: u32,

    /// Words removed by `removeFillers` (matched case-insensitively)
    pub filler_words: Vec<String>,

    /// Keywords flagged by `checkForFlubber`
    pub flubber_keywords: Vec<String>,

    /// Keywords flagged by `checkForIntern`
    pub intern_keywords: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            silence_threshold_db: -45.0,
            min_pause_s: 1.0,
            pause_retain_s: 0.3,
            analysis_window_ms: 20,
            filler_words: ["um", "umm", "uh", "uhh", "uhm", "er", "erm", "ah", "hmm", "mm"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
            flubber_keywords: vec!["flubber".to_string()],
            intern_keywords: vec!["intern".to_string()],
        }
    }
}

/// Final mixdown settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RenderConfig {
    /// Curve used for every music fade
    pub fade_curve: FadeCurve,

    /// Scale the master so its peak lands here (dBFS); disabled when unset
    pub normalize_peak_dbfs: Option<f32>,
}
