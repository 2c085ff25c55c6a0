//! Assembly requests and results

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Per-run cleanup switches for the main content recording
///
/// Field names match the client's camelCase JSON. The flag scans never cut
/// audio; they only add warnings to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CleanupOptions {
    pub remove_pauses: bool,
    pub remove_fillers: bool,
    pub check_for_flubber: bool,
    pub check_for_intern: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            remove_pauses: true,
            remove_fillers: true,
            check_for_flubber: true,
            check_for_intern: true,
        }
    }
}

impl CleanupOptions {
    /// All switches off: the content clip passes through untouched
    pub fn none() -> Self {
        Self {
            remove_pauses: false,
            remove_fillers: false,
            check_for_flubber: false,
            check_for_intern: false,
        }
    }

    /// True when any enabled step needs a transcript
    pub fn needs_transcript(&self) -> bool {
        self.remove_fillers || self.check_for_flubber || self.check_for_intern
    }
}

/// One assembly run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyRequest {
    pub template_id: Uuid,

    /// Main recording, looked up in the asset store
    pub main_content_filename: String,

    /// Output name; `.wav` is appended when it has no extension
    pub output_filename: String,

    #[serde(default)]
    pub cleanup_options: CleanupOptions,

    /// Segment id → replacement script, applied to TTS segments only
    #[serde(default)]
    pub tts_overrides: HashMap<String, String>,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyResult {
    pub output_path: PathBuf,

    /// Rendered duration in seconds
    pub duration_s: f64,

    /// Chronological, human-readable processing log
    pub log: Vec<String>,
}

/// Title and summary suggested for a finished episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    pub title: String,
    pub summary: String,
}
