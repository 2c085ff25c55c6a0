//! # Podcast Pro Plus Assembly Engine (ppp-ae)
//!
//! Builds a finished episode from a template, a main content recording and
//! per-run overrides.
//!
//! **Purpose:** Resolve segment audio (static files, AI-scripted narration,
//! direct text-to-speech), clean the spoken content, lay segments out on one
//! timeline with configurable overlap, mix background music beds underneath,
//! and export the result together with a processing log.
//!
//! **Architecture:** symphonia decode + rubato resample into one working
//! format, f32 buffer passes for composition and mixing, hound WAV export.
//! External services sit behind async traits in [`services`].

pub mod assembly;
pub mod audio;
pub mod config;
pub mod error;
pub mod model;
pub mod services;

pub use assembly::{AssemblyEngine, Services};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use model::{AssemblyRequest, AssemblyResult, CleanupOptions, EpisodeMetadata, Template};
