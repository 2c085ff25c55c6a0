//! Error types for ppp-ae
//!
//! Every variant here is fatal to an assembly run: the run is abandoned and no
//! artifact is produced. Non-fatal conditions (clamped timing, empty music
//! regions, keyword flags) never become errors; they are entries in the
//! assembly log.

use thiserror::Error;

/// Main error type for the assembly engine
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed template or request (anchor count, ordering, offsets, ranges)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Asset store has no file by that name
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Asset store could not serve a file (after retries)
    #[error("Asset store error: {0}")]
    AssetStore(String),

    /// Text generation failed or timed out
    #[error("Script generation error: {0}")]
    ScriptGeneration(String),

    /// Speech synthesis failed or timed out
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Transcription failed or timed out
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Audio bytes could not be decoded or resampled
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Encoding or writing the rendered artifact failed
    #[error("Export error: {0}")]
    Export(String),

    /// Run cancelled by the caller
    #[error("Assembly cancelled")]
    Cancelled,

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors outside the export step
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared library errors
    #[error("Common error: {0}")]
    Common(#[from] ppp_common::Error),
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
