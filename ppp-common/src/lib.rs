//! # Podcast Pro Plus Common Library
//!
//! Shared code for the Podcast Pro Plus tools:
//! - Error type used by configuration and file helpers
//! - TOML configuration loading, root folder and API key resolution
//! - Fade curve definitions and calculations
//! - Seconds/frames conversion and human-readable timestamps

pub mod config;
pub mod error;
pub mod fade_curves;
pub mod time;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
