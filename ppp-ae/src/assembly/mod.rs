//! Episode assembly pipeline
//!
//! Source resolution → content cleanup → timeline composition → music
//! mixing → render/export, driven by [`engine::AssemblyEngine`].

pub mod cleanup;
pub mod compositor;
pub mod engine;
pub mod log;
pub mod music_mixer;
pub mod render;
pub mod silence_detector;
pub mod source_resolver;

pub use cleanup::{CleanedContent, ContentCleaner};
pub use compositor::{Compositor, Placement, Timeline};
pub use engine::{AssemblyEngine, Services};
pub use log::{AssemblyLog, LogEntry, Severity, Stage};
pub use music_mixer::{MusicLayer, MusicMixer};
pub use render::Renderer;
pub use silence_detector::{SilenceDetector, SilenceRegion};
pub use source_resolver::SourceResolver;
