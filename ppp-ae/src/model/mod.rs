//! Template and request data model

pub mod request;
pub mod template;

pub use request::{AssemblyRequest, AssemblyResult, CleanupOptions, EpisodeMetadata};
pub use template::{MusicRule, Segment, SegmentKind, Source, Template, Timing};
