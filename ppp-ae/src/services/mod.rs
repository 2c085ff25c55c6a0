//! External collaborators of the engine
//!
//! Each service is a trait so runs can be driven by real HTTP clients in
//! production and by in-memory fakes in tests.

pub mod asset_store;
pub mod retry;
pub mod speech_synthesis;
pub mod template_store;
pub mod text_generation;
pub mod transcription;

pub use asset_store::{AssetError, AssetStore, LocalAssetStore};
pub use retry::fetch_with_retry;
pub use speech_synthesis::{ElevenLabsSynthesizer, SpeechSynthesizer, SynthesizedAudio};
pub use template_store::{InMemoryTemplateStore, JsonDirTemplateStore, TemplateStore};
pub use text_generation::{OpenAiTextGenerator, TextGenerator};
pub use transcription::{Transcriber, WhisperTranscriber, Word};
