//! Audio decoding, resampling, encoding and buffer types

pub mod decoder;
pub mod encoder;
pub mod resampler;
pub mod types;

pub use decoder::SimpleDecoder;
pub use encoder::{encode_wav, write_wav_file, WavFormat};
pub use resampler::Resampler;
pub use types::{AudioClip, ResolvedClip};
