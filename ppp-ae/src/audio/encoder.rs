//! WAV encoding with hound
//!
//! Rendered episodes are written as 32-bit float WAV so the master buffer
//! reaches disk without requantization. Transcription uploads use 16-bit PCM,
//! which every speech-to-text service accepts.

use crate::audio::types::AudioClip;
use crate::error::{Error, Result};
use std::io::{Cursor, Seek, Write};
use std::path::Path;

/// WAV sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    Float32,
    Pcm16,
}

impl WavFormat {
    fn spec(&self, clip: &AudioClip) -> hound::WavSpec {
        match self {
            WavFormat::Float32 => hound::WavSpec {
                channels: clip.channels,
                sample_rate: clip.sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
            WavFormat::Pcm16 => hound::WavSpec {
                channels: clip.channels,
                sample_rate: clip.sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
        }
    }
}

/// Encode a clip to WAV bytes in memory
pub fn encode_wav(clip: &AudioClip, format: WavFormat) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, clip, format)?;
    Ok(cursor.into_inner())
}

/// Write a clip as a WAV file at `path`
pub fn write_wav_file(path: &Path, clip: &AudioClip, format: WavFormat) -> Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| Error::Export(format!("Cannot create {}: {}", path.display(), e)))?;
    let mut writer = std::io::BufWriter::new(file);
    write_wav(&mut writer, clip, format)?;
    writer
        .flush()
        .map_err(|e| Error::Export(format!("Flush {} failed: {}", path.display(), e)))
}

fn write_wav<W: Write + Seek>(sink: &mut W, clip: &AudioClip, format: WavFormat) -> Result<()> {
    let mut writer = hound::WavWriter::new(sink, format.spec(clip))
        .map_err(|e| Error::Export(format!("WAV header write failed: {}", e)))?;

    match format {
        WavFormat::Float32 => {
            for &sample in &clip.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| Error::Export(format!("WAV write failed: {}", e)))?;
            }
        }
        WavFormat::Pcm16 => {
            for &sample in &clip.samples {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer
                    .write_sample(value)
                    .map_err(|e| Error::Export(format!("WAV write failed: {}", e)))?;
            }
        }
    }

    writer
        .finalize()
        .map_err(|e| Error::Export(format!("WAV finalize failed: {}", e)))
}
