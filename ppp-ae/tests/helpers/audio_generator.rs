//! Audio Test Fixture Generator
//!
//! Writes 32-bit float WAV files so decoded samples match the generated
//! values exactly.

use std::path::Path;

/// One stretch of generated audio
#[derive(Debug, Clone, Copy)]
pub enum Part {
    /// Constant level
    Level(f32, f64),
    /// 440 Hz sine at the given amplitude
    Tone(f32, f64),
    /// Digital silence
    Silence(f64),
}

/// Samples (mono) for `parts` at `sample_rate`
pub fn render_parts(parts: &[Part], sample_rate: u32) -> Vec<f32> {
    let mut samples = Vec::new();
    for part in parts {
        match *part {
            Part::Level(level, seconds) => {
                samples.extend(std::iter::repeat(level).take(frames(seconds, sample_rate)));
            }
            Part::Tone(amplitude, seconds) => {
                let start = samples.len();
                samples.extend((0..frames(seconds, sample_rate)).map(|i| {
                    let t = (start + i) as f32 / sample_rate as f32;
                    amplitude * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
                }));
            }
            Part::Silence(seconds) => {
                samples.extend(std::iter::repeat(0.0).take(frames(seconds, sample_rate)));
            }
        }
    }
    samples
}

pub fn frames(seconds: f64, sample_rate: u32) -> usize {
    (seconds * sample_rate as f64).round() as usize
}

/// Write mono float samples as a WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// WAV bytes for mono float samples
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Read every sample of a float WAV file
pub fn read_wav(path: &Path) -> (hound::WavSpec, Vec<f32>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    (spec, samples)
}
