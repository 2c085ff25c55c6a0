//! Final mixdown and export
//!
//! Sums the foreground with every music layer, optionally normalizes, then
//! hard-limits to [-1.0, 1.0] and writes a 32-bit float WAV. The file is
//! written under a temporary name and renamed into place, so a failed run
//! never leaves a partial artifact at the output path.

use crate::assembly::log::{AssemblyLog, Stage};
use crate::assembly::music_mixer::MusicLayer;
use crate::audio::encoder::{write_wav_file, WavFormat};
use crate::audio::types::AudioClip;
use crate::config::RenderConfig;
use crate::error::{Error, Result};
use crate::model::template::db_to_linear;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const OUTPUT_EXTENSION: &str = "wav";

/// Sum `layers` into `foreground` at their absolute positions
pub fn sum_layers(mut foreground: AudioClip, layers: &[MusicLayer]) -> AudioClip {
    let ch = foreground.channels as usize;
    let total = foreground.samples.len();

    for layer in layers {
        let offset = layer.start_frame * ch;
        if offset >= total {
            continue;
        }
        for (dst, src) in foreground.samples[offset..].iter_mut().zip(&layer.samples) {
            *dst += *src;
        }
    }

    foreground
}

/// Clamp every sample into [-1.0, 1.0]; returns how many were out of range
pub fn hard_limit(samples: &mut [f32]) -> usize {
    let mut clipped = 0;
    for sample in samples.iter_mut() {
        if *sample > 1.0 || *sample < -1.0 {
            *sample = sample.clamp(-1.0, 1.0);
            clipped += 1;
        }
    }
    clipped
}

/// Scale so the absolute peak equals `target_dbfs`; silent input is left alone
pub fn normalize_peak(samples: &mut [f32], target_dbfs: f32) -> Option<f32> {
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak <= 0.0 {
        return None;
    }

    let scale = db_to_linear(target_dbfs as f64) / peak;
    for sample in samples.iter_mut() {
        *sample *= scale;
    }
    Some(scale)
}

/// Output path for `filename` under `output_dir`
///
/// `filename` must be a bare file name. `.wav` is appended when it has no
/// extension; any other extension is rejected.
pub fn output_path(output_dir: &Path, filename: &str) -> Result<PathBuf> {
    let name = filename.trim();
    let as_path = Path::new(name);

    let is_bare_name = as_path.file_name().map(|f| f == as_path.as_os_str()).unwrap_or(false);
    if name.is_empty() || !is_bare_name {
        return Err(Error::Export(format!(
            "Output filename '{}' must be a plain file name",
            filename
        )));
    }

    match as_path.extension().and_then(|e| e.to_str()) {
        None => Ok(output_dir.join(format!("{}.{}", name, OUTPUT_EXTENSION))),
        Some(ext) if ext.eq_ignore_ascii_case(OUTPUT_EXTENSION) => Ok(output_dir.join(name)),
        Some(ext) => Err(Error::Export(format!(
            "Unsupported output format '.{}'; episodes are rendered as .{}",
            ext, OUTPUT_EXTENSION
        ))),
    }
}

/// Hidden temporary name next to `path`, unique per export
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.partial", name, Uuid::new_v4()))
}

/// Master bus
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Sum, normalize (if configured) and limit
    pub fn mixdown(&self, foreground: AudioClip, layers: &[MusicLayer], log: &mut AssemblyLog) -> AudioClip {
        let mut master = sum_layers(foreground, layers);

        if let Some(target) = self.config.normalize_peak_dbfs {
            if let Some(scale) = normalize_peak(&mut master.samples, target) {
                log.info(
                    Stage::Render,
                    format!("Normalized peak to {:.1} dBFS (gain x{:.3})", target, scale),
                );
            }
        }

        let clipped = hard_limit(&mut master.samples);
        if clipped > 0 {
            log.warn(
                Stage::Render,
                format!("Limiter clamped {} sample(s) exceeding full scale", clipped),
            );
        }

        master
    }

    /// Write `master` to `path` atomically
    pub fn export(&self, master: &AudioClip, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::Export(format!("Cannot create {}: {}", dir.display(), e)))?;
        }

        let partial = partial_path(path);
        if let Err(e) = write_wav_file(&partial, master, WavFormat::Float32) {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }

        std::fs::rename(&partial, path).map_err(|e| {
            let _ = std::fs::remove_file(&partial);
            Error::Export(format!("Cannot move episode into {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            duration_s = master.duration_seconds(),
            "Episode exported"
        );
        Ok(())
    }
}
