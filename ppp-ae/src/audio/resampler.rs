//! Audio resampling using rubato
//!
//! Converts clips to the engine's working sample rate before they are placed
//! on the timeline.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Audio resampler using rubato for sample rate conversion.
pub struct Resampler;

impl Resampler {
    /// Resample interleaved audio from `input_rate` to `output_rate`.
    ///
    /// The output always holds exactly `round(frames × output_rate / input_rate)`
    /// frames so that clip durations survive conversion; the resampler's tail
    /// is padded with silence or trimmed to that length.
    pub fn resample(
        input: &[f32],
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }

        if input_rate == 0 || output_rate == 0 || channels == 0 {
            return Err(Error::Decode(format!(
                "Cannot resample {}Hz -> {}Hz with {} channels",
                input_rate, output_rate, channels
            )));
        }

        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input.first().map(|c| c.len()).unwrap_or(0);

        if input_frames == 0 {
            return Ok(Vec::new());
        }

        debug!(
            "Resampling {} frames from {}Hz to {}Hz ({} channels)",
            input_frames, input_rate, output_rate, channels
        );

        let mut resampler = Self::create_resampler(input_rate, output_rate, channels, input_frames)?;

        let mut planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

        let expected_frames =
            (input_frames as f64 * output_rate as f64 / input_rate as f64).round() as usize;

        // The interpolator lags its input; flush until the delayed tail is out
        let delay = resampler.output_delay();
        while planar_output[0].len() < delay + expected_frames {
            let tail = resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| Error::Decode(format!("Resampler flush failed: {}", e)))?;
            if tail.first().map_or(true, Vec::is_empty) {
                break;
            }
            for (channel, flushed) in planar_output.iter_mut().zip(tail) {
                channel.extend(flushed);
            }
        }

        for channel in planar_output.iter_mut() {
            channel.drain(..delay.min(channel.len()));
            channel.resize(expected_frames, 0.0);
        }

        Ok(Self::interleave(planar_output))
    }

    /// Create a rubato resampler sized for a single whole-clip chunk.
    fn create_resampler(
        input_rate: u32,
        output_rate: u32,
        channels: u16,
        chunk_size: usize,
    ) -> Result<FastFixedIn<f32>> {
        FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            chunk_size,
            channels as usize,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))
    }

    /// Split interleaved frames into one buffer per channel
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let ch = channels as usize;
        (0..ch)
            .map(|c| samples.iter().skip(c).step_by(ch).copied().collect())
            .collect()
    }

    /// Merge per-channel buffers back into interleaved frames
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        let frames = planar.first().map(Vec::len).unwrap_or(0);
        (0..frames)
            .flat_map(|i| planar.iter().map(move |channel| channel[i]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave() {
        let interleaved = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let planar = Resampler::deinterleave(&interleaved, 2);

        assert_eq!(planar.len(), 2);
        assert_eq!(planar[0], vec![1.0, 3.0, 5.0]);
        assert_eq!(planar[1], vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_interleave() {
        let planar = vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]];
        assert_eq!(Resampler::interleave(planar), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_resample_same_rate() {
        let input = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let output = Resampler::resample(&input, 44100, 44100, 2).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_resample_exact_length() {
        let input_rate = 48000;
        let duration_frames = 4800;

        let mut input = Vec::with_capacity(duration_frames * 2);
        for i in 0..duration_frames {
            let t = i as f32 / input_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            input.push(sample);
            input.push(sample);
        }

        let output = Resampler::resample(&input, input_rate, 44100, 2).unwrap();
        assert_eq!(output.len() / 2, 4410);
    }

    #[test]
    fn test_resample_keeps_timing() {
        let mut input = vec![0.0f32; 8000];
        input[4000] = 1.0;

        let output = Resampler::resample(&input, 8000, 44100, 1).unwrap();
        assert_eq!(output.len(), 44100);

        let peak = output
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((peak as i64 - 22050).abs() <= 1, "peak at {}", peak);
    }

    #[test]
    fn test_resample_keeps_tail() {
        let output = Resampler::resample(&vec![0.5f32; 8000], 8000, 44100, 1).unwrap();
        assert_eq!(output.len(), 44100);
        assert!((output[44100 / 2] - 0.5).abs() < 1e-3);
        assert!(output[44100 - 40..44100 - 30].iter().all(|s| (s - 0.5).abs() < 0.01));
    }

    #[test]
    fn test_resample_empty() {
        let output = Resampler::resample(&[], 48000, 44100, 2).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_resample_rejects_zero_rate() {
        assert!(Resampler::resample(&[0.0; 4], 0, 44100, 2).is_err());
    }
}
