//! Audio decoder using symphonia
//!
//! Decodes in-memory audio (MP3, WAV, FLAC, AAC, Vorbis) to interleaved f32
//! PCM. Assets and synthesized speech both arrive as bytes, so nothing here
//! touches the filesystem.

use crate::audio::types::AudioClip;
use crate::error::{Error, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Simple whole-buffer decoder.
pub struct SimpleDecoder;

impl SimpleDecoder {
    /// Decode an entire in-memory audio file.
    ///
    /// `extension` is a format hint only (e.g. "mp3"); probing still inspects
    /// the bytes. Channel count and sample rate are kept as found in the
    /// source; conversion to the working format happens later.
    pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioClip> {
        debug!(bytes = bytes.len(), ?extension, "Decoding audio");

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Unrecognized audio format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(e) => {
                    end_of_stream(e, samples.len() / channels.unwrap_or(1).max(1) as usize)?;
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate.get_or_insert(spec.rate);
                    channels.get_or_insert(spec.channels.count() as u16);

                    let needed = decoded.capacity() * spec.channels.count();
                    let too_small = sample_buf
                        .as_ref()
                        .map_or(true, |buf| buf.capacity() < needed);
                    if too_small {
                        sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }

                    if let Some(buf) = sample_buf.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        samples.extend_from_slice(buf.samples());
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error: {}", e);
                    skipped_packets += 1;
                    continue;
                }
                Err(e) => {
                    return Err(Error::Decode(format!("Decoder failed: {}", e)));
                }
            }
        }

        if samples.is_empty() && skipped_packets > 0 {
            return Err(Error::Decode(format!(
                "No audio decoded: all {} packet(s) were corrupt",
                skipped_packets
            )));
        }
        if skipped_packets > 0 {
            warn!(skipped_packets, "Corrupt packets skipped while decoding");
        }

        let sample_rate =
            sample_rate.ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;
        let channels = channels.ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;

        debug!(
            sample_rate,
            channels,
            frames = samples.len() / channels.max(1) as usize,
            "Decoded audio"
        );

        Ok(AudioClip::new(samples, sample_rate, channels))
    }

    /// File extension of `filename`, used as a format hint
    pub fn extension_hint(filename: &str) -> Option<&str> {
        std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
    }
}

/// Classify a packet read error
///
/// A clean end of stream is `Ok`; anything else means the source is damaged,
/// and returning what was read so far would silently shorten the clip.
fn end_of_stream(err: SymphoniaError, frames_read: usize) -> Result<()> {
    match err {
        SymphoniaError::IoError(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
        SymphoniaError::ResetRequired => Ok(()),
        e => Err(Error::Decode(format!(
            "Audio stream unreadable after {} frames: {}",
            frames_read, e
        ))),
    }
}
