//! Text-to-speech
//!
//! The production synthesizer is ElevenLabs, which returns MP3 bytes. The
//! engine decodes whatever comes back, using [`SynthesizedAudio::format`] as
//! a format hint.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";
const USER_AGENT: &str = "ppp-ae/0.1.0";

/// Encoded speech audio
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,

    /// File extension of the encoding (e.g. "mp3", "wav")
    pub format: String,
}

/// Turns text into speech
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice_id`
    ///
    /// Failures are reported as [`Error::Synthesis`].
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<SynthesizedAudio>;
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// ElevenLabs text-to-speech client
pub struct ElevenLabsSynthesizer {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model_id: String,
}

impl ElevenLabsSynthesizer {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: ELEVENLABS_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!("{}/text-to-speech/{}", self.base_url, voice_id)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<SynthesizedAudio> {
        if text.trim().is_empty() {
            return Err(Error::Synthesis("Nothing to synthesize: empty script".to_string()));
        }

        tracing::debug!(voice_id, chars = text.len(), "Requesting speech synthesis");

        let response = self
            .http_client
            .post(self.endpoint(voice_id))
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&TtsRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("Network error: {}", e)))?;

        let status = response.status();
        if status == 401 {
            return Err(Error::Synthesis("Invalid ElevenLabs API key".to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!(
                "API error {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("Reading audio failed: {}", e)))?;

        tracing::info!(voice_id, bytes = bytes.len(), "Speech synthesized");

        Ok(SynthesizedAudio {
            bytes: bytes.to_vec(),
            format: "mp3".to_string(),
        })
    }
}
