//! Speech-to-text with word timestamps
//!
//! Cleanup needs word-level spans to find fillers and flag keywords, so a
//! transcript here is a flat list of [`Word`]s in time order. The production
//! transcriber is OpenAI Whisper (`verbose_json`, word granularity).

use crate::audio::encoder::{encode_wav, WavFormat};
use crate::audio::types::AudioClip;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const WHISPER_MODEL: &str = "whisper-1";
const USER_AGENT: &str = "ppp-ae/0.1.0";

/// Upload format; speech recognition gains nothing from higher rates
const UPLOAD_SAMPLE_RATE: u32 = 16000;

/// One recognized word with its span in the transcribed audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start_s: f64,
    pub end_s: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start_s: f64, end_s: f64) -> Self {
        Self {
            text: text.into(),
            start_s,
            end_s,
        }
    }

    /// Lowercased text with surrounding punctuation removed
    pub fn normalized(&self) -> String {
        self.text
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase()
    }
}

/// Space-joined transcript text
pub fn transcript_text(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Produces a word-timestamped transcript
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `clip`; words are returned in time order
    ///
    /// Failures are reported as [`Error::Transcription`].
    async fn transcribe(&self, clip: &AudioClip) -> Result<Vec<Word>>;
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

/// OpenAI Whisper transcription client
pub struct WhisperTranscriber {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl WhisperTranscriber {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Mono 16 kHz PCM WAV bytes for upload
    fn upload_bytes(clip: &AudioClip) -> Result<Vec<u8>> {
        let mono = clip.clone().conform(UPLOAD_SAMPLE_RATE, 1)?;
        encode_wav(&mono, WavFormat::Pcm16)
    }

    fn into_words(response: WhisperResponse) -> Vec<Word> {
        let mut words: Vec<Word> = response
            .words
            .into_iter()
            .map(|w| Word::new(w.word.trim(), w.start, w.end.max(w.start)))
            .filter(|w| !w.text.is_empty())
            .collect();
        words.sort_by(|a, b| a.start_s.total_cmp(&b.start_s));
        words
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<Vec<Word>> {
        let wav = Self::upload_bytes(clip)
            .map_err(|e| Error::Transcription(format!("Preparing upload failed: {}", e)))?;

        tracing::debug!(
            bytes = wav.len(),
            duration_s = clip.duration_seconds(),
            "Uploading audio for transcription"
        );

        let file_part = reqwest::multipart::Part::bytes(wav)
            .file_name("content.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Transcription(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .text("model", WHISPER_MODEL)
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .part("file", file_part);

        let response = self
            .http_client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transcription(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Transcription(format!(
                "API error {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("Parse error: {}", e)))?;

        let words = Self::into_words(body);
        tracing::info!(words = words.len(), "Transcription complete");
        Ok(words)
    }
}
