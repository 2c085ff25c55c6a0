//! In-memory stand-ins for the external services

use super::audio_generator::wav_bytes;
use async_trait::async_trait;
use ppp_ae::audio::AudioClip;
use ppp_ae::services::{SpeechSynthesizer, SynthesizedAudio, TextGenerator, Transcriber, Word};
use ppp_ae::{Error, Result};
use std::sync::Mutex;
use std::time::Duration;

/// Returns a fixed reply, or "Script for <prompt>" when none is set
#[derive(Default)]
pub struct FakeGenerator {
    pub reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn with_reply(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self
            .reply
            .clone()
            .unwrap_or_else(|| format!("Script for {}", prompt)))
    }
}

/// Speech of `seconds_per_word` per word at a constant `level`
pub struct FakeSynthesizer {
    pub sample_rate: u32,
    pub seconds_per_word: f64,
    pub level: f32,
    pub delay: Duration,
    pub texts: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            seconds_per_word: 0.5,
            level: 0.1,
            delay: Duration::ZERO,
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<SynthesizedAudio> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.texts.lock().unwrap().push(text.to_string());

        let words = text.split_whitespace().count() as f64;
        let frames = (words * self.seconds_per_word * self.sample_rate as f64).round() as usize;
        Ok(SynthesizedAudio {
            bytes: wav_bytes(&vec![self.level; frames], self.sample_rate),
            format: "wav".to_string(),
        })
    }
}

/// Always fails, after an optional delay
pub struct FailingSynthesizer {
    pub delay: Duration,
}

#[async_trait]
impl SpeechSynthesizer for FailingSynthesizer {
    async fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<SynthesizedAudio> {
        tokio::time::sleep(self.delay).await;
        Err(Error::Synthesis("voice unavailable".to_string()))
    }
}

/// Returns the same words for every clip
#[derive(Default)]
pub struct FakeTranscriber {
    pub words: Vec<Word>,
}

impl FakeTranscriber {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _clip: &AudioClip) -> Result<Vec<Word>> {
        Ok(self.words.clone())
    }
}
