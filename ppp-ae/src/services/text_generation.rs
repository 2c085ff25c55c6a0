//! Script generation for AI segments
//!
//! `AiGenerated` segments hand their prompt to a [`TextGenerator`]; the
//! returned script is then synthesized like any TTS segment. The production
//! implementation talks to the OpenAI chat completions API.

use crate::error::{Error, Result};
use crate::model::EpisodeMetadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const USER_AGENT: &str = "ppp-ae/0.1.0";

const SCRIPT_SYSTEM_PROMPT: &str = "You write short spoken segments for a podcast. \
Answer with the words to be read aloud only: no stage directions, headings or markup.";

/// Turns a prompt into a script
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`
    ///
    /// Failures are reported as [`Error::ScriptGeneration`].
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI chat completions client
pub struct OpenAiTextGenerator {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiTextGenerator {
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
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SCRIPT_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        }
    }

    fn parse_response(response: ChatResponse) -> Result<String> {
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::ScriptGeneration(
                "Model returned an empty script".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Requesting script");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| Error::ScriptGeneration(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::ScriptGeneration(format!(
                "API error {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::ScriptGeneration(format!("Parse error: {}", e)))?;

        let script = Self::parse_response(body)?;
        tracing::info!(chars = script.len(), "Script generated");
        Ok(script)
    }
}

/// Prompt asking for an episode title and summary from a transcript
pub fn metadata_prompt(transcript: &str) -> String {
    format!(
        "Based on the following podcast transcript, write a catchy episode title and a \
         two to three sentence summary. Respond with JSON only, in the form \
         {{\"title\": \"...\", \"summary\": \"...\"}}.\n\nTranscript:\n{}",
        transcript
    )
}

/// Parse the generator's reply to [`metadata_prompt`]
///
/// Accepts the requested JSON object, optionally wrapped in a markdown code
/// fence. Otherwise the first non-empty line is the title and the rest the
/// summary.
pub fn parse_metadata(reply: &str) -> Result<EpisodeMetadata> {
    let trimmed = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(metadata) = serde_json::from_str::<EpisodeMetadata>(trimmed) {
        return Ok(metadata);
    }

    let mut lines = trimmed.lines().map(str::trim).filter(|l| !l.is_empty());
    let title = lines
        .next()
        .map(|l| l.trim_start_matches("Title:").trim().to_string())
        .ok_or_else(|| Error::ScriptGeneration("Empty metadata reply".to_string()))?;
    let summary = lines
        .map(|l| l.trim_start_matches("Summary:").trim())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(EpisodeMetadata { title, summary })
}
