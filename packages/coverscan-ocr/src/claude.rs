//! Hosted vision backend over the Anthropic Messages API.
//!
//! Uses the same extraction prompt and reply parsing as the OpenAI-compatible
//! backend, so both produce the same kind of overlay records.
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::{OcrEngine, OcrError, OcrInput, OcrOutput};
use crate::vision::{image_mime, output_from_reply, EXTRACTION_PROMPT};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone)]
pub struct ClaudeOptions {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl Default for ClaudeOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            max_tokens: 1500,
        }
    }
}

pub struct ClaudeEngine {
    key: String,
    options: ClaudeOptions,
    client: reqwest::Client,
}

impl ClaudeEngine {
    pub fn new(key: impl Into<String>, options: ClaudeOptions) -> Self {
        Self {
            key: key.into(),
            options,
            client: reqwest::Client::new(),
        }
    }

    /// Builds an engine from an optional key, e.g. the value of `ANTHROPIC_API_KEY`.
    pub fn from_key(key: Option<String>, options: ClaudeOptions) -> Result<Self, OcrError> {
        match key {
            Some(key) if !key.trim().is_empty() => Ok(Self::new(key.trim(), options)),
            _ => Err(OcrError::MissingCredentials("ANTHROPIC_API_KEY is not set")),
        }
    }

    pub fn from_env(options: ClaudeOptions) -> Result<Self, OcrError> {
        Self::from_key(std::env::var(API_KEY_VAR).ok(), options)
    }

    async fn complete(&self, bytes: &[u8]) -> Result<String, OcrError> {
        let body = json!({
            "model": self.options.model,
            "max_tokens": self.options.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": image_mime(bytes),
                            "data": BASE64.encode(bytes)
                        }
                    },
                    {"type": "text", "text": EXTRACTION_PROMPT}
                ]
            }]
        });

        let endpoint = format!("{}/messages", self.options.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&endpoint)
            .header("x-api-key", &self.key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(OcrError::EngineError(format!(
                "Claude API error ({}): {}",
                status,
                extract_claude_error(&text).unwrap_or(text)
            )));
        }

        let payload: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| OcrError::EngineError(format!("bad Claude API response: {}", e)))?;
        let reply = payload
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        if reply.trim().is_empty() {
            return Err(OcrError::EngineError(
                "Claude API returned no text".to_string(),
            ));
        }
        Ok(reply)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

fn extract_claude_error(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    let message = error.get("message").and_then(Value::as_str)?;
    match error.get("type").and_then(Value::as_str) {
        Some(kind) => Some(format!("{} (type: {})", message, kind)),
        None => Some(message.to_string()),
    }
}

#[async_trait]
impl OcrEngine for ClaudeEngine {
    fn name(&self) -> String {
        format!("claude {}", self.options.model)
    }

    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, OcrError> {
        let bytes = input.read_bytes().await?;
        let reply = self.complete(&bytes).await?;
        Ok(output_from_reply(self.name(), &reply))
    }
}
