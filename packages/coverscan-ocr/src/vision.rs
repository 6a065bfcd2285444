//! Hosted vision-model backend (OpenAI-compatible chat completions).
//!
//! The model is asked to list every piece of text with an estimated position,
//! so regions from this backend have percentages but no pixel boxes.
use std::sync::OnceLock;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::{OcrEngine, OcrError, OcrInput, OcrOutput};
use crate::region::{RegionRecord, SizeClass};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

pub(crate) const EXTRACTION_PROMPT: &str = r#"Analyze this magazine cover and extract ALL visible text with approximate positions.

For each piece of text you find, provide:
1. The exact text content
2. Approximate position as percentage from top-left (0-100% for both x and y)
3. Approximate size (small/medium/large)
4. Text type (masthead/headline/caption/speech_bubble/price/date/other)

Format your response as a JSON array like this:
[
  {
    "text": "PRIVATE EYE",
    "x_percent": 50,
    "y_percent": 15,
    "size": "large",
    "type": "masthead"
  }
]

Be thorough - extract ALL text including titles, headlines, speech bubbles, prices, dates."#;

#[derive(Debug, Clone)]
pub struct VisionOptions {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl Default for VisionOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            max_tokens: 1500,
        }
    }
}

pub struct VisionEngine {
    key: String,
    options: VisionOptions,
    client: reqwest::Client,
}

impl VisionEngine {
    pub fn new(key: impl Into<String>, options: VisionOptions) -> Self {
        Self {
            key: key.into(),
            options,
            client: reqwest::Client::new(),
        }
    }

    /// Builds an engine from an optional key, e.g. the value of `OPENAI_API_KEY`.
    pub fn from_key(key: Option<String>, options: VisionOptions) -> Result<Self, OcrError> {
        match key {
            Some(key) if !key.trim().is_empty() => Ok(Self::new(key.trim(), options)),
            _ => Err(OcrError::MissingCredentials("OPENAI_API_KEY is not set")),
        }
    }

    pub fn from_env(options: VisionOptions) -> Result<Self, OcrError> {
        Self::from_key(std::env::var(API_KEY_VAR).ok(), options)
    }

    async fn complete(&self, bytes: &[u8]) -> Result<String, OcrError> {
        let url = format!("data:{};base64,{}", image_mime(bytes), BASE64.encode(bytes));
        let body = json!({
            "model": self.options.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": EXTRACTION_PROMPT},
                    {"type": "image_url", "image_url": {"url": url, "detail": "high"}}
                ]
            }],
            "max_tokens": self.options.max_tokens
        });

        let endpoint = format!(
            "{}/chat/completions",
            self.options.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(OcrError::EngineError(format!(
                "vision API error ({}): {}",
                status,
                extract_api_error(&text).unwrap_or(text)
            )));
        }

        let payload: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| OcrError::EngineError(format!("bad vision API response: {}", e)))?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OcrError::EngineError("vision API returned no content".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub(crate) fn image_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/png")
}

fn extract_api_error(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

#[async_trait]
impl OcrEngine for VisionEngine {
    fn name(&self) -> String {
        format!("vision {}", self.options.model)
    }

    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, OcrError> {
        let bytes = input.read_bytes().await?;
        let reply = self.complete(&bytes).await?;
        Ok(output_from_reply(self.name(), &reply))
    }
}

/// Wraps a hosted model's reply as engine output.
pub(crate) fn output_from_reply(method: String, reply: &str) -> OcrOutput {
    let regions = parse_vision_response(reply);
    tracing::debug!(regions = regions.len(), "{} parsed response", method);

    let text = regions
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    OcrOutput {
        method,
        text,
        regions,
        page: None,
    }
}

fn quoted_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#""([^"]+)""#).ok()).as_ref()
}

/// Turns a model reply into overlay records.
///
/// Uses the first complete JSON array of objects in the reply. Text after it,
/// bracketed or not, is ignored. When no array parses, every double-quoted
/// string longer than two characters becomes a record stacked down the middle
/// of the page.
pub fn parse_vision_response(reply: &str) -> Vec<RegionRecord> {
    if let Some(items) = first_json_array(reply) {
        return items.iter().filter_map(record_from_value).collect();
    }

    tracing::debug!("vision reply is not a JSON array, falling back to quoted strings");
    let mut records = Vec::new();
    let Some(quoted) = quoted_pattern() else {
        return records;
    };
    for line in reply.lines() {
        for cap in quoted.captures_iter(line) {
            let text = &cap[1];
            if text.chars().count() <= 2 {
                continue;
            }
            let y = 30.0 + records.len() as f64 * 15.0;
            records.push(RegionRecord {
                text: text.to_string(),
                x_percent: 50.0,
                y_percent: y,
                size: SizeClass::Medium,
                kind: "other".to_string(),
                confidence: None,
                bbox: None,
            });
        }
    }
    records
}

fn first_json_array(reply: &str) -> Option<Vec<Value>> {
    reply.match_indices('[').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&reply[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Array(items)))
                if items.is_empty() || items.iter().any(Value::is_object) =>
            {
                Some(items)
            }
            _ => None,
        }
    })
}

/// Entries only need non-empty text; symbol-only entries such as `£` are kept.
fn record_from_value(value: &Value) -> Option<RegionRecord> {
    let text = value.get("text")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    let percent = |key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_f64().or_else(|| v.as_str()?.trim_end_matches('%').parse().ok()))
            .map(|v| v.clamp(0.0, 100.0))
            .unwrap_or(50.0)
    };
    let size = match value.get("size").and_then(Value::as_str) {
        Some("small") => SizeClass::Small,
        Some("large") => SizeClass::Large,
        _ => SizeClass::Medium,
    };
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("other")
        .to_string();
    Some(RegionRecord {
        text: text.to_string(),
        x_percent: percent("x_percent"),
        y_percent: percent("y_percent"),
        size,
        kind,
        confidence: None,
        bbox: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    #[test]
    fn test_parse_fenced_array() {
        let reply = r#"Here is what I found:
```json
[
  {"text": "PRIVATE EYE", "x_percent": 50, "y_percent": 15, "size": "large", "type": "masthead"},
  {"text": "No. 1642", "x_percent": "80%", "y_percent": 5, "size": "small", "type": "date"},
  {"text": "", "x_percent": 1, "y_percent": 1}
]
```"#;
        let records = parse_vision_response(reply);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "PRIVATE EYE");
        assert_eq!(records[0].size, SizeClass::Large);
        assert_eq!(records[0].kind, "masthead");
        assert_eq!(records[1].x_percent, 80.0);
        assert!(records.iter().all(|r| r.bbox.is_none()));
    }

    #[test]
    fn test_trailing_bracketed_note_is_ignored() {
        let reply = r#"[{"text": "PRIVATE EYE", "x_percent": 50, "y_percent": 15, "size": "large", "type": "masthead"}]
Note: positions are estimates [approx]."#;
        let records = parse_vision_response(reply);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "PRIVATE EYE");
        assert_eq!(records[0].y_percent, 15.0);
        assert_eq!(records[0].kind, "masthead");
    }

    #[test]
    fn test_leading_bracketed_prose_is_skipped() {
        let reply = r#"Found [2] items:
[{"text": "ANDREW", "x_percent": 10, "y_percent": 40, "box": [1, 2]},
 {"text": "£", "x_percent": 90, "y_percent": 5, "size": "small", "type": "price"}]"#;
        let records = parse_vision_response(reply);
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["ANDREW", "£"]);
        assert_eq!(records[1].kind, "price");
    }

    #[test]
    fn test_fallback_to_quoted_strings() {
        let reply = "I see \"PRIVATE EYE\" at the top and \"OK\" in a bubble.\nAlso \"ANDREW\".";
        let records = parse_vision_response(reply);
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["PRIVATE EYE", "ANDREW"]);
        assert_eq!(records[0].y_percent, 30.0);
        assert_eq!(records[1].y_percent, 45.0);
        assert_eq!(records[1].kind, "other");
    }

    #[test]
    fn test_unparseable_reply_is_empty() {
        assert!(parse_vision_response("no text visible").is_empty());
    }

    #[tokio::test]
    async fn test_recognize_against_local_endpoint() {
        let reply = json!({
            "choices": [{"message": {"content": "[{\"text\": \"PRIVATE EYE\", \"x_percent\": 50, \"y_percent\": 15, \"size\": \"large\"}]"}}]
        });
        let (base_url, server) = serve_once(200, reply.to_string()).await;
        let engine = VisionEngine::new(
            "sk-test",
            VisionOptions {
                base_url,
                ..Default::default()
            },
        );

        let output = engine
            .recognize(&OcrInput::Bytes(b"fake image".to_vec()))
            .await
            .unwrap();
        assert_eq!(output.method, "vision gpt-4o");
        assert_eq!(output.text, "PRIVATE EYE");
        assert_eq!(output.regions[0].size, SizeClass::Large);

        let request = server.await.unwrap();
        assert!(request.head.starts_with("POST /chat/completions"));
        assert_eq!(request.header("authorization").as_deref(), Some("Bearer sk-test"));
        let body: Value = serde_json::from_str(&request.body).unwrap();
        let url = body["messages"][0]["content"][1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_recognize_reports_api_error() {
        let (base_url, _server) = serve_once(
            401,
            r#"{"error": {"message": "Incorrect API key provided"}}"#.to_string(),
        )
        .await;
        let engine = VisionEngine::new(
            "sk-bad",
            VisionOptions {
                base_url,
                ..Default::default()
            },
        );
        let err = engine
            .recognize(&OcrInput::Bytes(b"fake image".to_vec()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Incorrect API key provided"));
    }

    #[test]
    fn test_blank_key_is_missing_credentials() {
        let err = VisionEngine::from_key(Some("  ".to_string()), VisionOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, OcrError::MissingCredentials(_)));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(
            extract_api_error(body).as_deref(),
            Some("Incorrect API key provided")
        );
    }
}
