use crate::error::AppError;
use serde::{Deserialize, Serialize};

// --- Wire types for the chat-completions shaped endpoint ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

// Response fields are optional so that a partial body is reported as an
// invalid response rather than a JSON error.

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

impl ChatResponse {
    /// Decode a 2xx body and pull out `choices[0].message.content` as text.
    pub fn decode_content(body: &[u8]) -> Result<(String, Option<String>), AppError> {
        let resp: ChatResponse =
            serde_json::from_slice(body).map_err(|_| AppError::MalformedUpstreamResponse)?;

        let message = resp
            .choices
            .as_ref()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.message.as_ref())
            .ok_or(AppError::MalformedUpstreamResponse)?;

        Ok((content_to_text(message.content.as_ref()), resp.model))
    }
}

fn content_to_text(content: Option<&serde_json::Value>) -> String {
    match content {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}
