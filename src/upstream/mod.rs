pub mod chat;

use crate::config::UpstreamConfig;
use crate::error::AppError;
use crate::models::GenerationRequest;
use chat::{ChatMessage, ChatRequest, ChatResponse};
use regex::Regex;
use std::time::{Duration, Instant};

const SYSTEM_INSTRUCTION: &str = "You are a professional video generation AI. Create high-quality \
videos based on user descriptions with cinematic quality, smooth transitions, and professional \
production values.";

/// Normalized result of one upstream call.
#[derive(Debug, Clone)]
pub struct InferenceOutput {
    /// Raw assistant text from the upstream reply.
    pub content: String,
    /// Video link found in `content`, or the configured placeholder.
    pub video_url: String,
    /// True when `video_url` came from the reply rather than the placeholder.
    pub extracted: bool,
    pub model: String,
    pub elapsed: Duration,
}

/// Client for the external chat-completions shaped inference endpoint.
///
/// Constructed once from [`UpstreamConfig`] and shared; it holds no mutable state.
pub struct InferenceClient {
    http: reqwest::Client,
    config: UpstreamConfig,
    video_url_pattern: Regex,
}

impl InferenceClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, AppError> {
        Self::with_http_client(reqwest::Client::new(), config)
    }

    pub fn with_http_client(http: reqwest::Client, config: UpstreamConfig) -> Result<Self, AppError> {
        // Stop at whitespace, quotes, brackets and parens so adjacent links never merge.
        let video_url_pattern =
            Regex::new(r#"(?i)https?://[^\s"'<>()\[\]]+?\.(?:mp4|webm|avi|mov)\b"#)
                .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(Self {
            http,
            config,
            video_url_pattern,
        })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Issue exactly one upstream call for `request`, bounded by the configured timeout.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<InferenceOutput, AppError> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::validation("Valid prompt is required"));
        }

        let payload = self.build_payload(request);
        let start = Instant::now();

        // Dropping the in-flight future on expiry aborts the transport.
        let outcome = tokio::select! {
            res = self.send(&payload) => res,
            _ = tokio::time::sleep(self.timeout()) => {
                log::warn!(
                    "Upstream call exceeded {}s, giving up",
                    self.config.timeout_secs
                );
                Err(AppError::Timeout)
            }
        };

        let (content, model) = outcome?;
        let (video_url, extracted) = match self.extract_video_url(&content) {
            Some(url) => (url, true),
            None => (self.config.placeholder_video_url.clone(), false),
        };

        Ok(InferenceOutput {
            content,
            video_url,
            extracted,
            model: model.unwrap_or_else(|| self.config.model.clone()),
            elapsed: start.elapsed(),
        })
    }

    pub fn build_payload(&self, request: &GenerationRequest) -> ChatRequest {
        let user_message = format!(
            "Generate a high-quality video based on this description: {}. Duration: {} seconds. \
             Style: {}. Quality: {}.",
            request.prompt.trim(),
            request.duration,
            request.style,
            request.quality,
        );

        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(user_message),
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        }
    }

    async fn send(&self, payload: &ChatRequest) -> Result<(String, Option<String>), AppError> {
        let mut builder = self
            .http
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .json(payload);
        if let Some(customer_id) = &self.config.customer_id {
            builder = builder.header("CustomerId", customer_id);
        }
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let resp = builder.send().await.map_err(|e| {
            log::error!("Upstream request failed: {}", e);
            AppError::HttpClient(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp.text().await.unwrap_or_default();
            log::error!("Video generation API error: {} {}", status.as_u16(), error_body);
            return Err(classify_status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        ChatResponse::decode_content(&body)
    }

    /// First `http(s)` link in `content` pointing at a video file, if any.
    pub fn extract_video_url(&self, content: &str) -> Option<String> {
        self.video_url_pattern
            .find(content)
            .map(|m| m.as_str().to_string())
    }
}

/// Map a non-2xx upstream status onto the error taxonomy.
pub fn classify_status(status: u16) -> AppError {
    match status {
        429 => AppError::RateLimited,
        500..=599 => AppError::UpstreamUnavailable { status },
        _ => AppError::UpstreamRejected { status },
    }
}
