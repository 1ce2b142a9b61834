use crate::error::AppError;
use crate::models::{GenerateResponse, GenerationRequest, GenerationResult};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// The controller's view of the `/generate` endpoint.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// One round trip. Success means a record with a usable `video_url`.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, AppError>;
}

/// Talks to a running reelgen server over HTTP.
pub struct HttpGenerationApi {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGenerationApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /generate`: static service description.
    pub async fn service_info(&self) -> Result<Value, AppError> {
        let resp = self
            .http
            .get(self.url("/generate"))
            .timeout(Duration::from_secs(10))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl GenerationApi for HttpGenerationApi {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, AppError> {
        let resp = self
            .http
            .post(self.url("/generate"))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout
                } else {
                    AppError::HttpClient(e)
                }
            })?;

        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        let parsed: GenerateResponse =
            serde_json::from_slice(&body).map_err(|_| AppError::MissingVideo)?;
        if !parsed.success || parsed.video.video_url.trim().is_empty() {
            return Err(AppError::MissingVideo);
        }
        Ok(parsed.video)
    }
}

/// Pull the human-readable message out of a server error body.
fn error_from_body(status: u16, body: &[u8]) -> AppError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| match &v["error"] {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj.get("message").and_then(|m| m.as_str()).map(String::from),
            _ => None,
        })
        .unwrap_or_else(|| format!("Failed to generate video (HTTP {})", status));
    AppError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_from_nested_body() {
        let err = error_from_body(429, br#"{"error":{"message":"Rate limit exceeded.","type":"rate_limited"}}"#);
        match err {
            AppError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit exceeded.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_message_from_flat_or_garbage_body() {
        let err = error_from_body(400, br#"{"error":"Valid prompt is required"}"#);
        assert_eq!(err.to_string(), "Valid prompt is required");

        let err = error_from_body(502, b"<html>bad gateway</html>");
        assert_eq!(err.to_string(), "Failed to generate video (HTTP 502)");
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let api = HttpGenerationApi::new("http://localhost:9000/", Duration::from_secs(1));
        assert_eq!(api.url("/generate"), "http://localhost:9000/generate");
    }
}
