use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Video generation service temporarily unavailable. Please try again.")]
    UpstreamUnavailable { status: u16 },

    #[error("Failed to generate video. Please check your prompt and try again.")]
    UpstreamRejected { status: u16 },

    #[error("Video generation timed out. Please try with a shorter or simpler prompt.")]
    Timeout,

    #[error("Invalid response from video generation service")]
    MalformedUpstreamResponse,

    // Client side of the boundary.
    #[error("A generation is already in progress")]
    Busy,

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Video not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Video generation failed: no playable video in response")]
    MissingVideo,

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status this error is reported with at the request boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UpstreamRejected { status } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::MalformedUpstreamResponse => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Busy => StatusCode::CONFLICT,
            AppError::Cancelled => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Api { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::MissingVideo => StatusCode::BAD_GATEWAY,
            AppError::Storage(_)
            | AppError::Migration(_)
            | AppError::HttpClient(_)
            | AppError::Json(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable tag for the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::RateLimited => "rate_limited",
            AppError::UpstreamUnavailable { .. } => "upstream_unavailable",
            AppError::UpstreamRejected { .. } => "upstream_rejected",
            AppError::Timeout => "timeout",
            AppError::MalformedUpstreamResponse => "invalid_upstream_response",
            AppError::Busy => "busy",
            AppError::Cancelled => "cancelled",
            AppError::NotFound(_) => "not_found",
            AppError::Api { .. } => "api_error",
            AppError::MissingVideo => "missing_video",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Storage(_) | AppError::Migration(_) => "Storage error".to_string(),
            AppError::HttpClient(_) | AppError::Json(_) | AppError::Io(_) | AppError::Internal(_) => {
                "Internal server error during video generation".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": self.kind(),
            }
        }));

        (status, body).into_response()
    }
}
