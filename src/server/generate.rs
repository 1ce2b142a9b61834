use crate::error::AppError;
use crate::models::{
    new_video_id, GenerateResponse, GenerationRequest, GenerationResult, GenerationStatus,
    VideoMetadata, DEFAULT_DURATION_SECS, DEFAULT_QUALITY, DEFAULT_STYLE,
};
use crate::upstream::{InferenceClient, InferenceOutput};
use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;

pub const MAX_PROMPT_CHARS: usize = 1000;

#[derive(Clone)]
pub struct GenerateState {
    pub inference: Arc<InferenceClient>,
}

/// `POST /generate`
pub async fn handle_generate(
    State(state): State<GenerateState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, AppError> {
    let request = parse_request(&body)?;

    log::info!(
        "Generating video: {} chars, {}s, quality={}",
        request.prompt.chars().count(),
        request.duration,
        request.quality
    );

    let output = state.inference.generate(&request).await?;
    log::debug!(
        "Upstream replied in {:?} (link extracted: {}): {}",
        output.elapsed,
        output.extracted,
        output.content
    );
    let thumbnail_url = state.inference.config().placeholder_thumbnail_url.clone();
    let video = synthesize_result(&request, &output, thumbnail_url);

    Ok(Json(GenerateResponse {
        success: true,
        video,
        message: "Video generated successfully".into(),
    }))
}

/// `GET /generate`
pub async fn service_info(State(state): State<GenerateState>) -> Json<Value> {
    Json(json!({
        "message": "AI Video Generation API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST": "/generate - Generate video from text prompt",
            "GET": "/generate - Service information",
        },
        "model": state.inference.config().model,
    }))
}

/// Validate a raw `/generate` body without touching the network.
pub fn parse_request(body: &[u8]) -> Result<GenerationRequest, AppError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| AppError::validation("Request body must be a JSON object"))?;
    let obj = value
        .as_object()
        .ok_or_else(|| AppError::validation("Request body must be a JSON object"))?;

    let prompt = match obj.get("prompt") {
        Some(Value::String(p)) if !p.trim().is_empty() => p,
        _ => return Err(AppError::validation("Valid prompt is required")),
    };
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::validation(format!(
            "Prompt must be less than {} characters",
            MAX_PROMPT_CHARS
        )));
    }

    let duration = match obj.get("duration") {
        None | Some(Value::Null) => DEFAULT_DURATION_SECS,
        Some(v) => v
            .as_u64()
            .filter(|d| *d > 0)
            .and_then(|d| u32::try_from(d).ok())
            .ok_or_else(|| AppError::validation("Duration must be a positive number of seconds"))?,
    };

    Ok(GenerationRequest {
        prompt: prompt.trim().to_string(),
        duration,
        quality: label(obj.get("quality"), DEFAULT_QUALITY),
        style: label(obj.get("style"), DEFAULT_STYLE),
    })
}

fn label(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn synthesize_result(
    request: &GenerationRequest,
    output: &InferenceOutput,
    thumbnail_url: String,
) -> GenerationResult {
    GenerationResult {
        id: new_video_id(),
        prompt: request.prompt.clone(),
        video_url: output.video_url.clone(),
        thumbnail_url: Some(thumbnail_url),
        duration: request.duration,
        quality: request.quality.clone(),
        style: request.style.clone(),
        status: GenerationStatus::Completed,
        created_at: chrono::Utc::now().to_rfc3339(),
        metadata: VideoMetadata {
            model: Some(output.model.clone()),
            processing_time: Some(output.elapsed.as_secs()),
            file_size: Some(estimate_file_size_mb()),
        },
    }
}

fn estimate_file_size_mb() -> u32 {
    rand::rng().random_range(10..60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> Result<GenerationRequest, AppError> {
        parse_request(&serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn accepts_minimal_body_with_defaults() {
        let req = parse(json!({"prompt": "  A calm lake at sunset  "})).unwrap();
        assert_eq!(req.prompt, "A calm lake at sunset");
        assert_eq!(req.duration, 5);
        assert_eq!(req.quality, "standard");
        assert_eq!(req.style, "realistic");
    }

    #[test]
    fn rejects_missing_blank_or_non_string_prompt() {
        for body in [
            json!({}),
            json!({"prompt": ""}),
            json!({"prompt": " \n\t "}),
            json!({"prompt": 42}),
            json!({"prompt": null}),
            json!(["prompt"]),
        ] {
            assert!(matches!(parse(body), Err(AppError::Validation(_))));
        }
        assert!(matches!(parse_request(b"not json"), Err(AppError::Validation(_))));
    }

    #[test]
    fn enforces_prompt_length_bound() {
        let at_limit = "a".repeat(MAX_PROMPT_CHARS);
        assert!(parse(json!({"prompt": at_limit})).is_ok());

        let over = "a".repeat(MAX_PROMPT_CHARS + 1);
        let err = parse(json!({"prompt": over})).unwrap_err();
        assert_eq!(err.to_string(), "Prompt must be less than 1000 characters");
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let wide = "é".repeat(MAX_PROMPT_CHARS);
        assert!(parse(json!({"prompt": wide})).is_ok());
    }

    #[test]
    fn duration_must_be_positive() {
        assert!(parse(json!({"prompt": "x", "duration": 0})).is_err());
        assert!(parse(json!({"prompt": "x", "duration": -3})).is_err());
        assert!(parse(json!({"prompt": "x", "duration": "long"})).is_err());
        assert_eq!(parse(json!({"prompt": "x", "duration": 12})).unwrap().duration, 12);
    }
}
