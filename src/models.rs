use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_SECS: u32 = 5;
pub const DEFAULT_QUALITY: &str = "standard";
pub const DEFAULT_STYLE: &str = "realistic";

/// Lifecycle of one generation, shared by the controller and stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Idle,
    #[serde(alias = "pending", alias = "starting", alias = "generating")]
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_style")]
    pub style: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            duration: DEFAULT_DURATION_SECS,
            quality: DEFAULT_QUALITY.into(),
            style: DEFAULT_STYLE.into(),
        }
    }
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_SECS
}

fn default_quality() -> String {
    DEFAULT_QUALITY.into()
}

fn default_style() -> String {
    DEFAULT_STYLE.into()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Seconds spent waiting on the upstream call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,
    /// Rough size estimate in MB; nothing is actually downloaded server side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_style")]
    pub style: String,
    pub status: GenerationStatus,
    pub created_at: String,
    #[serde(default)]
    pub metadata: VideoMetadata,
}

impl GenerationResult {
    /// Record standing in for a request that has not resolved yet.
    pub fn in_flight(request: &GenerationRequest) -> Self {
        Self {
            id: new_video_id(),
            prompt: request.prompt.trim().to_string(),
            video_url: String::new(),
            thumbnail_url: None,
            duration: request.duration,
            quality: request.quality.clone(),
            style: request.style.clone(),
            status: GenerationStatus::Processing,
            created_at: chrono::Utc::now().to_rfc3339(),
            metadata: VideoMetadata::default(),
        }
    }
}

/// Body of a successful `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub video: GenerationResult,
    pub message: String,
}

/// `video_<unix millis>_<9 base-36 chars>`
pub fn new_video_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    format!("video_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}
