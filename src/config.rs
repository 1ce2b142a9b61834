use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_UPSTREAM_URL: &str = "https://oi-server.onrender.com/chat/completions";
pub const DEFAULT_MODEL: &str = "replicate/google/veo-3";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 15 * 60;
// Grace period so the server's own timeout answer reaches the client first.
const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 30;
pub const DEFAULT_PLACEHOLDER_VIDEO_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";
pub const DEFAULT_PLACEHOLDER_THUMBNAIL_URL: &str =
    "https://img.youtube.com/vi/aqz-KE-bpKQ/maxresdefault.jpg";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9000,
        }
    }
}

/// Connection details for the external inference endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub customer_id: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
    pub placeholder_video_url: String,
    pub placeholder_thumbnail_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_UPSTREAM_URL.into(),
            customer_id: None,
            api_key: None,
            model: DEFAULT_MODEL.into(),
            timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            max_tokens: 4000,
            temperature: 0.7,
            placeholder_video_url: DEFAULT_PLACEHOLDER_VIDEO_URL.into(),
            placeholder_thumbnail_url: DEFAULT_PLACEHOLDER_THUMBNAIL_URL.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_url: String,
    pub db_path: PathBuf,
    pub library_capacity: usize,
    pub progress_tick_ms: u64,
    /// Upper bound for the client's wait on `/generate`. Follows the upstream
    /// bound plus a margin unless `REELGEN_REQUEST_TIMEOUT_SECS` is set.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:9000".into(),
            db_path: default_db_path(),
            library_capacity: crate::library::DEFAULT_CAPACITY,
            progress_tick_ms: 2000,
            request_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS + REQUEST_TIMEOUT_MARGIN_SECS,
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelgen")
        .join("library.db")
}

impl AppConfig {
    /// Build the configuration from defaults, `.env` and the process environment.
    ///
    /// Values that fail to parse are logged and the default is kept.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("REELGEN_HOST") {
            config.server.host = host;
        }
        parse_into(&lookup, "REELGEN_PORT", &mut config.server.port);

        if let Some(url) = lookup("UPSTREAM_URL") {
            config.upstream.endpoint = url;
        }
        config.upstream.customer_id = non_empty(lookup("UPSTREAM_CUSTOMER_ID"));
        config.upstream.api_key = non_empty(lookup("UPSTREAM_API_KEY"));
        if let Some(model) = non_empty(lookup("UPSTREAM_MODEL")) {
            config.upstream.model = model;
        }
        parse_into(&lookup, "UPSTREAM_TIMEOUT_SECS", &mut config.upstream.timeout_secs);
        config.client.request_timeout_secs = config
            .upstream
            .timeout_secs
            .saturating_add(REQUEST_TIMEOUT_MARGIN_SECS);
        if let Some(url) = non_empty(lookup("PLACEHOLDER_VIDEO_URL")) {
            config.upstream.placeholder_video_url = url;
        }
        if let Some(url) = non_empty(lookup("PLACEHOLDER_THUMBNAIL_URL")) {
            config.upstream.placeholder_thumbnail_url = url;
        }

        if let Some(url) = non_empty(lookup("REELGEN_SERVER_URL")) {
            config.client.server_url = url;
        }
        if let Some(path) = non_empty(lookup("REELGEN_DB_PATH")) {
            config.client.db_path = PathBuf::from(path);
        }
        parse_into(&lookup, "REELGEN_LIBRARY_CAPACITY", &mut config.client.library_capacity);
        parse_into(&lookup, "REELGEN_PROGRESS_TICK_MS", &mut config.client.progress_tick_ms);
        parse_into(
            &lookup,
            "REELGEN_REQUEST_TIMEOUT_SECS",
            &mut config.client.request_timeout_secs,
        );

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_into<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => log::warn!("Ignoring unparsable {}={:?}", key, raw),
        }
    }
}
