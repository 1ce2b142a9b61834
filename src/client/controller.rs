use super::api::GenerationApi;
use crate::error::AppError;
use crate::library::VideoLibrary;
use crate::models::{
    GenerationRequest, GenerationResult, GenerationStatus, DEFAULT_DURATION_SECS, DEFAULT_QUALITY,
    DEFAULT_STYLE,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub const MAX_CLIENT_PROMPT_CHARS: usize = 500;
pub const MIN_DURATION_SECS: u32 = 3;
pub const MAX_DURATION_SECS: u32 = 30;

const INITIAL_PROGRESS: u8 = 10;
const PROGRESS_STEP: u8 = 5;
// Simulated progress never reaches 100 before the call resolves.
const PROGRESS_CAP: u8 = 90;

/// What the status indicator shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationState {
    pub status: GenerationStatus,
    pub progress: u8,
    pub message: String,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Toast-style notification for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub duration: u32,
    pub quality: String,
    pub style: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION_SECS,
            quality: DEFAULT_QUALITY.into(),
            style: DEFAULT_STYLE.into(),
        }
    }
}

/// Drives one prompt at a time through `idle -> processing -> completed | failed`.
///
/// Completed results are written through to the [`VideoLibrary`]; `videos()`
/// is the in-memory view of it.
pub struct GenerationController {
    api: Arc<dyn GenerationApi>,
    library: VideoLibrary,
    videos: Vec<GenerationResult>,
    prompt: String,
    options: GenerationOptions,
    in_flight: Option<GenerationResult>,
    last_request: Option<GenerationRequest>,
    state_tx: watch::Sender<GenerationState>,
    notices: Vec<Notice>,
    cancel: CancellationToken,
    progress_tick: Duration,
}

impl GenerationController {
    pub async fn new(api: Arc<dyn GenerationApi>, library: VideoLibrary) -> Self {
        let videos = library.load().await;
        let (state_tx, _) = watch::channel(GenerationState::default());
        Self {
            api,
            library,
            videos,
            prompt: String::new(),
            options: GenerationOptions::default(),
            in_flight: None,
            last_request: None,
            state_tx,
            notices: Vec::new(),
            cancel: CancellationToken::new(),
            progress_tick: Duration::from_secs(2),
        }
    }

    pub fn with_progress_tick(mut self, tick: Duration) -> Self {
        self.progress_tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_options(&mut self, options: GenerationOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn state(&self) -> GenerationState {
        self.state_tx.borrow().clone()
    }

    pub fn status(&self) -> GenerationStatus {
        self.state_tx.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state_tx.subscribe()
    }

    pub fn videos(&self) -> &[GenerationResult] {
        &self.videos
    }

    pub fn library(&self) -> &VideoLibrary {
        &self.library
    }

    pub fn in_flight(&self) -> Option<&GenerationResult> {
        self.in_flight.as_ref()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Token that stops the controller from waiting on the current call.
    ///
    /// The call itself keeps running; its result is discarded.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn can_submit(&self) -> bool {
        self.status() != GenerationStatus::Processing && !self.prompt.trim().is_empty()
    }

    pub async fn submit(&mut self) -> Result<GenerationResult, AppError> {
        if self.status() == GenerationStatus::Processing {
            return Err(AppError::Busy);
        }
        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => {
                self.notify(NoticeLevel::Error, e.to_string());
                return Err(e);
            }
        };
        self.run(request).await
    }

    /// Re-run the last failed request with the same inputs.
    pub async fn retry(&mut self) -> Result<GenerationResult, AppError> {
        if self.status() != GenerationStatus::Failed {
            return Err(AppError::validation("Only a failed generation can be retried"));
        }
        let request = self
            .last_request
            .clone()
            .ok_or_else(|| AppError::validation("Nothing to retry"))?;
        self.run(request).await
    }

    /// Return to idle from a terminal state. Returns false if there was nothing to reset.
    pub fn reset(&mut self) -> bool {
        if !self.status().is_terminal() {
            return false;
        }
        self.in_flight = None;
        self.state_tx.send_replace(GenerationState::default());
        true
    }

    pub async fn delete_video(&mut self, id: &str) -> bool {
        let ok = self.library.remove(id).await;
        if ok {
            self.videos.retain(|v| v.id != id);
            self.notify(NoticeLevel::Success, "Video deleted");
        } else {
            self.notify(NoticeLevel::Error, "Failed to delete video");
        }
        ok
    }

    pub async fn clear_videos(&mut self) -> bool {
        let ok = self.library.clear().await;
        if ok {
            self.videos.clear();
        }
        ok
    }

    pub async fn refresh(&mut self) {
        self.videos = self.library.load().await;
    }

    fn build_request(&self) -> Result<GenerationRequest, AppError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::validation("Please enter a video prompt"));
        }
        if self.prompt.chars().count() > MAX_CLIENT_PROMPT_CHARS {
            return Err(AppError::validation(format!(
                "Prompt must be at most {} characters",
                MAX_CLIENT_PROMPT_CHARS
            )));
        }
        let duration = self.options.duration;
        if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration) {
            return Err(AppError::validation(format!(
                "Duration must be between {} and {} seconds",
                MIN_DURATION_SECS, MAX_DURATION_SECS
            )));
        }

        Ok(GenerationRequest {
            prompt: prompt.to_string(),
            duration,
            quality: self.options.quality.clone(),
            style: self.options.style.clone(),
        })
    }

    async fn run(&mut self, request: GenerationRequest) -> Result<GenerationResult, AppError> {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.last_request = Some(request.clone());
        self.in_flight = Some(GenerationResult::in_flight(&request));
        self.state_tx.send_replace(GenerationState {
            status: GenerationStatus::Processing,
            progress: INITIAL_PROGRESS,
            message: "Initializing video generation...".into(),
            video_url: None,
        });

        let api = self.api.clone();
        let call_request = request.clone();
        let mut call = tokio::spawn(async move { api.generate(&call_request).await });
        let cancel = self.cancel.clone();
        let mut ticker = tokio::time::interval(self.progress_tick);
        ticker.tick().await;

        let outcome = loop {
            tokio::select! {
                joined = &mut call => {
                    break joined
                        .map_err(|e| AppError::Internal(format!("generation task failed: {}", e)))
                        .and_then(|res| res);
                }
                _ = cancel.cancelled() => break Err(AppError::Cancelled),
                _ = ticker.tick() => self.bump_progress(),
            }
        };

        match outcome {
            Ok(video) if !video.video_url.trim().is_empty() => Ok(self.complete(video).await),
            Ok(_) => Err(self.fail(AppError::MissingVideo)),
            Err(AppError::Cancelled) => {
                self.cancel = CancellationToken::new();
                self.in_flight = None;
                self.state_tx.send_replace(GenerationState {
                    message: "Generation cancelled".into(),
                    ..GenerationState::default()
                });
                self.notify(NoticeLevel::Info, "Generation cancelled");
                Err(AppError::Cancelled)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn bump_progress(&mut self) {
        self.state_tx.send_modify(|state| {
            if state.status == GenerationStatus::Processing {
                state.progress = state.progress.saturating_add(PROGRESS_STEP).min(PROGRESS_CAP);
                state.message = "Generating your video...".into();
            }
        });
    }

    async fn complete(&mut self, video: GenerationResult) -> GenerationResult {
        let record = match self.in_flight.as_mut() {
            Some(pending) => {
                pending.id = video.id;
                pending.video_url = video.video_url;
                pending.thumbnail_url = video.thumbnail_url;
                pending.metadata = video.metadata;
                pending.created_at = video.created_at;
                pending.status = GenerationStatus::Completed;
                pending.clone()
            }
            None => GenerationResult {
                status: GenerationStatus::Completed,
                ..video
            },
        };

        match self.library.append(record.clone()).await {
            Ok(videos) => self.videos = videos,
            Err(e) => {
                log::error!("Failed to store video {}: {}", record.id, e);
                self.notify(NoticeLevel::Error, format!("Video generated but not saved: {}", e));
                self.videos = self.library.load().await;
            }
        }

        self.state_tx.send_replace(GenerationState {
            status: GenerationStatus::Completed,
            progress: 100,
            message: "Video generated successfully!".into(),
            video_url: Some(record.video_url.clone()),
        });
        self.prompt.clear();
        self.notify(NoticeLevel::Success, "Video generated successfully!");
        record
    }

    fn fail(&mut self, error: AppError) -> AppError {
        log::warn!("Video generation failed: {}", error);
        if let Some(pending) = self.in_flight.as_mut() {
            pending.status = GenerationStatus::Failed;
        }
        self.state_tx.send_replace(GenerationState {
            status: GenerationStatus::Failed,
            progress: 0,
            message: error.to_string(),
            video_url: None,
        });
        self.notify(NoticeLevel::Error, format!("Failed to generate video: {}", error));
        error
    }

    fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notices.push(Notice {
            level,
            text: text.into(),
        });
    }
}
