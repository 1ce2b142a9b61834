use crate::error::AppError;
use crate::models::GenerationResult;
use crate::storage::SlotStorage;
use std::collections::HashSet;
use std::sync::Arc;

pub const STORAGE_KEY: &str = "generatedVideos";
pub const DEFAULT_CAPACITY: usize = 50;

/// The user's generation history: newest first, unique by id, capacity bounded.
///
/// Every mutation rewrites the whole slot. There is no locking; two processes
/// writing the same slot resolve last-write-wins.
#[derive(Clone)]
pub struct VideoLibrary {
    storage: Arc<dyn SlotStorage>,
    key: String,
    capacity: usize,
}

impl VideoLibrary {
    pub fn new(storage: Arc<dyn SlotStorage>) -> Self {
        Self {
            storage,
            key: STORAGE_KEY.to_string(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Library scoped to one owner, in its own slot.
    pub fn for_owner(storage: Arc<dyn SlotStorage>, owner: &str) -> Self {
        Self {
            key: format!("{}:{}", STORAGE_KEY, owner),
            ..Self::new(storage)
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read the library. Missing or unreadable data yields an empty library.
    pub async fn load(&self) -> Vec<GenerationResult> {
        let raw = match self.storage.get_item(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Failed to read stored videos from {}: {}", self.key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<GenerationResult>>(&raw) {
            Ok(videos) => self.normalize(videos),
            Err(e) => {
                log::warn!("Discarding corrupt video library in {}: {}", self.key, e);
                Vec::new()
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<GenerationResult> {
        self.load().await.into_iter().find(|v| v.id == id)
    }

    /// Put `result` at the head, dropping any older copy and anything past capacity.
    pub async fn append(&self, result: GenerationResult) -> Result<Vec<GenerationResult>, AppError> {
        let mut videos = self.load().await;
        videos.retain(|v| v.id != result.id);
        videos.insert(0, result);
        videos.truncate(self.capacity);
        self.write(&videos).await?;
        Ok(videos)
    }

    /// Drop the record with `id`. An unknown id is a successful no-op.
    pub async fn remove(&self, id: &str) -> bool {
        let mut videos = self.load().await;
        videos.retain(|v| v.id != id);
        match self.write(&videos).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to delete video {}: {}", id, e);
                false
            }
        }
    }

    pub async fn clear(&self) -> bool {
        match self.storage.remove_item(&self.key).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to clear video library {}: {}", self.key, e);
                false
            }
        }
    }

    /// Keep the first copy of each id, then cut to capacity.
    ///
    /// Another writer, or a run with a larger capacity, may have left more.
    fn normalize(&self, mut videos: Vec<GenerationResult>) -> Vec<GenerationResult> {
        let mut seen = HashSet::new();
        videos.retain(|v| seen.insert(v.id.clone()));
        videos.truncate(self.capacity);
        videos
    }

    async fn write(&self, videos: &[GenerationResult]) -> Result<(), AppError> {
        let raw = serde_json::to_string(videos)?;
        self.storage.set_item(&self.key, &raw).await
    }
}
