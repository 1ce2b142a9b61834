pub mod sqlite;

use crate::error::AppError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub use sqlite::SqliteSlots;

/// String-keyed slot storage, the shape of a browser's local storage.
///
/// Implementations only move opaque strings; interpreting them is up to the caller.
#[async_trait]
pub trait SlotStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AppError>;

    async fn remove_item(&self, key: &str) -> Result<(), AppError>;

    /// Keys starting with `prefix`, in ascending order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, AppError>;
}

/// Process-local storage, lost on exit.
#[derive(Default)]
pub struct MemorySlots {
    slots: Mutex<BTreeMap<String, String>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, AppError> {
        self.slots
            .lock()
            .map_err(|_| AppError::Internal("slot storage lock poisoned".into()))
    }
}

#[async_trait]
impl SlotStorage for MemorySlots {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), AppError> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
