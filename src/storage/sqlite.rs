use super::SlotStorage;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

pub async fn init_pool(db_path: &Path) -> Result<SqlitePool, AppError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Slot storage kept in a local SQLite file.
///
/// Each write replaces the whole slot; concurrent writers resolve last-write-wins.
#[derive(Clone)]
pub struct SqliteSlots {
    db: SqlitePool,
}

impl SqliteSlots {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn open(db_path: &Path) -> Result<Self, AppError> {
        Ok(Self::new(init_pool(db_path).await?))
    }
}

#[async_trait]
impl SlotStorage for SqliteSlots {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM storage_slots WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.db)
                .await?;
        Ok(value)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO storage_slots (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM storage_slots WHERE key = ?")
            .bind(key)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let keys: Vec<String> =
            sqlx::query_scalar("SELECT key FROM storage_slots WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")
                .bind(prefix)
                .fetch_all(&self.db)
                .await?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sqlite_slots_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("library.db");

        {
            let slots = SqliteSlots::open(&path).await.unwrap();
            slots.set_item("generatedVideos", "[]").await.unwrap();
            slots.set_item("generatedVideos", "[1]").await.unwrap();
            slots.set_item("generatedVideos:alice", "[2]").await.unwrap();
            slots.set_item("other", "x").await.unwrap();
        }

        let slots = SqliteSlots::open(&path).await.unwrap();
        assert_eq!(
            slots.get_item("generatedVideos").await.unwrap().as_deref(),
            Some("[1]")
        );
        assert_eq!(
            slots.keys("generatedVideos").await.unwrap(),
            vec!["generatedVideos", "generatedVideos:alice"]
        );

        slots.remove_item("generatedVideos").await.unwrap();
        assert_eq!(slots.get_item("generatedVideos").await.unwrap(), None);
    }
}
