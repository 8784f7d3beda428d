// SQLite-backed implementation of PostCounter.
//
// One row per user with a count and an expiry. The read-modify-write is
// not transactional across intake processes; a lost update under racing
// submitters slightly undercounts, which the burst heuristic tolerates.

use crate::core::intake::{PostCounter, TrackingError};
use crate::core::moderation::policy::SPAM_TIME_WINDOW_SECS;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use std::time::Duration;

pub struct SqlitePostCounter {
    pool: Pool<Sqlite>,
    window: Duration,
}

impl SqlitePostCounter {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self::with_window(pool, Duration::from_secs(SPAM_TIME_WINDOW_SECS))
    }

    pub fn with_window(pool: Pool<Sqlite>, window: Duration) -> Self {
        Self { pool, window }
    }

    /// Run database migrations to create the counter table.
    pub async fn migrate(&self) -> Result<(), TrackingError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_post_counts (
                user_id TEXT PRIMARY KEY,
                count INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TrackingError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl PostCounter for SqlitePostCounter {
    async fn record_post(&self, user_id: &str) -> Result<u32, TrackingError> {
        let now = Utc::now().timestamp();
        let expires_at = now + self.window.as_secs() as i64;

        // Upsert: restart the count when the previous window lapsed,
        // otherwise bump it; either way the window is refreshed.
        let row = sqlx::query(
            r#"
            INSERT INTO user_post_counts (user_id, count, expires_at)
            VALUES (?, 1, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                count = CASE WHEN user_post_counts.expires_at <= ? THEN 1
                             ELSE user_post_counts.count + 1 END,
                expires_at = excluded.expires_at
            RETURNING count
            "#,
        )
        .bind(user_id)
        .bind(expires_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TrackingError::StorageError(e.to_string()))?;

        Ok(row.get::<i64, _>(0) as u32)
    }

    async fn recent_count(&self, user_id: &str) -> Result<u32, TrackingError> {
        let row = sqlx::query(
            "SELECT count FROM user_post_counts WHERE user_id = ? AND expires_at > ?",
        )
        .bind(user_id)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TrackingError::StorageError(e.to_string()))?;

        Ok(row.map(|r| r.get::<i64, _>(0) as u32).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn counter(window: Duration) -> SqlitePostCounter {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let counter = SqlitePostCounter::with_window(pool, window);
        counter.migrate().await.unwrap();
        counter
    }

    #[tokio::test]
    async fn counts_climb_within_the_window() {
        let counter = counter(Duration::from_secs(60)).await;

        assert_eq!(counter.record_post("user-1").await.unwrap(), 1);
        assert_eq!(counter.record_post("user-1").await.unwrap(), 2);
        assert_eq!(counter.record_post("user-2").await.unwrap(), 1);
        assert_eq!(counter.recent_count("user-1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn lapsed_windows_restart_at_one() {
        let counter = counter(Duration::from_secs(0)).await;

        assert_eq!(counter.record_post("user-1").await.unwrap(), 1);
        // Zero-length window: already lapsed for both reads and writes.
        assert_eq!(counter.recent_count("user-1").await.unwrap(), 0);
        assert_eq!(counter.record_post("user-1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_users_read_zero() {
        let counter = counter(Duration::from_secs(60)).await;

        assert_eq!(counter.recent_count("never-posted").await.unwrap(), 0);
    }
}
