// SQLite-backed decision store.
//
// Tables:
// - moderation_results: short-lived records served to status queries
// - moderation_decisions: longer-lived records read by appeals/moderators
//
// Records are JSON payloads keyed by content id with an epoch-seconds
// expiry column. INSERT OR REPLACE gives the idempotent last-write-wins
// overwrite the reprocessing model depends on.

use crate::core::decisions::{DecisionError, DecisionStore};
use crate::core::moderation::{Decision, DecisionRecord};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use std::time::Duration;

const RESULT_TTL: Duration = Duration::from_secs(3600);
const DECISION_TTL: Duration = Duration::from_secs(86400);

pub struct SqliteDecisionStore {
    pool: Pool<Sqlite>,
    result_ttl: Duration,
    decision_ttl: Duration,
}

impl SqliteDecisionStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self::with_ttls(pool, RESULT_TTL, DECISION_TTL)
    }

    pub fn with_ttls(pool: Pool<Sqlite>, result_ttl: Duration, decision_ttl: Duration) -> Self {
        Self {
            pool,
            result_ttl,
            decision_ttl,
        }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), DecisionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_results (
                content_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DecisionError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_decisions (
                content_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DecisionError::StorageError(e.to_string()))?;

        Ok(())
    }

    fn expiry(ttl: Duration) -> i64 {
        Utc::now().timestamp() + ttl.as_secs() as i64
    }

    async fn put(
        &self,
        table: &str,
        content_id: &str,
        payload: String,
        expires_at: i64,
    ) -> Result<(), DecisionError> {
        let query = format!(
            "INSERT OR REPLACE INTO {table} (content_id, payload, expires_at) VALUES (?, ?, ?)"
        );
        sqlx::query(&query)
            .bind(content_id)
            .bind(payload)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| DecisionError::StorageError(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, table: &str, content_id: &str) -> Result<Option<String>, DecisionError> {
        let query =
            format!("SELECT payload FROM {table} WHERE content_id = ? AND expires_at > ?");
        let row = sqlx::query(&query)
            .bind(content_id)
            .bind(Utc::now().timestamp())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DecisionError::StorageError(e.to_string()))?;

        Ok(row.map(|r| r.get::<String, _>(0)))
    }
}

#[async_trait]
impl DecisionStore for SqliteDecisionStore {
    async fn put_result(&self, decision: &Decision) -> Result<(), DecisionError> {
        let payload = serde_json::to_string(decision)
            .map_err(|e| DecisionError::StorageError(e.to_string()))?;
        self.put(
            "moderation_results",
            &decision.content_id,
            payload,
            Self::expiry(self.result_ttl),
        )
        .await
    }

    async fn get_result(&self, content_id: &str) -> Result<Option<Decision>, DecisionError> {
        match self.get("moderation_results", content_id).await? {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|e| DecisionError::StorageError(e.to_string())),
            None => Ok(None),
        }
    }

    async fn put_decision(&self, record: &DecisionRecord) -> Result<(), DecisionError> {
        let payload = serde_json::to_string(record)
            .map_err(|e| DecisionError::StorageError(e.to_string()))?;
        self.put(
            "moderation_decisions",
            record.content_id(),
            payload,
            Self::expiry(self.decision_ttl),
        )
        .await
    }

    async fn get_decision(
        &self,
        content_id: &str,
    ) -> Result<Option<DecisionRecord>, DecisionError> {
        match self.get("moderation_decisions", content_id).await? {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|e| DecisionError::StorageError(e.to_string())),
            None => Ok(None),
        }
    }

    async fn purge_expired(&self) -> Result<u64, DecisionError> {
        let now = Utc::now().timestamp();
        let mut purged = 0u64;

        for table in ["moderation_results", "moderation_decisions"] {
            let query = format!("DELETE FROM {table} WHERE expires_at <= ?");
            let result = sqlx::query(&query)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(|e| DecisionError::StorageError(e.to_string()))?;
            purged += result.rows_affected();
        }

        Ok(purged)
    }
}
