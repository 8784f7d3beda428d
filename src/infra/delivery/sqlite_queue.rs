// SQLite-backed implementation of JobQueue.
//
// The durable, claim-and-acknowledge end of the transport contract, in
// the consumer-group style: pulling claims the oldest queued row for this
// consumer and marks it pending; acknowledging deletes it; pending rows
// whose claim has gone stale (worker crashed before ack) are put back by
// reclaim_stale, which a background sweep drives.

use crate::core::delivery::{Delivery, JobQueue, QueueError};
use crate::core::moderation::QueueJob;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use std::time::{Duration, Instant};

/// How often pull re-checks the table while waiting for a job.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct SqliteJobQueue {
    pool: Pool<Sqlite>,
    consumer: String,
}

impl SqliteJobQueue {
    /// `consumer` names this handle in claims, so stale ones can be told
    /// apart and reclaimed.
    pub fn new(pool: Pool<Sqlite>, consumer: impl Into<String>) -> Self {
        Self {
            pool,
            consumer: consumer.into(),
        }
    }

    /// Run database migrations to create the queue table.
    pub async fn migrate(&self) -> Result<(), QueueError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'queued',
                claimed_by TEXT,
                claimed_at INTEGER,
                enqueued_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError::StorageError(e.to_string()))?;

        Ok(())
    }

    /// Claim the oldest queued row, if any. The single UPDATE keeps the
    /// claim atomic across competing consumers.
    async fn try_claim(&self) -> Result<Option<Delivery>, QueueError> {
        let row = sqlx::query(
            r#"
            UPDATE moderation_queue
            SET status = 'pending', claimed_by = ?, claimed_at = ?
            WHERE id = (
                SELECT id FROM moderation_queue
                WHERE status = 'queued'
                ORDER BY id
                LIMIT 1
            )
            RETURNING id, payload
            "#,
        )
        .bind(&self.consumer)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QueueError::StorageError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: i64 = row.get(0);
        let payload: String = row.get(1);
        let job: QueueJob = serde_json::from_str(&payload)
            .map_err(|e| QueueError::StorageError(e.to_string()))?;

        Ok(Some(Delivery { job, receipt: id }))
    }

    /// Return stale pending rows to the queue. A claim is stale once it
    /// is older than `visibility`. Returns how many rows were requeued.
    pub async fn reclaim_stale(&self, visibility: Duration) -> Result<u64, QueueError> {
        let cutoff = Utc::now().timestamp() - visibility.as_secs() as i64;

        let result = sqlx::query(
            r#"
            UPDATE moderation_queue
            SET status = 'queued', claimed_by = NULL, claimed_at = NULL
            WHERE status = 'pending' AND claimed_at <= ?
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError::StorageError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, job: &QueueJob) -> Result<(), QueueError> {
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::StorageError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO moderation_queue (payload, status, enqueued_at) VALUES (?, 'queued', ?)",
        )
        .bind(payload)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError::StorageError(e.to_string()))?;

        Ok(())
    }

    async fn pull(&self, timeout: Duration) -> Result<Option<Delivery>, QueueError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(delivery) = self.try_claim().await? {
                return Ok(Some(delivery));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        sqlx::query("DELETE FROM moderation_queue WHERE id = ?")
            .bind(delivery.receipt)
            .execute(&self.pool)
            .await
            .map_err(|e| QueueError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::ContentType;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashMap;

    async fn pool() -> Pool<Sqlite> {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    fn job(content_id: &str) -> QueueJob {
        QueueJob {
            content_id: content_id.to_string(),
            user_id: "user-1".to_string(),
            content: "hello".to_string(),
            content_type: ContentType::Text,
            metadata: HashMap::new(),
            recent_post_count: 2,
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn claims_oldest_first_and_survives_the_round_trip() {
        let queue = SqliteJobQueue::new(pool().await, "consumer-a");
        queue.migrate().await.unwrap();

        queue.enqueue(&job("c-1")).await.unwrap();
        queue.enqueue(&job("c-2")).await.unwrap();

        let delivery = queue.pull(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(delivery.job.content_id, "c-1");
        assert_eq!(delivery.job.recent_post_count, 2);
    }

    #[tokio::test]
    async fn empty_queue_times_out_to_none() {
        let queue = SqliteJobQueue::new(pool().await, "consumer-a");
        queue.migrate().await.unwrap();

        let pulled = queue.pull(Duration::from_millis(50)).await.unwrap();

        assert!(pulled.is_none());
    }

    #[tokio::test]
    async fn a_claimed_job_is_invisible_to_other_consumers() {
        let shared = pool().await;
        let a = SqliteJobQueue::new(shared.clone(), "consumer-a");
        let b = SqliteJobQueue::new(shared, "consumer-b");
        a.migrate().await.unwrap();

        a.enqueue(&job("c-1")).await.unwrap();

        let claimed = a.pull(Duration::from_millis(50)).await.unwrap();
        assert!(claimed.is_some());

        // The other consumer sees nothing while the claim is live.
        let other = b.pull(Duration::from_millis(50)).await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn ack_removes_the_row_for_good() {
        let queue = SqliteJobQueue::new(pool().await, "consumer-a");
        queue.migrate().await.unwrap();

        queue.enqueue(&job("c-1")).await.unwrap();
        let delivery = queue.pull(Duration::from_millis(50)).await.unwrap().unwrap();
        queue.ack(&delivery).await.unwrap();

        // Nothing left to reclaim or pull.
        assert_eq!(queue.reclaim_stale(Duration::from_secs(0)).await.unwrap(), 0);
        assert!(queue.pull(Duration::from_millis(50)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn jobs_survive_a_process_restart() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", file.path().display());

        {
            let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
            let queue = SqliteJobQueue::new(pool, "consumer-a");
            queue.migrate().await.unwrap();
            queue.enqueue(&job("c-durable")).await.unwrap();
        }

        // A fresh pool over the same file, as after a restart.
        let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
        let queue = SqliteJobQueue::new(pool, "consumer-b");
        queue.migrate().await.unwrap();

        let delivery = queue.pull(Duration::from_millis(50)).await.unwrap().unwrap();
        assert_eq!(delivery.job.content_id, "c-durable");
    }

    #[tokio::test]
    async fn unacked_claims_are_reclaimed_and_redelivered() {
        let shared = pool().await;
        let a = SqliteJobQueue::new(shared.clone(), "consumer-a");
        let b = SqliteJobQueue::new(shared, "consumer-b");
        a.migrate().await.unwrap();

        a.enqueue(&job("c-1")).await.unwrap();

        // Consumer A claims and then "crashes" (never acks).
        let _lost = a.pull(Duration::from_millis(50)).await.unwrap().unwrap();

        let reclaimed = b.reclaim_stale(Duration::from_secs(0)).await.unwrap();
        assert_eq!(reclaimed, 1);

        let redelivered = b.pull(Duration::from_millis(50)).await.unwrap().unwrap();
        assert_eq!(redelivered.job.content_id, "c-1");
    }
}
