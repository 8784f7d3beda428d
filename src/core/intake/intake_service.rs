// Intake - the boundary between submitters and the delivery subsystem.
//
// Validation happens here, synchronously; a malformed submission is
// rejected and never enqueued. Valid submissions get a generated content
// id, the user's rolling post count stamped on, and a place in the queue.

use crate::core::delivery::{JobQueue, QueueError};
use crate::core::moderation::policy::SPAM_TIME_WINDOW_SECS;
use crate::core::moderation::{ContentType, QueueJob};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Submissions larger than this are rejected outright.
const MAX_CONTENT_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("content must not be empty")]
    EmptyContent,

    #[error("user id must not be blank")]
    BlankUserId,

    #[error("content exceeds the maximum accepted size")]
    ContentTooLarge,

    #[error("failed to enqueue submission: {0}")]
    Enqueue(#[from] QueueError),

    #[error("rate tracking failed: {0}")]
    Tracking(#[from] TrackingError),
}

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// RATE TRACKER PORT
// ============================================================================

/// Per-user rolling post counter.
///
/// Counts posts within a fixed window; each recorded post refreshes the
/// window. The counter is shared between intake processes and read-modify-
/// written without coordination, so it is eventually consistent by design.
/// Spam-burst detection is a heuristic, not a guarantee.
#[async_trait]
pub trait PostCounter: Send + Sync {
    /// Record one post for this user and return the new count within the
    /// window.
    async fn record_post(&self, user_id: &str) -> Result<u32, TrackingError>;

    /// Current count within the window, 0 if none or expired.
    async fn recent_count(&self, user_id: &str) -> Result<u32, TrackingError>;
}

// ============================================================================
// MODELS
// ============================================================================

/// What a submitter sends in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub content: String,
    pub content_type: ContentType,
    pub user_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// What a submitter gets back: the id to poll status with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeReceipt {
    pub content_id: String,
}

/// Posting activity for one user, for the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPostStats {
    pub user_id: String,
    pub recent_post_count: u32,
    pub time_window_seconds: u64,
}

// ============================================================================
// SERVICE
// ============================================================================

/// Accepts submissions, stamps them with rate data, and enqueues them.
pub struct IntakeService<Q: JobQueue, C: PostCounter> {
    queue: Arc<Q>,
    counter: Arc<C>,
}

impl<Q: JobQueue, C: PostCounter> IntakeService<Q, C> {
    pub fn new(queue: Arc<Q>, counter: Arc<C>) -> Self {
        Self { queue, counter }
    }

    /// Validate and enqueue a submission for moderation.
    pub async fn submit(&self, request: SubmissionRequest) -> Result<IntakeReceipt, IntakeError> {
        if request.content.is_empty() {
            return Err(IntakeError::EmptyContent);
        }
        if request.user_id.trim().is_empty() {
            return Err(IntakeError::BlankUserId);
        }
        if request.content.len() > MAX_CONTENT_BYTES {
            return Err(IntakeError::ContentTooLarge);
        }

        let content_id = Uuid::new_v4().to_string();

        // The count is read here, once, and travels with the job. The
        // spam-burst gate downstream never touches the counter.
        let recent_post_count = self.counter.record_post(&request.user_id).await?;

        let job = QueueJob {
            content_id: content_id.clone(),
            user_id: request.user_id,
            content: request.content,
            content_type: request.content_type,
            metadata: request.metadata,
            recent_post_count,
            submitted_at: Utc::now(),
        };

        self.queue.enqueue(&job).await?;

        tracing::info!(
            content_id = %content_id,
            recent_post_count,
            "submission accepted and enqueued"
        );

        Ok(IntakeReceipt { content_id })
    }

    /// Posting activity for one user within the rate window.
    pub async fn user_stats(&self, user_id: &str) -> Result<UserPostStats, IntakeError> {
        let recent_post_count = self.counter.recent_count(user_id).await?;

        Ok(UserPostStats {
            user_id: user_id.to_string(),
            recent_post_count,
            time_window_seconds: SPAM_TIME_WINDOW_SECS,
        })
    }
}
