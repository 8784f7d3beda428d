// Decision storage port.
//
// Two keyed record families, both idempotent overwrites:
// - result records: what status queries read, short lived (~1 hour)
// - decision records: what appeals and moderators read, longer lived
//   (~1 day), and the slot an appeal record supersedes
//
// Writes for the same content id are last-write-wins with no residue,
// which is what makes crash-and-redeliver reprocessing safe.

use crate::core::moderation::{Decision, DecisionRecord};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("No decision found for content {0}")]
    NotFound(String),
}

/// Trait for persisting moderation outcomes.
///
/// Implementations own expiry: an expired record reads back as absent.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Store (or overwrite) the result record for a content id.
    async fn put_result(&self, decision: &Decision) -> Result<(), DecisionError>;

    /// Read the result record, if present and not expired.
    async fn get_result(&self, content_id: &str) -> Result<Option<Decision>, DecisionError>;

    /// Store (or overwrite) the decision record for a content id.
    async fn put_decision(&self, record: &DecisionRecord) -> Result<(), DecisionError>;

    /// Read the decision record, if present and not expired.
    async fn get_decision(&self, content_id: &str)
        -> Result<Option<DecisionRecord>, DecisionError>;

    /// Drop expired records. Returns how many were removed.
    async fn purge_expired(&self) -> Result<u64, DecisionError>;
}
