// Job transport port - at-least-once delivery to competing consumers.
//
// One contract, two shapes of implementation: a plain block-pop queue
// (popping removes the job, ack is free) and a claim-and-acknowledge
// stream where unacked jobs become redeliverable. Workers must ack only
// after the decision is durably stored.

use crate::core::moderation::QueueJob;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("queue is closed")]
    Closed,
}

/// A job handed to exactly one worker for this delivery attempt.
///
/// The receipt identifies the delivery back to the transport on ack; the
/// in-memory transport ignores it, the durable one needs it.
#[derive(Debug)]
pub struct Delivery {
    pub job: QueueJob,
    pub receipt: i64,
}

/// Trait for moving jobs from intake to the workers.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job to the queue.
    async fn enqueue(&self, job: &QueueJob) -> Result<(), QueueError>;

    /// Wait up to `timeout` for a job. `Ok(None)` means nothing arrived;
    /// that is not an error, just "nothing to do now".
    async fn pull(&self, timeout: Duration) -> Result<Option<Delivery>, QueueError>;

    /// Acknowledge a delivery after its decision is durably stored.
    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;
}
