// In-memory implementation of JobQueue.
//
// An async-channel multi-consumer channel: the pop itself removes the
// job, so acknowledgment is a no-op and a worker crash loses the job.
// That is the plain-queue end of the transport contract; the SQLite
// transport is the durable claim-and-ack end.

use crate::core::delivery::{Delivery, JobQueue, QueueError};
use crate::core::moderation::QueueJob;
use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

pub struct MemoryJobQueue {
    sender: Sender<QueueJob>,
    receiver: Receiver<QueueJob>,
    next_receipt: AtomicI64,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        let (sender, receiver) = async_channel::unbounded();
        Self {
            sender,
            receiver,
            next_receipt: AtomicI64::new(1),
        }
    }

    /// Jobs currently waiting.
    pub fn depth(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: &QueueJob) -> Result<(), QueueError> {
        self.sender
            .send(job.clone())
            .await
            .map_err(|_| QueueError::Closed)
    }

    async fn pull(&self, timeout: Duration) -> Result<Option<Delivery>, QueueError> {
        match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Ok(Ok(job)) => Ok(Some(Delivery {
                job,
                receipt: self.next_receipt.fetch_add(1, Ordering::SeqCst),
            })),
            Ok(Err(_)) => Err(QueueError::Closed),
            // Timed out: nothing to do right now.
            Err(_) => Ok(None),
        }
    }

    async fn ack(&self, _delivery: &Delivery) -> Result<(), QueueError> {
        // The pop already removed the job.
        Ok(())
    }
}
