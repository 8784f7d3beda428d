// Moderation worker - pulls jobs, runs the pipeline, stores, acks.
//
// Each worker is one async task handling one job at a time. Several
// workers compete on the same transport; the transport guarantees a
// delivery goes to exactly one of them, so no locking is needed here.
//
// Ordering matters: the decision is stored durably BEFORE the delivery
// is acknowledged. A crash in between redelivers the job, and because
// the pipeline is pure the rerun just overwrites the same records.

use super::queue::{Delivery, JobQueue};
use crate::core::analysis::{Analyzer, LanguageDetector};
use crate::core::decisions::DecisionStore;
use crate::core::moderation::{
    Decision, DecisionRecord, DecisionStatus, ModerationAction, ModerationPipeline,
    PipelineContext, QueueJob,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long one pull waits for a job before giving the loop a chance to
/// notice cancellation.
const PULL_TIMEOUT: Duration = Duration::from_secs(5);

/// Back-off after a transport error before trying to pull again. This is
/// the one place an endless retry loop is correct.
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// A single competing consumer of the moderation queue.
pub struct Worker<Q, S, A, L>
where
    Q: JobQueue,
    S: DecisionStore,
    A: Analyzer,
    L: LanguageDetector,
{
    name: String,
    queue: Arc<Q>,
    store: Arc<S>,
    pipeline: Arc<ModerationPipeline<A, L>>,
}

impl<Q, S, A, L> Worker<Q, S, A, L>
where
    Q: JobQueue,
    S: DecisionStore,
    A: Analyzer,
    L: LanguageDetector,
{
    pub fn new(
        name: impl Into<String>,
        queue: Arc<Q>,
        store: Arc<S>,
        pipeline: Arc<ModerationPipeline<A, L>>,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            store,
            pipeline,
        }
    }

    /// Run until the token is cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(worker = %self.name, "worker started, waiting for content");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break;
                }
                pulled = self.queue.pull(PULL_TIMEOUT) => {
                    match pulled {
                        Ok(Some(delivery)) => self.handle(delivery).await,
                        Ok(None) => {
                            // Nothing queued right now; loop around.
                        }
                        Err(err) => {
                            tracing::warn!(
                                worker = %self.name,
                                error = %err,
                                "transport error pulling job, backing off"
                            );
                            tokio::select! {
                                _ = cancel.cancelled() => break,
                                _ = tokio::time::sleep(RETRY_BACKOFF) => {}
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(worker = %self.name, "worker stopped");
    }

    /// Process one delivery through to an acknowledged, stored decision.
    async fn handle(&self, delivery: Delivery) {
        let content_id = delivery.job.content_id.clone();
        tracing::info!(worker = %self.name, content_id = %content_id, "processing content");

        let decision = match self
            .pipeline
            .run(PipelineContext::from_job(delivery.job.clone()))
            .await
        {
            Ok(decision) => decision,
            Err(err) => {
                // A failed job is not retried; it degrades to a pending
                // review decision so status queries never hang on it.
                tracing::error!(
                    worker = %self.name,
                    content_id = %content_id,
                    error = %err,
                    "pipeline failed, storing degraded decision"
                );
                degraded_decision(&delivery.job)
            }
        };

        if let Err(err) = self.store_decision(&decision).await {
            // Not stored means not acknowledged: the delivery stays
            // pending on the transport and will be redelivered.
            tracing::error!(
                worker = %self.name,
                content_id = %content_id,
                error = %err,
                "failed to store decision, leaving job for redelivery"
            );
            return;
        }

        if let Err(err) = self.queue.ack(&delivery).await {
            tracing::warn!(
                worker = %self.name,
                content_id = %content_id,
                error = %err,
                "failed to acknowledge delivery; a duplicate run is harmless"
            );
            return;
        }

        tracing::info!(
            worker = %self.name,
            content_id = %content_id,
            action = %decision.action,
            "decision stored"
        );
    }

    async fn store_decision(
        &self,
        decision: &Decision,
    ) -> Result<(), crate::core::decisions::DecisionError> {
        self.store.put_result(decision).await?;
        self.store
            .put_decision(&DecisionRecord::Moderation(decision.clone()))
            .await
    }
}

/// The decision written when processing fails outright.
fn degraded_decision(job: &QueueJob) -> Decision {
    Decision {
        content_id: job.content_id.clone(),
        user_id: job.user_id.clone(),
        content: job.content.clone(),
        severity: 0.0,
        action: ModerationAction::Review,
        rationale: "Automated processing failed; queued for manual review".to_string(),
        detected_issues: vec!["processing_error".to_string()],
        language: None,
        status: DecisionStatus::Pending,
        moderator_notes: None,
        timestamp: Utc::now(),
    }
}
