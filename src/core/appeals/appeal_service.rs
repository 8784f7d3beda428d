// Appeal processing - rerun the pipeline and compare severities.
//
// An appeal never edits the original decision. The content is re-analyzed
// from scratch with the appeal context attached, and the appeal is
// granted only if the fresh severity comes in clearly below the original
// (under 80% of it). The resulting AppealDecision is stored under the
// same content id, superseding the moderation record for decision reads;
// the short-lived result record is left alone.

use crate::core::analysis::{Analyzer, LanguageDetector};
use crate::core::decisions::{DecisionError, DecisionStore};
use crate::core::moderation::{
    AppealDecision, AppealRequest, DecisionRecord, ModerationPipeline, PipelineContext,
    PipelineError,
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

/// Fraction of the original severity the reprocessed severity must stay
/// under for an appeal to be granted.
pub const APPEAL_GRANT_RATIO: f64 = 0.8;

#[derive(Debug, Error)]
pub enum AppealError {
    #[error("No decision found for content {0}")]
    NotFound(String),

    #[error("user does not match the original submitter")]
    OwnershipMismatch,

    #[error("content {0} has already been appealed")]
    AlreadyAppealed(String),

    #[error("appeal reprocessing failed: {0}")]
    Reprocessing(#[from] PipelineError),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<DecisionError> for AppealError {
    fn from(err: DecisionError) -> Self {
        match err {
            DecisionError::NotFound(id) => AppealError::NotFound(id),
            DecisionError::StorageError(msg) => AppealError::StorageError(msg),
        }
    }
}

/// Re-runs moderation for appealed decisions.
pub struct AppealService<A: Analyzer, L: LanguageDetector, S: DecisionStore> {
    pipeline: Arc<ModerationPipeline<A, L>>,
    store: Arc<S>,
}

impl<A: Analyzer, L: LanguageDetector, S: DecisionStore> AppealService<A, L, S> {
    pub fn new(pipeline: Arc<ModerationPipeline<A, L>>, store: Arc<S>) -> Self {
        Self { pipeline, store }
    }

    /// Process an appeal end to end.
    ///
    /// Fails if the content id is unknown, if the requester is not the
    /// original submitter, or if the decision was already appealed.
    pub async fn process_appeal(
        &self,
        request: AppealRequest,
    ) -> Result<AppealDecision, AppealError> {
        let record = self
            .store
            .get_decision(&request.content_id)
            .await?
            .ok_or_else(|| AppealError::NotFound(request.content_id.clone()))?;

        let original = match record {
            DecisionRecord::Moderation(decision) => decision,
            DecisionRecord::Appeal(_) => {
                return Err(AppealError::AlreadyAppealed(request.content_id));
            }
        };

        if original.user_id != request.user_id {
            return Err(AppealError::OwnershipMismatch);
        }

        let context = PipelineContext::for_appeal(&original, &request);
        let reprocessed = self.pipeline.run(context).await?;

        let appeal_granted = reprocessed.severity < original.severity * APPEAL_GRANT_RATIO;
        let new_action = if appeal_granted {
            reprocessed.action
        } else {
            original.action
        };

        let appeal = AppealDecision {
            content_id: request.content_id.clone(),
            original_decision: original,
            appeal_granted,
            new_action,
            moderator_notes: format!("Appeal review: {}", reprocessed.rationale),
            reviewed_by: "system".to_string(),
            timestamp: Utc::now(),
        };

        self.store
            .put_decision(&DecisionRecord::Appeal(appeal.clone()))
            .await?;

        tracing::info!(
            content_id = %appeal.content_id,
            appeal_granted,
            new_action = %appeal.new_action,
            "appeal processed"
        );

        Ok(appeal)
    }
}
