// The decision pipeline - a fixed state machine over PipelineContext.
//
// Stages run in a fixed order; the only branch is the review gate after
// severity calculation. Every stage is a transform that returns a partial
// update, and the context owner merges it. Nothing here touches storage,
// which is what keeps reprocessing a redelivered job harmless.
//
//   DetectLanguage -> Analyze -> CheckSpamBurst -> CalculateSeverity
//       -> (borderline? HumanReview) -> MakeDecision -> Terminal

use super::moderation_models::{
    Decision, DecisionStatus, ModerationAction, PipelineContext, StageUpdate,
};
use super::policy;
use crate::core::analysis::{AnalysisError, Analyzer, LanguageDetector, FALLBACK_LANGUAGE};
use chrono::Utc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("content analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("pipeline finished without assigning an action")]
    Incomplete,
}

/// The states of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineStage {
    DetectLanguage,
    Analyze,
    CheckSpamBurst,
    CalculateSeverity,
    HumanReview,
    MakeDecision,
    Terminal,
}

/// Runs submissions through the moderation stages and produces decisions.
///
/// Generic over the analyzer and language detector ports so the
/// composition root decides the backends once. The pipeline itself is
/// stateless and shared across workers.
pub struct ModerationPipeline<A: Analyzer, L: LanguageDetector> {
    analyzer: A,
    language: L,
}

impl<A: Analyzer, L: LanguageDetector> ModerationPipeline<A, L> {
    pub fn new(analyzer: A, language: L) -> Self {
        Self { analyzer, language }
    }

    /// Run a context through every stage and snapshot the decision.
    pub async fn run(&self, mut ctx: PipelineContext) -> Result<Decision, PipelineError> {
        let mut stage = PipelineStage::DetectLanguage;

        while stage != PipelineStage::Terminal {
            let update = self.step(stage, &ctx).await?;
            ctx.apply(update);
            stage = Self::transition(stage, &ctx);
        }

        let action = ctx.action.ok_or(PipelineError::Incomplete)?;

        Ok(Decision {
            content_id: ctx.content_id,
            user_id: ctx.user_id,
            content: ctx.content,
            severity: ctx.severity,
            action,
            rationale: ctx.rationale,
            detected_issues: ctx.detected_issues,
            language: ctx.language,
            status: DecisionStatus::Completed,
            moderator_notes: None,
            timestamp: Utc::now(),
        })
    }

    /// The transition table. Only the edge out of CalculateSeverity is
    /// conditional.
    fn transition(stage: PipelineStage, ctx: &PipelineContext) -> PipelineStage {
        match stage {
            PipelineStage::DetectLanguage => PipelineStage::Analyze,
            PipelineStage::Analyze => PipelineStage::CheckSpamBurst,
            PipelineStage::CheckSpamBurst => PipelineStage::CalculateSeverity,
            PipelineStage::CalculateSeverity => {
                if policy::needs_human_review(
                    ctx.sarcasm_score,
                    ctx.severity,
                    ctx.detected_issues.len(),
                ) {
                    PipelineStage::HumanReview
                } else {
                    PipelineStage::MakeDecision
                }
            }
            PipelineStage::HumanReview => PipelineStage::MakeDecision,
            PipelineStage::MakeDecision => PipelineStage::Terminal,
            PipelineStage::Terminal => PipelineStage::Terminal,
        }
    }

    async fn step(
        &self,
        stage: PipelineStage,
        ctx: &PipelineContext,
    ) -> Result<StageUpdate, PipelineError> {
        match stage {
            PipelineStage::DetectLanguage => Ok(self.detect_language(ctx).await),
            PipelineStage::Analyze => self.analyze(ctx).await,
            PipelineStage::CheckSpamBurst => Ok(Self::check_spam_burst(ctx)),
            PipelineStage::CalculateSeverity => Ok(Self::calculate_severity(ctx)),
            PipelineStage::HumanReview => Ok(Self::human_review(ctx)),
            PipelineStage::MakeDecision => Ok(Self::make_decision(ctx)),
            PipelineStage::Terminal => Ok(StageUpdate::default()),
        }
    }

    /// Ask the external classifier; fall back to a fixed code on failure.
    async fn detect_language(&self, ctx: &PipelineContext) -> StageUpdate {
        let language = match self.language.detect(&ctx.content).await {
            Ok(code) => code,
            Err(err) => {
                tracing::debug!(
                    content_id = %ctx.content_id,
                    error = %err,
                    "language detection failed, assuming fallback"
                );
                FALLBACK_LANGUAGE.to_string()
            }
        };

        StageUpdate {
            language: Some(language),
            ..Default::default()
        }
    }

    async fn analyze(&self, ctx: &PipelineContext) -> Result<StageUpdate, PipelineError> {
        let analysis = self.analyzer.analyze(&ctx.content).await?;

        Ok(StageUpdate {
            toxicity_score: Some(analysis.toxicity),
            spam_score: Some(analysis.spam),
            sarcasm_score: Some(analysis.sarcasm),
            rationale: Some(analysis.rationale),
            issues: analysis.issues,
            ..Default::default()
        })
    }

    /// Escalate when the intake rate tracker saw a posting burst.
    ///
    /// Reads only the count already attached to the job at intake; this
    /// stage has no side effects of its own.
    fn check_spam_burst(ctx: &PipelineContext) -> StageUpdate {
        if ctx.recent_post_count >= policy::SPAM_BURST_THRESHOLD {
            return StageUpdate {
                spam_score: Some(1.0),
                issues: vec!["spam burst detected".to_string()],
                ..Default::default()
            };
        }

        StageUpdate::default()
    }

    fn calculate_severity(ctx: &PipelineContext) -> StageUpdate {
        StageUpdate {
            severity: Some(policy::severity(
                ctx.toxicity_score,
                ctx.spam_score,
                ctx.sarcasm_score,
            )),
            ..Default::default()
        }
    }

    /// Mark the context for a human and pin the action to REVIEW.
    fn human_review(ctx: &PipelineContext) -> StageUpdate {
        StageUpdate {
            requires_human_review: Some(true),
            action: Some(ModerationAction::Review),
            rationale: Some(format!("{}{}", ctx.rationale, policy::REVIEW_SUFFIX)),
            ..Default::default()
        }
    }

    /// Assign the final action from the threshold table.
    ///
    /// Idempotent: a context already routed to human review keeps its
    /// REVIEW action untouched, even if this stage runs again.
    fn make_decision(ctx: &PipelineContext) -> StageUpdate {
        if ctx.requires_human_review {
            return StageUpdate::default();
        }

        let action = policy::action_for_severity(ctx.severity);

        let rationale = if ctx.rationale.is_empty() {
            Some(policy::synthesize_rationale(
                action,
                ctx.severity,
                &ctx.detected_issues,
            ))
        } else {
            None
        };

        StageUpdate {
            action: Some(action),
            rationale,
            ..Default::default()
        }
    }
}
