// Moderation domain models - data structures for the decision pipeline.
//
// These are pure domain types with no transport or storage dependencies.
// The infra layer serializes them for the queue and the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of content a submission carries.
///
/// Image and video submissions flow through the same pipeline as text;
/// their dedicated analyzers are external collaborators that are not
/// wired in yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Video,
}

/// The outcome of moderation for a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    /// Content is fine, publish it.
    Approve,
    /// Content stays up but is marked for follow-up.
    Flag,
    /// A human moderator makes the final call.
    Review,
    /// Content is taken down and the account sanctioned.
    Suspend,
}

impl std::fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModerationAction::Approve => write!(f, "approve"),
            ModerationAction::Flag => write!(f, "flag"),
            ModerationAction::Review => write!(f, "review"),
            ModerationAction::Suspend => write!(f, "suspend"),
        }
    }
}

/// Processing state of a stored decision.
///
/// `Pending` marks degraded decisions written when a worker could not
/// finish a job; everything the pipeline completes is `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Pending,
    Completed,
}

/// Wire form of a submission, as it travels through the job queue.
///
/// `recent_post_count` is injected by the intake rate tracker at enqueue
/// time so the spam-burst gate never has to reach back into shared state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueJob {
    pub content_id: String,
    pub user_id: String,
    pub content: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub recent_post_count: u32,
    pub submitted_at: DateTime<Utc>,
}

/// Mutable state threaded through the pipeline stages.
///
/// Exactly one worker owns a context at a time; stages read prior fields
/// and return a `StageUpdate`, which the context merges with explicit
/// per-field rules (see [`PipelineContext::apply`]).
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub content_id: String,
    pub user_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub metadata: HashMap<String, serde_json::Value>,
    pub recent_post_count: u32,

    // Analysis results, accumulated stage by stage.
    pub language: Option<String>,
    pub toxicity_score: f64,
    pub spam_score: f64,
    pub sarcasm_score: f64,
    pub detected_issues: Vec<String>,

    // Decision fields, set by the terminal stages.
    pub severity: f64,
    pub action: Option<ModerationAction>,
    pub rationale: String,
    pub requires_human_review: bool,

    // Appeal data. Appeals rerun the same pipeline; the extra context only
    // reaches the rationale string, never the analyzers.
    pub is_appeal: bool,
    pub appeal_reason: Option<String>,
    pub additional_context: Option<String>,
}

impl PipelineContext {
    /// Build a fresh context from a dequeued job.
    pub fn from_job(job: QueueJob) -> Self {
        Self {
            content_id: job.content_id,
            user_id: job.user_id,
            content: job.content,
            content_type: job.content_type,
            metadata: job.metadata,
            recent_post_count: job.recent_post_count,
            language: None,
            toxicity_score: 0.0,
            spam_score: 0.0,
            sarcasm_score: 0.0,
            detected_issues: Vec::new(),
            severity: 0.0,
            action: None,
            rationale: String::new(),
            requires_human_review: false,
            is_appeal: false,
            appeal_reason: None,
            additional_context: None,
        }
    }

    /// Build a context that re-runs moderation of a stored decision with
    /// appeal context attached.
    pub fn for_appeal(original: &Decision, appeal: &AppealRequest) -> Self {
        Self {
            content_id: original.content_id.clone(),
            user_id: original.user_id.clone(),
            content: original.content.clone(),
            // Decisions do not record the submitted content type; appeals
            // re-analyze the stored text.
            content_type: ContentType::Text,
            metadata: HashMap::new(),
            recent_post_count: 0,
            language: None,
            toxicity_score: 0.0,
            spam_score: 0.0,
            sarcasm_score: 0.0,
            detected_issues: Vec::new(),
            severity: 0.0,
            action: None,
            rationale: String::new(),
            requires_human_review: false,
            is_appeal: true,
            appeal_reason: Some(appeal.appeal_reason.clone()),
            additional_context: appeal.additional_context.clone(),
        }
    }

    /// Merge a partial update into the context.
    ///
    /// Merge rules are deliberate, not conventional: scalar fields
    /// overwrite when the update carries them, `issues` always appends.
    pub fn apply(&mut self, update: StageUpdate) {
        if let Some(language) = update.language {
            self.language = Some(language);
        }
        if let Some(toxicity) = update.toxicity_score {
            self.toxicity_score = toxicity;
        }
        if let Some(spam) = update.spam_score {
            self.spam_score = spam;
        }
        if let Some(sarcasm) = update.sarcasm_score {
            self.sarcasm_score = sarcasm;
        }
        if let Some(severity) = update.severity {
            self.severity = severity;
        }
        if let Some(action) = update.action {
            self.action = Some(action);
        }
        if let Some(rationale) = update.rationale {
            self.rationale = rationale;
        }
        if let Some(review) = update.requires_human_review {
            self.requires_human_review = review;
        }
        self.detected_issues.extend(update.issues);
    }
}

/// Partial update returned by a pipeline stage.
///
/// A stage fills in only the fields it computed. `None` means "leave the
/// context value alone".
#[derive(Debug, Default)]
pub struct StageUpdate {
    pub language: Option<String>,
    pub toxicity_score: Option<f64>,
    pub spam_score: Option<f64>,
    pub sarcasm_score: Option<f64>,
    pub severity: Option<f64>,
    pub action: Option<ModerationAction>,
    pub rationale: Option<String>,
    pub requires_human_review: Option<bool>,
    pub issues: Vec<String>,
}

/// Terminal, immutable snapshot of a finished pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub content_id: String,
    pub user_id: String,
    pub content: String,
    pub severity: f64,
    pub action: ModerationAction,
    pub rationale: String,
    pub detected_issues: Vec<String>,
    pub language: Option<String>,
    pub status: DecisionStatus,
    pub moderator_notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A user's request to have a decision re-examined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppealRequest {
    pub content_id: String,
    pub user_id: String,
    pub appeal_reason: String,
    pub additional_context: Option<String>,
}

/// Outcome of an appeal. The original decision is embedded untouched so
/// the full history survives the overwrite of the decision record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppealDecision {
    pub content_id: String,
    pub original_decision: Decision,
    pub appeal_granted: bool,
    pub new_action: ModerationAction,
    pub moderator_notes: String,
    pub reviewed_by: String,
    pub timestamp: DateTime<Utc>,
}

/// What the decision record for a content id currently holds.
///
/// An appeal stores a new record under the same content id, superseding
/// the moderation record for subsequent reads. The tag keeps the two
/// shapes apart in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DecisionRecord {
    Moderation(Decision),
    Appeal(AppealDecision),
}

impl DecisionRecord {
    pub fn content_id(&self) -> &str {
        match self {
            DecisionRecord::Moderation(decision) => &decision.content_id,
            DecisionRecord::Appeal(appeal) => &appeal.content_id,
        }
    }
}
