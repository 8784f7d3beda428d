// Severity and decision policy - how scores become actions.
//
// All thresholds live here so the pipeline stages stay mechanical. The
// numbers are product policy, not tuning knobs; tests pin them down.

use super::moderation_models::ModerationAction;

/// Ordered action thresholds, compared top down against severity.
pub const SUSPEND_THRESHOLD: f64 = 0.8;
pub const FLAG_THRESHOLD: f64 = 0.6;
pub const REVIEW_THRESHOLD: f64 = 0.5;

/// Sarcasm is the least reliable of the three signals, so it is
/// discounted before it can drive the severity.
pub const SARCASM_DISCOUNT: f64 = 0.8;

/// Posts within the rolling rate window before a user counts as bursting.
pub const SPAM_BURST_THRESHOLD: u32 = 5;

/// Rolling window for the per-user post counter, in seconds.
pub const SPAM_TIME_WINDOW_SECS: u64 = 60;

/// Appended to the rationale when the review gate routes a decision to a
/// human.
pub const REVIEW_SUFFIX: &str =
    " [Flagged for human review due to borderline severity or ambiguous content]";

/// Combine the component scores into a single severity value.
pub fn severity(toxicity: f64, spam: f64, sarcasm: f64) -> f64 {
    toxicity.max(spam).max(sarcasm * SARCASM_DISCOUNT)
}

/// Should this context be routed to a human instead of auto-decided?
///
/// Two borderline shapes qualify: sarcasm strong enough to matter but too
/// weak to trust, and high-but-not-extreme severity built from several
/// distinct issue signals.
pub fn needs_human_review(sarcasm: f64, severity: f64, issue_count: usize) -> bool {
    if sarcasm > 0.5 && sarcasm < 0.8 && severity < SUSPEND_THRESHOLD {
        return true;
    }

    if severity > 0.7 && severity < 0.85 && issue_count > 2 {
        return true;
    }

    false
}

/// Map a severity to an action by descending threshold comparison.
pub fn action_for_severity(severity: f64) -> ModerationAction {
    if severity >= SUSPEND_THRESHOLD {
        ModerationAction::Suspend
    } else if severity >= FLAG_THRESHOLD {
        ModerationAction::Flag
    } else if severity >= REVIEW_THRESHOLD {
        ModerationAction::Review
    } else {
        ModerationAction::Approve
    }
}

/// Synthesize a rationale when the analyzer did not produce one.
pub fn synthesize_rationale(
    action: ModerationAction,
    severity: f64,
    detected_issues: &[String],
) -> String {
    let issues = if detected_issues.is_empty() {
        "no significant issues".to_string()
    } else {
        detected_issues.join(", ")
    };

    match action {
        ModerationAction::Suspend => format!(
            "Content suspended due to high severity ({severity:.2}). Issues: {issues}"
        ),
        ModerationAction::Flag => {
            format!("Content flagged for review. Severity: {severity:.2}. Issues: {issues}")
        }
        ModerationAction::Review => {
            format!("Content requires manual review. Severity: {severity:.2}. Issues: {issues}")
        }
        ModerationAction::Approve => {
            format!("Content approved. Low severity ({severity:.2}). {issues}")
        }
    }
}
