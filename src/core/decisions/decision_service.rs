// Decision reads and moderator overrides.
//
// The thin HTTP status/review endpoints call straight into this service;
// it owns no policy beyond "which record family answers which question".

use super::decision_store::{DecisionError, DecisionStore};
use crate::core::moderation::{Decision, DecisionRecord, DecisionStatus, ModerationAction};
use chrono::Utc;
use std::sync::Arc;

/// Status reads and moderator overrides over a decision store.
pub struct DecisionService<S: DecisionStore> {
    store: Arc<S>,
}

impl<S: DecisionStore> DecisionService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Look up the moderation outcome for a content id.
    ///
    /// `None` covers both "unknown id" and "not processed yet"; callers
    /// cannot tell the two apart from this interface.
    pub async fn status_of(&self, content_id: &str) -> Result<Option<Decision>, DecisionError> {
        self.store.get_result(content_id).await
    }

    /// Unconditionally overwrite a decision with a moderator's call.
    ///
    /// Succeeds for any known content id, including one that has been
    /// through an appeal; in that case the override lands on the original
    /// decision embedded in the appeal record. Both record families are
    /// refreshed so status reads pick up the override immediately.
    pub async fn moderator_override(
        &self,
        content_id: &str,
        action: ModerationAction,
        notes: &str,
        moderator_id: &str,
    ) -> Result<Decision, DecisionError> {
        let record = self
            .store
            .get_decision(content_id)
            .await?
            .ok_or_else(|| DecisionError::NotFound(content_id.to_string()))?;

        let mut decision = match record {
            DecisionRecord::Moderation(decision) => decision,
            DecisionRecord::Appeal(appeal) => appeal.original_decision,
        };

        decision.action = action;
        decision.moderator_notes = Some(notes.to_string());
        decision.status = DecisionStatus::Completed;
        decision.timestamp = Utc::now();

        self.store
            .put_decision(&DecisionRecord::Moderation(decision.clone()))
            .await?;
        self.store.put_result(&decision).await?;

        tracing::info!(
            content_id = %content_id,
            moderator_id = %moderator_id,
            action = %action,
            "moderator override applied"
        );

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{AppealDecision, DecisionRecord};
    use async_trait::async_trait;
    use dashmap::DashMap;

    /// Store with no expiry, enough to exercise the service.
    #[derive(Default)]
    struct MockDecisionStore {
        results: DashMap<String, Decision>,
        decisions: DashMap<String, DecisionRecord>,
    }

    #[async_trait]
    impl DecisionStore for MockDecisionStore {
        async fn put_result(&self, decision: &Decision) -> Result<(), DecisionError> {
            self.results
                .insert(decision.content_id.clone(), decision.clone());
            Ok(())
        }

        async fn get_result(&self, content_id: &str) -> Result<Option<Decision>, DecisionError> {
            Ok(self.results.get(content_id).map(|d| d.clone()))
        }

        async fn put_decision(&self, record: &DecisionRecord) -> Result<(), DecisionError> {
            self.decisions
                .insert(record.content_id().to_string(), record.clone());
            Ok(())
        }

        async fn get_decision(
            &self,
            content_id: &str,
        ) -> Result<Option<DecisionRecord>, DecisionError> {
            Ok(self.decisions.get(content_id).map(|r| r.clone()))
        }

        async fn purge_expired(&self) -> Result<u64, DecisionError> {
            Ok(0)
        }
    }

    fn decision(content_id: &str, action: ModerationAction) -> Decision {
        Decision {
            content_id: content_id.to_string(),
            user_id: "user-1".to_string(),
            content: "some content".to_string(),
            severity: 0.6,
            action,
            rationale: "flagged".to_string(),
            detected_issues: vec![],
            language: Some("en".to_string()),
            status: DecisionStatus::Completed,
            moderator_notes: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn status_returns_the_stored_result() {
        let store = Arc::new(MockDecisionStore::default());
        let service = DecisionService::new(Arc::clone(&store));

        store
            .put_result(&decision("c-1", ModerationAction::Flag))
            .await
            .unwrap();

        let found = service.status_of("c-1").await.unwrap().unwrap();
        assert_eq!(found.action, ModerationAction::Flag);

        assert!(service.status_of("c-unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn override_rewrites_action_notes_and_both_records() {
        let store = Arc::new(MockDecisionStore::default());
        let service = DecisionService::new(Arc::clone(&store));

        let original = decision("c-2", ModerationAction::Suspend);
        store
            .put_decision(&DecisionRecord::Moderation(original.clone()))
            .await
            .unwrap();
        store.put_result(&original).await.unwrap();

        let updated = service
            .moderator_override("c-2", ModerationAction::Approve, "false positive", "mod-7")
            .await
            .unwrap();

        assert_eq!(updated.action, ModerationAction::Approve);
        assert_eq!(updated.moderator_notes.as_deref(), Some("false positive"));

        // Status reads see the override.
        let result = service.status_of("c-2").await.unwrap().unwrap();
        assert_eq!(result.action, ModerationAction::Approve);

        // So does the decision record.
        match store.get_decision("c-2").await.unwrap().unwrap() {
            DecisionRecord::Moderation(d) => assert_eq!(d.action, ModerationAction::Approve),
            DecisionRecord::Appeal(_) => panic!("override should store a moderation record"),
        }
    }

    #[tokio::test]
    async fn override_on_unknown_id_is_not_found() {
        let store = Arc::new(MockDecisionStore::default());
        let service = DecisionService::new(store);

        let err = service
            .moderator_override("nope", ModerationAction::Approve, "n/a", "mod-1")
            .await
            .unwrap_err();

        assert!(matches!(err, DecisionError::NotFound(_)));
    }

    #[tokio::test]
    async fn override_after_an_appeal_lands_on_the_embedded_original() {
        let store = Arc::new(MockDecisionStore::default());
        let service = DecisionService::new(Arc::clone(&store));

        let original = decision("c-3", ModerationAction::Suspend);
        let appeal = AppealDecision {
            content_id: "c-3".to_string(),
            original_decision: original,
            appeal_granted: false,
            new_action: ModerationAction::Suspend,
            moderator_notes: "Appeal review: denied".to_string(),
            reviewed_by: "system".to_string(),
            timestamp: Utc::now(),
        };
        store
            .put_decision(&DecisionRecord::Appeal(appeal))
            .await
            .unwrap();

        let updated = service
            .moderator_override("c-3", ModerationAction::Flag, "manual downgrade", "mod-2")
            .await
            .unwrap();

        assert_eq!(updated.action, ModerationAction::Flag);
        match store.get_decision("c-3").await.unwrap().unwrap() {
            DecisionRecord::Moderation(d) => assert_eq!(d.action, ModerationAction::Flag),
            DecisionRecord::Appeal(_) => panic!("override should replace the appeal record"),
        }
    }
}
