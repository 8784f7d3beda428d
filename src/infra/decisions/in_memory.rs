// In-memory implementation of DecisionStore.
//
// Backed by DashMap so concurrent workers can write without a Mutex.
// Expiry is checked lazily on read and swept by purge_expired. Useful for
// tests and single-process deployments; the SQLite store is the durable
// twin with the same semantics.

use crate::core::decisions::{DecisionError, DecisionStore};
use crate::core::moderation::{Decision, DecisionRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Default lifetimes, matching the durable store.
const RESULT_TTL: Duration = Duration::from_secs(3600);
const DECISION_TTL: Duration = Duration::from_secs(86400);

struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

pub struct InMemoryDecisionStore {
    results: DashMap<String, Expiring<Decision>>,
    decisions: DashMap<String, Expiring<DecisionRecord>>,
    result_ttl: Duration,
    decision_ttl: Duration,
}

impl InMemoryDecisionStore {
    pub fn new() -> Self {
        Self::with_ttls(RESULT_TTL, DECISION_TTL)
    }

    pub fn with_ttls(result_ttl: Duration, decision_ttl: Duration) -> Self {
        Self {
            results: DashMap::new(),
            decisions: DashMap::new(),
            result_ttl,
            decision_ttl,
        }
    }
}

impl Default for InMemoryDecisionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionStore for InMemoryDecisionStore {
    async fn put_result(&self, decision: &Decision) -> Result<(), DecisionError> {
        // insert() replaces any previous entry outright; a rerun of the
        // same job leaves no residue from the first write.
        self.results.insert(
            decision.content_id.clone(),
            Expiring {
                value: decision.clone(),
                expires_at: Instant::now() + self.result_ttl,
            },
        );
        Ok(())
    }

    async fn get_result(&self, content_id: &str) -> Result<Option<Decision>, DecisionError> {
        let now = Instant::now();
        if let Some(entry) = self.results.get(content_id) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        // Lapsed entry; the read guard is released before we remove it.
        self.results.remove(content_id);
        Ok(None)
    }

    async fn put_decision(&self, record: &DecisionRecord) -> Result<(), DecisionError> {
        self.decisions.insert(
            record.content_id().to_string(),
            Expiring {
                value: record.clone(),
                expires_at: Instant::now() + self.decision_ttl,
            },
        );
        Ok(())
    }

    async fn get_decision(
        &self,
        content_id: &str,
    ) -> Result<Option<DecisionRecord>, DecisionError> {
        let now = Instant::now();
        if let Some(entry) = self.decisions.get(content_id) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        self.decisions.remove(content_id);
        Ok(None)
    }

    async fn purge_expired(&self) -> Result<u64, DecisionError> {
        let now = Instant::now();
        let before = self.results.len() + self.decisions.len();
        self.results.retain(|_, entry| entry.expires_at > now);
        self.decisions.retain(|_, entry| entry.expires_at > now);
        let after = self.results.len() + self.decisions.len();
        Ok((before - after) as u64)
    }
}
