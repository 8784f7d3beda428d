// In-memory implementation of PostCounter.
//
// DashMap keyed by user id, one rolling window per user. Each recorded
// post refreshes the window, so a steady stream of posts keeps the count
// alive, exactly like an INCR-plus-EXPIRE counter.

use crate::core::intake::{PostCounter, TrackingError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::core::moderation::policy::SPAM_TIME_WINDOW_SECS;

struct Window {
    count: u32,
    expires_at: Instant,
}

pub struct InMemoryPostCounter {
    windows: DashMap<String, Window>,
    window: Duration,
}

impl InMemoryPostCounter {
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(SPAM_TIME_WINDOW_SECS))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            window,
        }
    }
}

impl Default for InMemoryPostCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostCounter for InMemoryPostCounter {
    async fn record_post(&self, user_id: &str) -> Result<u32, TrackingError> {
        let now = Instant::now();
        let expires_at = now + self.window;

        let mut entry = self.windows.entry(user_id.to_string()).or_insert(Window {
            count: 0,
            expires_at,
        });

        if entry.expires_at <= now {
            // Window lapsed; start over.
            entry.count = 0;
        }
        entry.count += 1;
        entry.expires_at = expires_at;

        Ok(entry.count)
    }

    async fn recent_count(&self, user_id: &str) -> Result<u32, TrackingError> {
        Ok(self
            .windows
            .get(user_id)
            .filter(|w| w.expires_at > Instant::now())
            .map(|w| w.count)
            .unwrap_or(0))
    }
}
