// In-memory RateLimitStore for tests.
//
// `try_consume` runs under the DashMap entry lock for the key, so concurrent
// callers for the same actor are serialized.

use crate::core::rate_limit::{RateLimitError, RateLimitStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

type EventKey = (Uuid, String);

#[derive(Clone, Default)]
pub struct InMemoryRateLimitStore {
    events: Arc<DashMap<EventKey, Vec<DateTime<Utc>>>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total recorded events for the key, regardless of age.
    pub fn event_count(&self, actor_id: Uuid, action_type: &str) -> usize {
        self.events
            .get(&(actor_id, action_type.to_string()))
            .map(|events| events.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn count_since(
        &self,
        actor_id: Uuid,
        action_type: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, RateLimitError> {
        Ok(self
            .events
            .get(&(actor_id, action_type.to_string()))
            .map(|events| events.iter().filter(|at| **at >= since).count() as u32)
            .unwrap_or(0))
    }

    async fn record(
        &self,
        actor_id: Uuid,
        action_type: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RateLimitError> {
        self.events
            .entry((actor_id, action_type.to_string()))
            .or_default()
            .push(at);
        Ok(())
    }

    async fn try_consume(
        &self,
        actor_id: Uuid,
        action_type: &str,
        since: DateTime<Utc>,
        max_actions: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, RateLimitError> {
        let mut events = self
            .events
            .entry((actor_id, action_type.to_string()))
            .or_default();
        let in_window = events.iter().filter(|t| **t >= since).count() as u32;
        if in_window >= max_actions {
            return Ok(false);
        }
        events.push(at);
        Ok(true)
    }

    async fn remove_one(
        &self,
        actor_id: Uuid,
        action_type: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RateLimitError> {
        if let Some(mut events) = self.events.get_mut(&(actor_id, action_type.to_string())) {
            if let Some(pos) = events.iter().rposition(|t| *t == at) {
                events.remove(pos);
            }
        }
        Ok(())
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64, RateLimitError> {
        let mut removed = 0u64;
        for mut entry in self.events.iter_mut() {
            let before = entry.len();
            entry.retain(|at| *at >= older_than);
            removed += (before - entry.len()) as u64;
        }
        self.events.retain(|_, events| !events.is_empty());
        Ok(removed)
    }
}
