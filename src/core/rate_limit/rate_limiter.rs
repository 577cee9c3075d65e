// Rolling-window rate limiter for actor actions (report filing).
//
// Each consumed action is stored as a timestamped event keyed by
// (actor, action type). The window count is the number of events newer than
// `now - window`. `try_acquire` is the path request handlers use: the store
// checks and records in one atomic step so concurrent requests from the
// same actor cannot both slip under the limit. A grant whose guarded write
// then fails is handed back with `release`, so failed attempts cost nothing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Action type used for user report filing.
pub const REPORT_ACTION: &str = "report";

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid rate limit policy: {0}")]
    InvalidPolicy(String),
}

/// How many actions an actor may take per rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_actions: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn per_hours(max_actions: u32, window_hours: i64) -> Self {
        Self {
            max_actions,
            window: Duration::hours(window_hours),
        }
    }

    pub fn window_hours(&self) -> i64 {
        self.window.num_hours()
    }

    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.window <= Duration::zero() {
            return Err(RateLimitError::InvalidPolicy(
                "window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::per_hours(10, 24) // 10 reports per rolling day
    }
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Number of events for the key at or after `since`.
    async fn count_since(
        &self,
        actor_id: Uuid,
        action_type: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, RateLimitError>;

    /// Record one event unconditionally.
    async fn record(
        &self,
        actor_id: Uuid,
        action_type: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RateLimitError>;

    /// Record one event only if fewer than `max_actions` exist since `since`.
    /// Must be atomic with respect to other calls for the same key.
    async fn try_consume(
        &self,
        actor_id: Uuid,
        action_type: &str,
        since: DateTime<Utc>,
        max_actions: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, RateLimitError>;

    /// Delete one event recorded for the key at exactly `at`.
    async fn remove_one(
        &self,
        actor_id: Uuid,
        action_type: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RateLimitError>;

    /// Delete events older than the cutoff. Returns how many were removed.
    async fn prune(&self, older_than: DateTime<Utc>) -> Result<u64, RateLimitError>;
}

/// One consumed slot, returned by [`RateLimiter::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitGrant {
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
}

pub struct RateLimiter<R: RateLimitStore> {
    store: R,
}

impl<R: RateLimitStore> RateLimiter<R> {
    pub fn new(store: R) -> Self {
        Self { store }
    }

    /// Whether the actor is still under `max_actions` within the last `window_hours`.
    ///
    /// Read-only. Pair with [`Self::increment_rate_limit`] only where a race is
    /// acceptable; request paths should use [`Self::try_acquire`].
    pub async fn check_rate_limit(
        &self,
        actor_id: Uuid,
        action_type: &str,
        max_actions: u32,
        window_hours: i64,
    ) -> Result<bool, RateLimitError> {
        let policy = RateLimitPolicy::per_hours(max_actions, window_hours);
        policy.validate()?;

        let since = Utc::now() - policy.window;
        let count = self.store.count_since(actor_id, action_type, since).await?;
        Ok(count < max_actions)
    }

    /// Record one action for the actor now. Pair with `check_rate_limit`
    /// only where a racy check is acceptable; report filing uses `try_acquire`.
    #[allow(dead_code)]
    pub async fn increment_rate_limit(
        &self,
        actor_id: Uuid,
        action_type: &str,
    ) -> Result<(), RateLimitError> {
        self.store.record(actor_id, action_type, Utc::now()).await
    }

    /// Atomically consume one action slot. Returns `None` when the limit is reached.
    pub async fn try_acquire(
        &self,
        actor_id: Uuid,
        action_type: &str,
        policy: RateLimitPolicy,
    ) -> Result<Option<RateLimitGrant>, RateLimitError> {
        policy.validate()?;

        let now = Utc::now();
        let acquired = self
            .store
            .try_consume(
                actor_id,
                action_type,
                now - policy.window,
                policy.max_actions,
                now,
            )
            .await?;

        if !acquired {
            tracing::info!(
                actor_id = %actor_id,
                action_type,
                max_actions = policy.max_actions,
                "Rate limit reached"
            );
            return Ok(None);
        }
        Ok(Some(RateLimitGrant { actor_id, at: now }))
    }

    /// Hand back a slot whose guarded action did not happen.
    pub async fn release(
        &self,
        grant: RateLimitGrant,
        action_type: &str,
    ) -> Result<(), RateLimitError> {
        self.store
            .remove_one(grant.actor_id, action_type, grant.at)
            .await
    }

    /// Actions the actor may still take in the current window.
    pub async fn remaining(
        &self,
        actor_id: Uuid,
        action_type: &str,
        policy: RateLimitPolicy,
    ) -> Result<u32, RateLimitError> {
        policy.validate()?;

        let since = Utc::now() - policy.window;
        let count = self.store.count_since(actor_id, action_type, since).await?;
        Ok(policy.max_actions.saturating_sub(count))
    }

    /// Drop events that can no longer fall inside any window up to `max_window`.
    pub async fn prune_expired(&self, max_window: Duration) -> Result<u64, RateLimitError> {
        self.store.prune(Utc::now() - max_window).await
    }
}
