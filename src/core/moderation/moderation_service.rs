// Moderation service - the trust-and-safety engine.
//
// The service is split by component across sibling files, each adding an
// `impl` block to `ModerationService`:
// - ingestion.rs    - user reports and classifier signals become flags
// - review_queue.rs - urgency-ordered queue and status counts
// - disposition.rs  - reviewer decisions, content deletion, outbox reconciliation
//
// NO HTTP or SQL here - storage and the hosted backend come in through traits.

use super::moderation_ports::ModerationStore;
use crate::core::audit::{AuditService, AuditStore};
use crate::core::content::{ContentGateway, ProfileDirectory};
use crate::core::rate_limit::{RateLimitPolicy, RateLimitStore, RateLimiter};
use chrono::Duration;
use std::sync::Arc;

/// Tunables for the moderation service.
#[derive(Debug, Clone, Copy)]
pub struct ModerationConfig {
    /// Report filing quota per reporter
    pub report_limit: RateLimitPolicy,
    /// Queue size when the caller does not pass a limit
    pub default_queue_limit: usize,
    /// Outbox rows younger than this belong to a deletion still in flight
    /// and are left alone by reconciliation
    pub reconcile_grace: Duration,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            report_limit: RateLimitPolicy::default(),
            default_queue_limit: 100,
            reconcile_grace: Duration::seconds(60),
        }
    }
}

pub struct ModerationService<S, C, A, R>
where
    S: ModerationStore,
    C: ContentGateway + ProfileDirectory,
    A: AuditStore,
    R: RateLimitStore,
{
    pub(super) store: S,
    pub(super) content: Arc<C>,
    pub(super) audit: Arc<AuditService<A, C>>,
    pub(super) limiter: Arc<RateLimiter<R>>,
    pub(super) config: ModerationConfig,
}

impl<S, C, A, R> ModerationService<S, C, A, R>
where
    S: ModerationStore,
    C: ContentGateway + ProfileDirectory,
    A: AuditStore,
    R: RateLimitStore,
{
    /// Create the service. The audit service and rate limiter are shared with
    /// the HTTP layer, which also exposes them directly.
    pub fn new(
        store: S,
        content: Arc<C>,
        audit: Arc<AuditService<A, C>>,
        limiter: Arc<RateLimiter<R>>,
        config: ModerationConfig,
    ) -> Self {
        Self {
            store,
            content,
            audit,
            limiter,
            config,
        }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }
}
