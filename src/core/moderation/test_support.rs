// Shared fixtures for moderation service tests.
//
// Wires the service to in-memory stores and a fake backend, and keeps clones
// of every store so tests can inspect what was written.

use super::moderation_models::{ContentFlag, ContentType, FlagReason, FlagSource, FlagTarget};
use super::moderation_service::{ModerationConfig, ModerationService};
use crate::core::audit::AuditService;
use crate::core::content::{
    ContentError, ContentGateway, PostSummary, ProfileDirectory, ProfileSummary,
};
use crate::core::rate_limit::RateLimiter;
use crate::infra::audit::InMemoryAuditStore;
use crate::infra::moderation::InMemoryModerationStore;
use crate::infra::rate_limit::InMemoryRateLimitStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Stand-in for the hosted backend: posts, comments and profiles in memory.
#[derive(Default)]
pub struct FakeBackend {
    posts: DashMap<Uuid, PostSummary>,
    comments: DashMap<Uuid, ()>,
    profiles: DashMap<Uuid, ProfileSummary>,
    pub fail_reads: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl FakeBackend {
    pub fn add_post(&self, id: Uuid, author: Option<Uuid>) {
        self.posts.insert(
            id,
            PostSummary {
                id,
                user_id: author,
                content: Some("post body".to_string()),
                media_url: None,
            },
        );
    }

    pub fn add_comment(&self, id: Uuid) {
        self.comments.insert(id, ());
    }

    pub fn add_profile(&self, id: Uuid, username: &str) {
        self.profiles.insert(
            id,
            ProfileSummary {
                id,
                username: Some(username.to_string()),
                display_name: None,
                avatar_url: None,
            },
        );
    }

    pub fn has_post(&self, id: Uuid) -> bool {
        self.posts.contains_key(&id)
    }

    fn check_reads(&self) -> Result<(), ContentError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ContentError::Timeout);
        }
        Ok(())
    }
}

#[async_trait]
impl ContentGateway for FakeBackend {
    async fn delete_content(
        &self,
        content_type: ContentType,
        id: Uuid,
    ) -> Result<(), ContentError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ContentError::Unavailable("backend returned 503".to_string()));
        }
        let removed = match content_type {
            ContentType::Post => self.posts.remove(&id).is_some(),
            ContentType::Comment => self.comments.remove(&id).is_some(),
        };
        if !removed {
            return Err(ContentError::NotFound { content_type, id });
        }
        Ok(())
    }

    async fn content_exists(
        &self,
        content_type: ContentType,
        id: Uuid,
    ) -> Result<bool, ContentError> {
        self.check_reads()?;
        Ok(match content_type {
            ContentType::Post => self.posts.contains_key(&id),
            ContentType::Comment => self.comments.contains_key(&id),
        })
    }

    async fn fetch_posts(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, PostSummary>, ContentError> {
        self.check_reads()?;
        Ok(ids
            .iter()
            .filter_map(|id| self.posts.get(id).map(|p| (*id, p.clone())))
            .collect())
    }
}

#[async_trait]
impl ProfileDirectory for FakeBackend {
    async fn fetch_profiles(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ProfileSummary>, ContentError> {
        self.check_reads()?;
        Ok(ids
            .iter()
            .filter_map(|id| self.profiles.get(id).map(|p| (*id, p.clone())))
            .collect())
    }
}

pub type TestService = ModerationService<
    InMemoryModerationStore,
    FakeBackend,
    InMemoryAuditStore,
    InMemoryRateLimitStore,
>;

pub struct Harness {
    pub service: TestService,
    pub store: InMemoryModerationStore,
    pub rate_limits: InMemoryRateLimitStore,
    pub audit_store: InMemoryAuditStore,
    pub backend: Arc<FakeBackend>,
}

pub fn harness() -> Harness {
    build(InMemoryAuditStore::new(), ModerationConfig::default())
}

/// Harness whose audit store rejects every write.
pub fn harness_with_failing_audit() -> Harness {
    build(InMemoryAuditStore::failing(), ModerationConfig::default())
}

pub fn harness_with_config(config: ModerationConfig) -> Harness {
    build(InMemoryAuditStore::new(), config)
}

fn build(audit_store: InMemoryAuditStore, config: ModerationConfig) -> Harness {
    let store = InMemoryModerationStore::new();
    let rate_limits = InMemoryRateLimitStore::new();
    let backend = Arc::new(FakeBackend::default());

    let audit = Arc::new(AuditService::new(audit_store.clone(), Arc::clone(&backend)));
    let limiter = Arc::new(RateLimiter::new(rate_limits.clone()));

    let service = ModerationService::new(
        store.clone(),
        Arc::clone(&backend),
        audit,
        limiter,
        config,
    );

    Harness {
        service,
        store,
        rate_limits,
        audit_store,
        backend,
    }
}

/// A pending automated flag on a fresh post, created at `created_at`.
pub fn seeded_flag(urgency_level: Option<i32>, created_at: DateTime<Utc>) -> ContentFlag {
    let mut flag = ContentFlag::new(
        FlagTarget::post(Uuid::new_v4()),
        FlagSource::AutomatedClassifier,
        FlagReason::Spam,
    );
    flag.ai_category = Some("spam".to_string());
    flag.ai_confidence = Some(0.7);
    flag.urgency_level = urgency_level;
    flag.created_at = created_at;
    flag
}
