// Errors and the storage trait (port) for moderation state.

use super::moderation_models::{
    ContentFlag, ModerationStatus, PendingDisposition, Review, UserReport,
};
use crate::core::content::ContentError;
use crate::core::rate_limit::RateLimitError;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Rate limit exceeded: at most {max_actions} per {window_hours} hours")]
    RateLimitExceeded { max_actions: u32, window_hours: i64 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Flag {0} has already been reviewed")]
    AlreadyReviewed(Uuid),

    #[error("Content deletion for flag {0} is already in progress")]
    DispositionInProgress(Uuid),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Dependency failure: {0}")]
    DependencyFailure(String),
}

impl ModerationError {
    pub fn flag_not_found(id: Uuid) -> Self {
        ModerationError::NotFound {
            entity: "flag",
            id,
        }
    }

    pub fn report_not_found(id: Uuid) -> Self {
        ModerationError::NotFound {
            entity: "report",
            id,
        }
    }
}

impl From<RateLimitError> for ModerationError {
    fn from(e: RateLimitError) -> Self {
        match e {
            RateLimitError::StorageError(msg) => ModerationError::StorageError(msg),
            RateLimitError::InvalidPolicy(msg) => ModerationError::Validation(msg),
        }
    }
}

impl From<ContentError> for ModerationError {
    fn from(e: ContentError) -> Self {
        match e {
            ContentError::NotFound { content_type, id } => ModerationError::NotFound {
                entity: content_type.as_str(),
                id,
            },
            other => ModerationError::DependencyFailure(other.to_string()),
        }
    }
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for flags, reports and the disposition outbox.
///
/// Implementations own atomicity: each method is one transaction.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Insert a report together with the flag it spawned.
    async fn insert_report_with_flag(
        &self,
        report: &UserReport,
        flag: &ContentFlag,
    ) -> Result<(), ModerationError>;

    async fn insert_flag(&self, flag: &ContentFlag) -> Result<(), ModerationError>;

    async fn get_flag(&self, id: Uuid) -> Result<Option<ContentFlag>, ModerationError>;

    async fn get_report(&self, id: Uuid) -> Result<Option<UserReport>, ModerationError>;

    /// Flags ordered by urgency (descending, nulls last) then creation time (descending).
    async fn list_flags(
        &self,
        status: Option<ModerationStatus>,
        limit: usize,
    ) -> Result<Vec<ContentFlag>, ModerationError>;

    /// Raw `(status, count)` pairs exactly as stored.
    async fn count_flags_by_status(&self) -> Result<Vec<(String, u64)>, ModerationError>;

    /// Apply a review to a pending flag and mirror the status onto its linked report.
    ///
    /// Fails with `NotFound` for an unknown flag and `AlreadyReviewed` when the
    /// flag is no longer pending; in both cases nothing is written.
    async fn apply_review(
        &self,
        flag_id: Uuid,
        review: &Review,
    ) -> Result<ContentFlag, ModerationError>;

    /// Set a report's status, returning the previous status and the updated report.
    /// No cascade to the linked flag.
    async fn set_report_status(
        &self,
        report_id: Uuid,
        status: ModerationStatus,
    ) -> Result<(ModerationStatus, UserReport), ModerationError>;

    /// Claim the outbox slot for a flag. Fails with `DispositionInProgress`
    /// when another deletion already holds it.
    async fn save_pending_disposition(
        &self,
        pending: &PendingDisposition,
    ) -> Result<(), ModerationError>;

    async fn remove_pending_disposition(&self, flag_id: Uuid) -> Result<(), ModerationError>;

    async fn list_pending_dispositions(&self) -> Result<Vec<PendingDisposition>, ModerationError>;
}
