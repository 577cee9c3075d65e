// Ports onto the hosted backend that owns posts, comments and profiles.
//
// The moderation core never stores social content itself. It asks the
// backend to delete things and reads small summaries for the review UI.

use crate::core::moderation::ContentType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{content_type} {id} not found")]
    NotFound { content_type: ContentType, id: Uuid },

    #[error("Backend request timed out")]
    Timeout,

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Minimal post data shown next to a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
}

/// Minimal profile data shown for flagged users, reporters and admins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Content operations delegated to the backend.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    /// Physically remove a post or comment. Dependent rows are the backend's job.
    async fn delete_content(&self, content_type: ContentType, id: Uuid) -> Result<(), ContentError>;

    /// Whether the post or comment still exists.
    async fn content_exists(
        &self,
        content_type: ContentType,
        id: Uuid,
    ) -> Result<bool, ContentError>;

    /// Batch lookup of post summaries. Missing ids are simply absent.
    async fn fetch_posts(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, PostSummary>, ContentError>;
}

/// Profile lookups, shared by the review queue and the audit log.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Batch lookup of profiles. Missing ids are simply absent.
    async fn fetch_profiles(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ProfileSummary>, ContentError>;
}

/// Fetch profiles, treating any failure as "nothing found".
///
/// Read-side joins must never fail the query they decorate.
pub async fn profiles_or_empty<P: ProfileDirectory + ?Sized>(
    directory: &P,
    ids: &[Uuid],
) -> HashMap<Uuid, ProfileSummary> {
    if ids.is_empty() {
        return HashMap::new();
    }
    match directory.fetch_profiles(ids).await {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::warn!(
                error = %e,
                count = ids.len(),
                "Profile lookup failed; omitting profiles"
            );
            HashMap::new()
        }
    }
}

/// Sorted, de-duplicated ids from an iterator of optional references.
pub fn distinct_ids(ids: impl IntoIterator<Item = Option<Uuid>>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.into_iter().flatten().collect();
    ids.sort();
    ids.dedup();
    ids
}
