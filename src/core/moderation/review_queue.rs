// Review queue - what reviewers see and in which order.

use super::moderation_models::{
    ContentFlag, FlagView, ModerationStats, ModerationStatus, StatusFilter,
};
use super::moderation_ports::{ModerationError, ModerationStore};
use super::moderation_service::ModerationService;
use crate::core::audit::AuditStore;
use crate::core::content::{distinct_ids, profiles_or_empty, ContentGateway, ProfileDirectory};
use crate::core::rate_limit::RateLimitStore;
use std::collections::HashMap;

impl<S, C, A, R> ModerationService<S, C, A, R>
where
    S: ModerationStore,
    C: ContentGateway + ProfileDirectory,
    A: AuditStore,
    R: RateLimitStore,
{
    /// Flags for review, most urgent first, with post and profile summaries attached.
    ///
    /// `limit` falls back to the configured default. Missing or unreachable
    /// related rows leave the attachment empty and never fail the call.
    pub async fn list_flags(
        &self,
        filter: StatusFilter,
        limit: Option<usize>,
    ) -> Result<Vec<FlagView>, ModerationError> {
        let limit = limit.unwrap_or(self.config.default_queue_limit);
        if limit == 0 {
            return Err(ModerationError::Validation(
                "limit must be at least 1".to_string(),
            ));
        }

        let flags = self.store.list_flags(filter.status(), limit).await?;
        Ok(self.attach_related(flags).await)
    }

    /// Flag counts per status. Statuses outside the known vocabulary are ignored.
    pub async fn fetch_moderation_stats(&self) -> Result<ModerationStats, ModerationError> {
        let rows = self.store.count_flags_by_status().await?;

        let mut stats = ModerationStats::default();
        for (status, count) in rows {
            match status.parse::<ModerationStatus>() {
                Ok(ModerationStatus::Pending) => stats.pending += count,
                Ok(ModerationStatus::Reviewed) => stats.reviewed += count,
                Ok(ModerationStatus::Actioned) => stats.actioned += count,
                Ok(ModerationStatus::Dismissed) => stats.dismissed += count,
                Err(_) => {
                    tracing::debug!(status = %status, count, "Ignoring unrecognized flag status")
                }
            }
        }
        Ok(stats)
    }

    async fn attach_related(&self, flags: Vec<ContentFlag>) -> Vec<FlagView> {
        let post_ids = distinct_ids(flags.iter().map(|f| f.post_id));
        let user_ids = distinct_ids(
            flags
                .iter()
                .flat_map(|f| [f.flagged_user_id, f.flagged_by]),
        );

        let posts = if post_ids.is_empty() {
            HashMap::new()
        } else {
            match self.content.fetch_posts(&post_ids).await {
                Ok(posts) => posts,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        count = post_ids.len(),
                        "Post lookup failed; omitting posts"
                    );
                    HashMap::new()
                }
            }
        };
        let profiles = profiles_or_empty(self.content.as_ref(), &user_ids).await;

        flags
            .into_iter()
            .map(|flag| FlagView {
                post: flag.post_id.and_then(|id| posts.get(&id).cloned()),
                flagged_user: flag.flagged_user_id.and_then(|id| profiles.get(&id).cloned()),
                reporter: flag.flagged_by.and_then(|id| profiles.get(&id).cloned()),
                flag,
            })
            .collect()
    }
}
