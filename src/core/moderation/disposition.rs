// Disposition engine - applies reviewer decisions.
//
// State machine: pending -> reviewed | actioned | dismissed. Terminal states
// have no outgoing transitions; reviewing a non-pending flag is rejected.
//
// Content deletion is a two-system mutation (backend delete, then our
// disposition write). A `PendingDisposition` outbox row is written before the
// delete and removed after the disposition, and `reconcile_dispositions`
// finishes any deletion whose disposition write was lost.

use super::moderation_models::{
    ContentFlag, ContentType, ModerationStatus, PendingDisposition, ReconcileSummary, Review,
    ReviewDecision, UserReport,
};
use super::moderation_ports::{ModerationError, ModerationStore};
use super::moderation_service::ModerationService;
use crate::core::audit::{action_types, target_types, ActionDetails, AuditStore};
use crate::core::content::{ContentGateway, ProfileDirectory};
use crate::core::rate_limit::RateLimitStore;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

impl<S, C, A, R> ModerationService<S, C, A, R>
where
    S: ModerationStore,
    C: ContentGateway + ProfileDirectory,
    A: AuditStore,
    R: RateLimitStore,
{
    /// Record a reviewer's decision on a pending flag.
    pub async fn review_flag(
        &self,
        flag_id: Uuid,
        decision: ReviewDecision,
        reviewer_id: Option<Uuid>,
        notes: Option<String>,
    ) -> Result<ContentFlag, ModerationError> {
        let reviewer_id = reviewer_id.ok_or(ModerationError::Unauthorized)?;

        let review = Review {
            decision,
            reviewer_id,
            notes: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            action_taken: None,
            reviewed_at: Utc::now(),
        };
        self.record_disposition(flag_id, review).await
    }

    /// Delete the flagged post or comment, then mark the flag `actioned`.
    ///
    /// If the deletion fails the flag is left untouched. If the deletion
    /// succeeds but the disposition cannot be written, the error is returned
    /// and the outbox row stays behind for `reconcile_dispositions`.
    pub async fn delete_flagged_content(
        &self,
        flag_id: Uuid,
        content_type: ContentType,
        content_id: Uuid,
        reviewer_id: Option<Uuid>,
    ) -> Result<ContentFlag, ModerationError> {
        let reviewer_id = reviewer_id.ok_or(ModerationError::Unauthorized)?;

        let flag = self
            .store
            .get_flag(flag_id)
            .await?
            .ok_or_else(|| ModerationError::flag_not_found(flag_id))?;
        if flag.status.is_terminal() {
            return Err(ModerationError::AlreadyReviewed(flag_id));
        }
        if flag.content_id(content_type) != Some(content_id) {
            return Err(ModerationError::Validation(format!(
                "{content_type} {content_id} is not referenced by flag {flag_id}"
            )));
        }

        let pending = PendingDisposition {
            flag_id,
            content_type,
            content_id,
            reviewer_id,
            created_at: Utc::now(),
        };
        self.store.save_pending_disposition(&pending).await?;

        if let Err(e) = self.content.delete_content(content_type, content_id).await {
            tracing::warn!(
                flag_id = %flag_id,
                content_type = %content_type,
                content_id = %content_id,
                error = %e,
                "Content deletion failed; flag left pending"
            );
            if let Err(cleanup) = self.store.remove_pending_disposition(flag_id).await {
                tracing::warn!(flag_id = %flag_id, error = %cleanup, "Failed to clear outbox row");
            }
            return Err(e.into());
        }

        self.audit
            .log_action(
                reviewer_id,
                action_types::DELETE_CONTENT,
                content_type.as_str(),
                Some(content_id),
                ActionDetails {
                    old_value: Some(json!({ "flag_id": flag_id })),
                    ..Default::default()
                }
                .with_reason(format!("flag {flag_id} ({})", flag.reason)),
            )
            .await;

        self.complete_deletion(&pending).await.map_err(|e| {
            tracing::error!(
                flag_id = %flag_id,
                content_type = %content_type,
                content_id = %content_id,
                error = %e,
                "Content deleted but disposition not recorded; left for reconciliation"
            );
            e
        })
    }

    /// Set a report's status directly. Does not touch the linked flag.
    pub async fn update_report_status(
        &self,
        report_id: Uuid,
        status: ModerationStatus,
        actor_id: Option<Uuid>,
    ) -> Result<UserReport, ModerationError> {
        let actor_id = actor_id.ok_or(ModerationError::Unauthorized)?;

        let (previous, report) = self.store.set_report_status(report_id, status).await?;

        tracing::info!(
            report_id = %report_id,
            from = %previous,
            to = %status,
            "Report status updated"
        );

        self.audit
            .log_action(
                actor_id,
                action_types::UPDATE_REPORT_STATUS,
                target_types::USER_REPORT,
                Some(report_id),
                ActionDetails::change(json!({ "status": previous }), json!({ "status": status })),
            )
            .await;

        Ok(report)
    }

    /// Finish or discard outbox rows left by interrupted content deletions.
    pub async fn reconcile_dispositions(&self) -> Result<ReconcileSummary, ModerationError> {
        let pending = self.store.list_pending_dispositions().await?;

        // Rows newer than the cutoff may still be owned by a live request
        let cutoff = Utc::now() - self.config.reconcile_grace;

        let mut summary = ReconcileSummary::default();
        for item in pending {
            if item.created_at > cutoff {
                summary.deferred += 1;
                continue;
            }
            match self.reconcile_one(&item).await {
                Ok(true) => summary.completed += 1,
                Ok(false) => summary.discarded += 1,
                Err(e) => {
                    tracing::warn!(
                        flag_id = %item.flag_id,
                        error = %e,
                        "Reconciliation failed; will retry"
                    );
                    summary.failed += 1;
                }
            }
        }

        if summary.completed + summary.discarded + summary.failed > 0 {
            tracing::info!(
                completed = summary.completed,
                discarded = summary.discarded,
                failed = summary.failed,
                "Disposition reconciliation pass finished"
            );
        }
        Ok(summary)
    }

    /// Returns `true` when a disposition was recorded, `false` when the row was discarded.
    async fn reconcile_one(&self, item: &PendingDisposition) -> Result<bool, ModerationError> {
        let still_pending = self
            .store
            .get_flag(item.flag_id)
            .await?
            .is_some_and(|f| !f.status.is_terminal());

        if !still_pending {
            self.store.remove_pending_disposition(item.flag_id).await?;
            return Ok(false);
        }

        if self
            .content
            .content_exists(item.content_type, item.content_id)
            .await?
        {
            // The delete never went through; the flag stays with the reviewers.
            self.store.remove_pending_disposition(item.flag_id).await?;
            return Ok(false);
        }

        match self.complete_deletion(item).await {
            Ok(_) => Ok(true),
            Err(ModerationError::AlreadyReviewed(_)) => {
                self.store.remove_pending_disposition(item.flag_id).await?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Record the `actioned` disposition for a finished deletion and clear
    /// the outbox row. A flag already closed by this same deletion counts as
    /// success.
    async fn complete_deletion(
        &self,
        pending: &PendingDisposition,
    ) -> Result<ContentFlag, ModerationError> {
        let action_taken = format!("{}_deleted", pending.content_type);
        let review = Review {
            decision: ReviewDecision::Actioned,
            reviewer_id: pending.reviewer_id,
            notes: Some(format!("{} deleted", pending.content_type)),
            action_taken: Some(action_taken.clone()),
            reviewed_at: Utc::now(),
        };

        let flag = match self.record_disposition(pending.flag_id, review).await {
            Ok(flag) => flag,
            Err(ModerationError::AlreadyReviewed(flag_id)) => {
                let existing = self
                    .store
                    .get_flag(flag_id)
                    .await?
                    .filter(|f| {
                        f.status == ModerationStatus::Actioned
                            && f.action_taken.as_deref() == Some(action_taken.as_str())
                    })
                    .ok_or(ModerationError::AlreadyReviewed(flag_id))?;
                tracing::debug!(flag_id = %flag_id, "Deletion disposition already recorded");
                existing
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.store.remove_pending_disposition(pending.flag_id).await {
            // Harmless: the next pass sees a terminal flag and discards the row.
            tracing::warn!(flag_id = %pending.flag_id, error = %e, "Failed to clear outbox row");
        }
        Ok(flag)
    }

    async fn record_disposition(
        &self,
        flag_id: Uuid,
        review: Review,
    ) -> Result<ContentFlag, ModerationError> {
        let flag = self.store.apply_review(flag_id, &review).await?;

        tracing::info!(
            flag_id = %flag_id,
            reviewer_id = %review.reviewer_id,
            status = %flag.status,
            "Flag reviewed"
        );

        self.audit
            .log_action(
                review.reviewer_id,
                action_types::REVIEW_FLAG,
                target_types::CONTENT_FLAG,
                Some(flag_id),
                ActionDetails::change(
                    json!({ "status": ModerationStatus::Pending }),
                    json!({
                        "status": flag.status,
                        "notes": flag.action_notes,
                        "action_taken": flag.action_taken,
                    }),
                ),
            )
            .await;

        Ok(flag)
    }
}
