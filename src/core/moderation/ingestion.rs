// Flag ingestion - user reports and classifier signals.

use super::moderation_models::{
    ClassifierSignal, ContentFlag, FlagReason, FlagSource, FlagTarget, ModerationStatus,
    UserReport,
};
use super::moderation_ports::{ModerationError, ModerationStore};
use super::moderation_service::ModerationService;
use crate::core::audit::AuditStore;
use crate::core::content::{ContentGateway, ProfileDirectory};
use crate::core::rate_limit::{RateLimitStore, REPORT_ACTION};
use uuid::Uuid;

const MAX_DESCRIPTION_CHARS: usize = 2000;

impl<S, C, A, R> ModerationService<S, C, A, R>
where
    S: ModerationStore,
    C: ContentGateway + ProfileDirectory,
    A: AuditStore,
    R: RateLimitStore,
{
    /// File a report on behalf of `reporter_id`.
    ///
    /// Every report spawns a linked pending flag so it shows up in the review
    /// queue; both rows are written together. One unit of the reporter's quota
    /// is taken before the write and handed back if the write fails.
    pub async fn file_user_report(
        &self,
        reporter_id: Option<Uuid>,
        reason: FlagReason,
        description: Option<String>,
        target: FlagTarget,
    ) -> Result<UserReport, ModerationError> {
        let reporter_id = reporter_id.ok_or(ModerationError::Unauthorized)?;
        target.validate()?;
        let description = normalize_description(description)?;

        let policy = self.config.report_limit;
        let grant = self
            .limiter
            .try_acquire(reporter_id, REPORT_ACTION, policy)
            .await?
            .ok_or(ModerationError::RateLimitExceeded {
                max_actions: policy.max_actions,
                window_hours: policy.window_hours(),
            })?;

        let mut flag = ContentFlag::new(target, FlagSource::UserReport, reason);
        flag.flagged_by = Some(reporter_id);
        flag.description = description.clone();

        let report = UserReport {
            id: Uuid::new_v4(),
            reporter_id,
            reported_user_id: target.user_id,
            reported_post_id: target.post_id,
            reported_comment_id: target.comment_id,
            reason,
            description,
            status: ModerationStatus::Pending,
            content_flag_id: Some(flag.id),
            created_at: flag.created_at,
        };

        if let Err(e) = self.store.insert_report_with_flag(&report, &flag).await {
            if let Err(release) = self.limiter.release(grant, REPORT_ACTION).await {
                tracing::warn!(
                    reporter_id = %reporter_id,
                    error = %release,
                    "Failed to hand back report quota"
                );
            }
            return Err(e);
        }

        tracing::info!(
            report_id = %report.id,
            flag_id = %flag.id,
            reporter_id = %reporter_id,
            reason = %reason,
            "User report filed"
        );
        Ok(report)
    }

    /// Turn a classifier signal into a pending flag.
    ///
    /// Only the shape of the signal is checked. Categories that are not a
    /// known reason are kept verbatim in `ai_category` with reason `other`.
    pub async fn ingest_automated_flag(
        &self,
        signal: ClassifierSignal,
    ) -> Result<ContentFlag, ModerationError> {
        signal.target.validate()?;

        let category = signal.category.trim();
        if category.is_empty() {
            return Err(ModerationError::Validation(
                "category must not be empty".to_string(),
            ));
        }
        if !signal.confidence.is_finite() || !(0.0..=1.0).contains(&signal.confidence) {
            return Err(ModerationError::Validation(format!(
                "confidence must be between 0 and 1 (got {})",
                signal.confidence
            )));
        }

        let reason = category
            .to_ascii_lowercase()
            .parse()
            .unwrap_or(FlagReason::Other);

        let mut flag = ContentFlag::new(signal.target, FlagSource::AutomatedClassifier, reason);
        flag.ai_category = Some(category.to_string());
        flag.ai_confidence = Some(signal.confidence);
        flag.urgency_level = signal.urgency_level;

        self.store.insert_flag(&flag).await?;

        tracing::info!(
            flag_id = %flag.id,
            category,
            confidence = signal.confidence,
            urgency_level = ?signal.urgency_level,
            "Automated flag ingested"
        );
        Ok(flag)
    }
}

fn normalize_description(description: Option<String>) -> Result<Option<String>, ModerationError> {
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    if let Some(d) = &description {
        if d.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ModerationError::Validation(format!(
                "description must be at most {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
    }
    Ok(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::test_support::harness;
    use crate::core::moderation::StatusFilter;

    #[tokio::test]
    async fn test_report_creates_linked_pending_flag() {
        let h = harness();
        let reporter = Uuid::new_v4();
        let post = Uuid::new_v4();

        let report = h
            .service
            .file_user_report(Some(reporter), FlagReason::Spam, None, FlagTarget::post(post))
            .await
            .unwrap();

        assert_eq!(report.reporter_id, reporter);
        assert_eq!(report.reported_post_id, Some(post));
        assert_eq!(report.reason, FlagReason::Spam);
        assert_eq!(report.status, ModerationStatus::Pending);
        assert!(report.description.is_none());

        let flag_id = report.content_flag_id.expect("report should link a flag");
        let flag = h.store.flag(flag_id).unwrap();
        assert_eq!(flag.source, FlagSource::UserReport);
        assert_eq!(flag.flagged_by, Some(reporter));
        assert_eq!(flag.post_id, Some(post));
        assert_eq!(flag.status, ModerationStatus::Pending);

        assert_eq!(h.rate_limits.event_count(reporter, REPORT_ACTION), 1);
    }

    #[tokio::test]
    async fn test_eleventh_report_in_a_day_is_rate_limited() {
        let h = harness();
        let reporter = Uuid::new_v4();

        for i in 0..10 {
            let result = h
                .service
                .file_user_report(
                    Some(reporter),
                    FlagReason::Harassment,
                    Some(format!("report {}", i)),
                    FlagTarget::post(Uuid::new_v4()),
                )
                .await;
            assert!(result.is_ok(), "report {} should be accepted", i);
        }
        assert_eq!(h.store.report_count(), 10);

        let result = h
            .service
            .file_user_report(
                Some(reporter),
                FlagReason::Harassment,
                None,
                FlagTarget::post(Uuid::new_v4()),
            )
            .await;

        assert!(matches!(
            result,
            Err(ModerationError::RateLimitExceeded {
                max_actions: 10,
                window_hours: 24
            })
        ));
        assert_eq!(h.store.report_count(), 10);
    }

    #[tokio::test]
    async fn test_report_requires_reporter_and_target() {
        let h = harness();

        let result = h
            .service
            .file_user_report(None, FlagReason::Spam, None, FlagTarget::post(Uuid::new_v4()))
            .await;
        assert!(matches!(result, Err(ModerationError::Unauthorized)));

        let result = h
            .service
            .file_user_report(
                Some(Uuid::new_v4()),
                FlagReason::Spam,
                None,
                FlagTarget::default(),
            )
            .await;
        assert!(matches!(result, Err(ModerationError::Validation(_))));

        assert_eq!(h.store.report_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_report_does_not_consume_quota() {
        let h = harness();
        let reporter = Uuid::new_v4();

        let _ = h
            .service
            .file_user_report(Some(reporter), FlagReason::Spam, None, FlagTarget::default())
            .await;

        assert_eq!(h.rate_limits.event_count(reporter, REPORT_ACTION), 0);
    }

    #[tokio::test]
    async fn test_failed_write_hands_quota_back() {
        let h = harness();
        let reporter = Uuid::new_v4();
        h.store.set_fail_inserts(true);

        for _ in 0..10 {
            let result = h
                .service
                .file_user_report(
                    Some(reporter),
                    FlagReason::Spam,
                    None,
                    FlagTarget::post(Uuid::new_v4()),
                )
                .await;
            assert!(matches!(result, Err(ModerationError::StorageError(_))));
        }
        assert_eq!(h.rate_limits.event_count(reporter, REPORT_ACTION), 0);
        assert_eq!(h.store.report_count(), 0);

        // Once the store is back the reporter still has the full quota
        h.store.set_fail_inserts(false);
        h.service
            .file_user_report(
                Some(reporter),
                FlagReason::Spam,
                None,
                FlagTarget::post(Uuid::new_v4()),
            )
            .await
            .unwrap();
        assert_eq!(h.rate_limits.event_count(reporter, REPORT_ACTION), 1);
    }

    #[tokio::test]
    async fn test_description_is_trimmed_and_bounded() {
        let h = harness();
        let reporter = Uuid::new_v4();

        let report = h
            .service
            .file_user_report(
                Some(reporter),
                FlagReason::Other,
                Some("   ".to_string()),
                FlagTarget::post(Uuid::new_v4()),
            )
            .await
            .unwrap();
        assert!(report.description.is_none());

        let result = h
            .service
            .file_user_report(
                Some(reporter),
                FlagReason::Other,
                Some("x".repeat(MAX_DESCRIPTION_CHARS + 1)),
                FlagTarget::post(Uuid::new_v4()),
            )
            .await;
        assert!(matches!(result, Err(ModerationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_automated_flag_round_trips_through_queue() {
        let h = harness();
        let post = Uuid::new_v4();

        let created = h
            .service
            .ingest_automated_flag(ClassifierSignal {
                target: FlagTarget::post(post),
                category: "nudity".to_string(),
                confidence: 0.92,
                urgency_level: Some(5),
            })
            .await
            .unwrap();

        let queue = h
            .service
            .list_flags("pending".parse::<StatusFilter>().unwrap(), Some(10))
            .await
            .unwrap();

        assert_eq!(queue.len(), 1);
        let flag = &queue[0].flag;
        assert_eq!(flag, &created);
        assert_eq!(flag.source, FlagSource::AutomatedClassifier);
        assert_eq!(flag.reason, FlagReason::Nudity);
        assert_eq!(flag.ai_category.as_deref(), Some("nudity"));
        assert_eq!(flag.ai_confidence, Some(0.92));
        assert_eq!(flag.urgency_level, Some(5));
        assert_eq!(flag.post_id, Some(post));
        assert!(flag.flagged_by.is_none());
        assert_eq!(flag.status, ModerationStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_category_falls_back_to_other() {
        let h = harness();

        let flag = h
            .service
            .ingest_automated_flag(ClassifierSignal {
                target: FlagTarget::post(Uuid::new_v4()),
                category: "self_harm".to_string(),
                confidence: 0.5,
                urgency_level: None,
            })
            .await
            .unwrap();

        assert_eq!(flag.reason, FlagReason::Other);
        assert_eq!(flag.ai_category.as_deref(), Some("self_harm"));
    }

    #[tokio::test]
    async fn test_malformed_signals_are_rejected() {
        let h = harness();
        let bad_signals = [
            ClassifierSignal {
                target: FlagTarget::default(),
                category: "spam".to_string(),
                confidence: 0.5,
                urgency_level: None,
            },
            ClassifierSignal {
                target: FlagTarget::post(Uuid::new_v4()),
                category: " ".to_string(),
                confidence: 0.5,
                urgency_level: None,
            },
            ClassifierSignal {
                target: FlagTarget::post(Uuid::new_v4()),
                category: "spam".to_string(),
                confidence: 1.5,
                urgency_level: None,
            },
            ClassifierSignal {
                target: FlagTarget::post(Uuid::new_v4()),
                category: "spam".to_string(),
                confidence: f64::NAN,
                urgency_level: None,
            },
        ];

        for signal in bad_signals {
            let result = h.service.ingest_automated_flag(signal).await;
            assert!(matches!(result, Err(ModerationError::Validation(_))));
        }
        assert_eq!(h.store.flag_count(), 0);
    }
}
