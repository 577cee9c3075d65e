// In-memory ModerationStore used by the core service tests.
//
// Clones share the same maps, so a test can hand one clone to the service
// and keep another to inspect what was written.

use crate::core::moderation::{
    ContentFlag, ModerationError, ModerationStatus, ModerationStore, PendingDisposition, Review,
    UserReport,
};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    flags: DashMap<Uuid, ContentFlag>,
    reports: DashMap<Uuid, UserReport>,
    pending: DashMap<Uuid, PendingDisposition>,
    /// When set, `apply_review` fails as if the database were down.
    fail_reviews: AtomicBool,
    /// When set, inserts fail as if the database were down.
    fail_inserts: AtomicBool,
}

#[derive(Clone, Default)]
pub struct InMemoryModerationStore {
    inner: Arc<Inner>,
}

impl InMemoryModerationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, id: Uuid) -> Option<ContentFlag> {
        self.inner.flags.get(&id).map(|f| f.value().clone())
    }

    pub fn report(&self, id: Uuid) -> Option<UserReport> {
        self.inner.reports.get(&id).map(|r| r.value().clone())
    }

    pub fn flag_count(&self) -> usize {
        self.inner.flags.len()
    }

    pub fn report_count(&self) -> usize {
        self.inner.reports.len()
    }

    pub fn pending_disposition_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn set_fail_reviews(&self, fail: bool) {
        self.inner.fail_reviews.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.inner.fail_inserts.store(fail, Ordering::SeqCst);
    }

    fn check_inserts(&self) -> Result<(), ModerationError> {
        if self.inner.fail_inserts.load(Ordering::SeqCst) {
            return Err(ModerationError::StorageError(
                "simulated write failure".to_string(),
            ));
        }
        Ok(())
    }
}

/// Urgency descending with nulls last, then newest first.
fn queue_order(a: &ContentFlag, b: &ContentFlag) -> CmpOrdering {
    // `None < Some(_)`, so comparing b to a puts nulls last
    b.urgency_level
        .cmp(&a.urgency_level)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

#[async_trait]
impl ModerationStore for InMemoryModerationStore {
    async fn insert_report_with_flag(
        &self,
        report: &UserReport,
        flag: &ContentFlag,
    ) -> Result<(), ModerationError> {
        self.check_inserts()?;
        self.inner.flags.insert(flag.id, flag.clone());
        self.inner.reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn insert_flag(&self, flag: &ContentFlag) -> Result<(), ModerationError> {
        self.check_inserts()?;
        self.inner.flags.insert(flag.id, flag.clone());
        Ok(())
    }

    async fn get_flag(&self, id: Uuid) -> Result<Option<ContentFlag>, ModerationError> {
        Ok(self.flag(id))
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<UserReport>, ModerationError> {
        Ok(self.report(id))
    }

    async fn list_flags(
        &self,
        status: Option<ModerationStatus>,
        limit: usize,
    ) -> Result<Vec<ContentFlag>, ModerationError> {
        let mut flags: Vec<ContentFlag> = self
            .inner
            .flags
            .iter()
            .filter(|f| status.map_or(true, |s| f.status == s))
            .map(|f| f.value().clone())
            .collect();
        flags.sort_by(queue_order);
        flags.truncate(limit);
        Ok(flags)
    }

    async fn count_flags_by_status(&self) -> Result<Vec<(String, u64)>, ModerationError> {
        let mut counts: HashMap<&'static str, u64> = HashMap::new();
        for flag in self.inner.flags.iter() {
            *counts.entry(flag.status.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(status, count)| (status.to_string(), count))
            .collect())
    }

    async fn apply_review(
        &self,
        flag_id: Uuid,
        review: &Review,
    ) -> Result<ContentFlag, ModerationError> {
        if self.inner.fail_reviews.load(Ordering::SeqCst) {
            return Err(ModerationError::StorageError(
                "simulated write failure".to_string(),
            ));
        }

        // The entry guard keeps concurrent reviews of the same flag serialized.
        let updated = {
            let mut flag = self
                .inner
                .flags
                .get_mut(&flag_id)
                .ok_or_else(|| ModerationError::flag_not_found(flag_id))?;
            if flag.status.is_terminal() {
                return Err(ModerationError::AlreadyReviewed(flag_id));
            }
            flag.status = review.decision.status();
            flag.reviewed_by = Some(review.reviewer_id);
            flag.reviewed_at = Some(review.reviewed_at);
            flag.action_notes = review.notes.clone();
            flag.action_taken = review.action_taken.clone();
            flag.clone()
        };

        for mut report in self.inner.reports.iter_mut() {
            if report.content_flag_id == Some(flag_id) {
                report.status = updated.status;
            }
        }
        Ok(updated)
    }

    async fn set_report_status(
        &self,
        report_id: Uuid,
        status: ModerationStatus,
    ) -> Result<(ModerationStatus, UserReport), ModerationError> {
        let mut report = self
            .inner
            .reports
            .get_mut(&report_id)
            .ok_or_else(|| ModerationError::report_not_found(report_id))?;
        let previous = report.status;
        report.status = status;
        Ok((previous, report.clone()))
    }

    async fn save_pending_disposition(
        &self,
        pending: &PendingDisposition,
    ) -> Result<(), ModerationError> {
        match self.inner.pending.entry(pending.flag_id) {
            Entry::Occupied(_) => Err(ModerationError::DispositionInProgress(pending.flag_id)),
            Entry::Vacant(slot) => {
                slot.insert(pending.clone());
                Ok(())
            }
        }
    }

    async fn remove_pending_disposition(&self, flag_id: Uuid) -> Result<(), ModerationError> {
        self.inner.pending.remove(&flag_id);
        Ok(())
    }

    async fn list_pending_dispositions(&self) -> Result<Vec<PendingDisposition>, ModerationError> {
        let mut pending: Vec<PendingDisposition> =
            self.inner.pending.iter().map(|p| p.value().clone()).collect();
        pending.sort_by_key(|p| p.created_at);
        Ok(pending)
    }
}
