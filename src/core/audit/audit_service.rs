// Audit log service - append-only record of privileged actions.
//
// Writing an entry is a side channel: `log_action` swallows every failure
// and reports it through `tracing` (target "audit") instead of returning an
// error, so an audit outage can never undo a moderation action that already
// happened. Those error logs are the monitoring hook for missing entries.

use super::audit_models::{ActionDetails, AdminLog, AdminLogView};
use crate::core::content::{distinct_ids, profiles_or_empty, ProfileDirectory};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Append-only storage for audit entries. There is deliberately no update or delete.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: &AdminLog) -> Result<(), AuditError>;

    /// Newest first, optionally restricted to one action type.
    async fn list(
        &self,
        limit: usize,
        action_type: Option<&str>,
    ) -> Result<Vec<AdminLog>, AuditError>;
}

pub struct AuditService<A: AuditStore, P: ProfileDirectory> {
    store: A,
    profiles: Arc<P>,
}

impl<A: AuditStore, P: ProfileDirectory> AuditService<A, P> {
    pub fn new(store: A, profiles: Arc<P>) -> Self {
        Self { store, profiles }
    }

    /// Append an audit entry. Returns the stored entry, or `None` if it could not be written.
    pub async fn log_action(
        &self,
        admin_id: Uuid,
        action_type: &str,
        target_type: &str,
        target_id: Option<Uuid>,
        details: ActionDetails,
    ) -> Option<AdminLog> {
        if action_type.trim().is_empty() || target_type.trim().is_empty() {
            tracing::error!(
                target: "audit",
                admin_id = %admin_id,
                "Refusing audit entry with blank action or target type"
            );
            return None;
        }

        let entry = AdminLog {
            id: Uuid::new_v4(),
            admin_id,
            action_type: action_type.to_string(),
            target_type: target_type.to_string(),
            target_id,
            old_value: details.old_value,
            new_value: details.new_value,
            reason: details.reason,
            ip_address: details.ip_address,
            created_at: Utc::now(),
        };

        match self.store.append(&entry).await {
            Ok(()) => {
                tracing::debug!(
                    target: "audit",
                    log_id = %entry.id,
                    action_type,
                    "Audit entry written"
                );
                Some(entry)
            }
            Err(e) => {
                tracing::error!(
                    target: "audit",
                    error = %e,
                    admin_id = %admin_id,
                    action_type,
                    target_type,
                    target_id = ?target_id,
                    "Failed to write audit entry; action proceeds without audit trail"
                );
                None
            }
        }
    }

    /// Recent entries, newest first, with the acting admin's profile when available.
    pub async fn fetch_logs(
        &self,
        limit: usize,
        action_type: Option<&str>,
    ) -> Result<Vec<AdminLogView>, AuditError> {
        if limit == 0 {
            return Err(AuditError::Validation(
                "limit must be at least 1".to_string(),
            ));
        }

        let action_type = action_type.map(str::trim).filter(|a| !a.is_empty());
        let logs = self.store.list(limit, action_type).await?;

        let admin_ids = distinct_ids(logs.iter().map(|l| Some(l.admin_id)));
        let profiles = profiles_or_empty(self.profiles.as_ref(), &admin_ids).await;

        Ok(logs
            .into_iter()
            .map(|log| {
                let admin = profiles.get(&log.admin_id).cloned();
                AdminLogView { log, admin }
            })
            .collect())
    }
}
