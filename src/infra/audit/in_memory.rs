// In-memory AuditStore for tests. Clones share the same log.

use crate::core::audit::{AdminLog, AuditError, AuditStore};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct InMemoryAuditStore {
    entries: Arc<Mutex<Vec<AdminLog>>>,
    failing: bool,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every append fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<AdminLog> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &AdminLog) -> Result<(), AuditError> {
        if self.failing {
            return Err(AuditError::StorageError("audit table unavailable".to_string()));
        }
        self.entries
            .lock()
            .map_err(|e| AuditError::StorageError(e.to_string()))?
            .push(entry.clone());
        Ok(())
    }

    async fn list(
        &self,
        limit: usize,
        action_type: Option<&str>,
    ) -> Result<Vec<AdminLog>, AuditError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| AuditError::StorageError(e.to_string()))?;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| action_type.map_or(true, |a| e.action_type == a))
            .take(limit)
            .cloned()
            .collect())
    }
}
