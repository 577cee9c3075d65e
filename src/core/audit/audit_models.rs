// Audit log domain models.

use crate::core::content::ProfileSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

/// Well-known `action_type` tags. The column is free-form; these are the
/// values the moderation service and dashboard write.
pub mod action_types {
    pub const REVIEW_FLAG: &str = "review_flag";
    pub const DELETE_CONTENT: &str = "delete_content";
    pub const UPDATE_REPORT_STATUS: &str = "update_report_status";
    #[allow(dead_code)]
    pub const BAN_USER: &str = "ban_user";
    #[allow(dead_code)]
    pub const WARN_USER: &str = "warn_user";
    #[allow(dead_code)]
    pub const ADJUST_LIKES: &str = "adjust_likes";
}

/// Well-known `target_type` values.
pub mod target_types {
    #[allow(dead_code)]
    pub const USER: &str = "user";
    pub const CONTENT_FLAG: &str = "content_flag";
    pub const USER_REPORT: &str = "user_report";
}

/// One append-only audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminLog {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub action_type: String,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub reason: Option<String>,
    pub ip_address: Option<IpAddr>,
    pub created_at: DateTime<Utc>,
}

/// Optional context attached to an audit entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionDetails {
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub reason: Option<String>,
    pub ip_address: Option<IpAddr>,
}

impl ActionDetails {
    pub fn change(old_value: serde_json::Value, new_value: serde_json::Value) -> Self {
        Self {
            old_value: Some(old_value),
            new_value: Some(new_value),
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Audit entry joined with the acting admin's profile.
#[derive(Debug, Clone, Serialize)]
pub struct AdminLogView {
    #[serde(flatten)]
    pub log: AdminLog,
    pub admin: Option<ProfileSummary>,
}
