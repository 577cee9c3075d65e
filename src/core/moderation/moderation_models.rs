// Moderation domain models - flags, reports and the vocabularies they share.
//
// These are pure domain types with no storage or HTTP dependencies.
// The string forms of the enums are what existing stored data uses, so
// `as_str` / `FromStr` must stay in sync with the serde names.

use super::moderation_ports::ModerationError;
use crate::core::content::{PostSummary, ProfileSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Where a flag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSource {
    /// Filed by a human through the report UI
    UserReport,
    /// Emitted by the content classifier
    AutomatedClassifier,
}

impl FlagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagSource::UserReport => "user_report",
            FlagSource::AutomatedClassifier => "automated_classifier",
        }
    }
}

impl FromStr for FlagSource {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_report" => Ok(FlagSource::UserReport),
            "automated_classifier" => Ok(FlagSource::AutomatedClassifier),
            other => Err(ModerationError::Validation(format!(
                "unknown flag source: {other}"
            ))),
        }
    }
}

/// Reason category attached to a flag or report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    Nudity,
    Violence,
    Harassment,
    HateSpeech,
    ScamFraud,
    Spam,
    Misinformation,
    Other,
}

impl FlagReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagReason::Nudity => "nudity",
            FlagReason::Violence => "violence",
            FlagReason::Harassment => "harassment",
            FlagReason::HateSpeech => "hate_speech",
            FlagReason::ScamFraud => "scam_fraud",
            FlagReason::Spam => "spam",
            FlagReason::Misinformation => "misinformation",
            FlagReason::Other => "other",
        }
    }
}

impl FromStr for FlagReason {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nudity" => Ok(FlagReason::Nudity),
            "violence" => Ok(FlagReason::Violence),
            "harassment" => Ok(FlagReason::Harassment),
            "hate_speech" => Ok(FlagReason::HateSpeech),
            "scam_fraud" => Ok(FlagReason::ScamFraud),
            "spam" => Ok(FlagReason::Spam),
            "misinformation" => Ok(FlagReason::Misinformation),
            "other" => Ok(FlagReason::Other),
            other => Err(ModerationError::Validation(format!(
                "unknown reason: {other}"
            ))),
        }
    }
}

impl fmt::Display for FlagReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation status shared by flags and reports.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Pending,
    Reviewed,
    Actioned,
    Dismissed,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Reviewed => "reviewed",
            ModerationStatus::Actioned => "actioned",
            ModerationStatus::Dismissed => "dismissed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ModerationStatus::Pending)
    }
}

impl FromStr for ModerationStatus {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ModerationStatus::Pending),
            "reviewed" => Ok(ModerationStatus::Reviewed),
            "actioned" => Ok(ModerationStatus::Actioned),
            "dismissed" => Ok(ModerationStatus::Dismissed),
            other => Err(ModerationError::Validation(format!(
                "unknown status: {other}"
            ))),
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewer's decision. Every decision maps to a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Reviewed,
    Actioned,
    Dismissed,
}

impl ReviewDecision {
    pub fn status(&self) -> ModerationStatus {
        match self {
            ReviewDecision::Reviewed => ModerationStatus::Reviewed,
            ReviewDecision::Actioned => ModerationStatus::Actioned,
            ReviewDecision::Dismissed => ModerationStatus::Dismissed,
        }
    }
}

impl FromStr for ReviewDecision {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reviewed" => Ok(ReviewDecision::Reviewed),
            "actioned" => Ok(ReviewDecision::Actioned),
            "dismissed" => Ok(ReviewDecision::Dismissed),
            other => Err(ModerationError::Validation(format!(
                "decision must be reviewed, actioned or dismissed (got {other})"
            ))),
        }
    }
}

/// Kind of content the deletion collaborator can remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Post,
    Comment,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "post",
            ContentType::Comment => "comment",
        }
    }
}

impl FromStr for ContentType {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ContentType::Post),
            "comment" => Ok(ContentType::Comment),
            other => Err(ModerationError::Validation(format!(
                "content type must be post or comment (got {other})"
            ))),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a flag or report points at. At least one reference must be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagTarget {
    pub user_id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
}

impl FlagTarget {
    #[cfg(test)]
    pub fn post(post_id: Uuid) -> Self {
        Self {
            post_id: Some(post_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.post_id.is_none() && self.comment_id.is_none()
    }

    pub fn validate(&self) -> Result<(), ModerationError> {
        if self.is_empty() {
            return Err(ModerationError::Validation(
                "a user, post or comment must be referenced".to_string(),
            ));
        }
        Ok(())
    }
}

/// A unit of moderation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentFlag {
    pub id: Uuid,
    pub post_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub flagged_user_id: Option<Uuid>,
    /// Absent for automated flags
    pub flagged_by: Option<Uuid>,
    pub source: FlagSource,
    pub reason: FlagReason,
    pub description: Option<String>,
    pub ai_category: Option<String>,
    pub ai_confidence: Option<f64>,
    pub urgency_level: Option<i32>,
    pub status: ModerationStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub action_taken: Option<String>,
    pub action_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ContentFlag {
    /// A fresh pending flag with no review fields set.
    pub fn new(target: FlagTarget, source: FlagSource, reason: FlagReason) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id: target.post_id,
            comment_id: target.comment_id,
            flagged_user_id: target.user_id,
            flagged_by: None,
            source,
            reason,
            description: None,
            ai_category: None,
            ai_confidence: None,
            urgency_level: None,
            status: ModerationStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            action_taken: None,
            action_notes: None,
            created_at: Utc::now(),
        }
    }

    /// The content id this flag references for the given type, if any.
    pub fn content_id(&self, content_type: ContentType) -> Option<Uuid> {
        match content_type {
            ContentType::Post => self.post_id,
            ContentType::Comment => self.comment_id,
        }
    }
}

/// An explicit human report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReport {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Option<Uuid>,
    pub reported_post_id: Option<Uuid>,
    pub reported_comment_id: Option<Uuid>,
    pub reason: FlagReason,
    pub description: Option<String>,
    pub status: ModerationStatus,
    pub content_flag_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Output of the content classifier, consumed as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSignal {
    #[serde(flatten)]
    pub target: FlagTarget,
    pub category: String,
    pub confidence: f64,
    pub urgency_level: Option<i32>,
}

/// Fields written by a disposition.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub decision: ReviewDecision,
    pub reviewer_id: Uuid,
    pub notes: Option<String>,
    pub action_taken: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

/// Outbox row for a content deletion whose disposition is not yet recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDisposition {
    pub flag_id: Uuid,
    pub content_type: ContentType,
    pub content_id: Uuid,
    pub reviewer_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Status restriction for the review queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ModerationStatus),
}

impl StatusFilter {
    pub fn status(&self) -> Option<ModerationStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(*status),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(StatusFilter::All),
            other => other.parse().map(StatusFilter::Only),
        }
    }
}

/// A queue entry with best-effort attachments for the reviewer UI.
#[derive(Debug, Clone, Serialize)]
pub struct FlagView {
    #[serde(flatten)]
    pub flag: ContentFlag,
    pub post: Option<PostSummary>,
    pub flagged_user: Option<ProfileSummary>,
    pub reporter: Option<ProfileSummary>,
}

/// Flag counts per known status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModerationStats {
    pub pending: u64,
    pub reviewed: u64,
    pub actioned: u64,
    pub dismissed: u64,
}

impl ModerationStats {
    pub fn total(&self) -> u64 {
        self.pending + self.reviewed + self.actioned + self.dismissed
    }
}

/// Result of one reconciliation pass over the outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub completed: u32,
    pub discarded: u32,
    pub failed: u32,
    /// Rows still inside the grace period, left for a later pass
    pub deferred: u32,
}
