// Moderator and admin dashboard routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResponse, ApiResult, ErrorCode};
use crate::api::extract::{AdminActor, ClientIp, ModeratorActor};
use crate::api::AppState;
use crate::core::audit::{ActionDetails, AdminLog, AdminLogView};
use crate::core::moderation::{
    ContentFlag, ContentType, FlagView, ModerationStats, ModerationStatus, ReconcileSummary,
    ReviewDecision, StatusFilter, UserReport,
};

const DEFAULT_LOG_LIMIT: usize = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flags", get(list_flags))
        .route("/flags/:id/review", put(review_flag))
        .route("/flags/:id/delete-content", post(delete_content))
        .route("/reports/:id/status", put(update_report_status))
        .route("/stats", get(stats))
        .route("/logs", get(list_logs).post(log_action))
        .route("/reconcile", post(reconcile))
}

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct FlagQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteContentRequest {
    pub content_type: ContentType,
    pub content_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ReportStatusRequest {
    pub status: ModerationStatus,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counts: ModerationStats,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
    pub action_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogActionRequest {
    pub action_type: String,
    pub target_type: String,
    #[serde(default)]
    pub target_id: Option<Uuid>,
    #[serde(default)]
    pub old_value: Option<Value>,
    #[serde(default)]
    pub new_value: Option<Value>,
    #[serde(default)]
    pub reason: Option<String>,
}

// --- Review queue ---

pub async fn list_flags(
    State(state): State<AppState>,
    _moderator: ModeratorActor,
    Query(query): Query<FlagQuery>,
) -> ApiResult<Json<ApiResponse<Vec<FlagView>>>> {
    let filter: StatusFilter = query.status.as_deref().unwrap_or_default().parse()?;
    let flags = state.moderation.list_flags(filter, query.limit).await?;
    Ok(Json(ApiResponse::ok(flags)))
}

pub async fn stats(
    State(state): State<AppState>,
    _moderator: ModeratorActor,
) -> ApiResult<Json<ApiResponse<StatsResponse>>> {
    let counts = state.moderation.fetch_moderation_stats().await?;
    Ok(Json(ApiResponse::ok(StatsResponse {
        total: counts.total(),
        counts,
    })))
}

// --- Dispositions ---

pub async fn review_flag(
    State(state): State<AppState>,
    ModeratorActor(actor): ModeratorActor,
    Path(flag_id): Path<Uuid>,
    Json(body): Json<ReviewRequest>,
) -> ApiResult<Json<ApiResponse<ContentFlag>>> {
    let flag = state
        .moderation
        .review_flag(flag_id, body.decision, Some(actor.id), body.notes)
        .await?;
    Ok(Json(ApiResponse::ok(flag)))
}

pub async fn delete_content(
    State(state): State<AppState>,
    ModeratorActor(actor): ModeratorActor,
    Path(flag_id): Path<Uuid>,
    Json(body): Json<DeleteContentRequest>,
) -> ApiResult<Json<ApiResponse<ContentFlag>>> {
    let flag = state
        .moderation
        .delete_flagged_content(flag_id, body.content_type, body.content_id, Some(actor.id))
        .await?;
    Ok(Json(ApiResponse::ok_with_message(
        flag,
        format!("{} deleted", body.content_type),
    )))
}

pub async fn update_report_status(
    State(state): State<AppState>,
    ModeratorActor(actor): ModeratorActor,
    Path(report_id): Path<Uuid>,
    Json(body): Json<ReportStatusRequest>,
) -> ApiResult<Json<ApiResponse<UserReport>>> {
    let report = state
        .moderation
        .update_report_status(report_id, body.status, Some(actor.id))
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}

pub async fn reconcile(
    State(state): State<AppState>,
    AdminActor(actor): AdminActor,
) -> ApiResult<Json<ApiResponse<ReconcileSummary>>> {
    let summary = state.moderation.reconcile_dispositions().await?;
    tracing::info!(
        admin_id = %actor.id,
        completed = summary.completed,
        discarded = summary.discarded,
        failed = summary.failed,
        "Manual reconciliation finished"
    );
    Ok(Json(ApiResponse::ok(summary)))
}

// --- Audit log ---

pub async fn list_logs(
    State(state): State<AppState>,
    _moderator: ModeratorActor,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<ApiResponse<Vec<AdminLogView>>>> {
    let action_type = query.action_type.as_deref().filter(|s| !s.is_empty());
    let logs = state
        .audit
        .fetch_logs(query.limit.unwrap_or(DEFAULT_LOG_LIMIT), action_type)
        .await?;
    Ok(Json(ApiResponse::ok(logs)))
}

/// Record a privileged change made outside the moderation flows
/// (bans, warnings, like adjustments).
pub async fn log_action(
    State(state): State<AppState>,
    AdminActor(actor): AdminActor,
    ClientIp(ip): ClientIp,
    Json(body): Json<LogActionRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AdminLog>>)> {
    if body.action_type.trim().is_empty() || body.target_type.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::ValidationError,
            "action_type and target_type are required",
        ));
    }

    // The recorded address always comes from the connection
    let details = ActionDetails {
        old_value: body.old_value,
        new_value: body.new_value,
        reason: body.reason,
        ip_address: ip,
    };

    let entry = state
        .audit
        .log_action(
            actor.id,
            &body.action_type,
            &body.target_type,
            body.target_id,
            details,
        )
        .await
        .ok_or_else(ApiError::unavailable)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(entry))))
}
