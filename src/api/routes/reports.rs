// User-facing report filing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiResponse, ApiResult};
use crate::api::extract::AuthActor;
use crate::api::AppState;
use crate::core::moderation::{FlagReason, FlagTarget, UserReport};
use crate::core::rate_limit::REPORT_ACTION;

#[derive(Debug, Deserialize)]
pub struct FileReportRequest {
    pub reason: FlagReason,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub target: FlagTarget,
}

#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub max_actions: u32,
    pub window_hours: i64,
    pub remaining: u32,
    pub allowed: bool,
}

pub async fn file_report(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Json(body): Json<FileReportRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserReport>>)> {
    let report = state
        .moderation
        .file_user_report(Some(actor.id), body.reason, body.description, body.target)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(report, "report received")),
    ))
}

pub async fn quota(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
) -> ApiResult<Json<ApiResponse<QuotaResponse>>> {
    let policy = state.moderation.config().report_limit;

    let allowed = state
        .limiter
        .check_rate_limit(actor.id, REPORT_ACTION, policy.max_actions, policy.window_hours())
        .await?;
    let remaining = state
        .limiter
        .remaining(actor.id, REPORT_ACTION, policy)
        .await?;

    Ok(Json(ApiResponse::ok(QuotaResponse {
        max_actions: policy.max_actions,
        window_hours: policy.window_hours(),
        remaining,
        allowed,
    })))
}
