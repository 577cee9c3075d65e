// Internal ingestion endpoint for the automated classifier.
//
// The classifier authenticates with a shared key instead of a user token.
// Without a configured key the endpoint does not exist.

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::{ApiError, ApiResponse, ApiResult};
use crate::api::AppState;
use crate::core::moderation::{ClassifierSignal, ContentFlag};

pub const CLASSIFIER_KEY_HEADER: &str = "x-classifier-key";

/// A request carrying the configured classifier key.
pub struct ClassifierCaller;

#[axum::async_trait]
impl FromRequestParts<AppState> for ClassifierCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .classifier_key
            .as_deref()
            .ok_or_else(|| ApiError::not_found("classifier ingestion is disabled"))?;

        let presented = parts
            .headers
            .get(CLASSIFIER_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing classifier key"))?;

        if presented != expected {
            return Err(ApiError::unauthorized("invalid classifier key"));
        }
        Ok(Self)
    }
}

pub async fn ingest_flag(
    State(state): State<AppState>,
    _caller: ClassifierCaller,
    Json(signal): Json<ClassifierSignal>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ContentFlag>>)> {
    let flag = state.moderation.ingest_automated_flag(signal).await?;

    tracing::debug!(flag_id = %flag.id, "Classifier signal accepted");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(flag))))
}
