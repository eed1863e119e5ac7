// handlers/public/invites.rs - GET /api/invites/:code handler

use axum::extract::{Path, State};

use crate::error::OrFail;
use crate::middleware::{ApiResponse, ApiResult};
use crate::AppState;

/// GET /api/invites/:code - Whether the invite code belongs to a family
///
/// Only reports existence; the family itself is not disclosed.
pub async fn validate(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<bool> {
    let valid = state
        .families()
        .validate_invite_code(&code)
        .await
        .or_fail("Failed to validate invite code")?;
    Ok(ApiResponse::success(valid))
}
