// handlers/protected/family.rs - /api/family and /api/family/invite-code handlers

use axum::extract::{Extension, State};
use serde::Serialize;

use crate::api::ApiJson;
use crate::database::models::{Family, FamilyUpdate};
use crate::error::OrFail;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::FamilyContext;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCodeResponse {
    pub invite_code: String,
}

/// GET /api/family - The caller's family
pub async fn get(Extension(ctx): Extension<FamilyContext>) -> ApiResult<Family> {
    Ok(ApiResponse::success(ctx.family))
}

/// PATCH /api/family - Rename or change settings (owner only)
pub async fn patch(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    ApiJson(update): ApiJson<FamilyUpdate>,
) -> ApiResult<Family> {
    let family = state
        .families()
        .update_family(&ctx, update)
        .await
        .or_fail("Failed to update family")?;
    Ok(ApiResponse::success(family))
}

/// GET /api/family/invite-code
pub async fn invite_code_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
) -> ApiResult<InviteCodeResponse> {
    let invite_code = state.families().invite_code(&ctx);
    Ok(ApiResponse::success(InviteCodeResponse { invite_code }))
}

/// POST /api/family/invite-code - Issue a new code (owner only); the old one stops working
pub async fn invite_code_regenerate(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
) -> ApiResult<InviteCodeResponse> {
    let invite_code = state
        .families()
        .regenerate_invite_code(&ctx)
        .await
        .or_fail("Failed to regenerate invite code")?;
    Ok(ApiResponse::success(InviteCodeResponse { invite_code }))
}
