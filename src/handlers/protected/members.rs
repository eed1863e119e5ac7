// handlers/protected/members.rs - /api/members handlers

use axum::extract::{Extension, Path, State};
use serde::Serialize;

use crate::api::ApiJson;
use crate::database::models::{CreateFamilyMemberInput, FamilyMember, FamilyMemberUpdate};
use crate::error::OrFail;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::FamilyContext;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ColorResponse {
    pub color: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedMember {
    pub id: String,
}

/// GET /api/members - Family roster, oldest first
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
) -> ApiResult<Vec<FamilyMember>> {
    let members = state.members().list(&ctx).await.or_fail("Failed to load family members")?;
    Ok(ApiResponse::success(members))
}

/// GET /api/members/me - The member linked to the caller, or null
pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
) -> ApiResult<Option<FamilyMember>> {
    let member = state.members().my_member(&ctx).await.or_fail("Failed to load family member")?;
    Ok(ApiResponse::success(member))
}

/// GET /api/members/default - The caller's default member, or null
pub async fn default_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
) -> ApiResult<Option<FamilyMember>> {
    let member = state
        .members()
        .default_member(&ctx)
        .await
        .or_fail("Failed to load default member")?;
    Ok(ApiResponse::success(member))
}

/// GET /api/members/available-color - First palette colour not yet taken
pub async fn available_color(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
) -> ApiResult<ColorResponse> {
    let color = state
        .members()
        .available_color(&ctx)
        .await
        .or_fail("Failed to load family members")?;
    Ok(ApiResponse::success(ColorResponse { color }))
}

/// POST /api/members - Add a member without an account
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    ApiJson(input): ApiJson<CreateFamilyMemberInput>,
) -> ApiResult<FamilyMember> {
    let member = state.members().create(&ctx, input).await.or_fail("Failed to create family member")?;
    Ok(ApiResponse::created(member))
}

/// PATCH /api/members/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<FamilyMemberUpdate>,
) -> ApiResult<FamilyMember> {
    let member = state
        .members()
        .update(&ctx, &id, update)
        .await
        .or_fail("Failed to update family member")?;
    Ok(ApiResponse::success(member))
}

/// DELETE /api/members/:id - Refused for members linked to an account
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    Path(id): Path<String>,
) -> ApiResult<DeletedMember> {
    state.members().delete(&ctx, &id).await.or_fail("Failed to delete family member")?;
    Ok(ApiResponse::success(DeletedMember { id }))
}

/// PUT /api/members/:id/default - Make one of the caller's own members their default
pub async fn default_set(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    Path(id): Path<String>,
) -> ApiResult<FamilyMember> {
    let member = state
        .members()
        .set_default(&ctx, &id)
        .await
        .or_fail("Failed to set default member")?;
    Ok(ApiResponse::success(member))
}
