// handlers/protected/providers.rs - /api/providers handlers

use axum::extract::{Extension, Path, State};
use serde::{Deserialize, Serialize};

use crate::api::{ApiJson, ApiQuery};
use crate::database::models::{CreateProviderInput, FamilyGroup, HealthcareProvider, ProviderUpdateInput};
use crate::error::OrFail;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::FamilyContext;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    /// Defaults to the configured limit, capped at 50
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DeletedProvider {
    pub id: String,
}

/// GET /api/providers - All providers, by name
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
) -> ApiResult<Vec<HealthcareProvider>> {
    let providers = state.providers().list(&ctx).await.or_fail("Failed to load providers")?;
    Ok(ApiResponse::success(providers))
}

/// GET /api/members/:id/providers
pub async fn for_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    Path(member_id): Path<String>,
) -> ApiResult<Vec<HealthcareProvider>> {
    let providers = state
        .providers()
        .for_member(&ctx, &member_id)
        .await
        .or_fail("Failed to load providers")?;
    Ok(ApiResponse::success(providers))
}

/// GET /api/providers/grouped - Each member with the providers serving them
pub async fn grouped(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
) -> ApiResult<Vec<FamilyGroup>> {
    let groups = state.providers().grouped(&ctx).await.or_fail("Failed to load providers")?;
    Ok(ApiResponse::success(groups))
}

/// GET /api/providers/recent?limit=
pub async fn recent(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> ApiResult<Vec<HealthcareProvider>> {
    let providers = state
        .providers()
        .recent(&ctx, query.limit)
        .await
        .or_fail("Failed to load recent providers")?;
    Ok(ApiResponse::success(providers))
}

/// POST /api/providers
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    ApiJson(input): ApiJson<CreateProviderInput>,
) -> ApiResult<HealthcareProvider> {
    let provider = state.providers().create(&ctx, input).await.or_fail("Failed to create provider")?;
    Ok(ApiResponse::created(provider))
}

/// PATCH /api/providers/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ProviderUpdateInput>,
) -> ApiResult<HealthcareProvider> {
    let provider = state
        .providers()
        .update(&ctx, &id, input)
        .await
        .or_fail("Failed to update provider")?;
    Ok(ApiResponse::success(provider))
}

/// DELETE /api/providers/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    Path(id): Path<String>,
) -> ApiResult<DeletedProvider> {
    state.providers().delete(&ctx, &id).await.or_fail("Failed to delete provider")?;
    Ok(ApiResponse::success(DeletedProvider { id }))
}

/// POST /api/providers/:id/used - Record a portal visit
pub async fn mark_used(
    State(state): State<AppState>,
    Extension(ctx): Extension<FamilyContext>,
    Path(id): Path<String>,
) -> ApiResult<HealthcareProvider> {
    let provider = state
        .providers()
        .mark_used(&ctx, &id)
        .await
        .or_fail("Failed to update provider")?;
    Ok(ApiResponse::success(provider))
}
