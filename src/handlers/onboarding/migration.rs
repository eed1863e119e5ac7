// handlers/onboarding/migration.rs - /api/onboarding/* handlers

use axum::extract::{Extension, State};

use crate::api::ApiJson;
use crate::error::OrFail;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{LegacyFamilyData, MigrationResult};
use crate::AppState;

/// GET /api/onboarding/status - True while the caller has no family
pub async fn status(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<bool> {
    let needed = state
        .migrations()
        .check_migration_needed(&user)
        .await
        .or_fail("Failed to check migration status")?;
    Ok(ApiResponse::success(needed))
}

/// POST /api/onboarding/migrate - Copy pre-login local data into a new family
///
/// Body: `{ "familyMembers": [...], "providers": [...] }`
pub async fn migrate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(data): ApiJson<LegacyFamilyData>,
) -> ApiResult<MigrationResult> {
    let result = state
        .migrations()
        .migrate_family_data(&user, data)
        .await
        .or_fail("Failed to migrate family data")?;
    Ok(ApiResponse::created(result))
}

/// POST /api/onboarding/minimal - Create a default family when there is nothing to migrate
pub async fn minimal(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<String> {
    let family_id = state
        .migrations()
        .create_minimal_family(&user)
        .await
        .or_fail("Failed to create family")?;
    Ok(ApiResponse::created(family_id))
}
