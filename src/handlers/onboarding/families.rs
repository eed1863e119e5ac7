// handlers/onboarding/families.rs - POST /api/families and POST /api/families/join

use axum::extract::{Extension, State};
use serde::Deserialize;

use crate::api::ApiJson;
use crate::database::models::Family;
use crate::error::OrFail;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateFamilyRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinFamilyRequest {
    #[serde(default)]
    pub invite_code: String,
}

/// POST /api/families - Create a family owned by the caller
///
/// The caller is linked to the new family and gets a "Self" member.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<CreateFamilyRequest>,
) -> ApiResult<Family> {
    let family = state
        .families()
        .create_family(&user, &body.name)
        .await
        .or_fail("Failed to create family")?;
    Ok(ApiResponse::created(family))
}

/// POST /api/families/join - Join the family behind an invite code
pub async fn join(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<JoinFamilyRequest>,
) -> ApiResult<Family> {
    let family = state
        .families()
        .join_family(&user, &body.invite_code)
        .await
        .or_fail("Failed to join family")?;
    Ok(ApiResponse::success(family))
}
