use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::error::{ApiError, OrFail};
use crate::services::require_auth_with_family;
use crate::AppState;

/// Resolve the principal's family and inject `FamilyContext` into the request.
/// Runs after `jwt_auth_middleware`; a principal without a family gets the
/// onboarding redirect.
pub async fn validate_family_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Get AuthUser from previous JWT middleware
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before family validation"))?;

    let ctx = require_auth_with_family(state.store.as_ref(), &user)
        .await
        .or_fail("Failed to load family")?;

    tracing::debug!("Family resolved: user {} in family {}", user.id, ctx.family_id());

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
