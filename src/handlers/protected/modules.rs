// handlers/protected/modules.rs - GET /api/modules handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult};
use crate::modules::ModuleInfo;
use crate::AppState;

/// GET /api/modules - Registered modules with their capabilities and status
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ModuleInfo>> {
    Ok(ApiResponse::success(state.modules.list()))
}
