// handlers/public/system.rs - GET / and GET /health

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::AppState;

/// GET / - Service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "FamilyOS API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "invites": "/api/invites/:code (public)",
                "onboarding": "/api/onboarding/*, /api/families, /api/families/join (authenticated)",
                "family": "/api/family[/invite-code] (family)",
                "members": "/api/members[/:id] (family)",
                "portal": "/api/portal/detect (authenticated)",
                "providers": "/api/providers[/:id] (family)",
                "todos": "/api/todos[/:id] (family)",
                "modules": "/api/modules (family)",
            }
        }
    }))
}

/// GET /health - Liveness plus storage reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
