use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod modules;
pub mod services;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use config::AppConfig;
use database::FamilyStore;
use middleware::{jwt_auth_middleware, validate_family_middleware};
use modules::ModuleRegistry;
use services::{FamilyService, MemberService, MigrationService, ProviderService, TodoService};

/// Shared by every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FamilyStore>,
    pub config: Arc<AppConfig>,
    pub modules: Arc<ModuleRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn FamilyStore>, config: AppConfig, modules: ModuleRegistry) -> Self {
        Self {
            store,
            config: Arc::new(config),
            modules: Arc::new(modules),
        }
    }

    pub fn families(&self) -> FamilyService {
        FamilyService::new(self.store.clone(), self.config.family.clone())
    }

    pub fn members(&self) -> MemberService {
        MemberService::new(self.store.clone())
    }

    pub fn providers(&self) -> ProviderService {
        ProviderService::new(self.store.clone(), self.config.family.recent_providers_limit)
    }

    pub fn todos(&self) -> TodoService {
        TodoService::new(self.store.clone())
    }

    pub fn migrations(&self) -> MigrationService {
        MigrationService::new(self.store.clone(), self.config.family.clone())
    }
}

pub fn app(state: AppState) -> Router {
    let max_body = state.config.api.max_request_size_bytes;

    let router = Router::new()
        // Public
        .merge(public_routes())
        // Authenticated, family not required yet
        .merge(onboarding_routes(&state))
        // Authenticated and resolved to a family
        .merge(family_routes(&state))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(cors_layer(&state.config));

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/api/invites/:code", get(public::invite_validate))
}

fn onboarding_routes(state: &AppState) -> Router<AppState> {
    use handlers::onboarding;

    Router::new()
        .route("/api/onboarding/status", get(onboarding::migration_status))
        .route("/api/onboarding/migrate", post(onboarding::migration_migrate))
        .route("/api/onboarding/minimal", post(onboarding::migration_minimal))
        .route("/api/families", post(onboarding::family_create))
        .route("/api/families/join", post(onboarding::family_join))
        .route("/api/portal/detect", post(onboarding::portal_detect))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn family_routes(state: &AppState) -> Router<AppState> {
    use handlers::protected::{family, members, modules, providers, todos};

    Router::new()
        // Family
        .route("/api/family", get(family::get).patch(family::patch))
        .route(
            "/api/family/invite-code",
            get(family::invite_code_get).post(family::invite_code_regenerate),
        )
        // Members
        .route("/api/members", get(members::list).post(members::create))
        .route("/api/members/me", get(members::me))
        .route("/api/members/default", get(members::default_get))
        .route("/api/members/available-color", get(members::available_color))
        .route("/api/members/:id", patch(members::update).delete(members::delete))
        .route("/api/members/:id/default", put(members::default_set))
        .route("/api/members/:id/providers", get(providers::for_member))
        // Providers
        .route("/api/providers", get(providers::list).post(providers::create))
        .route("/api/providers/grouped", get(providers::grouped))
        .route("/api/providers/recent", get(providers::recent))
        .route("/api/providers/:id", patch(providers::update).delete(providers::delete))
        .route("/api/providers/:id/used", post(providers::mark_used))
        // Todos
        .route("/api/todos", get(todos::list).post(todos::create))
        .route("/api/todos/active-count", get(todos::active_count))
        .route("/api/todos/:id", patch(todos::update).delete(todos::delete))
        .route("/api/todos/:id/complete", post(todos::complete))
        // Modules
        .route("/api/modules", get(modules::list))
        .route_layer(from_fn_with_state(state.clone(), validate_family_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}
