use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use familyos_api::database::{schema, DatabaseManager, PgStore};
use familyos_api::modules::ModuleRegistry;
use familyos_api::{app, config, is_development, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("familyos_api=info,tower_http=info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config().clone();
    info!("Starting FamilyOS API in {:?} mode", config.environment);
    if is_development!() && std::env::var("JWT_SECRET").is_err() {
        warn!("JWT_SECRET not set; using the development signing secret");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    if config.database.auto_init {
        schema::initialize_indexes(&pool)
            .await
            .context("failed to initialize tables and indexes")?;
    }

    let store = Arc::new(PgStore::new(pool.clone(), config.database.statement_timeout()));

    let modules = ModuleRegistry::with_builtins();
    modules.init_all();

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(store, config, modules);
    let registry = state.modules.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("FamilyOS API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    registry.teardown_all();
    DatabaseManager::close(pool).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
