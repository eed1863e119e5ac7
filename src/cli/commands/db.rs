use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::{schema, DatabaseManager};

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Create tables and indexes (idempotent)")]
    Init,

    #[command(about = "Drop lookup indexes, keeping constraint indexes (development)")]
    DropIndexes,

    #[command(about = "Check database connectivity")]
    Ping,
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config().database)
        .await
        .context("failed to connect to database")?;

    let result = match cmd {
        DbCommands::Init => schema::initialize_indexes(&pool)
            .await
            .map(|_| ("Tables and indexes initialized", json!({ "tables": schema::table_names() }))),
        DbCommands::DropIndexes => schema::drop_indexes(&pool)
            .await
            .map(|_| ("Lookup indexes dropped", json!({}))),
        DbCommands::Ping => DatabaseManager::health_check(&pool)
            .await
            .map(|_| ("Database reachable", json!({}))),
    };

    DatabaseManager::close(pool).await;
    let (message, data) = result?;
    output_success(&output_format, message, Some(data))
}
