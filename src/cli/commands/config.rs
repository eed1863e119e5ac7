use clap::Subcommand;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show the configuration the server would start with (secrets omitted)")]
    Show,
}

pub async fn handle(cmd: ConfigCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let mut value = serde_json::to_value(config())?;
            // The URL may embed credentials
            if let Some(database) = value.get_mut("database").and_then(|d| d.as_object_mut()) {
                if database.get("url").is_some_and(|url| !url.is_null()) {
                    database.insert("url".to_string(), serde_json::Value::from("<set>"));
                }
            }
            output_success(&output_format, &format!("{:?} configuration", config().environment), Some(value))
        }
    }
}
