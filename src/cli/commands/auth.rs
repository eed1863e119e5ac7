use clap::Subcommand;
use serde_json::json;

use crate::auth::{generate_jwt, verify_jwt, Claims};
use crate::cli::utils::{output_success, output_value};
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Mint a session token signed with JWT_SECRET (development)")]
    Token {
        #[arg(long, help = "Principal id (token subject)")]
        user_id: String,
        #[arg(long, help = "Display name")]
        name: Option<String>,
        #[arg(long, help = "Email address")]
        email: Option<String>,
        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },

    #[command(about = "Verify a session token and show its claims")]
    Verify {
        #[arg(help = "Token to verify")]
        token: String,
    },
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;

    match cmd {
        AuthCommands::Token { user_id, name, email, hours } => {
            let claims = Claims::new(user_id, name, email, hours.unwrap_or(security.jwt_expiry_hours));
            let token = generate_jwt(&claims, &security.jwt_secret)?;
            output_value(&output_format, "token", &token)
        }
        AuthCommands::Verify { token } => {
            let claims = verify_jwt(&token, &security.jwt_secret)?;
            output_success(
                &output_format,
                "Token is valid",
                Some(json!({
                    "sub": claims.sub,
                    "name": claims.name,
                    "email": claims.email,
                    "exp": claims.exp,
                })),
            )
        }
    }
}
