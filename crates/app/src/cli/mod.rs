use clap::{Args, Parser, Subcommand};
use replygate_app::database;
use sqlx::PgPool;

mod db;
mod rate_limits;
mod token;

#[derive(Debug, Parser)]
#[command(name = "replygate-app", about = "Replygate administration", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    Token(token::TokenCommand),
    RateLimits(rate_limits::RateLimitsCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Db(command) => db::run(command).await,
            Commands::Token(command) => token::run(command).await,
            Commands::RateLimits(command) => rate_limits::run(command).await,
        }
    }
}

/// Connection flags shared by every command.
#[derive(Debug, Args)]
pub(crate) struct DatabaseArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

impl DatabaseArgs {
    pub(crate) async fn connect(&self) -> Result<PgPool, String> {
        database::connect(&self.database_url)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))
    }
}
