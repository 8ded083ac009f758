use clap::{Args, Subcommand};
use replygate_app::database;

use super::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct DbCommand {
    #[command(subcommand)]
    command: DbSubcommand,
}

#[derive(Debug, Subcommand)]
enum DbSubcommand {
    /// Apply pending schema migrations
    Migrate(DatabaseArgs),
}

pub(crate) async fn run(command: DbCommand) -> Result<(), String> {
    match command.command {
        DbSubcommand::Migrate(args) => {
            let pool = args.connect().await?;

            database::migrate(&pool)
                .await
                .map_err(|error| format!("failed to run migrations: {error}"))?;

            println!("migrations applied");

            Ok(())
        }
    }
}
