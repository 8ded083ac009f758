use std::{sync::Arc, time::Duration};

use clap::{Args, Subcommand};
use replygate_app::{
    clock::SystemClock,
    rate_limits::{RateLimitService, WindowRateLimitService},
};

use super::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct RateLimitsCommand {
    #[command(subcommand)]
    command: RateLimitsSubcommand,
}

#[derive(Debug, Subcommand)]
enum RateLimitsSubcommand {
    /// Delete counters for windows that are long over
    Prune(PruneArgs),
}

#[derive(Debug, Args)]
struct PruneArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    /// Keep windows that started within this many milliseconds
    #[arg(long, default_value_t = 86_400_000)]
    older_than_ms: u64,
}

pub(crate) async fn run(command: RateLimitsCommand) -> Result<(), String> {
    match command.command {
        RateLimitsSubcommand::Prune(args) => {
            let service = WindowRateLimitService::new(
                args.database.connect().await?,
                Arc::new(SystemClock),
                Duration::from_secs(30),
            );

            let pruned = service
                .prune(args.older_than_ms)
                .await
                .map_err(|error| format!("failed to prune rate limits: {error}"))?;

            println!("pruned {pruned} rate limit window(s)");

            Ok(())
        }
    }
}
