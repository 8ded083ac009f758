//! Database Config

use std::time::Duration;

use clap::Args;

/// Database settings.
#[derive(Debug, Args)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Upper bound for a single store call, in milliseconds
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 2_000_u64)]
    pub store_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Store call timeout as a [`Duration`].
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
