//! Upstream Config

use std::time::Duration;

use clap::Args;
use replygate_app::replies::ReplyGeneratorConfig;

/// Completion service settings.
#[derive(Debug, Args)]
pub struct UpstreamConfig {
    /// Completion endpoint replies are forwarded to
    #[arg(
        long,
        env = "COMPLETIONS_URL",
        default_value = "http://localhost:8700/v1/replies"
    )]
    pub completions_url: String,

    /// Bearer key for the completion service
    #[arg(long, env = "COMPLETIONS_API_KEY", hide_env_values = true)]
    pub completions_api_key: Option<String>,

    /// Completion call timeout, in milliseconds
    #[arg(long, env = "COMPLETIONS_TIMEOUT_MS", default_value_t = 30_000_u64)]
    pub completions_timeout_ms: u64,
}

impl UpstreamConfig {
    #[must_use]
    pub fn generator_config(&self) -> ReplyGeneratorConfig {
        ReplyGeneratorConfig {
            url: self.completions_url.clone(),
            api_key: self.completions_api_key.clone(),
            timeout: Duration::from_millis(self.completions_timeout_ms),
        }
    }
}
