//! Server configuration module

use clap::Parser;

use crate::config::{
    auth::AuthConfig,
    cors::CorsConfig,
    db::DatabaseConfig,
    observability::{LoggingConfig, ObservabilityConfig},
    rate_limits::RateLimitsConfig,
    server::ServerRuntimeConfig,
    upstream::UpstreamConfig,
};

pub(crate) mod auth;
pub(crate) mod cors;
pub(crate) mod db;
pub(crate) mod observability;
pub(crate) mod rate_limits;
pub(crate) mod server;
pub(crate) mod upstream;

/// Replygate JSON API Server configuration
#[derive(Debug, Parser)]
#[command(name = "replygate-json", about = "Replygate JSON API Server", long_about = None)]
pub struct ServerConfig {
    /// Server network settings.
    #[command(flatten)]
    pub server: ServerRuntimeConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Observability (traces/metrics) settings.
    #[command(flatten)]
    pub observability: ObservabilityConfig,

    /// Shared store settings.
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Credential issuance settings.
    #[command(flatten)]
    pub auth: AuthConfig,

    /// Request quotas.
    #[command(flatten)]
    pub rate_limits: RateLimitsConfig,

    /// Cross-origin allow-list.
    #[command(flatten)]
    pub cors: CorsConfig,

    /// Completion service settings.
    #[command(flatten)]
    pub upstream: UpstreamConfig,
}

impl ServerConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }
}
