//! Auth Config

use clap::Args;
use jiff::SignedDuration;

/// Credential issuance settings.
#[derive(Debug, Args)]
pub struct AuthConfig {
    /// Name of the first-party session cookie
    #[arg(long, env = "SESSION_COOKIE_NAME", default_value = "session")]
    pub session_cookie_name: String,

    /// Lifetime of an extension credential, in days
    #[arg(long, env = "TOKEN_TTL_DAYS", default_value_t = 90_u32)]
    pub token_ttl_days: u32,
}

impl AuthConfig {
    /// Credential lifetime.
    #[must_use]
    pub fn token_ttl(&self) -> SignedDuration {
        SignedDuration::from_hours(i64::from(self.token_ttl_days) * 24)
    }
}
