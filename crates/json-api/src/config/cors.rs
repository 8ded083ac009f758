//! CORS Config

use clap::Args;

/// Cross-origin allow-list.
#[derive(Debug, Args)]
pub struct CorsConfig {
    /// Production dashboard origin
    #[arg(long, env = "DASHBOARD_ORIGIN", default_value = "https://app.replygate.com")]
    pub dashboard_origin: String,

    /// Scheme prefix shared by extension origins
    #[arg(
        long,
        env = "EXTENSION_ORIGIN_PREFIX",
        default_value = "chrome-extension://"
    )]
    pub extension_origin_prefix: String,

    /// Local development origin
    #[arg(long, env = "DEV_ORIGIN", default_value = "http://localhost:3000")]
    pub dev_origin: String,

    /// Admit the development origin
    #[arg(long, env = "ALLOW_DEV_ORIGIN", default_value_t = cfg!(debug_assertions))]
    pub allow_dev_origin: bool,
}

impl CorsConfig {
    /// Allow-list in precedence order. The first entry doubles as the fallback origin.
    #[must_use]
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![
            self.dashboard_origin.clone(),
            self.extension_origin_prefix.clone(),
        ];

        if self.allow_dev_origin {
            origins.push(self.dev_origin.clone());
        }

        origins
    }
}
