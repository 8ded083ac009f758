//! Bridge CLI

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use tracing::info;

use replygate_bridge::{
    Bridge, BridgeError, BridgeSettings,
    issuer::{HttpSessionIssuer, HttpSessionIssuerConfig},
    storage::FileStorage,
    transit::{DEFAULT_TRANSIT_PORT, LoopbackSlot},
};

#[derive(Debug, Parser)]
#[command(name = "replygate-bridge", about = "Connect this machine to Replygate", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    config: BridgeConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct BridgeConfig {
    /// Gateway base URL
    #[arg(long, env = "API_BASE_URL", default_value = "http://localhost:8698")]
    api_base_url: String,

    /// Value of the signed-in web session cookie
    #[arg(long, env = "SESSION_COOKIE", hide_env_values = true)]
    session_cookie: Option<String>,

    /// Name of the web session cookie
    #[arg(long, env = "SESSION_COOKIE_NAME", default_value = "session")]
    session_cookie_name: String,

    /// Directory holding `local.json` and `sync.json`
    #[arg(long, env = "BRIDGE_STORAGE_DIR", default_value = ".replygate")]
    storage_dir: PathBuf,

    /// Loopback port of the transit slot
    #[arg(long, env = "BRIDGE_TRANSIT_PORT", default_value_t = DEFAULT_TRANSIT_PORT)]
    transit_port: u16,

    /// Timeout for each HTTP call in milliseconds
    #[arg(long, env = "BRIDGE_HTTP_TIMEOUT_MS", default_value_t = 10_000)]
    http_timeout_ms: u64,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Trade the web session for an extension token and store it
    Connect,

    /// Show the stored connection and check it against the gateway
    Status,

    /// Forget the stored token here and on the server
    Disconnect,
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), BridgeError> {
        let bridge = self.config.bridge().await?;

        match self.command {
            Command::Connect => {
                let user_id = bridge.connect().await?;

                info!(%user_id, "connected");
            }
            Command::Status => match bridge.storage().synced().await? {
                Some(status) if status.connected => {
                    let user_id = bridge.api().me().await?;

                    info!(%user_id, "connected and accepted by the gateway");
                }
                _ => info!("not connected"),
            },
            Command::Disconnect => {
                bridge.api().disconnect().await?;

                info!("disconnected");
            }
        }

        Ok(())
    }
}

impl BridgeConfig {
    async fn bridge(self) -> Result<Bridge, BridgeError> {
        let timeout = Duration::from_millis(self.http_timeout_ms);

        let issuer = HttpSessionIssuer::new(HttpSessionIssuerConfig {
            base_url: self.api_base_url.clone(),
            cookie_name: self.session_cookie_name,
            session: self.session_cookie.unwrap_or_default(),
            timeout,
        })?;

        let storage = FileStorage::open(self.storage_dir).await?;

        let mut settings = BridgeSettings::new(self.api_base_url);
        settings.http_timeout = timeout;

        Bridge::start(
            Arc::new(issuer),
            Arc::new(LoopbackSlot::new(self.transit_port)),
            Arc::new(storage),
            settings,
        )
        .await
    }
}
