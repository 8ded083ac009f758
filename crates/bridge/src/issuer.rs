//! Token issuance over the network with the ambient web session.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use mockall::automock;
use reqwest::{StatusCode, header::COOKIE};
use tracing::debug;

use crate::{errors::BridgeError, payload::TransferPayload};

/// Source of freshly minted credentials.
#[automock]
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn issue(&self) -> Result<TransferPayload, BridgeError>;
}

#[derive(Clone)]
pub struct HttpSessionIssuerConfig {
    pub base_url: String,
    pub cookie_name: String,
    pub session: String,
    pub timeout: Duration,
}

impl fmt::Debug for HttpSessionIssuerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSessionIssuerConfig")
            .field("base_url", &self.base_url)
            .field("cookie_name", &self.cookie_name)
            .field("session", &"**redacted**")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `POST /extension/token` carrying the web session cookie.
#[derive(Debug, Clone)]
pub struct HttpSessionIssuer {
    client: reqwest::Client,
    config: HttpSessionIssuerConfig,
}

impl HttpSessionIssuer {
    /// # Errors
    ///
    /// Returns [`BridgeError::Http`] when the HTTP client cannot be built.
    pub fn new(mut config: HttpSessionIssuerConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self { client, config })
    }
}

#[async_trait]
impl SessionIssuer for HttpSessionIssuer {
    async fn issue(&self) -> Result<TransferPayload, BridgeError> {
        let response = self
            .client
            .post(format!("{}/extension/token", self.config.base_url))
            .header(
                COOKIE,
                format!("{}={}", self.config.cookie_name, self.config.session),
            )
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let payload: TransferPayload = response.json().await?;

                debug!(user_id = %payload.user_id, "token issued");

                Ok(payload)
            }
            StatusCode::UNAUTHORIZED => Err(BridgeError::Unauthenticated),
            status => Err(BridgeError::UnexpectedStatus {
                status: status.as_u16(),
            }),
        }
    }
}
