//! Authenticated API client used by extension surfaces.

use std::{sync::Arc, time::Duration};

use reqwest::{Method, StatusCode, header::RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    channel::{RuntimeBus, RuntimeEvent},
    errors::BridgeError,
    machine::{HandshakeMachine, ResetCause},
    storage::ExtensionStorage,
    worker::WorkerHandle,
};

const REMAINING_HEADER: &str = "x-ratelimit-remaining";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityBody {
    user_id: Uuid,
}

#[derive(Debug, Serialize)]
struct ReplyBody<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ReplyResponseBody {
    reply: String,
}

/// Generated reply plus what is left of the caller's quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReply {
    pub reply: String,
    pub remaining: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout: Duration,

    /// Upper bound for one background re-sync.
    pub resync_timeout: Duration,
}

/// Attaches the stored bearer credential to every call.
///
/// A 401 clears both storage areas and drops the handshake to
/// `Disconnected`. One silent re-sync through the background worker is
/// attempted per call; if the retried call is rejected again the caller gets
/// [`BridgeError::ReconnectRequired`]. After [`ApiClient::disconnect`] no
/// re-sync happens until the user connects again.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: ApiClientConfig,
    storage: Arc<dyn ExtensionStorage>,
    machine: Arc<HandshakeMachine>,
    runtime: RuntimeBus,
    worker: WorkerHandle,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`BridgeError::Http`] when the HTTP client cannot be built.
    pub fn new(
        mut config: ApiClientConfig,
        storage: Arc<dyn ExtensionStorage>,
        machine: Arc<HandshakeMachine>,
        runtime: RuntimeBus,
        worker: WorkerHandle,
    ) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            config,
            storage,
            machine,
            runtime,
            worker,
        })
    }

    /// `GET /extension/me`
    ///
    /// # Errors
    ///
    /// See [`ApiClient`] for credential handling; other failures surface as
    /// [`BridgeError::Http`] or [`BridgeError::UnexpectedStatus`].
    pub async fn me(&self) -> Result<Uuid, BridgeError> {
        let response = self
            .authorized(Method::GET, "/extension/me", None::<&()>)
            .await?;

        let body: IdentityBody = expect_success(response)?.json().await?;

        Ok(body.user_id)
    }

    /// `POST /replies`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::RateLimited`] when the quota is used up, plus
    /// everything [`ApiClient::me`] can fail with.
    pub async fn generate_reply(
        &self,
        prompt: &str,
        context: Option<&str>,
    ) -> Result<GeneratedReply, BridgeError> {
        let response = self
            .authorized(Method::POST, "/replies", Some(&ReplyBody { prompt, context }))
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = header_number(&response, RETRY_AFTER.as_str()).unwrap_or(0);

            return Err(BridgeError::RateLimited { retry_after_secs });
        }

        let response = expect_success(response)?;
        let remaining = header_number(&response, REMAINING_HEADER)
            .and_then(|remaining| u32::try_from(remaining).ok());
        let body: ReplyResponseBody = response.json().await?;

        Ok(GeneratedReply {
            reply: body.reply,
            remaining,
        })
    }

    /// Forget the credential here and on the server.
    ///
    /// Local state is cleared first; the server call is best effort.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Storage`] when local state cannot be cleared.
    pub async fn disconnect(&self) -> Result<(), BridgeError> {
        let credential = self.storage.local().await?;

        self.storage.clear().await?;
        self.machine.reset(ResetCause::Revoked);
        self.runtime.publish(RuntimeEvent::Disconnected);

        let Some(credential) = credential else {
            return Ok(());
        };

        let revoked = self
            .client
            .delete(self.url("/extension/token"))
            .bearer_auth(&credential.token)
            .send()
            .await;

        match revoked {
            Ok(response) if response.status().is_success() => {
                info!(user_id = %credential.user_id, "extension token revoked");
            }
            Ok(response) => warn!(status = %response.status(), "server did not revoke token"),
            Err(source) => warn!("failed to reach server to revoke token: {source}"),
        }

        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn authorized<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, BridgeError> {
        let mut resynced = false;

        loop {
            if let Some(credential) = self.storage.local().await? {
                let mut request = self
                    .client
                    .request(method.clone(), self.url(path))
                    .bearer_auth(&credential.token);

                if let Some(body) = body {
                    request = request.json(body);
                }

                let response = request.send().await?;

                if response.status() != StatusCode::UNAUTHORIZED {
                    return Ok(response);
                }

                self.expire().await?;
            }

            if resynced || self.machine.reset_cause() == Some(ResetCause::Revoked) {
                return Err(BridgeError::ReconnectRequired);
            }

            resynced = true;

            if let Err(source) = self.worker.resync(self.config.resync_timeout).await {
                warn!("silent re-sync failed: {source}");

                return Err(BridgeError::ReconnectRequired);
            }
        }
    }

    async fn expire(&self) -> Result<(), BridgeError> {
        warn!("credential rejected, clearing extension storage");

        self.storage.clear().await?;
        self.machine.reset(ResetCause::Expired);
        self.runtime.publish(RuntimeEvent::Disconnected);

        Ok(())
    }
}

fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, BridgeError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(BridgeError::UnexpectedStatus {
            status: response.status().as_u16(),
        })
    }
}

fn header_number(response: &reqwest::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}
