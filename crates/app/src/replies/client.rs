//! Completion service client.

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::{
    replies::{GenerationError, ReplyRequest, ReplyResponse},
    users::UserUuid,
};

/// Connection details for the completion service.
#[derive(Debug, Clone)]
pub struct ReplyGeneratorConfig {
    /// Endpoint that accepts a JSON reply request, e.g. `"http://localhost:8700/v1/replies"`.
    pub url: String,

    /// Bearer key sent upstream, when the service requires one.
    pub api_key: Option<String>,

    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpReplyGenerator {
    config: ReplyGeneratorConfig,
    http: Client,
}

impl HttpReplyGenerator {
    /// Create a client with the configured per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ReplyGeneratorConfig) -> Result<Self, GenerationError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, http })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamRequest<'a> {
    user_id: UserUuid,
    #[serde(flatten)]
    request: &'a ReplyRequest,
}

#[async_trait]
impl ReplyGenerator for HttpReplyGenerator {
    async fn generate(
        &self,
        user: UserUuid,
        request: &ReplyRequest,
    ) -> Result<ReplyResponse, GenerationError> {
        if request.prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        let mut call = self.http.post(&self.config.url).json(&UpstreamRequest {
            user_id: user,
            request,
        });

        if let Some(key) = &self.config.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();

            return Err(GenerationError::UnexpectedResponse { status, body });
        }

        let reply: ReplyResponse = response.json().await?;

        debug!(user = %user, chars = reply.reply.len(), "generated reply");

        Ok(reply)
    }
}

#[automock]
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Produce a reply on behalf of `user`.
    async fn generate(
        &self,
        user: UserUuid,
        request: &ReplyRequest,
    ) -> Result<ReplyResponse, GenerationError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn blank_prompts_are_rejected_before_any_request() -> TestResult {
        let generator = HttpReplyGenerator::new(ReplyGeneratorConfig {
            url: "http://127.0.0.1:9/unreachable".to_string(),
            api_key: None,
            timeout: Duration::from_millis(100),
        })?;

        let result = generator
            .generate(
                UserUuid::new(),
                &ReplyRequest {
                    prompt: "   ".to_string(),
                    context: None,
                    tone: Default::default(),
                },
            )
            .await;

        assert!(matches!(result, Err(GenerationError::EmptyPrompt)));

        Ok(())
    }

    #[test]
    fn upstream_body_carries_user_and_request_fields() -> TestResult {
        let user = UserUuid::new();
        let request = ReplyRequest {
            prompt: "thanks!".to_string(),
            context: Some("great post".to_string()),
            tone: crate::replies::Tone::Friendly,
        };

        let body = serde_json::to_value(UpstreamRequest {
            user_id: user,
            request: &request,
        })?;

        assert_eq!(body["userId"], serde_json::json!(user.to_string()));
        assert_eq!(body["prompt"], "thanks!");
        assert_eq!(body["context"], "great post");
        assert_eq!(body["tone"], "friendly");

        Ok(())
    }
}
