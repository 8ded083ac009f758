//! Generate Reply Handler

use std::sync::Arc;

use replygate_app::replies::{ReplyRequest, Tone};
use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    errors::ApiError, extensions::*, quota::enforce, replies::errors::into_api_error, state::State,
};

/// Tone of the generated reply
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ReplyTone {
    #[default]
    Neutral,
    Friendly,
    Formal,
    Witty,
}

impl From<ReplyTone> for Tone {
    fn from(tone: ReplyTone) -> Self {
        match tone {
            ReplyTone::Neutral => Tone::Neutral,
            ReplyTone::Friendly => Tone::Friendly,
            ReplyTone::Formal => Tone::Formal,
            ReplyTone::Witty => Tone::Witty,
        }
    }
}

/// Generate Reply Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct GenerateReplyRequest {
    /// Message to reply to
    pub prompt: String,

    /// Surrounding conversation
    #[serde(default)]
    pub context: Option<String>,

    #[serde(default)]
    pub tone: ReplyTone,
}

impl From<GenerateReplyRequest> for ReplyRequest {
    fn from(request: GenerateReplyRequest) -> Self {
        ReplyRequest {
            prompt: request.prompt,
            context: request.context,
            tone: request.tone.into(),
        }
    }
}

/// Generated Reply Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct GenerateReplyResponse {
    pub reply: String,
}

/// Generate Reply Handler
///
/// Counts against the caller's generation quota before the body is read, so
/// malformed requests still use up quota.
#[endpoint(
    tags("replies"),
    summary = "Generate a reply",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Reply generated"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::TOO_MANY_REQUESTS, description = "Rate limited"),
        (status_code = StatusCode::BAD_GATEWAY, description = "Completion service failed"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<GenerateReplyResponse>, ApiError> {
    let user = depot.user_uuid_or_401()?;
    let state = depot.obtain_or_500::<Arc<State>>()?;

    enforce(
        state,
        &format!("generate:{user}"),
        state.settings.generate_policy,
        res,
    )
    .await?;

    let request = req
        .parse_json::<GenerateReplyRequest>()
        .await
        .map_err(|source| ApiError::bad_request(format!("Invalid request body: {source}")))?;

    let reply = state
        .app
        .replies
        .generate(user, &request.into())
        .await
        .map_err(into_api_error)?;

    Ok(Json(GenerateReplyResponse { reply: reply.reply }))
}
