//! Extension Identity Handler

use salvo::prelude::*;

use crate::{errors::ApiError, extension::IdentityResponse, extensions::*};

/// Extension Identity Handler
///
/// Reports the user behind the presented bearer token.
#[endpoint(
    tags("extension"),
    summary = "Resolve extension identity",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Identity resolved"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<IdentityResponse>, ApiError> {
    let user = depot.user_uuid_or_401()?;

    Ok(Json(IdentityResponse {
        user_id: user.into_uuid(),
    }))
}
