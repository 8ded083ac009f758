//! Extension credential endpoints

mod errors;
pub(crate) mod issue;
pub(crate) mod me;
pub(crate) mod revoke;

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity resolved from a credential.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IdentityResponse {
    pub user_id: Uuid,
}
