//! Handshake transfer object.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Freshly minted credential on its way from the page into extension storage.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub token: String,
    pub user_id: Uuid,
}

impl fmt::Debug for TransferPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferPayload")
            .field("token", &"**redacted**")
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_token() {
        let payload = TransferPayload {
            token: "secret-token-value".to_string(),
            user_id: Uuid::nil(),
        };

        let rendered = format!("{payload:?}");

        assert!(!rendered.contains("secret-token-value"), "token leaked: {rendered}");
        assert!(rendered.contains("redacted"), "missing marker: {rendered}");
    }

    #[test]
    fn wire_format_is_camel_case() -> Result<(), serde_json::Error> {
        let payload: TransferPayload = serde_json::from_str(
            r#"{"token":"abc","userId":"00000000-0000-0000-0000-000000000000"}"#,
        )?;

        assert_eq!(payload.user_id, Uuid::nil());

        Ok(())
    }
}
