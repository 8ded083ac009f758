//! Errors

use replygate_app::replies::GenerationError;
use tracing::error;

use crate::errors::ApiError;

pub(crate) fn into_api_error(error: GenerationError) -> ApiError {
    match error {
        GenerationError::EmptyPrompt => ApiError::bad_request("Prompt must not be empty"),
        GenerationError::Http(source) => {
            error!("completion request failed: {source}");

            ApiError::upstream()
        }
        GenerationError::UnexpectedResponse { status, body } => {
            error!(status, "completion service rejected request: {body}");

            ApiError::upstream()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::ErrorCode;

    use super::*;

    #[test]
    fn empty_prompt_is_the_callers_fault() {
        assert_eq!(
            into_api_error(GenerationError::EmptyPrompt).code(),
            ErrorCode::BadRequest
        );
    }

    #[test]
    fn upstream_failures_are_hidden() {
        let error = into_api_error(GenerationError::UnexpectedResponse {
            status: 500,
            body: "model overloaded".to_string(),
        });

        assert_eq!(error.code(), ErrorCode::UpstreamError);
    }
}
