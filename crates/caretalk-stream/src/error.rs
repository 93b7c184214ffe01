use caretalk_types::api::ApiErrorBody;
use thiserror::Error;

/// Backend error code for "does not exist".
const CODE_DOES_NOT_EXIST: i64 = 16;

#[derive(Debug, Error)]
pub enum StreamError {
    /// Transport-level failure (connect, TLS, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend rejected the call.
    #[error("backend error ({status}) code {code}: {message}")]
    Api { status: u16, code: i64, message: String },

    /// Auth token could not be minted.
    #[error("token minting failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StreamError {
    pub(crate) fn api(status: reqwest::StatusCode, body: ApiErrorBody) -> Self {
        StreamError::Api {
            status: status.as_u16(),
            code: body.code,
            message: body.message,
        }
    }

    /// True only when the backend explicitly reported the entity as missing.
    /// Transport failures and every other API error are not "not found";
    /// callers must escalate those instead of treating them as absence.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StreamError::Api { status: 404, .. }
                | StreamError::Api { code: CODE_DOES_NOT_EXIST, .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
