use thiserror::Error;

/// Unified API error type.
///
/// Handlers answer with the status from [`ApiError::status_code`] and the
/// message as a plain-text body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m) | Self::Internal(m) => m,
        }
    }
}

impl From<crate::types::MediaIdError> for ApiError {
    fn from(e: crate::types::MediaIdError) -> Self {
        Self::BadRequest(e.to_string())
    }
}
