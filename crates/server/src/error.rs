use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use mex_core::error::ApiError;
use mex_metadata::ProviderError;

/// Newtype wrapper so we can implement `IntoResponse` in this crate.
///
/// Errors are answered as plain text; they have already been logged where
/// they originated.
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.0.message().to_string(),
        )
            .into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        if e.is_caller_error() {
            Self(ApiError::BadRequest(e.to_string()))
        } else {
            Self(ApiError::Internal(e.to_string()))
        }
    }
}
