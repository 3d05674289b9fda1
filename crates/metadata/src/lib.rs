pub mod aggregate;
pub mod credentials;
pub mod image_proxy;
pub mod provider;
pub mod rest;
pub mod tmdb;
pub mod tvdb;

use thiserror::Error;

pub use aggregate::Aggregator;
pub use credentials::CredentialStore;
pub use image_proxy::ImageProxy;
pub use provider::MetadataProvider;

/// Upper bound on pages drained by any paginated provider call.
pub const MAX_PAGES: u32 = 50;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0}: login before using the API")]
    NotAuthenticated(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("not found")]
    NotFound,
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl ProviderError {
    /// True for errors caused by the caller's input rather than a provider.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::UnknownProvider(_))
    }
}

impl From<rest::RestError> for ProviderError {
    fn from(e: rest::RestError) -> Self {
        match e {
            rest::RestError::InvalidArgument(m) => Self::InvalidArgument(m),
            other => Self::Upstream(other.to_string()),
        }
    }
}
