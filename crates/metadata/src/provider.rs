use mex_core::{Details, SearchResult};

use crate::ProviderError;

pub(crate) const IMDB_TITLE_URL: &str = "https://www.imdb.com/title/";

/// A metadata provider that can search and fetch details.
///
/// Implementations own their authentication state and translate the
/// provider's wire format into the canonical model.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short name used as the `MediaId` prefix ("tmdb", "tvdb").
    fn name(&self) -> &str;

    /// Establish credentials. Called once at startup, before any other call.
    async fn login(&self, api_key: &str) -> Result<(), ProviderError>;

    /// Search by name and append normalised hits to `results`.
    ///
    /// On error `results` may hold a partial batch and must be discarded.
    async fn search(&self, name: &str, results: &mut Vec<SearchResult>)
    -> Result<(), ProviderError>;

    /// Full details for one item by the provider's own id.
    async fn details(&self, native_id: u64) -> Result<Details, ProviderError>;
}
