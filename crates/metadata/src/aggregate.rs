//! Fan-out of one logical query across every registered provider.

use std::sync::Arc;

use mex_core::{Details, MediaId, SearchResult};
use tracing::{debug, warn};

use crate::{MetadataProvider, ProviderError};

/// Registered providers in a fixed order. Search results are returned in
/// that order; details requests go to exactly one provider.
#[derive(Clone, Default)]
pub struct Aggregator {
    providers: Vec<Arc<dyn MetadataProvider>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn provider(&self, name: &str) -> Option<&Arc<dyn MetadataProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Search every provider in registration order.
    ///
    /// Providers run one after another. The first failure aborts the whole
    /// search and the partially filled batch is dropped.
    pub async fn search(&self, name: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let mut results = Vec::new();
        for provider in &self.providers {
            let before = results.len();
            provider.search(name, &mut results).await?;
            debug!(
                provider = provider.name(),
                hits = results.len() - before,
                "provider search finished"
            );
        }
        Ok(results)
    }

    /// Route a details request to the provider named in `id`.
    pub async fn details(&self, id: &MediaId) -> Result<Details, ProviderError> {
        let Some(provider) = self.provider(&id.provider) else {
            warn!(provider = %id.provider, "details requested for unknown provider");
            return Err(ProviderError::UnknownProvider(id.provider.clone()));
        };
        provider.details(id.native_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use mex_core::MediaType;

    /// Provider that returns canned hits or a canned failure.
    struct StubProvider {
        name: &'static str,
        hits: Vec<&'static str>,
        fail: bool,
        calls: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn new(name: &'static str, hits: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                name,
                hits,
                fail: false,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                hits: Vec::new(),
                fail: true,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl MetadataProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn login(&self, _api_key: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn search(
            &self,
            name: &str,
            results: &mut Vec<SearchResult>,
        ) -> Result<(), ProviderError> {
            self.calls.lock().unwrap().push(format!("search:{name}"));
            for (i, title) in self.hits.iter().enumerate() {
                results.push(SearchResult {
                    id: format!("{}:{i}", self.name),
                    media_type: MediaType::Movie,
                    adult: false,
                    title: title.to_string(),
                    overview: String::new(),
                    poster_uri: "p".into(),
                    release_date: String::new(),
                });
            }
            if self.fail {
                return Err(ProviderError::Upstream(format!("{} is down", self.name)));
            }
            Ok(())
        }

        async fn details(&self, native_id: u64) -> Result<Details, ProviderError> {
            self.calls.lock().unwrap().push(format!("details:{native_id}"));
            Ok(Details::new(format!("{}:{native_id}", self.name), MediaType::Movie))
        }
    }

    #[tokio::test]
    async fn search_keeps_registration_order() {
        let first = StubProvider::new("tmdb", vec!["a", "b"]);
        let second = StubProvider::new("tvdb", vec!["c"]);
        let aggregator = Aggregator::new().register(first.clone()).register(second.clone());

        let results = aggregator.search("x").await.unwrap();
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["a", "b", "c"]);
        assert_eq!(aggregator.provider_names(), ["tmdb", "tvdb"]);
    }

    #[tokio::test]
    async fn first_failure_aborts_and_discards_partial_results() {
        let first = StubProvider::failing("tmdb");
        let second = StubProvider::new("tvdb", vec!["c"]);
        let aggregator = Aggregator::new().register(first.clone()).register(second.clone());

        let err = aggregator.search("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Upstream(m) if m == "tmdb is down"));
        assert!(second.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn details_routes_to_one_provider() {
        let first = StubProvider::new("tmdb", vec![]);
        let second = StubProvider::new("tvdb", vec![]);
        let aggregator = Aggregator::new().register(first.clone()).register(second.clone());

        let d = aggregator.details(&MediaId::new("tvdb", 42)).await.unwrap();
        assert_eq!(d.id, "tvdb:42");
        assert!(first.calls.lock().unwrap().is_empty());
        assert_eq!(*second.calls.lock().unwrap(), ["details:42"]);
    }

    #[tokio::test]
    async fn unknown_provider_is_its_own_error() {
        let aggregator = Aggregator::new().register(StubProvider::new("tmdb", vec![]));
        let err = aggregator
            .details(&MediaId::new("imdb", 1))
            .await
            .unwrap_err();
        assert!(err.is_caller_error());
        assert!(matches!(err, ProviderError::UnknownProvider(p) if p == "imdb"));
    }
}
