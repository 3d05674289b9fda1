//! TMDB (The Movie Database) provider client.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs
//! Authenticated by an `api_key` query parameter on every call.

use mex_core::{Details, MediaId, MediaType, SearchResult};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::provider::{IMDB_TITLE_URL, MetadataProvider};
use crate::rest::RestRequest;
use crate::{CredentialStore, MAX_PAGES, ProviderError};

pub const NAME: &str = "tmdb";

const BASE_URL: &str = "https://api.themoviedb.org/3";
pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w342";
const SITE_URL: &str = "https://www.themoviedb.org/movie";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchHit {
    id: u64,
    adult: bool,
    title: String,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchPage {
    page: u32,
    total_pages: u32,
    results: Vec<SearchHit>,
}

/// Subset of https://developer.themoviedb.org/reference/movie-details
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MovieDetails {
    id: u64,
    adult: bool,
    title: String,
    imdb_id: Option<String>,
    status: Option<String>,
    runtime: Option<u32>,
    homepage: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
}

pub struct TmdbClient {
    client: reqwest::Client,
    base_url: String,
    api_key: CredentialStore,
}

impl TmdbClient {
    pub fn new(client: reqwest::Client, api_key: CredentialStore) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            api_key,
        }
    }

    /// Point the client at a different API root (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn require_key(&self) -> Result<String, ProviderError> {
        match self.api_key.get().await {
            Some(key) => Ok(key),
            None => {
                error!("tmdb: must login with API key before use");
                Err(ProviderError::NotAuthenticated(NAME.into()))
            }
        }
    }

    fn request(&self, api_key: &str) -> RestRequest {
        RestRequest::new(&self.client).add_query("api_key", api_key)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbClient {
    fn name(&self) -> &str {
        NAME
    }

    async fn login(&self, api_key: &str) -> Result<(), ProviderError> {
        info!("tmdb: login");
        if api_key.is_empty() {
            error!("tmdb: empty API key");
            return Err(ProviderError::InvalidArgument(
                "tmdb: API key must be provided".into(),
            ));
        }

        self.api_key.set(api_key.to_string()).await;
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        results: &mut Vec<SearchResult>,
    ) -> Result<(), ProviderError> {
        let api_key = self.require_key().await?;
        if name.is_empty() {
            error!("tmdb: search name must be provided");
            return Err(ProviderError::InvalidArgument(
                "tmdb: name must be provided".into(),
            ));
        }

        info!(name, "tmdb: starting movie search");
        let url = format!("{}/search/movie", self.base_url);
        let mut page = 1;
        let mut fetched = 0;

        loop {
            let reply: SearchPage = self
                .request(&api_key)
                .add_query("page", &page.to_string())
                .add_query("query", name)
                .add_query("include_adult", "true")
                .get_json(&url)
                .await
                .map_err(|e| {
                    error!(page, error = %e, "tmdb: search page failed");
                    ProviderError::from(e)
                })?;
            fetched += 1;

            results.extend(reply.results.into_iter().filter_map(to_search_result));

            if reply.page >= reply.total_pages {
                break;
            }
            if fetched >= MAX_PAGES {
                warn!(
                    name,
                    total_pages = reply.total_pages,
                    "tmdb: page limit reached, stopping search"
                );
                break;
            }
            page = reply.page + 1;
        }

        Ok(())
    }

    async fn details(&self, native_id: u64) -> Result<Details, ProviderError> {
        let api_key = self.require_key().await?;
        info!(id = native_id, "tmdb: details");

        let url = format!("{}/movie/{native_id}", self.base_url);
        let reply: MovieDetails = self.request(&api_key).get_json(&url).await.map_err(|e| {
            if e.is_not_found() {
                warn!(id = native_id, "tmdb: no such movie");
                ProviderError::NotFound
            } else {
                error!(id = native_id, error = %e, "tmdb: details failed");
                ProviderError::from(e)
            }
        })?;

        Ok(build_details(reply))
    }
}

/// Hits without a poster are dropped rather than shown degraded.
fn to_search_result(hit: SearchHit) -> Option<SearchResult> {
    let poster = hit.poster_path.filter(|p| !p.is_empty())?;

    Some(SearchResult {
        id: MediaId::new(NAME, hit.id).to_string(),
        media_type: MediaType::Movie,
        adult: hit.adult,
        title: hit.title,
        overview: hit.overview.unwrap_or_default(),
        poster_uri: format!("{IMAGE_BASE}{poster}"),
        release_date: hit.release_date.unwrap_or_default(),
    })
}

fn build_details(reply: MovieDetails) -> Details {
    let mut d = Details::new(MediaId::new(NAME, reply.id).to_string(), MediaType::Movie);
    d.adult = reply.adult;
    d.title = reply.title;
    d.status = reply.status.unwrap_or_default();
    d.runtime = reply.runtime.unwrap_or(0);
    d.overview = reply.overview.unwrap_or_default();
    d.release_date = reply.release_date.unwrap_or_default();

    if let Some(poster) = reply.poster_path.filter(|p| !p.is_empty()) {
        d.poster_uri = format!("{IMAGE_BASE}{poster}");
    }

    // Fixed order: homepage, IMDB, then TMDB itself.
    if let Some(homepage) = reply.homepage.filter(|h| !h.is_empty()) {
        d.push_link("Homepage", homepage);
    }
    if let Some(imdb_id) = reply.imdb_id.filter(|i| !i.is_empty()) {
        d.push_link("IMDB", format!("{IMDB_TITLE_URL}{imdb_id}"));
    }
    d.push_link("TheMovieDB", format!("{SITE_URL}/{}", reply.id));

    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn logged_in(server: &MockServer) -> TmdbClient {
        let client = TmdbClient::new(reqwest::Client::new(), CredentialStore::new())
            .with_base_url(server.uri());
        client.login("test-key").await.unwrap();
        client
    }

    fn hit(id: u64, poster: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "adult": false,
            "title": format!("Movie {id}"),
            "overview": "An overview",
            "poster_path": poster,
            "release_date": "2019-01-31"
        })
    }

    async fn mount_page(server: &MockServer, page: u32, total: u32, hits: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("page", page.to_string()))
            .and(query_param("api_key", "test-key"))
            .and(query_param("query", "alita"))
            .and(query_param("include_adult", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": page,
                "total_pages": total,
                "total_results": 0,
                "results": hits
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn search_drains_every_page_in_order() {
        let server = MockServer::start().await;
        mount_page(&server, 1, 3, vec![hit(1, Some("/a.jpg")), hit(2, None)]).await;
        mount_page(&server, 2, 3, vec![hit(3, Some("/c.jpg"))]).await;
        mount_page(&server, 3, 3, vec![hit(4, Some("")), hit(5, Some("/e.jpg"))]).await;

        let client = logged_in(&server).await;
        let mut results = Vec::new();
        client.search("alita", &mut results).await.unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["tmdb:1", "tmdb:3", "tmdb:5"]);
        assert!(results.iter().all(|r| !r.poster_uri.is_empty()));
        assert_eq!(results[0].poster_uri, "https://image.tmdb.org/t/p/w342/a.jpg");
        assert_eq!(results[0].media_type, MediaType::Movie);
        assert_eq!(results[0].release_date, "2019-01-31");
    }

    #[tokio::test]
    async fn search_appends_to_existing_results() {
        let server = MockServer::start().await;
        mount_page(&server, 1, 1, vec![hit(9, Some("/i.jpg"))]).await;

        let client = logged_in(&server).await;
        let mut results = vec![SearchResult {
            id: "other:1".into(),
            media_type: MediaType::TvShow,
            adult: false,
            title: "Existing".into(),
            overview: String::new(),
            poster_uri: "x".into(),
            release_date: String::new(),
        }];
        client.search("alita", &mut results).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].id, "tmdb:9");
    }

    #[tokio::test]
    async fn failing_page_aborts_the_search() {
        let server = MockServer::start().await;
        mount_page(&server, 1, 2, vec![hit(1, Some("/a.jpg"))]).await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = logged_in(&server).await;
        let mut results = Vec::new();
        let err = client.search("alita", &mut results).await.unwrap_err();
        assert!(matches!(err, ProviderError::Upstream(_)));
    }

    #[tokio::test]
    async fn search_stops_at_page_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "total_pages": 10_000,
                "results": []
            })))
            .expect(u64::from(MAX_PAGES))
            .mount(&server)
            .await;

        let client = logged_in(&server).await;
        let mut results = Vec::new();
        client.search("alita", &mut results).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_requires_login_and_a_name() {
        let server = MockServer::start().await;
        let client = TmdbClient::new(reqwest::Client::new(), CredentialStore::new())
            .with_base_url(server.uri());

        let mut results = Vec::new();
        let err = client.search("alita", &mut results).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotAuthenticated(_)));

        client.login("test-key").await.unwrap();
        let err = client.search("", &mut results).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidArgument(_)));

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_rejects_empty_key() {
        let client = TmdbClient::new(reqwest::Client::new(), CredentialStore::new());
        assert!(matches!(
            client.login("").await,
            Err(ProviderError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn details_links_follow_fixed_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/299534"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 299534,
                "imdb_id": "tt0371746",
                "homepage": "http://x"
            })))
            .mount(&server)
            .await;

        let client = logged_in(&server).await;
        let d = client.details(299534).await.unwrap();

        let names: Vec<&str> = d.links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Homepage", "IMDB", "TheMovieDB"]);
        assert_eq!(d.links[0].url, "http://x");
        assert_eq!(d.links[1].url, "https://www.imdb.com/title/tt0371746");
        assert_eq!(d.links[2].url, "https://www.themoviedb.org/movie/299534");
        assert_eq!(d.id, "tmdb:299534");
        assert!(d.poster_uri.is_empty());
        assert!(d.episodes.is_empty());
    }

    #[tokio::test]
    async fn details_not_found_is_distinct_from_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{broken"))
            .mount(&server)
            .await;

        let client = logged_in(&server).await;
        assert!(matches!(
            client.details(1).await,
            Err(ProviderError::NotFound)
        ));
        assert!(matches!(
            client.details(2).await,
            Err(ProviderError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_api_does_not_leak_the_key() {
        let client = TmdbClient::new(reqwest::Client::new(), CredentialStore::new())
            .with_base_url("http://127.0.0.1:1");
        client.login("SUPERSECRETKEY").await.unwrap();

        let mut results = Vec::new();
        let err = client.search("x", &mut results).await.unwrap_err();
        assert!(matches!(err, ProviderError::Upstream(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));

        let err = client.details(1).await.unwrap_err();
        assert!(matches!(err, ProviderError::Upstream(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));
    }

    #[test]
    fn build_details_maps_fields() {
        let reply: MovieDetails = serde_json::from_value(json!({
            "id": 299534,
            "adult": false,
            "title": "Avengers: Endgame",
            "imdb_id": null,
            "status": "Released",
            "runtime": 181,
            "homepage": "",
            "overview": "After the devastating events...",
            "poster_path": "/or06FN3Dka5tukK1e9sl16pB3iy.jpg",
            "release_date": "2019-04-24"
        }))
        .unwrap();

        let d = build_details(reply);
        assert_eq!(d.title, "Avengers: Endgame");
        assert_eq!(d.runtime, 181);
        assert_eq!(d.status, "Released");
        assert_eq!(
            d.poster_uri,
            "https://image.tmdb.org/t/p/w342/or06FN3Dka5tukK1e9sl16pB3iy.jpg"
        );
        assert_eq!(d.links.len(), 1);
        assert_eq!(d.links[0].name, "TheMovieDB");
    }
}
