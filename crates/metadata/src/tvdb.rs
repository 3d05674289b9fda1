//! TheTVDB provider client (API v2).
//!
//! Login trades the API key for a bearer token which is refreshed before
//! every operation. Posters and episodes need their own calls.

use mex_core::{Details, Episode, MediaId, MediaType, SearchResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::provider::{IMDB_TITLE_URL, MetadataProvider};
use crate::rest::RestRequest;
use crate::{CredentialStore, ImageProxy, MAX_PAGES, ProviderError};

pub const NAME: &str = "tvdb";

const BASE_URL: &str = "https://api.thetvdb.com";
pub const IMAGE_BASE: &str = "https://www.thetvdb.com/banners/";
const SERIES_URL: &str = "https://www.thetvdb.com/series/";
const ZAP2IT_URL: &str = "https://tvlistings.zap2it.com/overview.html?programSeriesId=";

#[derive(Serialize)]
struct TokenRequest<'a> {
    apikey: &'a str,
}

#[derive(Deserialize)]
struct TokenReply {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchReply {
    data: Option<Vec<SeriesHit>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SeriesHit {
    id: u64,
    series_name: Option<String>,
    overview: Option<String>,
    first_aired: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageReply {
    data: Option<Vec<Image>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Image {
    file_name: Option<String>,
    ratings_info: Option<RatingsInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RatingsInfo {
    average: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EpisodePage {
    links: Option<PageLinks>,
    data: Option<Vec<EpisodeRecord>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageLinks {
    next: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EpisodeRecord {
    absolute_number: Option<u32>,
    aired_episode_number: Option<u32>,
    aired_season: Option<u32>,
    episode_name: Option<String>,
    first_aired: Option<String>,
    overview: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeriesReply {
    data: SeriesRecord,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SeriesRecord {
    id: u64,
    /// Appended to https://www.thetvdb.com/series/
    slug: Option<String>,
    imdb_id: Option<String>,
    status: Option<String>,
    /// Minutes per episode, as a string.
    runtime: Option<String>,
    overview: Option<String>,
    zap2it_id: Option<String>,
    first_aired: Option<String>,
    series_name: Option<String>,
}

pub struct TvdbClient {
    client: reqwest::Client,
    base_url: String,
    token: CredentialStore,
    proxy: ImageProxy,
}

impl TvdbClient {
    pub fn new(client: reqwest::Client, token: CredentialStore, proxy: ImageProxy) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            token,
            proxy,
        }
    }

    /// Point the client at a different API root (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Exchange the current token for a fresh one and store it.
    ///
    /// Runs before every authenticated operation.
    pub async fn refresh(&self) -> Result<String, ProviderError> {
        let Some(current) = self.token.get().await else {
            error!("tvdb: login before using the API");
            return Err(ProviderError::NotAuthenticated(NAME.into()));
        };

        let reply: TokenReply = RestRequest::new(&self.client)
            .set_bearer_auth(&current)
            .get_json(&format!("{}/refresh_token", self.base_url))
            .await
            .map_err(|e| {
                error!(error = %e, "tvdb: token refresh failed");
                ProviderError::Upstream(format!("tvdb: token refresh failed: {e}"))
            })?;
        if reply.token.is_empty() {
            error!("tvdb: refresh returned an empty token");
            return Err(ProviderError::Upstream(
                "tvdb: refresh returned an empty token".into(),
            ));
        }

        self.token.set(reply.token.clone()).await;
        Ok(reply.token)
    }

    /// Proxied URL of the highest rated poster, or an empty string if the
    /// series has none.
    async fn poster_url(&self, token: &str, series_id: u64) -> Result<String, ProviderError> {
        let url = format!("{}/series/{series_id}/images/query", self.base_url);
        let reply: ImageReply = match RestRequest::new(&self.client)
            .set_bearer_auth(token)
            .add_query("keyType", "poster")
            .get_json(&url)
            .await
        {
            Ok(reply) => reply,
            Err(e) if e.is_not_found() => {
                debug!(series_id, "tvdb: no poster images");
                return Ok(String::new());
            }
            Err(e) => {
                error!(series_id, error = %e, "tvdb: poster lookup failed");
                return Err(e.into());
            }
        };

        Ok(best_poster(reply.data.unwrap_or_default())
            .map(|file| self.proxy.wrap(&format!("{IMAGE_BASE}{file}")))
            .unwrap_or_default())
    }

    /// Drain the paged episode listing by following the `next` cursor.
    async fn episodes(&self, token: &str, series_id: u64) -> Result<Vec<Episode>, ProviderError> {
        let url = format!("{}/series/{series_id}/episodes", self.base_url);
        let mut episodes = Vec::new();
        let mut page = 1;
        let mut fetched = 0;

        loop {
            let reply: EpisodePage = match RestRequest::new(&self.client)
                .set_bearer_auth(token)
                .add_query("page", &page.to_string())
                .get_json(&url)
                .await
            {
                Ok(reply) => reply,
                Err(e) if e.is_not_found() => {
                    debug!(series_id, page, "tvdb: no more episodes");
                    break;
                }
                Err(e) => {
                    error!(series_id, page, error = %e, "tvdb: episode page failed");
                    return Err(e.into());
                }
            };
            fetched += 1;

            episodes.extend(reply.data.unwrap_or_default().into_iter().map(to_episode));

            let Some(next) = reply.links.and_then(|l| l.next).filter(|n| *n > 0) else {
                break;
            };
            if fetched >= MAX_PAGES {
                warn!(series_id, next, "tvdb: page limit reached, stopping episode listing");
                break;
            }
            page = next;
        }

        Ok(episodes)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TvdbClient {
    fn name(&self) -> &str {
        NAME
    }

    async fn login(&self, api_key: &str) -> Result<(), ProviderError> {
        info!("tvdb: login");
        if api_key.is_empty() {
            error!("tvdb: empty API key");
            return Err(ProviderError::InvalidArgument(
                "tvdb: API key must be provided".into(),
            ));
        }

        let reply: TokenReply = RestRequest::new(&self.client)
            .set_body(&TokenRequest { apikey: api_key })
            .post_json(&format!("{}/login", self.base_url))
            .await
            .map_err(|e| {
                error!(error = %e, "tvdb: login failed");
                ProviderError::Auth(format!("tvdb: {e}"))
            })?;
        if reply.token.is_empty() {
            error!("tvdb: login returned an empty token");
            return Err(ProviderError::Auth("tvdb: login returned an empty token".into()));
        }

        self.token.set(reply.token).await;
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        results: &mut Vec<SearchResult>,
    ) -> Result<(), ProviderError> {
        info!(name, "tvdb: starting series search");
        if !self.token.is_set().await {
            error!("tvdb: login before using the API");
            return Err(ProviderError::NotAuthenticated(NAME.into()));
        }
        if name.is_empty() {
            error!("tvdb: search name must be provided");
            return Err(ProviderError::InvalidArgument(
                "tvdb: name must be provided".into(),
            ));
        }

        let token = self.refresh().await?;

        let reply: SearchReply = match RestRequest::new(&self.client)
            .set_bearer_auth(&token)
            .add_query("name", name)
            .get_json(&format!("{}/search/series", self.base_url))
            .await
        {
            Ok(reply) => reply,
            // TVDB answers 404 when nothing matches.
            Err(e) if e.is_not_found() => {
                debug!(name, "tvdb: no series found");
                return Ok(());
            }
            Err(e) => {
                error!(name, error = %e, "tvdb: search failed");
                return Err(e.into());
            }
        };

        for hit in reply.data.unwrap_or_default() {
            let poster_uri = self.poster_url(&token, hit.id).await?;
            if poster_uri.is_empty() {
                continue;
            }

            results.push(SearchResult {
                id: MediaId::new(NAME, hit.id).to_string(),
                media_type: MediaType::TvShow,
                adult: false,
                title: hit.series_name.unwrap_or_default(),
                overview: hit.overview.unwrap_or_default(),
                poster_uri,
                release_date: hit.first_aired.unwrap_or_default(),
            });
        }

        Ok(())
    }

    async fn details(&self, native_id: u64) -> Result<Details, ProviderError> {
        info!(id = native_id, "tvdb: details");
        let token = self.refresh().await?;

        let url = format!("{}/series/{native_id}", self.base_url);
        let reply: SeriesReply = RestRequest::new(&self.client)
            .set_bearer_auth(&token)
            .get_json(&url)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    warn!(id = native_id, "tvdb: no such series");
                    ProviderError::NotFound
                } else {
                    error!(id = native_id, error = %e, "tvdb: details failed");
                    ProviderError::from(e)
                }
            })?;

        let mut d = build_details(reply.data);
        d.poster_uri = self.poster_url(&token, native_id).await?;
        d.episodes = self.episodes(&token, native_id).await?;

        Ok(d)
    }
}

/// Highest average rating wins; ties keep the earliest candidate.
fn best_poster(images: Vec<Image>) -> Option<String> {
    let mut best: Option<(f64, String)> = None;

    for image in images {
        let Some(file) = image.file_name.filter(|f| !f.is_empty()) else {
            continue;
        };
        let rating = image
            .ratings_info
            .and_then(|r| r.average)
            .unwrap_or(0.0);

        match &best {
            Some((top, _)) if rating <= *top => {}
            _ => best = Some((rating, file)),
        }
    }

    best.map(|(_, file)| file)
}

fn to_episode(record: EpisodeRecord) -> Episode {
    Episode {
        name: record.episode_name.unwrap_or_default(),
        number: record.absolute_number.unwrap_or(0),
        season: record.aired_season.unwrap_or(0),
        air_date: record.first_aired.unwrap_or_default(),
        episode: record.aired_episode_number.unwrap_or(0),
        overview: record.overview.unwrap_or_default(),
    }
}

fn build_details(series: SeriesRecord) -> Details {
    let mut d = Details::new(MediaId::new(NAME, series.id).to_string(), MediaType::TvShow);
    d.title = series.series_name.unwrap_or_default();
    d.status = series.status.unwrap_or_default();
    d.overview = series.overview.unwrap_or_default();
    d.release_date = series.first_aired.unwrap_or_default();
    d.runtime = series
        .runtime
        .as_deref()
        .and_then(|r| r.trim().parse().ok())
        .unwrap_or(0);

    if let Some(imdb_id) = series.imdb_id.filter(|i| !i.is_empty()) {
        d.push_link("IMDB", format!("{IMDB_TITLE_URL}{imdb_id}"));
    }
    if let Some(zap2it_id) = series.zap2it_id.filter(|z| !z.is_empty()) {
        d.push_link("Zap2It", format!("{ZAP2IT_URL}{zap2it_id}"));
    }
    if let Some(slug) = series.slug.filter(|s| !s.is_empty()) {
        d.push_link("TheTVDB", format!("{SERIES_URL}{slug}"));
    }

    d
}
