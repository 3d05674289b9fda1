use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use mex_metadata::tmdb::{self, TmdbClient};
use mex_metadata::tvdb::{self, TvdbClient};
use mex_metadata::{Aggregator, CredentialStore, ImageProxy, MetadataProvider};
use tracing::info;

use crate::config::ServerConfig;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    /// Client for the image proxy; providers hold their own clones.
    pub http: reqwest::Client,
    /// URL prefixes the image proxy is allowed to fetch.
    pub proxy_targets: Arc<[String]>,
    /// Static UI served for unmatched paths, if any.
    pub ui_dir: Option<PathBuf>,
}

impl AppState {
    /// Build provider clients, log each one in, and register them in
    /// search order (TMDB, then TVDB).
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed to build HTTP client")?;

        let proxy = ImageProxy::new(&config.public_url).map_err(anyhow::Error::msg)?;

        let tmdb = Arc::new(TmdbClient::new(http.clone(), CredentialStore::new()));
        tmdb.login(&config.tmdb_api_key)
            .await
            .context("TMDB authentication error")?;

        let tvdb = Arc::new(TvdbClient::new(http.clone(), CredentialStore::new(), proxy));
        tvdb.login(&config.tvdb_api_key)
            .await
            .context("TVDB authentication error")?;

        let aggregator = Aggregator::new().register(tmdb).register(tvdb);
        info!(providers = ?aggregator.provider_names(), "providers ready");

        let ui_dir = config.ui_dir.is_dir().then(|| config.ui_dir.clone());
        if ui_dir.is_none() {
            info!(ui_dir = %config.ui_dir.display(), "UI directory not found, static files disabled");
        }

        Ok(Self {
            aggregator: Arc::new(aggregator),
            http,
            proxy_targets: vec![tvdb::IMAGE_BASE.to_string(), tmdb::IMAGE_BASE.to_string()].into(),
            ui_dir,
        })
    }
}
