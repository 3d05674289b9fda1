use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

const DEFAULT_BIND: &str = "0.0.0.0:9000";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:9000";
const DEFAULT_UI_DIR: &str = "ui/dist/mex";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Process configuration, read from `MEX_*` environment variables.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub tmdb_api_key: String,
    pub tvdb_api_key: String,
    /// Externally visible base URL; proxied poster URIs point here.
    pub public_url: String,
    pub ui_dir: PathBuf,
    /// Deadline for every outbound provider call.
    pub http_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let http_timeout = match get("MEX_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("MEX_HTTP_TIMEOUT_SECS is not a number: {raw}"))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        if http_timeout == 0 {
            bail!("MEX_HTTP_TIMEOUT_SECS must be greater than zero");
        }

        let public_url = get("MEX_PUBLIC_URL").unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());
        reqwest::Url::parse(&public_url)
            .with_context(|| format!("MEX_PUBLIC_URL is not a valid URL: {public_url}"))?;

        Ok(Self {
            bind: get("MEX_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            tmdb_api_key: required("MEX_TMDB_KEY")?,
            tvdb_api_key: required("MEX_TVDB_KEY")?,
            public_url: public_url.trim_end_matches('/').to_string(),
            ui_dir: get("MEX_UI_DIR")
                .unwrap_or_else(|| DEFAULT_UI_DIR.to_string())
                .into(),
            http_timeout: Duration::from_secs(http_timeout),
        })
    }
}
