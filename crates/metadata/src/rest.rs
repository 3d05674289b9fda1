//! Fluent builder for outbound REST calls.
//!
//! Configuration steps never fail on the spot. The first invalid step is
//! remembered, every later step becomes a no-op, and the error is reported
//! when the request is executed. This lets call sites chain freely:
//!
//! ```no_run
//! # async fn demo(client: &reqwest::Client) -> Result<(), mex_metadata::rest::RestError> {
//! use mex_metadata::rest::RestRequest;
//!
//! let reply: serde_json::Value = RestRequest::new(client)
//!     .add_query("api_key", "secret")
//!     .add_query("query", "Alita")
//!     .get_json("https://api.themoviedb.org/3/search/movie")
//!     .await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// Query parameters whose values never show up in logs.
const REDACTED_PARAMS: &[&str] = &["api_key", "apikey"];

#[derive(Error, Debug)]
pub enum RestError {
    #[error("rest: {0}")]
    InvalidArgument(String),
    #[error("rest: invalid url {0}")]
    InvalidUrl(String),
    /// Connection, timeout or body read failure. The request URL is
    /// stripped since it may carry an API key.
    #[error("rest: transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// Non-2xx reply. The response is kept so callers can inspect it.
    #[error("{} returned {}", redact(.0.url()), .0.status())]
    Status(Box<reqwest::Response>),
    #[error("rest: failed to decode reply: {0}")]
    Decode(String),
}

impl RestError {
    /// HTTP status of a non-2xx reply.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(response) => Some(response.status()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

impl From<reqwest::Error> for RestError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.without_url())
    }
}

/// An outbound REST call under construction.
#[derive(Debug)]
pub struct RestRequest {
    client: reqwest::Client,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    error: Option<RestError>,
}

impl RestRequest {
    pub fn new(client: &reqwest::Client) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            client: client.clone(),
            headers,
            query: Vec::new(),
            body: None,
            error: None,
        }
    }

    /// Appends a query parameter. Both key and value must be non-empty.
    pub fn add_query(mut self, key: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        if key.is_empty() {
            return self.fail("query key must be provided");
        }
        if value.is_empty() {
            return self.fail(format!("query value must be provided for '{key}'"));
        }

        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn set_bearer_auth(mut self, token: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        if token.is_empty() {
            return self.fail("token must be provided");
        }

        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
                self
            }
            Err(_) => self.fail("token contains characters not allowed in a header"),
        }
    }

    /// Serialises `body` as the JSON request body. Values that serialise to
    /// `null` are rejected.
    pub fn set_body<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        if self.error.is_some() {
            return self;
        }

        let value = match serde_json::to_value(body) {
            Ok(serde_json::Value::Null) => return self.fail("body must be provided"),
            Ok(value) => value,
            Err(e) => return self.fail(format!("failed to serialise body: {e}")),
        };
        match serde_json::to_vec(&value) {
            Ok(bytes) => {
                self.body = Some(bytes);
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                self
            }
            Err(e) => self.fail(format!("failed to serialise body: {e}")),
        }
    }

    pub async fn get(self, url: &str) -> Result<reqwest::Response, RestError> {
        self.execute(Method::GET, url).await
    }

    pub async fn post(self, url: &str) -> Result<reqwest::Response, RestError> {
        self.execute(Method::POST, url).await
    }

    /// GET and deserialise a 2xx reply into `T`.
    pub async fn get_json<T: DeserializeOwned>(self, url: &str) -> Result<T, RestError> {
        decode(self.execute(Method::GET, url).await?).await
    }

    /// POST and deserialise a 2xx reply into `T`.
    pub async fn post_json<T: DeserializeOwned>(self, url: &str) -> Result<T, RestError> {
        decode(self.execute(Method::POST, url).await?).await
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        self.error = Some(RestError::InvalidArgument(message.into()));
        self
    }

    async fn execute(self, method: Method, raw_url: &str) -> Result<reqwest::Response, RestError> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut url =
            Url::parse(raw_url).map_err(|e| RestError::InvalidUrl(format!("{raw_url}: {e}")))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        debug!(method = %method, url = %redact(&url), "calling REST service");

        let mut request = self.client.request(method, url).headers(self.headers);
        if let Some(body) = self.body {
            request = request.body(body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RestError::Status(Box::new(response)));
        }

        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RestError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| RestError::Decode(e.to_string()))
}

fn redact(url: &Url) -> String {
    if !url
        .query_pairs()
        .any(|(k, _)| REDACTED_PARAMS.contains(&&*k))
    {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if REDACTED_PARAMS.contains(&&*k) {
                (k.into_owned(), "***".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(&pairs);
    redacted.to_string()
}
