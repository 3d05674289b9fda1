use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use mex_core::error::ApiError;
use mex_core::{Details, MediaId, SearchResult};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Upstream headers that describe the upstream connection, not the payload.
fn is_hop_by_hop(name: &header::HeaderName) -> bool {
    [
        header::CONNECTION,
        header::TRANSFER_ENCODING,
        header::CONTENT_LENGTH,
    ]
    .contains(name)
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api", api_router());

    if let Some(dir) = &state.ui_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET]),
                ),
        )
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/details", get(details))
        .route("/proxy", get(proxy))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    providers: Vec<String>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        providers: state
            .aggregator
            .provider_names()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let Some(name) = query.q.filter(|q| !q.is_empty()) else {
        warn!("search: `q` query parameter is empty");
        return Err(ApiError::BadRequest("`q` query parameter is required".into()).into());
    };

    info!(name = %name, "search");
    let results = state.aggregator.search(&name).await?;
    Ok(Json(results))
}

// ---------------------------------------------------------------------------
// Details
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DetailsQuery {
    id: Option<String>,
}

async fn details(
    State(state): State<AppState>,
    Query(query): Query<DetailsQuery>,
) -> Result<Json<Details>, AppError> {
    let Some(raw) = query.id.filter(|id| !id.is_empty()) else {
        warn!("details: `id` query parameter is empty");
        return Err(ApiError::BadRequest("`id` query parameter is required".into()).into());
    };

    let id = raw.parse::<MediaId>().map_err(|e| {
        warn!(id = %raw, error = %e, "details: malformed id");
        ApiError::from(e)
    })?;

    info!(id = %id, "details");
    let details = state.aggregator.details(&id).await?;
    Ok(Json(details))
}

// ---------------------------------------------------------------------------
// Image proxy
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProxyQuery {
    url: Option<String>,
}

/// Fetch `url` and relay status, headers and body. Only URLs under one of
/// the configured provider image locations are fetched.
///
/// Some providers refuse to serve images to browsers based on the referrer,
/// so poster URIs are routed through here.
async fn proxy(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> Result<Response, AppError> {
    let Some(url) = query.url.filter(|u| !u.is_empty()) else {
        warn!("proxy: `url` query parameter is empty");
        return Err(ApiError::BadRequest("`url` query parameter is required".into()).into());
    };
    let target = match reqwest::Url::parse(&url) {
        Ok(target) if matches!(target.scheme(), "http" | "https") => target,
        _ => {
            warn!(url = %url, "proxy: not an http(s) URL");
            return Err(ApiError::BadRequest("`url` must be an http(s) URL".into()).into());
        }
    };
    // Compared after parsing so `..` segments cannot escape an allowed prefix.
    if !state
        .proxy_targets
        .iter()
        .any(|prefix| target.as_str().starts_with(prefix.as_str()))
    {
        warn!(url = %target, "proxy: target not allowed");
        return Err(ApiError::BadRequest("`url` is not a known image location".into()).into());
    }

    info!(url = %target, "proxy");
    let upstream = state.http.get(target).send().await.map_err(|e| {
        error!(url = %url, error = %e, "proxy: request failed");
        ApiError::Internal(format!("proxy request failed: {e}"))
    })?;

    let status = upstream.status();
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    let body = upstream.bytes().await.map_err(|e| {
        error!(url = %url, error = %e, "proxy: error reading response");
        ApiError::Internal(format!("proxy read failed: {e}"))
    })?;

    Ok((status, headers, body).into_response())
}
