//! HTTP transport: a JSON lead-search endpoint and a health check.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lead_search::{
    CacheReport, GoogleConnector, LeadAggregator, LeadRecord, PaginationCache, SearchError,
    SearchOptions,
};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServiceConfig;

#[derive(Clone)]
struct AppState {
    aggregator: Arc<LeadAggregator>,
}

/// Body of `POST /api/lead-search`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeadSearchRequest {
    pub query: String,
    pub use_cache: Option<bool>,
    pub continue_from_cache: Option<bool>,
    pub page_size: Option<usize>,
}

impl LeadSearchRequest {
    fn options(&self, default_page_size: usize) -> SearchOptions {
        let defaults = SearchOptions::default();
        SearchOptions {
            use_cache: self.use_cache.unwrap_or(defaults.use_cache),
            continue_from_cache: self
                .continue_from_cache
                .unwrap_or(defaults.continue_from_cache),
            page_size: self.page_size.unwrap_or(default_page_size),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadSearchResponse {
    success: bool,
    results: Vec<LeadRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    cache: CacheReport,
    from_cache: bool,
}

/// Build the aggregator described by `config`.
///
/// Google is registered only when credentials are present. Other enabled
/// sources have no connector and are reported per request.
///
/// # Errors
///
/// Returns an error if the search section is invalid or the HTTP client
/// cannot be built.
pub fn build_aggregator(config: &ServiceConfig) -> crate::Result<LeadAggregator> {
    let cache = PaginationCache::new(config.search.cache_ttl(), config.search.max_cache_entries);
    let mut aggregator = LeadAggregator::new(config.search.clone(), cache)?;

    match config.google.credentials() {
        Some((api_key, cse_id)) => {
            let mut google = GoogleConnector::new(api_key, cse_id, &config.search)?;
            if let Some(base_url) = &config.google.base_url {
                google = google.with_base_url(base_url.clone());
            }
            aggregator = aggregator.with_connector(google);
            tracing::info!("Google connector registered");
        }
        None => tracing::warn!("Google credentials missing, Google source disabled"),
    }

    Ok(aggregator)
}

/// Router with CORS open to any origin.
pub fn router(aggregator: Arc<LeadAggregator>) -> Router {
    let routes = Router::new()
        .route("/health", get(health))
        .route("/api/lead-search", post(lead_search))
        .with_state(AppState { aggregator });
    layered(routes)
}

/// Shared middleware: a panicking handler answers with the JSON 500 body.
fn layered(routes: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
}

/// Bind the configured address and serve until the process exits.
pub async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let aggregator = Arc::new(build_aggregator(&config)?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!("lead search listening on http://{local_addr}");
    axum::serve(listener, router(aggregator)).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn lead_search(
    State(state): State<AppState>,
    payload: Result<Json<LeadSearchRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return bad_request(format!("invalid request body: {}", rejection.body_text()));
        }
    };

    let options = request.options(state.aggregator.config().default_page_size);
    match state.aggregator.search(&request.query, options).await {
        Ok(result) => {
            tracing::debug!(
                count = result.results.len(),
                errors = result.errors.len(),
                from_cache = result.from_cache,
                "lead search served"
            );
            let body = LeadSearchResponse {
                success: true,
                results: result.results,
                errors: result.errors,
                cache: result.cache,
                from_cache: result.from_cache,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_response(&err),
    }
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}

fn handle_panic(payload: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    };
    error_response(&SearchError::Internal(format!("handler panicked: {detail}")))
}

fn error_response(err: &SearchError) -> Response {
    if err.is_client_error() {
        return bad_request(err.to_string());
    }
    tracing::error!(error = %err, "lead search failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "success": false,
            "message": "lead search failed",
            "error": err.to_string(),
        })),
    )
        .into_response()
}
