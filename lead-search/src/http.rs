//! Shared HTTP client for source connectors.
//!
//! Provides a configured [`reqwest::Client`] with the aggregator's request
//! timeout and User-Agent applied.

use std::time::Duration;

use crate::config::AggregatorConfig;
use crate::error::SearchError;

/// User-Agent sent when the config does not override it.
pub const DEFAULT_USER_AGENT: &str = concat!("lead-search/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] configured for provider requests.
///
/// The client has:
/// - Per-request timeout from `request_timeout_seconds`
/// - The configured User-Agent, or [`DEFAULT_USER_AGENT`]
/// - Brotli and gzip decompression
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &AggregatorConfig) -> Result<reqwest::Client, SearchError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}
