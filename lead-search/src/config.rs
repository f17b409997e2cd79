//! Aggregator configuration with sensible defaults.
//!
//! [`AggregatorConfig`] controls which sources are enabled and in what
//! order, deadlines, page ceilings and cache behaviour.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::types::LeadSource;

/// Configuration for the lead aggregator.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Enabled sources. Queried concurrently; merged in this order.
    pub sources: Vec<LeadSource>,
    /// Page size used when a request does not specify one.
    pub default_page_size: usize,
    /// How long a pagination cache entry stays valid after its last update.
    pub cache_ttl_seconds: u64,
    /// Upper bound on live cache entries before the oldest are evicted.
    pub max_cache_entries: u64,
    /// Overall deadline for a single connector call. A connector that has
    /// not settled by then is reported as a source-scoped timeout.
    pub source_timeout_seconds: u64,
    /// Ceiling on provider pages a connector fetches per call.
    pub max_pages_per_source: u32,
    /// Per-request HTTP timeout inside a connector.
    pub request_timeout_seconds: u64,
    /// Custom User-Agent string. If `None`, [`crate::http::DEFAULT_USER_AGENT`] is sent.
    pub user_agent: Option<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            sources: vec![LeadSource::Google, LeadSource::Directory11880],
            default_page_size: 20,
            cache_ttl_seconds: 3600,
            max_cache_entries: 1000,
            source_timeout_seconds: 30,
            max_pages_per_source: 3,
            request_timeout_seconds: 10,
            user_agent: None,
        }
    }
}

impl AggregatorConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `sources` must not be empty and must not repeat a source
    /// - `default_page_size`, `cache_ttl_seconds`, `max_cache_entries`,
    ///   `source_timeout_seconds`, `max_pages_per_source` and
    ///   `request_timeout_seconds` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.sources.is_empty() {
            return Err(SearchError::Config(
                "at least one source must be enabled".into(),
            ));
        }
        let unique: HashSet<&LeadSource> = self.sources.iter().collect();
        if unique.len() != self.sources.len() {
            return Err(SearchError::Config(
                "sources must not contain duplicates".into(),
            ));
        }
        if self.default_page_size == 0 {
            return Err(SearchError::Config(
                "default_page_size must be greater than 0".into(),
            ));
        }
        if self.cache_ttl_seconds == 0 {
            return Err(SearchError::Config(
                "cache_ttl_seconds must be greater than 0".into(),
            ));
        }
        if self.max_cache_entries == 0 {
            return Err(SearchError::Config(
                "max_cache_entries must be greater than 0".into(),
            ));
        }
        if self.source_timeout_seconds == 0 {
            return Err(SearchError::Config(
                "source_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_pages_per_source == 0 {
            return Err(SearchError::Config(
                "max_pages_per_source must be greater than 0".into(),
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(SearchError::Config(
                "request_timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Cache time-to-live as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Per-connector deadline as a [`Duration`].
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds)
    }
}
