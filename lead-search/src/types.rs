//! Core types for lead records, source identification and aggregation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Known lead providers that lead-search can aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadSource {
    /// Google Custom Search JSON API.
    #[serde(rename = "google")]
    Google,
    /// The 11880 business directory.
    #[serde(rename = "11880")]
    Directory11880,
    /// The Gelbe Seiten business directory.
    #[serde(rename = "gelbeseiten")]
    GelbeSeiten,
}

impl LeadSource {
    /// Returns the human-readable name of this source.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Directory11880 => "11880",
            Self::GelbeSeiten => "Gelbe Seiten",
        }
    }

    /// Returns all known source variants.
    pub fn all() -> &'static [LeadSource] {
        &[Self::Google, Self::Directory11880, Self::GelbeSeiten]
    }
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One candidate business lead discovered by a source.
///
/// Only `company_name` is guaranteed; everything else depends on what the
/// provider exposes. Records are never mutated once they enter the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    /// Which provider discovered this lead.
    pub source: LeadSource,
    /// Company name as shown by the provider. Non-empty once accepted.
    pub company_name: String,
    /// Phone number in whatever format the provider returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Company website or listing URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Free-text snippet describing the business.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LeadRecord {
    /// Create a record with only a company name set.
    pub fn new(source: LeadSource, company_name: impl Into<String>) -> Self {
        Self {
            source,
            company_name: company_name.into(),
            phone: None,
            url: None,
            description: None,
        }
    }

    /// Builder-style setter for the phone number.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Builder-style setter for the URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Builder-style setter for the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// What a single connector call produced.
///
/// Connectors always return this shape; a provider failure is reported via
/// `error` with `results` empty or partially filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResult {
    /// The provider that produced this batch.
    pub source: LeadSource,
    /// Raw records in discovery order.
    pub results: Vec<LeadRecord>,
    /// Source-scoped failure description, if the source failed or degraded.
    pub error: Option<String>,
    /// Whether the provider has no further pages for this query.
    pub complete: bool,
    /// Number of provider pages consumed by this call.
    pub pages_fetched: u32,
}

impl SourceResult {
    /// A successful batch.
    pub fn ok(source: LeadSource, results: Vec<LeadRecord>, complete: bool, pages_fetched: u32) -> Self {
        Self {
            source,
            results,
            error: None,
            complete,
            pages_fetched,
        }
    }

    /// A failed call with no usable records.
    pub fn failed(source: LeadSource, message: impl fmt::Display) -> Self {
        Self {
            source,
            results: Vec::new(),
            error: Some(format!("{source}: {message}")),
            complete: false,
            pages_fetched: 0,
        }
    }

    /// Validate records at the connector boundary.
    ///
    /// Company names are trimmed, records with an empty name are dropped,
    /// and every record is tagged with this result's source.
    pub fn validated(mut self) -> Self {
        let before = self.results.len();
        let source = self.source;
        self.results = self
            .results
            .into_iter()
            .filter_map(|mut record| {
                let trimmed = record.company_name.trim();
                if trimmed.is_empty() {
                    return None;
                }
                if trimmed.len() != record.company_name.len() {
                    record.company_name = trimmed.to_owned();
                }
                record.source = source;
                Some(record)
            })
            .collect();

        let dropped = before - self.results.len();
        if dropped > 0 {
            tracing::debug!(%source, dropped, "dropped records without a company name");
        }
        self
    }
}

/// Per-call options for [`crate::LeadAggregator::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    /// Whether to consult and populate the pagination cache at all.
    pub use_cache: bool,
    /// Prefer serving the next page from cache over issuing new fetches.
    pub continue_from_cache: bool,
    /// Window size for cache-served pages.
    pub page_size: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            continue_from_cache: false,
            page_size: 20,
        }
    }
}

/// Read-only summary of one source's cache entry for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    /// Source the entry belongs to.
    pub source: LeadSource,
    /// Whether a live entry exists.
    pub cached: bool,
    /// Number of raw records accumulated so far.
    pub total_results: usize,
    /// Whether the source has been exhausted.
    pub complete: bool,
    /// When the entry was last appended to.
    pub last_update: Option<DateTime<Utc>>,
}

/// Cache state reported alongside an aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheReport {
    /// One status per enabled source, in enablement order.
    pub sources: Vec<CacheStatus>,
    /// Whether any enabled source may still yield more records.
    pub has_more: bool,
}

/// The response for one orchestration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// Deduplicated leads in source-enablement then discovery order.
    pub results: Vec<LeadRecord>,
    /// One message per failed or degraded source.
    pub errors: Vec<String>,
    /// Per-source cache state and the combined "more pages" flag.
    pub cache: CacheReport,
    /// Whether the answer was served entirely from cache.
    pub from_cache: bool,
}

impl AggregationResult {
    /// Whether more pages may be available from any source.
    pub fn has_more(&self) -> bool {
        self.cache.has_more
    }
}
