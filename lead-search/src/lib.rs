//! # lead-search
//!
//! Aggregates business leads from several independent providers into one
//! deduplicated result set.
//!
//! ## Design
//!
//! - Queries every enabled source concurrently; one source failing, hanging
//!   or panicking never takes the others down
//! - Merges batches in a fixed source order, so output does not depend on
//!   which provider answers first
//! - Collapses near-duplicate leads by normalised (name, URL, phone) and
//!   keeps the record carrying the most contact information
//! - Keeps per-(query, source) pagination state in an injected in-memory
//!   cache with a one hour TTL, so callers can page through results across
//!   separate requests without re-fetching
//!
//! ## Security
//!
//! - API keys never appear in error messages or logs
//! - Search queries are logged only at trace level
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> lead_search::Result<()> {
//! use lead_search::{AggregatorConfig, GoogleConnector, LeadAggregator, PaginationCache, SearchOptions};
//!
//! let config = AggregatorConfig::default();
//! let cache = PaginationCache::new(config.cache_ttl(), config.max_cache_entries);
//! let google = GoogleConnector::new("api-key", "cse-id", &config)?;
//! let aggregator = LeadAggregator::new(config, cache)?.with_connector(google);
//!
//! let page = aggregator.search("Bäcker Berlin", SearchOptions::default()).await?;
//! for lead in &page.results {
//!     println!("{} {:?}", lead.company_name, lead.phone);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod connector;
pub mod connectors;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod types;

pub use cache::{CacheEntry, CachedPage, PageProgress, PaginationCache};
pub use config::AggregatorConfig;
pub use connector::LeadConnector;
pub use connectors::GoogleConnector;
pub use error::{Result, SearchError};
pub use orchestrator::dedup::dedupe;
pub use orchestrator::search::LeadAggregator;
pub use types::{
    AggregationResult, CacheReport, CacheStatus, LeadRecord, LeadSource, SearchOptions,
    SourceResult,
};
