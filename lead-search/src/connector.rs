//! Trait definition for pluggable lead source connectors.
//!
//! Each provider implements [`LeadConnector`] to give the orchestrator a
//! uniform, failure-isolated way to fetch raw leads for a query.

use async_trait::async_trait;

use crate::types::{LeadSource, SourceResult};

/// A pluggable lead source.
///
/// Implementors own everything provider-specific:
///
/// - request construction and transport
/// - response parsing into [`crate::LeadRecord`] values
/// - internal multi-page fetching from the requested start page, up to
///   their own ceiling
///
/// `fetch` must always resolve to a [`SourceResult`]. Provider failures are
/// reported through [`SourceResult::error`], never by returning early with
/// an error. The orchestrator still isolates panics and stalls, but a
/// well-behaved connector never relies on that.
///
/// All implementations must be `Send + Sync` for concurrent fan-out.
#[async_trait]
pub trait LeadConnector: Send + Sync {
    /// Fetch leads for `query`, beginning at zero-based provider page
    /// `start_page`.
    ///
    /// The orchestrator passes the number of provider pages already cached
    /// for this query (0 when there are none or caching is off), so a
    /// connector only fetches pages it has not returned before. The
    /// returned `pages_fetched` counts pages consumed from `start_page` on.
    ///
    /// `use_cache` tells the connector whether the caller is working with
    /// cached pagination state; connectors may use it to allow or bypass
    /// any caching on their side of the transport.
    async fn fetch(&self, query: &str, use_cache: bool, start_page: u32) -> SourceResult;

    /// Returns which [`LeadSource`] this implementation represents.
    fn source(&self) -> LeadSource;
}
