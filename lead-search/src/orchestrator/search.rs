//! Lead aggregation orchestrator: cache resume or concurrent fan-out, then dedup.
//!
//! A call either serves the next page of every enabled source straight
//! from the [`PaginationCache`], or fans the query out to every enabled
//! connector at once (each resuming after the provider pages it already
//! has cached), waits for all of them to settle, merges the batches in
//! enablement order and deduplicates the merge. Per-source raw batches
//! are appended to the cache untouched so later merges can re-deduplicate
//! against sources that arrive afterwards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{PageProgress, PaginationCache};
use crate::config::AggregatorConfig;
use crate::connector::LeadConnector;
use crate::error::SearchError;
use crate::types::{
    AggregationResult, CacheReport, CacheStatus, LeadRecord, LeadSource, SearchOptions,
    SourceResult,
};

use super::dedup::dedupe;

/// Aggregates leads from every enabled [`LeadConnector`].
///
/// The cache is injected rather than global so that independent stores
/// can coexist (one per process in production, one per test otherwise).
pub struct LeadAggregator {
    config: AggregatorConfig,
    cache: PaginationCache,
    connectors: HashMap<LeadSource, Arc<dyn LeadConnector>>,
    source_timeout: Duration,
}

impl std::fmt::Debug for LeadAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeadAggregator")
            .field("sources", &self.config.sources)
            .field("connectors", &self.connectors.keys().collect::<Vec<_>>())
            .field("source_timeout", &self.source_timeout)
            .finish()
    }
}

impl LeadAggregator {
    /// Create an aggregator with no connectors registered yet.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation.
    pub fn new(config: AggregatorConfig, cache: PaginationCache) -> Result<Self, SearchError> {
        config.validate()?;
        let source_timeout = config.source_timeout();
        Ok(Self {
            config,
            cache,
            connectors: HashMap::new(),
            source_timeout,
        })
    }

    /// Register a connector. A later registration for the same source
    /// replaces the earlier one.
    pub fn with_connector<C>(mut self, connector: C) -> Self
    where
        C: LeadConnector + 'static,
    {
        self.register(Arc::new(connector));
        self
    }

    /// Register a shared connector.
    pub fn register(&mut self, connector: Arc<dyn LeadConnector>) {
        self.connectors.insert(connector.source(), connector);
    }

    /// Override the per-connector deadline taken from the config.
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// The pagination cache this aggregator reads and writes.
    pub fn cache(&self) -> &PaginationCache {
        &self.cache
    }

    /// The active configuration.
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Run one aggregation.
    ///
    /// # Pipeline
    ///
    /// 1. Reject empty queries and zero page sizes
    /// 2. Resolve enabled sources to connectors, in enablement order
    /// 3. With `use_cache` and `continue_from_cache`, serve the next cached
    ///    window of every source that has a live entry
    /// 4. Otherwise spawn every connector under its own deadline, resuming
    ///    after the provider pages already cached; exhausted sources are
    ///    not called again
    /// 5. Join all of them; panics and timeouts become source errors
    /// 6. Record each source's raw batch in the cache
    /// 7. Concatenate in enablement order and deduplicate
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidInput`] for an empty/whitespace query or a
    ///   zero page size. Nothing is fetched and the cache is untouched.
    /// - [`SearchError::Config`] if no enabled source has a connector.
    ///
    /// Failing sources never produce an `Err`: if every source fails the
    /// result is empty with one error string per source.
    pub async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<AggregationResult, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidInput(
                "query must not be empty".into(),
            ));
        }
        if options.page_size == 0 {
            return Err(SearchError::InvalidInput(
                "page_size must be greater than 0".into(),
            ));
        }

        let (active, mut errors) = self.resolve_connectors();
        if active.is_empty() {
            return Err(SearchError::Config(
                "no enabled source has a connector".into(),
            ));
        }

        tracing::trace!(query, sources = active.len(), "lead search");

        if options.use_cache && options.continue_from_cache {
            if let Some(result) = self.serve_from_cache(query, options.page_size, &errors).await {
                return Ok(result);
            }
        }

        let plans = self.plan_fetches(query, &active, options.use_cache).await;
        let outcomes = self.fan_out(query, plans, options.use_cache).await;

        let mut merged: Vec<LeadRecord> = Vec::new();
        let mut has_more = false;

        for (outcome, start_page) in outcomes {
            let outcome = outcome.validated();
            let source = outcome.source;
            let usable = outcome.error.is_none() || !outcome.results.is_empty();

            match &outcome.error {
                Some(err) => {
                    tracing::warn!(%source, error = %err, partial = outcome.results.len(), "source failed");
                    errors.push(err.clone());
                }
                None => {
                    tracing::debug!(%source, start_page, count = outcome.results.len(), "source returned leads");
                }
            }

            if usable {
                has_more |= !outcome.complete;
                if options.use_cache {
                    self.cache
                        .record_fetch(query, &outcome, start_page, options.page_size)
                        .await;
                }
            }

            merged.extend(outcome.results);
        }

        let raw = merged.len();
        let results = dedupe(merged);
        tracing::debug!(raw, unique = results.len(), "merged leads");

        Ok(AggregationResult {
            results,
            errors,
            cache: CacheReport {
                sources: self.cache_statuses(query).await,
                has_more,
            },
            from_cache: false,
        })
    }

    /// Split enabled sources into registered connectors and errors for the
    /// ones nobody registered.
    fn resolve_connectors(&self) -> (Vec<Arc<dyn LeadConnector>>, Vec<String>) {
        let mut active = Vec::with_capacity(self.config.sources.len());
        let mut errors = Vec::new();
        for source in &self.config.sources {
            match self.connectors.get(source) {
                Some(connector) => active.push(Arc::clone(connector)),
                None => {
                    tracing::warn!(%source, "enabled source has no connector");
                    errors.push(format!("{source}: no connector configured"));
                }
            }
        }
        (active, errors)
    }

    /// Serve the next cached window of every enabled source.
    ///
    /// Only sources with a live entry take part; a source that failed or
    /// has no connector says nothing about whether more pages exist.
    /// Returns `None` when nothing can be served from cache but a live
    /// source may still have unfetched pages (or no source has a live
    /// entry at all), so the caller falls through to a resuming fan-out.
    async fn serve_from_cache(
        &self,
        query: &str,
        page_size: usize,
        errors: &[String],
    ) -> Option<AggregationResult> {
        let mut windows = Vec::new();
        for &source in &self.config.sources {
            if let Some(entry) = self.cache.get(query, source).await {
                let page = self.cache.next_page(query, source, page_size).await;
                windows.push((source, entry.complete, page));
            }
        }
        if windows.is_empty() {
            return None;
        }

        let nothing_cached = windows.iter().all(|(_, _, page)| page.records.is_empty());
        let fetchable = windows.iter().any(|(_, complete, _)| !complete);
        if nothing_cached && fetchable {
            tracing::debug!("cached windows exhausted, fetching further pages");
            return None;
        }

        let mut merged = Vec::new();
        let mut has_more = false;
        for (source, _, page) in windows {
            has_more |= page.has_more;
            if page.records.is_empty() {
                continue;
            }

            // Mark this window as served.
            let progress = PageProgress {
                current_page: page.next_start_index / page_size,
                total_pages: 0,
                complete: false,
            };
            self.cache.put(query, source, Vec::new(), progress).await;
            merged.extend(page.records);
        }

        let results = dedupe(merged);
        tracing::debug!(count = results.len(), "served leads from cache");

        Some(AggregationResult {
            results,
            errors: errors.to_vec(),
            cache: CacheReport {
                sources: self.cache_statuses(query).await,
                has_more,
            },
            from_cache: true,
        })
    }

    /// Pair each connector with the provider page to resume from.
    ///
    /// With caching on, a source resumes after the pages its entry already
    /// holds, and a source whose entry is complete is left out.
    async fn plan_fetches(
        &self,
        query: &str,
        connectors: &[Arc<dyn LeadConnector>],
        use_cache: bool,
    ) -> Vec<(Arc<dyn LeadConnector>, u32)> {
        let mut plans = Vec::with_capacity(connectors.len());
        for connector in connectors {
            let start_page = if use_cache {
                match self.cache.get(query, connector.source()).await {
                    Some(entry) if entry.complete => {
                        tracing::debug!(source = %connector.source(), "source exhausted, not fetching");
                        continue;
                    }
                    Some(entry) => entry.total_pages,
                    None => 0,
                }
            } else {
                0
            };
            plans.push((Arc::clone(connector), start_page));
        }
        plans
    }

    /// Invoke every planned connector concurrently and wait for all to settle.
    ///
    /// Output order matches `plans`, regardless of completion order.
    async fn fan_out(
        &self,
        query: &str,
        plans: Vec<(Arc<dyn LeadConnector>, u32)>,
        use_cache: bool,
    ) -> Vec<(SourceResult, u32)> {
        let deadline = self.source_timeout;

        let tasks: Vec<_> = plans
            .into_iter()
            .map(|(connector, start_page)| {
                let source = connector.source();
                let query = query.to_owned();
                let handle = tokio::spawn(async move {
                    let fetch = connector.fetch(&query, use_cache, start_page);
                    match tokio::time::timeout(deadline, fetch).await {
                        Ok(result) => result,
                        Err(_) => SourceResult::failed(
                            source,
                            SearchError::Timeout(format!(
                                "no response after {}ms",
                                deadline.as_millis()
                            )),
                        ),
                    }
                });
                async move {
                    let mut result = match handle.await {
                        Ok(result) => result,
                        Err(err) if err.is_panic() => SourceResult::failed(
                            source,
                            SearchError::Source("connector panicked".into()),
                        ),
                        Err(err) => SourceResult::failed(
                            source,
                            SearchError::Source(format!("connector task failed: {err}")),
                        ),
                    };
                    result.source = source;
                    (result, start_page)
                }
            })
            .collect();

        futures::future::join_all(tasks).await
    }

    async fn cache_statuses(&self, query: &str) -> Vec<CacheStatus> {
        let mut statuses = Vec::with_capacity(self.config.sources.len());
        for &source in &self.config.sources {
            statuses.push(self.cache.status(query, source).await);
        }
        statuses
    }
}
