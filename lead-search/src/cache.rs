//! In-memory pagination cache for per-source fetch progress.
//!
//! Stores the raw, non-deduplicated records each source has produced for a
//! query, together with a page cursor and a completeness flag, so callers
//! can ask for "more results" without repeating a multi-page fetch.
//!
//! Entries are keyed by `(source, lowercased + trimmed query)` and expire a
//! fixed time after their last update. Expiry is checked lazily on read.
//! Appends to one key go through [`moka`]'s per-key compute so concurrent
//! writers never lose each other's records; distinct keys never contend.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

use crate::types::{CacheStatus, LeadRecord, LeadSource, SourceResult};

/// Default entry time-to-live: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Default upper bound on live entries.
pub const DEFAULT_MAX_ENTRIES: u64 = 1000;

/// Composite cache key: source + normalised query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: LeadSource,
    /// Lowercased, trimmed query string.
    query: String,
}

impl CacheKey {
    /// Build a cache key. Queries that differ only in case or surrounding
    /// whitespace map to the same key.
    pub fn new(query: &str, source: LeadSource) -> Self {
        Self {
            source,
            query: query.trim().to_lowercase(),
        }
    }
}

/// Resumable fetch state for one `(query, source)` pair.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Query text as first supplied.
    pub query: String,
    /// Source the records came from.
    pub source: LeadSource,
    /// Accumulated records in discovery order. Only ever grows.
    pub results: Vec<LeadRecord>,
    /// Pages already served to callers.
    pub current_page: usize,
    /// Provider pages known so far.
    pub total_pages: u32,
    /// Wall-clock time of the last update, for reporting.
    pub last_update: DateTime<Utc>,
    /// Whether the source has been exhausted. Never reverts to `false`.
    pub complete: bool,
    touched: Instant,
}

impl CacheEntry {
    fn new(query: &str, source: LeadSource, results: Vec<LeadRecord>, progress: PageProgress) -> Self {
        Self {
            query: query.to_owned(),
            source,
            results,
            current_page: progress.current_page,
            total_pages: progress.total_pages,
            last_update: Utc::now(),
            complete: progress.complete,
            touched: Instant::now(),
        }
    }

    fn append(&mut self, records: Vec<LeadRecord>, progress: PageProgress) {
        self.results.extend(records);
        self.current_page = self.current_page.max(progress.current_page);
        self.total_pages = self.total_pages.max(progress.total_pages);
        self.complete |= progress.complete;
        self.last_update = Utc::now();
        self.touched = Instant::now();
    }

    /// Time since the last update.
    pub fn age(&self) -> Duration {
        self.touched.elapsed()
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }
}

/// Progress markers supplied alongside an append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageProgress {
    /// Pages served so far. Stored as the maximum of old and new.
    pub current_page: usize,
    /// Provider pages known so far. Stored as the maximum of old and new.
    pub total_pages: u32,
    /// Whether the source is exhausted. Sticky once set.
    pub complete: bool,
}

/// A window of cached records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    /// At most `page_size` records.
    pub records: Vec<LeadRecord>,
    /// Whether the source may have more, cached or not yet fetched.
    pub has_more: bool,
    /// Index just past the end of this window.
    pub next_start_index: usize,
}

/// Pagination cache handle.
///
/// Cloning is cheap and every clone shares the same storage, so a single
/// store can be constructed at startup and handed to whoever needs it.
#[derive(Clone)]
pub struct PaginationCache {
    entries: Cache<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl std::fmt::Debug for PaginationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl Default for PaginationCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

impl PaginationCache {
    /// Create an empty store with the given TTL and capacity bound.
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { entries, ttl }
    }

    /// Entry time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry.
    ///
    /// Returns `None` on a miss. An expired entry is evicted and also
    /// reported as `None`.
    pub async fn get(&self, query: &str, source: LeadSource) -> Option<CacheEntry> {
        let key = CacheKey::new(query, source);
        let entry = self.entries.get(&key).await?;
        if !entry.is_expired(self.ttl) {
            return Some(entry);
        }

        // Re-check under the per-key lock; a writer may have refreshed it.
        let ttl = self.ttl;
        let outcome = self
            .entries
            .entry(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if entry.value().is_expired(ttl) => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        match outcome {
            CompResult::Unchanged(entry) => Some(entry.into_value()),
            _ => {
                tracing::debug!(%source, "evicted expired cache entry");
                None
            }
        }
    }

    /// Append records and progress to the entry for `(query, source)`.
    ///
    /// Creates the entry if absent or expired. Existing records are never
    /// removed or reordered; no deduplication happens here.
    pub async fn put(
        &self,
        query: &str,
        source: LeadSource,
        records: Vec<LeadRecord>,
        progress: PageProgress,
    ) {
        let key = CacheKey::new(query, source);
        let ttl = self.ttl;
        let appended = records.len();
        self.entries
            .entry(key)
            .and_compute_with(move |current| {
                let next = match current.map(|entry| entry.into_value()) {
                    Some(mut existing) if !existing.is_expired(ttl) => {
                        existing.append(records, progress);
                        existing
                    }
                    _ => CacheEntry::new(query, source, records, progress),
                };
                std::future::ready(Op::Put(next))
            })
            .await;
        tracing::trace!(%source, appended, "cache entry updated");
    }

    /// Record one connector call that started at provider page `start_page`.
    ///
    /// Runs under the per-key compute, so the stored cursor is derived from
    /// the entry as it is after the append:
    ///
    /// - `total_pages` becomes `start_page + pages_fetched`, so the next
    ///   fetch resumes after the pages seen so far
    /// - `current_page` becomes `ceil(len / page_size)`: everything fetched
    ///   counts as served
    /// - if another call already recorded pages from `start_page` on, the
    ///   batch overlaps stored records and is not appended again
    ///
    /// Returns the number of records appended.
    pub async fn record_fetch(
        &self,
        query: &str,
        fetched: &SourceResult,
        start_page: u32,
        page_size: usize,
    ) -> usize {
        let key = CacheKey::new(query, fetched.source);
        let ttl = self.ttl;
        let source = fetched.source;
        let records = fetched.results.clone();
        let reached = start_page.saturating_add(fetched.pages_fetched);
        let progress = PageProgress {
            current_page: 0,
            total_pages: reached,
            complete: fetched.complete,
        };
        let page_size = page_size.max(1);
        let mut appended = 0;
        let appended_out = &mut appended;

        self.entries
            .entry(key)
            .and_compute_with(move |current| {
                let mut next = match current.map(|entry| entry.into_value()) {
                    Some(mut existing) if !existing.is_expired(ttl) => {
                        if existing.total_pages > start_page {
                            // Pages from `start_page` on are already stored.
                            existing.append(Vec::new(), progress);
                        } else {
                            *appended_out = records.len();
                            existing.append(records, progress);
                        }
                        existing
                    }
                    _ => {
                        *appended_out = records.len();
                        CacheEntry::new(query, source, records, progress)
                    }
                };
                next.current_page = next.current_page.max(next.results.len().div_ceil(page_size));
                std::future::ready(Op::Put(next))
            })
            .await;

        tracing::trace!(%source, start_page, reached, appended, "fetch recorded");
        appended
    }

    /// Compute the next window of cached records without mutating state.
    ///
    /// The window is `[current_page * page_size, current_page * page_size + page_size)`.
    /// Advancing the cursor is the caller's job, via [`PaginationCache::put`].
    pub async fn next_page(&self, query: &str, source: LeadSource, page_size: usize) -> CachedPage {
        let Some(entry) = self.get(query, source).await else {
            return CachedPage {
                records: Vec::new(),
                has_more: true,
                next_start_index: 0,
            };
        };

        let start = entry.current_page.saturating_mul(page_size);
        let end = start.saturating_add(page_size);
        let records = entry
            .results
            .get(start.min(entry.results.len())..end.min(entry.results.len()))
            .map(<[LeadRecord]>::to_vec)
            .unwrap_or_default();

        CachedPage {
            records,
            has_more: !entry.complete || end < entry.results.len(),
            next_start_index: end,
        }
    }

    /// Read-only summary of the entry for `(query, source)`.
    pub async fn status(&self, query: &str, source: LeadSource) -> CacheStatus {
        match self.get(query, source).await {
            Some(entry) => CacheStatus {
                source,
                cached: true,
                total_results: entry.results.len(),
                complete: entry.complete,
                last_update: Some(entry.last_update),
            },
            None => CacheStatus {
                source,
                cached: false,
                total_results: 0,
                complete: false,
                last_update: None,
            },
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(source: LeadSource, prefix: &str, count: usize) -> Vec<LeadRecord> {
        (0..count)
            .map(|i| LeadRecord::new(source, format!("{prefix} {i}")))
            .collect()
    }

    fn progress(current_page: usize, total_pages: u32, complete: bool) -> PageProgress {
        PageProgress {
            current_page,
            total_pages,
            complete,
        }
    }

    #[test]
    fn cache_key_normalises_case_and_whitespace() {
        let a = CacheKey::new("  Bäcker BERLIN ", LeadSource::Google);
        let b = CacheKey::new("bäcker berlin", LeadSource::Google);
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_differs_per_source() {
        let a = CacheKey::new("bäcker", LeadSource::Google);
        let b = CacheKey::new("bäcker", LeadSource::Directory11880);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let cache = PaginationCache::default();
        assert!(cache.get("nothing here", LeadSource::Google).await.is_none());
    }

    #[tokio::test]
    async fn put_creates_entry() {
        let cache = PaginationCache::default();
        cache
            .put("Acme", LeadSource::Google, records(LeadSource::Google, "a", 3), progress(0, 1, false))
            .await;

        let entry = cache.get("acme", LeadSource::Google).await.expect("cached");
        assert_eq!(entry.query, "Acme");
        assert_eq!(entry.results.len(), 3);
        assert_eq!(entry.total_pages, 1);
        assert!(!entry.complete);
    }

    #[tokio::test]
    async fn put_appends_in_order() {
        let cache = PaginationCache::default();
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "first", 2), progress(0, 1, false))
            .await;
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "second", 2), progress(1, 2, false))
            .await;

        let entry = cache.get("q", LeadSource::Google).await.expect("cached");
        let names: Vec<&str> = entry.results.iter().map(|r| r.company_name.as_str()).collect();
        assert_eq!(names, vec!["first 0", "first 1", "second 0", "second 1"]);
        assert_eq!(entry.current_page, 1);
        assert_eq!(entry.total_pages, 2);
    }

    #[tokio::test]
    async fn total_pages_keeps_maximum() {
        let cache = PaginationCache::default();
        cache.put("q", LeadSource::Google, vec![], progress(0, 5, false)).await;
        cache.put("q", LeadSource::Google, vec![], progress(0, 2, false)).await;
        let entry = cache.get("q", LeadSource::Google).await.expect("cached");
        assert_eq!(entry.total_pages, 5);
    }

    #[tokio::test]
    async fn current_page_never_decreases() {
        let cache = PaginationCache::default();
        cache.put("q", LeadSource::Google, vec![], progress(3, 1, false)).await;
        cache.put("q", LeadSource::Google, vec![], progress(1, 1, false)).await;
        let entry = cache.get("q", LeadSource::Google).await.expect("cached");
        assert_eq!(entry.current_page, 3);
    }

    #[tokio::test]
    async fn complete_is_sticky() {
        let cache = PaginationCache::default();
        cache.put("q", LeadSource::Google, vec![], progress(0, 1, true)).await;
        cache.put("q", LeadSource::Google, vec![], progress(0, 1, false)).await;
        let entry = cache.get("q", LeadSource::Google).await.expect("cached");
        assert!(entry.complete);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = PaginationCache::new(Duration::from_millis(50), 100);
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "a", 1), progress(0, 1, true))
            .await;
        assert!(cache.get("q", LeadSource::Google).await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(cache.get("q", LeadSource::Google).await.is_none());
        assert!(!cache.status("q", LeadSource::Google).await.cached);
    }

    #[tokio::test]
    async fn put_after_expiry_starts_fresh_entry() {
        let cache = PaginationCache::new(Duration::from_millis(50), 100);
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "old", 4), progress(2, 2, true))
            .await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "new", 1), progress(0, 1, false))
            .await;

        let entry = cache.get("q", LeadSource::Google).await.expect("cached");
        assert_eq!(entry.results.len(), 1);
        assert_eq!(entry.results[0].company_name, "new 0");
        assert_eq!(entry.current_page, 0);
        assert!(!entry.complete);
    }

    #[tokio::test]
    async fn next_page_on_missing_entry() {
        let cache = PaginationCache::default();
        let page = cache.next_page("q", LeadSource::Google, 20).await;
        assert!(page.records.is_empty());
        assert!(page.has_more);
        assert_eq!(page.next_start_index, 0);
    }

    #[tokio::test]
    async fn next_page_windows_by_current_page() {
        let cache = PaginationCache::default();
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "r", 25), progress(1, 3, false))
            .await;

        let page = cache.next_page("q", LeadSource::Google, 10).await;
        assert_eq!(page.records.len(), 10);
        assert_eq!(page.records[0].company_name, "r 10");
        assert_eq!(page.next_start_index, 20);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn next_page_is_a_pure_read() {
        let cache = PaginationCache::default();
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "r", 5), progress(0, 1, true))
            .await;
        let first = cache.next_page("q", LeadSource::Google, 2).await;
        let second = cache.next_page("q", LeadSource::Google, 2).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn next_page_never_exceeds_page_size() {
        let cache = PaginationCache::default();
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "r", 50), progress(0, 5, false))
            .await;
        for size in [1, 7, 20, 49, 50, 80] {
            let page = cache.next_page("q", LeadSource::Google, size).await;
            assert!(page.records.len() <= size);
        }
    }

    #[tokio::test]
    async fn last_window_of_complete_entry_has_no_more() {
        let cache = PaginationCache::default();
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "r", 15), progress(1, 2, true))
            .await;
        let page = cache.next_page("q", LeadSource::Google, 10).await;
        assert_eq!(page.records.len(), 5);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn incomplete_entry_past_end_still_has_more() {
        let cache = PaginationCache::default();
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "r", 5), progress(4, 1, false))
            .await;
        let page = cache.next_page("q", LeadSource::Google, 10).await;
        assert!(page.records.is_empty());
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn status_reports_entry_summary() {
        let cache = PaginationCache::default();
        let empty = cache.status("q", LeadSource::Directory11880).await;
        assert!(!empty.cached);
        assert_eq!(empty.total_results, 0);
        assert!(empty.last_update.is_none());

        cache
            .put(
                "q",
                LeadSource::Directory11880,
                records(LeadSource::Directory11880, "r", 4),
                progress(0, 1, true),
            )
            .await;
        let status = cache.status("Q ", LeadSource::Directory11880).await;
        assert!(status.cached);
        assert_eq!(status.total_results, 4);
        assert!(status.complete);
        assert!(status.last_update.is_some());
    }

    #[tokio::test]
    async fn clear_empties_store() {
        let cache = PaginationCache::default();
        cache
            .put("a", LeadSource::Google, records(LeadSource::Google, "r", 1), progress(0, 1, false))
            .await;
        cache
            .put("b", LeadSource::Directory11880, records(LeadSource::Directory11880, "r", 1), progress(0, 1, false))
            .await;
        cache.clear();
        assert!(cache.get("a", LeadSource::Google).await.is_none());
        assert!(cache.get("b", LeadSource::Directory11880).await.is_none());
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let cache = PaginationCache::default();
        let handle = cache.clone();
        handle
            .put("q", LeadSource::Google, records(LeadSource::Google, "r", 2), progress(0, 1, false))
            .await;
        assert_eq!(cache.status("q", LeadSource::Google).await.total_results, 2);
    }

    fn fetched(prefix: &str, count: usize, pages: u32, complete: bool) -> SourceResult {
        SourceResult::ok(LeadSource::Google, records(LeadSource::Google, prefix, count), complete, pages)
    }

    #[tokio::test]
    async fn record_fetch_sets_resume_point_and_served_cursor() {
        let cache = PaginationCache::default();
        let appended = cache.record_fetch("q", &fetched("a", 25, 3, false), 0, 10).await;

        let entry = cache.get("q", LeadSource::Google).await.expect("cached");
        assert_eq!(appended, 25);
        assert_eq!(entry.total_pages, 3);
        assert_eq!(entry.current_page, 3);
        assert!(!entry.complete);
    }

    #[tokio::test]
    async fn record_fetch_resumes_after_stored_pages() {
        let cache = PaginationCache::default();
        cache.record_fetch("q", &fetched("a", 10, 1, false), 0, 20).await;
        let appended = cache.record_fetch("q", &fetched("b", 4, 1, true), 1, 20).await;

        let entry = cache.get("q", LeadSource::Google).await.expect("cached");
        assert_eq!(appended, 4);
        assert_eq!(entry.results.len(), 14);
        assert_eq!(entry.total_pages, 2);
        assert_eq!(entry.current_page, 1);
        assert!(entry.complete);
    }

    #[tokio::test]
    async fn record_fetch_cursor_uses_stored_length() {
        let cache = PaginationCache::default();
        cache
            .put("q", LeadSource::Google, records(LeadSource::Google, "bg", 30), progress(0, 0, false))
            .await;
        cache.record_fetch("q", &fetched("a", 5, 1, false), 0, 10).await;

        let entry = cache.get("q", LeadSource::Google).await.expect("cached");
        assert_eq!(entry.results.len(), 35);
        assert_eq!(entry.current_page, 4);
    }

    #[tokio::test]
    async fn overlapping_fetch_is_not_appended_twice() {
        let cache = PaginationCache::default();
        cache.record_fetch("q", &fetched("a", 10, 1, false), 0, 20).await;
        let appended = cache.record_fetch("q", &fetched("a", 10, 1, false), 0, 20).await;

        let entry = cache.get("q", LeadSource::Google).await.expect("cached");
        assert_eq!(appended, 0);
        assert_eq!(entry.results.len(), 10);
        assert_eq!(entry.total_pages, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_fetches_of_same_pages_store_one_batch() {
        let cache = PaginationCache::default();
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache.record_fetch("race", &fetched("p", 10, 1, false), 0, 20).await
                })
            })
            .collect();
        let mut appended = 0;
        for task in futures::future::join_all(tasks).await {
            appended += task.expect("record task");
        }

        let entry = cache.get("race", LeadSource::Google).await.expect("cached");
        assert_eq!(appended, 10);
        assert_eq!(entry.results.len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_not_lost() {
        let cache = PaginationCache::default();
        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let record = LeadRecord::new(LeadSource::Google, format!("lead {i}"));
                    cache.put("race", LeadSource::Google, vec![record], progress(0, 1, false)).await;
                })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            task.expect("append task");
        }

        let entry = cache.get("race", LeadSource::Google).await.expect("cached");
        assert_eq!(entry.results.len(), 64);
    }
}
