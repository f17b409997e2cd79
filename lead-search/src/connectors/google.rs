//! Google Custom Search connector.
//!
//! Queries the Custom Search JSON API page by page (10 items per page) and
//! maps each item to a lead: the page title becomes the company name, the
//! link the URL and the snippet the description. Phone numbers are not
//! available from this API.

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use url::Url;

use crate::config::AggregatorConfig;
use crate::connector::LeadConnector;
use crate::error::SearchError;
use crate::http;
use crate::types::{LeadRecord, LeadSource, SourceResult};

/// Production endpoint of the Custom Search JSON API.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Items per API page; the API maximum.
const RESULTS_PER_PAGE: u32 = 10;

/// Highest `start` the API accepts (it serves at most 100 results).
const MAX_START: u32 = 91;

/// Google Custom Search JSON API connector.
pub struct GoogleConnector {
    api_key: String,
    cse_id: String,
    base_url: String,
    max_pages: u32,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    link: Option<String>,
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GoogleConnector {
    /// Create a connector with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        cse_id: impl Into<String>,
        config: &AggregatorConfig,
    ) -> Result<Self, SearchError> {
        Ok(Self {
            api_key: api_key.into(),
            cse_id: cse_id.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            max_pages: config.max_pages_per_source,
            client: http::build_client(config)?,
        })
    }

    /// Point the connector at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch one API page. `page` is zero-based.
    async fn fetch_page(
        &self,
        query: &str,
        page: u32,
        use_cache: bool,
    ) -> Result<Vec<SearchItem>, SearchError> {
        let start = (page * RESULTS_PER_PAGE + 1).to_string();
        let num = RESULTS_PER_PAGE.to_string();
        let url = Url::parse_with_params(
            &self.base_url,
            [
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
                ("start", start.as_str()),
            ],
        )
        .map_err(|e| SearchError::Config(format!("invalid Google base URL: {e}")))?;

        let mut request = self.client.get(url);
        if !use_cache {
            request = request.header(CACHE_CONTROL, "no-cache");
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Google request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| {
                SearchError::Http(format!("Google response read failed: {}", e.without_url()))
            })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(SearchError::Http(format!("{}: {message}", status.as_u16())));
        }

        tracing::trace!(page, bytes = body.len(), "Google response received");

        serde_json::from_str::<SearchResponse>(&body)
            .map(|r| r.items)
            .map_err(|e| SearchError::Parse(format!("Google response: {e}")))
    }
}

#[async_trait]
impl LeadConnector for GoogleConnector {
    async fn fetch(&self, query: &str, use_cache: bool, start_page: u32) -> SourceResult {
        tracing::trace!(query, start_page, "Google search");

        let mut results = Vec::new();
        let mut pages_fetched = 0;
        let mut complete = false;

        for page in start_page..start_page.saturating_add(self.max_pages) {
            if page > (MAX_START - 1) / RESULTS_PER_PAGE {
                complete = true;
                break;
            }
            match self.fetch_page(query, page, use_cache).await {
                Ok(items) => {
                    let short_page = (items.len() as u32) < RESULTS_PER_PAGE;
                    if !items.is_empty() {
                        pages_fetched += 1;
                        results.extend(items.into_iter().filter_map(lead_from_item));
                    }
                    if short_page {
                        complete = true;
                        break;
                    }
                }
                Err(err) if page == start_page => {
                    return SourceResult::failed(LeadSource::Google, format!("API error: {err}"));
                }
                Err(err) => {
                    // Later pages only cost completeness.
                    tracing::warn!(page, error = %err, "Google page failed, keeping earlier pages");
                    break;
                }
            }
        }

        tracing::debug!(count = results.len(), pages_fetched, complete, "Google search finished");
        SourceResult::ok(LeadSource::Google, results, complete, pages_fetched)
    }

    fn source(&self) -> LeadSource {
        LeadSource::Google
    }
}

/// Map an API item to a lead, or `None` if the title has nothing usable.
fn lead_from_item(item: SearchItem) -> Option<LeadRecord> {
    let name = sanitize_title(&item.title);
    if name.is_empty() {
        return None;
    }
    Some(LeadRecord {
        source: LeadSource::Google,
        company_name: name,
        phone: None,
        url: item.link,
        description: item.snippet,
    })
}

/// Keep letters, digits, whitespace and `-._&()`; trim the rest.
fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| {
            c.is_alphanumeric() || c.is_whitespace() || matches!(c, '-' | '.' | '_' | '&' | '(' | ')')
        })
        .collect::<String>()
        .trim()
        .to_owned()
}
