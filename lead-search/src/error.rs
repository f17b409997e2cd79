//! Error types for the lead-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. No API keys or sensitive data appear in
//! error messages.
//!
//! Only [`SearchError::InvalidInput`] and [`SearchError::Config`] ever
//! escape [`crate::LeadAggregator::search`]. [`SearchError::Internal`] is
//! what the HTTP layer answers with when a handler panics. The remaining
//! variants describe a single source's failure (a connector panic is a
//! [`SearchError::Source`], a missed deadline a [`SearchError::Timeout`])
//! and end up as an error string on that source's [`crate::SourceResult`].

/// Errors that can occur during lead search operations.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The caller supplied an unusable request (e.g. an empty query).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A single source failed or returned degraded data.
    #[error("source error: {0}")]
    Source(String),

    /// A source did not settle before its deadline.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// An HTTP request to a provider failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse a provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid configuration, including having no usable sources.
    #[error("config error: {0}")]
    Config(String),

    /// Unexpected fault while serving a request, such as a handler panic.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SearchError {
    /// Whether this error was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Convenience type alias for lead-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
