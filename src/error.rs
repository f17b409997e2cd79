//! Error types for the lead-harvest service.

/// Top-level error type for service startup and configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lead search core rejected its setup.
    #[error("search error: {0}")]
    Search(#[from] lead_search::SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ServiceError>;
