//! lead-harvest: HTTP service in front of the `lead-search` aggregator.
//!
//! Loads a [`ServiceConfig`] from TOML (with environment overrides),
//! wires the configured connectors into a [`lead_search::LeadAggregator`]
//! and exposes it over a small JSON API.

pub mod config;
pub mod error;
pub mod server;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
