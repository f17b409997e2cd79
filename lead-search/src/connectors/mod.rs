//! Concrete source connectors.
//!
//! Each module provides a struct implementing [`crate::connector::LeadConnector`]
//! for one provider.

pub mod google;

pub use google::GoogleConnector;
