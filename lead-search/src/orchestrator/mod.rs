//! Lead orchestrator: concurrent fan-out, cache resume, deduplication.
//!
//! This module fans a query out to every enabled source connector, merges
//! their batches in a fixed order, and collapses near-duplicate leads by
//! normalised identity key, keeping the most informative record.

pub mod dedup;
pub mod normalize;
pub mod scoring;
pub mod search;
