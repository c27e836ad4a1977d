//! Portfolio Import Core - broker statement import and normalization engine.
//!
//! Turns heterogeneous broker exports (position snapshots and transaction
//! histories) into one canonical list of positions and merges them into
//! stored portfolios. Parsing and merging are pure; persistence is a trait
//! implemented by the embedding application.

pub mod aggregation;
pub mod constants;
pub mod detection;
pub mod dialects;
pub mod errors;
pub mod imports;
pub mod merge;
pub mod normalization;
pub mod portfolio;
pub mod utils;

// Re-export the types most callers need
pub use dialects::{BrokerId, ParseOptions, ParserResult};
pub use imports::{ImportFile, ImportOptions, ImportService, ImportServiceTrait};
pub use merge::MergeStrategy;
pub use portfolio::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
