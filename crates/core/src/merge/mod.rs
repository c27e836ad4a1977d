//! Merge module - combining positions across files and into existing portfolios.

mod merge_engine;
mod merge_model;


pub use merge_engine::{combine_positions, fold_parsed_import, merge_into_portfolio, merge_positions};
pub use merge_model::MergeStrategy;
