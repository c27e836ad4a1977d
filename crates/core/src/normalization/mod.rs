//! Normalization module - canonical symbols, instrument identity and per-file deduplication.

mod normalizer;
mod position_key;
mod symbol_utils;


pub use normalizer::{normalize_and_deduplicate_positions, normalize_position};
pub use position_key::PositionKey;
pub use symbol_utils::{canonical_symbol, normalize_name, split_exchange_suffix};
