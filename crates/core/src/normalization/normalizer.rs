//! Per-file canonicalization: one position per instrument, stable ids.

use log::debug;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::position_key::PositionKey;
use super::symbol_utils::split_exchange_suffix;
use crate::constants::DEFAULT_CURRENCY;
use crate::merge::{combine_positions, MergeStrategy};
use crate::portfolio::Position;

/// Canonical descriptive fields for a single position. The id is left alone.
pub fn normalize_position(position: Position) -> Position {
    let (symbol, suffix_exchange) = split_exchange_suffix(&position.symbol);
    let exchange = match (position.exchange.trim(), suffix_exchange) {
        ("", Some(venue)) => venue,
        (current, _) => current.to_string(),
    };
    let currency = match position.currency.trim() {
        "" => DEFAULT_CURRENCY.to_string(),
        c => c.to_uppercase(),
    };
    let name = position.name.trim().to_string();
    let isin = position.isin.clone();

    Position {
        symbol,
        name,
        exchange,
        currency,
        ..position
    }
    .with_isin(isin)
}

/// Normalizes every position and combines those that share a [`PositionKey`]
/// with the additive merge rule. First-seen order is preserved.
///
/// Keyed positions get a deterministic id. Unkeyable ones keep their id when
/// it is non-empty and unique in the batch, otherwise receive a fresh UUID.
/// Keeping that id is what makes a second pass over the output a no-op: a
/// fresh UUID on every run would change unkeyable ids each time.
pub fn normalize_and_deduplicate_positions(positions: Vec<Position>) -> Vec<Position> {
    let input_count = positions.len();
    let mut result: Vec<Position> = Vec::with_capacity(input_count);
    let mut by_key: HashMap<PositionKey, usize> = HashMap::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for position in positions.into_iter().map(normalize_position) {
        match PositionKey::for_position(&position) {
            Some(key) => match by_key.get(&key) {
                Some(&idx) => {
                    let existing = std::mem::take(&mut result[idx]);
                    result[idx] = combine_positions(existing, position, MergeStrategy::Add);
                }
                None => {
                    let id = key.to_position_id();
                    seen_ids.insert(id.clone());
                    by_key.insert(key, result.len());
                    result.push(position.with_id(id));
                }
            },
            None => {
                let position = if position.id.trim().is_empty() || seen_ids.contains(&position.id)
                {
                    position.with_id(Uuid::new_v4().to_string())
                } else {
                    position
                };
                seen_ids.insert(position.id.clone());
                result.push(position);
            }
        }
    }

    if result.len() != input_count {
        debug!(
            "Deduplicated {} positions into {}",
            input_count,
            result.len()
        );
    }
    result
}
