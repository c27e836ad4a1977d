//! The single merge rule shared by cross-file folding and import-into-portfolio.

use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use super::merge_model::MergeStrategy;
use crate::constants::DECIMAL_PRECISION;
use crate::normalization::PositionKey;
use crate::portfolio::{ParsedImport, Portfolio, Position};

fn prefer_existing(existing: String, incoming: String) -> String {
    if existing.trim().is_empty() {
        incoming
    } else {
        existing
    }
}

/// Combines two records of the same instrument.
///
/// `Add` sums saturate at the `Decimal` bounds.
pub fn combine_positions(existing: Position, incoming: Position, strategy: MergeStrategy) -> Position {
    match strategy {
        MergeStrategy::Ignore => existing,
        MergeStrategy::Replace => Position {
            id: existing.id,
            ..incoming
        },
        MergeStrategy::Add => {
            let quantity = existing.quantity.saturating_add(incoming.quantity);
            let value = existing.value.saturating_add(incoming.value);
            let close_price = value
                .checked_div(quantity)
                .map(|price| price.round_dp(DECIMAL_PRECISION))
                .unwrap_or(existing.close_price);
            // Existing rate wins unless it is the default of 1.
            let fx_rate_to_base = if existing.fx_rate_to_base == Decimal::ONE {
                incoming.fx_rate_to_base
            } else {
                existing.fx_rate_to_base
            };

            Position {
                id: existing.id,
                isin: existing.isin.or(incoming.isin),
                symbol: prefer_existing(existing.symbol, incoming.symbol),
                name: prefer_existing(existing.name, incoming.name),
                asset_type: prefer_existing(existing.asset_type, incoming.asset_type),
                sector: prefer_existing(existing.sector, incoming.sector),
                exchange: prefer_existing(existing.exchange, incoming.exchange),
                currency: prefer_existing(existing.currency, incoming.currency),
                quantity,
                close_price,
                value,
                cost_basis: existing.cost_basis.saturating_add(incoming.cost_basis),
                unrealized_pnl: existing.unrealized_pnl.saturating_add(incoming.unrealized_pnl),
                fx_rate_to_base,
                last_updated: existing.last_updated.max(incoming.last_updated),
            }
        }
    }
}

/// Merges `incoming` into `existing` by [`PositionKey`].
///
/// Existing order is kept and new instruments are appended. Unkeyable incoming
/// records are never matched and always get a fresh id.
pub fn merge_positions(
    existing: Vec<Position>,
    incoming: Vec<Position>,
    strategy: MergeStrategy,
) -> Vec<Position> {
    let mut merged = existing;
    let mut by_key: HashMap<PositionKey, usize> = HashMap::new();
    for (idx, position) in merged.iter().enumerate() {
        if let Some(key) = PositionKey::for_position(position) {
            by_key.entry(key).or_insert(idx);
        }
    }

    let mut matched = 0usize;
    for position in incoming {
        match PositionKey::for_position(&position) {
            Some(key) => match by_key.get(&key) {
                Some(&idx) => {
                    let current = std::mem::take(&mut merged[idx]);
                    merged[idx] = combine_positions(current, position, strategy);
                    matched += 1;
                }
                None => {
                    by_key.insert(key, merged.len());
                    merged.push(position);
                }
            },
            None => merged.push(position.with_id(Uuid::new_v4().to_string())),
        }
    }

    debug!(
        "Merged with strategy '{}': {} matched, {} positions total",
        strategy,
        matched,
        merged.len()
    );
    merged
}

/// Folds one file's result into the batch accumulator.
pub fn fold_parsed_import(
    accumulator: ParsedImport,
    next: ParsedImport,
    strategy: MergeStrategy,
) -> ParsedImport {
    let ParsedImport {
        mut portfolio,
        mut sources,
    } = accumulator;
    let existing = std::mem::take(&mut portfolio.positions);
    let positions = merge_positions(existing, next.portfolio.positions, strategy);
    sources.extend(next.sources);
    ParsedImport {
        portfolio: portfolio.with_positions(positions),
        sources,
    }
}

/// New portfolio value with `parsed` merged in and its sources appended.
pub fn merge_into_portfolio(
    portfolio: &Portfolio,
    parsed: ParsedImport,
    strategy: MergeStrategy,
) -> Portfolio {
    let positions = merge_positions(
        portfolio.positions.clone(),
        parsed.portfolio.positions,
        strategy,
    );
    portfolio
        .clone()
        .with_positions(positions)
        .with_import_sources(parsed.sources)
}
