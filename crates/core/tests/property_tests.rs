//! Property-based tests for amount parsing, normalization and merging.
//!
//! These tests verify that universal properties hold across all valid inputs,
//! using the `proptest` crate for random test case generation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;

use portfolio_import_core::merge::{merge_positions, MergeStrategy};
use portfolio_import_core::normalization::{normalize_and_deduplicate_positions, PositionKey};
use portfolio_import_core::utils::{format_amount, parse_amount, AmountHints, NumberFormat};
use portfolio_import_core::Position;

// =============================================================================
// Generators
// =============================================================================

/// Decimal with up to four fractional digits.
fn arb_amount() -> impl Strategy<Value = (Decimal, u32)> {
    (-10_000_000_000i64..10_000_000_000i64, 0u32..=4)
        .prop_map(|(mantissa, scale)| (Decimal::new(mantissa, scale), scale))
}

/// Symbols drawn from a small pool so that collisions and decorated
/// duplicates are common.
fn arb_symbol() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("AAPL"),
        Just("aapl.us"),
        Just("MSFT"),
        Just("NASDAQ:MSFT"),
        Just("SAP.DE"),
        Just("XETRA:SAP"),
        Just("VOD LN EQUITY"),
    ]
}

fn arb_position() -> impl Strategy<Value = Position> {
    (
        arb_symbol(),
        prop_oneof![Just("USD"), Just("eur")],
        1i64..100_000,
        1i64..1_000_000,
        0i64..1_000_000,
    )
        .prop_map(|(symbol, currency, qty, price, cost)| {
            Position::new(
                symbol,
                "",
                currency,
                Decimal::new(qty, 2),
                Decimal::new(price, 2),
            )
            .with_cost_basis(Decimal::new(cost, 2))
        })
}

fn arb_positions() -> impl Strategy<Value = Vec<Position>> {
    prop::collection::vec(arb_position(), 0..12)
}

/// Quantity, value and cost basis per instrument.
fn totals(positions: &[Position]) -> HashMap<String, (Decimal, Decimal, Decimal)> {
    positions
        .iter()
        .map(|p| {
            let key = PositionKey::for_position(p)
                .map(|k| k.to_string())
                .unwrap_or_else(|| p.id.clone());
            (key, (p.quantity, p.value, p.cost_basis))
        })
        .collect()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn amount_round_trips_in_both_conventions((value, scale) in arb_amount()) {
        let us = format_amount(value, NumberFormat::Us, scale);
        prop_assert_eq!(parse_amount(&us, &AmountHints::US).unwrap(), value);

        let european = format_amount(value, NumberFormat::European, scale);
        prop_assert_eq!(parse_amount(&european, &AmountHints::EUROPEAN).unwrap(), value);
    }

    #[test]
    fn parenthesized_amounts_are_negative((value, scale) in arb_amount()) {
        let magnitude = value.abs();
        let text = format!("(${})", format_amount(magnitude, NumberFormat::Us, scale));
        prop_assert_eq!(parse_amount(&text, &AmountHints::US).unwrap(), -magnitude);
    }

    #[test]
    fn deduplication_is_idempotent(positions in arb_positions()) {
        let once = normalize_and_deduplicate_positions(positions);
        let twice = normalize_and_deduplicate_positions(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn deduplication_leaves_one_position_per_key(positions in arb_positions()) {
        let deduped = normalize_and_deduplicate_positions(positions);
        prop_assert_eq!(totals(&deduped).len(), deduped.len());
    }

    #[test]
    fn add_is_commutative(a in arb_positions(), b in arb_positions()) {
        let a = normalize_and_deduplicate_positions(a);
        let b = normalize_and_deduplicate_positions(b);

        let ab = merge_positions(a.clone(), b.clone(), MergeStrategy::Add);
        let ba = merge_positions(b, a, MergeStrategy::Add);
        prop_assert_eq!(totals(&ab), totals(&ba));
    }

    #[test]
    fn add_is_associative(a in arb_positions(), b in arb_positions(), c in arb_positions()) {
        let a = normalize_and_deduplicate_positions(a);
        let b = normalize_and_deduplicate_positions(b);
        let c = normalize_and_deduplicate_positions(c);

        let left = merge_positions(
            merge_positions(a.clone(), b.clone(), MergeStrategy::Add),
            c.clone(),
            MergeStrategy::Add,
        );
        let right = merge_positions(a, merge_positions(b, c, MergeStrategy::Add), MergeStrategy::Add);
        prop_assert_eq!(totals(&left), totals(&right));
    }

    #[test]
    fn ignore_keeps_existing_and_replace_takes_incoming(a in arb_positions(), b in arb_positions()) {
        let a = normalize_and_deduplicate_positions(a);
        let b = normalize_and_deduplicate_positions(b);
        let existing = totals(&a);
        let incoming = totals(&b);

        let ignored = totals(&merge_positions(a.clone(), b.clone(), MergeStrategy::Ignore));
        let replaced = totals(&merge_positions(a, b, MergeStrategy::Replace));
        for (key, amounts) in &existing {
            prop_assert_eq!(ignored.get(key), Some(amounts));
        }
        for (key, amounts) in &incoming {
            prop_assert_eq!(replaced.get(key), Some(amounts));
        }
    }
}
