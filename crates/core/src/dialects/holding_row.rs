//! Cell extraction shared by the dialect parsers.

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;

use super::csv_reader::Record;
use crate::errors::{ImportError, ImportResult};
use crate::portfolio::{Position, ASSET_TYPE_STOCKS};
use crate::utils::{parse_date, parse_optional_amount, AmountHints, DateLayout};

/// First date captured by `pattern` (group 1) in any cell of `records`.
pub(crate) fn scan_for_date(
    records: &[Record],
    pattern: &Regex,
    layouts: &[DateLayout],
) -> Option<DateTime<Utc>> {
    records
        .iter()
        .flat_map(|r| r.cells().iter())
        .filter_map(|cell| pattern.captures(cell))
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_date(m.as_str(), layouts).ok())
}

/// Amount in a column that must hold one.
pub(crate) fn required_amount(
    record: &Record,
    idx: usize,
    field: &str,
    hints: &AmountHints,
) -> ImportResult<Decimal> {
    parse_optional_amount(record.cell(idx), hints)?
        .ok_or_else(|| ImportError::malformed_row(record.line, format!("missing {}", field)))
}

/// Amount in an optional column. Absent column and blank cell both yield `None`.
pub(crate) fn optional_amount(
    record: &Record,
    idx: Option<usize>,
    hints: &AmountHints,
) -> ImportResult<Option<Decimal>> {
    parse_optional_amount(record.opt_cell(idx), hints)
}

fn out_of_range(line: usize) -> ImportError {
    ImportError::malformed_row(line, "amount out of range")
}

/// `a * b`, or a row-level error once the product leaves the `Decimal` range.
pub(crate) fn checked_product(line: usize, a: Decimal, b: Decimal) -> ImportResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| out_of_range(line))
}

/// `a / b`, or a row-level error on overflow or a zero divisor.
pub(crate) fn checked_ratio(line: usize, a: Decimal, b: Decimal) -> ImportResult<Decimal> {
    a.checked_div(b).ok_or_else(|| out_of_range(line))
}

/// One holding as read from a snapshot row, before defaults are filled in.
#[derive(Debug, Clone, Default)]
pub(crate) struct HoldingRow {
    pub symbol: String,
    pub name: String,
    pub isin: Option<String>,
    pub currency: String,
    pub asset_type: Option<&'static str>,
    pub sector: String,
    pub exchange: String,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub value: Option<Decimal>,
    pub cost_basis: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub fx_rate_to_base: Option<Decimal>,
    pub as_of: Option<DateTime<Utc>>,
}

impl HoldingRow {
    /// Builds the position. Missing price is derived from value and vice versa.
    pub fn into_position(self, line: usize) -> ImportResult<Position> {
        if self.symbol.is_empty() && self.name.is_empty() {
            return Err(ImportError::malformed_row(line, "no symbol or name"));
        }
        if self.quantity.is_zero() {
            return Err(ImportError::malformed_row(line, "zero quantity"));
        }

        let price = match (self.price, self.value) {
            (Some(price), _) => price,
            (None, Some(value)) => checked_ratio(line, value, self.quantity)?,
            (None, None) => Decimal::ZERO,
        };
        let value = match self.value {
            Some(value) => value,
            None => checked_product(line, self.quantity, price)?,
        };
        if let Some(cost_basis) = self.cost_basis {
            value.checked_sub(cost_basis).ok_or_else(|| out_of_range(line))?;
        }

        let mut position = Position::new(self.symbol, self.name, self.currency, self.quantity, price)
            .with_value(value)
            .with_isin(self.isin)
            .with_asset_type(self.asset_type.unwrap_or(ASSET_TYPE_STOCKS))
            .with_sector(self.sector)
            .with_exchange(self.exchange);
        if let Some(cost_basis) = self.cost_basis {
            position = position.with_cost_basis(cost_basis);
        }
        if let Some(unrealized_pnl) = self.unrealized_pnl {
            position = position.with_unrealized_pnl(unrealized_pnl);
        }
        if let Some(fx_rate) = self.fx_rate_to_base {
            position = position.with_fx_rate_to_base(fx_rate);
        }
        if let Some(as_of) = self.as_of {
            position = position.with_last_updated(as_of);
        }
        Ok(position)
    }
}
