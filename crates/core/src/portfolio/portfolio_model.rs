//! Portfolio domain models.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::portfolio_constants::ASSET_TYPE_STOCKS;
use crate::constants::{DEFAULT_CURRENCY, QUANTITY_THRESHOLD};

lazy_static! {
    static ref QUANTITY_THRESHOLD_VALUE: Decimal =
        Decimal::from_str_radix(QUANTITY_THRESHOLD, 10).expect("Invalid quantity threshold");
}

pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    quantity.abs() >= *QUANTITY_THRESHOLD_VALUE
}

/// Canonical holding produced by every dialect parser.
///
/// Positions are value objects. Anything that changes a position builds a new
/// instance through the `with_*` methods or struct update syntax.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    pub symbol: String,
    pub name: String,
    pub asset_type: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub exchange: String,
    pub currency: String,
    pub quantity: Decimal,
    pub close_price: Decimal,
    /// Market value in `currency`. Expected to be close to `quantity * close_price`.
    pub value: Decimal,
    /// Total cost of the holding in `currency`, fees included.
    pub cost_basis: Decimal,
    #[serde(rename = "unrealizedPnL")]
    pub unrealized_pnl: Decimal,
    /// Multiplier from `currency` into the portfolio base currency.
    pub fx_rate_to_base: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            id: String::new(),
            isin: None,
            symbol: String::new(),
            name: String::new(),
            asset_type: ASSET_TYPE_STOCKS.to_string(),
            sector: String::new(),
            exchange: String::new(),
            currency: DEFAULT_CURRENCY.to_string(),
            quantity: Decimal::ZERO,
            close_price: Decimal::ZERO,
            value: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            fx_rate_to_base: Decimal::ONE,
            last_updated: Utc::now(),
        }
    }
}

impl Position {
    /// Creates a position with a fresh identifier and `value = quantity * close_price`,
    /// saturating at the `Decimal` bounds.
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        currency: impl Into<String>,
        quantity: Decimal,
        close_price: Decimal,
    ) -> Self {
        Position {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            name: name.into(),
            currency: currency.into(),
            quantity,
            close_price,
            value: quantity.saturating_mul(close_price),
            ..Default::default()
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        Position {
            id: id.into(),
            ..self
        }
    }

    /// Sets the ISIN, treating blank input as absent.
    pub fn with_isin(self, isin: Option<String>) -> Self {
        let isin = isin
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());
        Position { isin, ..self }
    }

    pub fn with_asset_type(self, asset_type: impl Into<String>) -> Self {
        Position {
            asset_type: asset_type.into(),
            ..self
        }
    }

    pub fn with_sector(self, sector: impl Into<String>) -> Self {
        Position {
            sector: sector.into(),
            ..self
        }
    }

    pub fn with_exchange(self, exchange: impl Into<String>) -> Self {
        Position {
            exchange: exchange.into(),
            ..self
        }
    }

    pub fn with_value(self, value: Decimal) -> Self {
        Position { value, ..self }
    }

    /// Sets the cost basis and derives unrealized P&L from the current value.
    pub fn with_cost_basis(self, cost_basis: Decimal) -> Self {
        Position {
            cost_basis,
            unrealized_pnl: self.value.saturating_sub(cost_basis),
            ..self
        }
    }

    pub fn with_unrealized_pnl(self, unrealized_pnl: Decimal) -> Self {
        Position {
            unrealized_pnl,
            ..self
        }
    }

    pub fn with_fx_rate_to_base(self, fx_rate_to_base: Decimal) -> Self {
        Position {
            fx_rate_to_base,
            ..self
        }
    }

    pub fn with_last_updated(self, last_updated: DateTime<Utc>) -> Self {
        Position {
            last_updated,
            ..self
        }
    }

    /// Market value converted into the portfolio base currency.
    pub fn value_in_base(&self) -> Decimal {
        self.value.saturating_mul(self.fx_rate_to_base)
    }

    /// Average cost per unit, zero for empty positions.
    pub fn average_cost(&self) -> Decimal {
        if is_quantity_significant(&self.quantity) {
            self.cost_basis
                .checked_div(self.quantity)
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }
}

/// Provenance of one consumed file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSource {
    pub id: String,
    /// Broker identifier of the dialect that produced the positions.
    pub broker_id: String,
    pub file_name: String,
    pub imported_at: DateTime<Utc>,
    /// Positions this file contributed after normalization.
    pub position_count: usize,
    #[serde(default)]
    pub skipped_rows: usize,
    #[serde(default)]
    pub auto_detected: bool,
}

impl ImportSource {
    pub fn new(
        broker_id: impl Into<String>,
        file_name: impl Into<String>,
        position_count: usize,
    ) -> Self {
        ImportSource {
            id: Uuid::new_v4().to_string(),
            broker_id: broker_id.into(),
            file_name: file_name.into(),
            imported_at: Utc::now(),
            position_count,
            skipped_rows: 0,
            auto_detected: false,
        }
    }
}

/// Unit of persistence: a set of positions plus the files they came from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub base_currency: String,
    pub positions: Vec<Position>,
    /// Append-only.
    #[serde(default)]
    pub import_sources: Vec<ImportSource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Portfolio {
    fn default() -> Self {
        let now = Utc::now();
        Portfolio {
            id: String::new(),
            name: String::new(),
            base_currency: DEFAULT_CURRENCY.to_string(),
            positions: Vec::new(),
            import_sources: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Portfolio {
    pub fn new(name: impl Into<String>, base_currency: impl Into<String>) -> Self {
        Portfolio {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            base_currency: base_currency.into(),
            ..Default::default()
        }
    }

    /// Throwaway portfolio used to carry parser output.
    pub fn from_positions(positions: Vec<Position>) -> Self {
        Portfolio {
            positions,
            ..Default::default()
        }
    }

    pub fn with_positions(self, positions: Vec<Position>) -> Self {
        Portfolio {
            positions,
            updated_at: Utc::now(),
            ..self
        }
    }

    /// Returns a copy with `sources` appended to the provenance list.
    pub fn with_import_sources(self, sources: Vec<ImportSource>) -> Self {
        let mut import_sources = self.import_sources;
        import_sources.extend(sources);
        Portfolio {
            import_sources,
            updated_at: Utc::now(),
            ..self
        }
    }

    /// Sum of all position values in the base currency.
    pub fn total_value(&self) -> Decimal {
        self.positions
            .iter()
            .map(Position::value_in_base)
            .fold(Decimal::ZERO, |total, value| total.saturating_add(value))
    }

    pub fn find_position(&self, symbol: &str) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.symbol.eq_ignore_ascii_case(symbol))
    }
}

/// Portfolio under construction plus the sources consumed so far.
/// Lives for the duration of one import operation.
#[derive(Debug, Clone, Default)]
pub struct ParsedImport {
    pub portfolio: Portfolio,
    pub sources: Vec<ImportSource>,
}

impl ParsedImport {
    pub fn positions(&self) -> &[Position] {
        &self.portfolio.positions
    }
}
