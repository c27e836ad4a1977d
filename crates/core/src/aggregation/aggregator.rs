//! Folds transaction histories into net holdings.
//!
//! Average-cost bookkeeping only: a sell removes the sold fraction of the
//! cost basis, nothing is realized and no lots are tracked. Events whose
//! amounts would leave the `Decimal` range are logged and dropped.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use super::transaction_model::{Transaction, TransactionKind};
use crate::normalization::{canonical_symbol, normalize_name};
use crate::portfolio::{is_quantity_significant, Position, ASSET_TYPE_STOCKS};

/// Running state of one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentLedger {
    symbol: String,
    name: String,
    isin: Option<String>,
    currency: String,
    asset_type: Option<String>,
    fx_rate: Option<Decimal>,
    quantity: Decimal,
    cost_basis: Decimal,
    last_price: Decimal,
    dividends: Decimal,
    last_activity: Option<DateTime<Utc>>,
}

impl InstrumentLedger {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, currency: impl Into<String>) -> Self {
        InstrumentLedger {
            symbol: symbol.into(),
            name: name.into(),
            isin: None,
            currency: currency.into(),
            asset_type: None,
            fx_rate: None,
            quantity: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            last_price: Decimal::ZERO,
            dividends: Decimal::ZERO,
            last_activity: None,
        }
    }

    fn from_transaction(tx: &Transaction) -> Self {
        let mut ledger = InstrumentLedger::new(tx.symbol.clone(), tx.name.clone(), tx.currency.clone());
        ledger.isin = tx.isin.clone();
        ledger.asset_type = tx.asset_type.clone();
        ledger
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn cost_basis(&self) -> Decimal {
        self.cost_basis
    }

    pub fn dividends(&self) -> Decimal {
        self.dividends
    }

    pub fn average_cost(&self) -> Decimal {
        if is_quantity_significant(&self.quantity) {
            self.cost_basis
                .checked_div(self.quantity)
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }

    pub fn add_buy(&mut self, quantity: Decimal, price: Decimal, fees: Decimal) {
        if !quantity.is_sign_positive() || quantity.is_zero() {
            warn!(
                "Ignoring buy of non-positive quantity {} for {}",
                quantity, self.symbol
            );
            return;
        }
        let total_quantity = self.quantity.checked_add(quantity);
        let total_cost = quantity
            .checked_mul(price)
            .and_then(|gross| gross.checked_add(fees.abs()))
            .and_then(|cost| self.cost_basis.checked_add(cost));
        let (Some(total_quantity), Some(total_cost)) = (total_quantity, total_cost) else {
            warn!(
                "Ignoring buy of {} {} at {}: amount out of range",
                quantity, self.symbol, price
            );
            return;
        };
        self.quantity = total_quantity;
        self.cost_basis = total_cost;
        self.last_price = price;
    }

    pub fn add_sell(&mut self, quantity: Decimal, price: Decimal) {
        if !quantity.is_sign_positive() || quantity.is_zero() {
            warn!(
                "Ignoring sell of non-positive quantity {} for {}",
                quantity, self.symbol
            );
            return;
        }
        if !price.is_zero() {
            self.last_price = price;
        }
        if quantity >= self.quantity {
            if quantity > self.quantity {
                warn!(
                    "Sell of {} {} exceeds held quantity {}. Position closed.",
                    quantity, self.symbol, self.quantity
                );
            }
            self.quantity = Decimal::ZERO;
            self.cost_basis = Decimal::ZERO;
            return;
        }
        let removed_cost = self
            .cost_basis
            .checked_mul(quantity)
            .and_then(|cost| cost.checked_div(self.quantity))
            .or_else(|| self.cost_basis.checked_mul(quantity / self.quantity))
            .unwrap_or(self.cost_basis);
        self.quantity -= quantity;
        self.cost_basis -= removed_cost;
    }

    pub fn add_dividend(&mut self, amount: Decimal) {
        self.dividends = self.dividends.saturating_add(amount);
    }

    /// Scales quantity by `ratio`; aggregate cost stays put so per-share cost shrinks.
    pub fn handle_split(&mut self, ratio: Decimal) {
        if !ratio.is_sign_positive() || ratio.is_zero() {
            warn!("Ignoring split with invalid ratio {} for {}", ratio, self.symbol);
            return;
        }
        match (self.quantity.checked_mul(ratio), self.last_price.checked_div(ratio)) {
            (Some(quantity), Some(price)) => {
                self.quantity = quantity;
                self.last_price = price;
            }
            _ => warn!("Ignoring split with out-of-range ratio {} for {}", ratio, self.symbol),
        }
    }

    /// Split expressed as shares delivered on top of the current holding.
    pub fn handle_split_shares(&mut self, delivered: Decimal) {
        if !is_quantity_significant(&self.quantity) {
            warn!(
                "Ignoring split delivery of {} shares for {} with no open holding",
                delivered, self.symbol
            );
            return;
        }
        match self
            .quantity
            .checked_add(delivered)
            .and_then(|total| total.checked_div(self.quantity))
        {
            Some(ratio) => self.handle_split(ratio),
            None => warn!(
                "Ignoring split delivery of {} shares for {}: amount out of range",
                delivered, self.symbol
            ),
        }
    }

    fn absorb_details(&mut self, tx: &Transaction) {
        if self.name.is_empty() && !tx.name.is_empty() {
            self.name = tx.name.clone();
        }
        if self.symbol.is_empty() && !tx.symbol.is_empty() {
            self.symbol = tx.symbol.clone();
        }
        if self.isin.is_none() {
            self.isin = tx.isin.clone();
        }
        if self.asset_type.is_none() {
            self.asset_type = tx.asset_type.clone();
        }
        if tx.fx_rate.is_some() {
            self.fx_rate = tx.fx_rate;
        }
        self.last_activity = Some(tx.date);
    }

    pub fn apply(&mut self, tx: &Transaction) {
        self.absorb_details(tx);
        match &tx.kind {
            TransactionKind::Buy {
                quantity,
                price,
                fees,
            } => self.add_buy(*quantity, *price, *fees),
            TransactionKind::Sell { quantity, price } => self.add_sell(*quantity, *price),
            TransactionKind::Dividend { amount } => self.add_dividend(*amount),
            TransactionKind::Split { ratio } => self.handle_split(*ratio),
            TransactionKind::SplitShares { quantity } => self.handle_split_shares(*quantity),
        }
    }

    /// Net holding, or `None` once the position is closed.
    pub fn to_position(&self) -> Option<Position> {
        if !self.quantity.is_sign_positive() || !is_quantity_significant(&self.quantity) {
            return None;
        }
        let value = self.quantity.saturating_mul(self.last_price);
        Some(Position {
            id: Uuid::new_v4().to_string(),
            isin: self.isin.clone(),
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            asset_type: self
                .asset_type
                .clone()
                .unwrap_or_else(|| ASSET_TYPE_STOCKS.to_string()),
            currency: self.currency.clone(),
            quantity: self.quantity,
            close_price: self.last_price,
            value,
            cost_basis: self.cost_basis,
            unrealized_pnl: value.saturating_sub(self.cost_basis),
            fx_rate_to_base: self.fx_rate.unwrap_or(Decimal::ONE),
            last_updated: self.last_activity.unwrap_or_else(Utc::now),
            ..Default::default()
        })
    }
}

/// Ledger key: ISIN, then canonical symbol, then normalized name.
fn ledger_key(tx: &Transaction) -> Option<String> {
    if let Some(isin) = tx.isin.as_deref().filter(|s| !s.is_empty()) {
        return Some(format!("ISIN|{}", isin));
    }
    let symbol = canonical_symbol(&tx.symbol);
    if !symbol.is_empty() {
        return Some(format!("SYMBOL|{}", symbol));
    }
    let name = normalize_name(&tx.name);
    if !name.is_empty() {
        return Some(format!("NAME|{}", name));
    }
    None
}

/// Per-instrument state machine over a chronologically ordered history.
#[derive(Debug, Default)]
pub struct TransactionAggregator {
    ledgers: Vec<InstrumentLedger>,
    index: HashMap<String, usize>,
    symbol_aliases: HashMap<String, usize>,
}

impl TransactionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorts by date and applies every event.
    ///
    /// The sort is stable: events sharing a timestamp are applied in input
    /// order, so newest-first exports must be reversed before they get here.
    pub fn from_transactions(mut transactions: Vec<Transaction>) -> Self {
        transactions.sort_by_key(|tx| tx.date);
        let mut aggregator = Self::new();
        for tx in &transactions {
            aggregator.apply(tx);
        }
        aggregator
    }

    pub fn apply(&mut self, tx: &Transaction) {
        let Some(key) = ledger_key(tx) else {
            debug!("Dropping transaction without instrument identity: {:?}", tx.kind);
            return;
        };

        // Exports that carry ISIN on trades but only a ticker on dividends still share one ledger.
        let symbol = canonical_symbol(&tx.symbol);
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => match self.symbol_aliases.get(&symbol).copied() {
                Some(idx) if !symbol.is_empty() => {
                    self.index.insert(key, idx);
                    idx
                }
                _ => {
                    let idx = self.ledgers.len();
                    self.ledgers.push(InstrumentLedger::from_transaction(tx));
                    self.index.insert(key, idx);
                    idx
                }
            },
        };
        if !symbol.is_empty() {
            self.symbol_aliases.entry(symbol).or_insert(idx);
        }
        self.ledgers[idx].apply(tx);
    }

    pub fn ledgers(&self) -> &[InstrumentLedger] {
        &self.ledgers
    }

    /// Open holdings in first-seen order.
    pub fn to_positions(&self) -> Vec<Position> {
        self.ledgers
            .iter()
            .filter_map(InstrumentLedger::to_position)
            .collect()
    }

    /// Dividends received per instrument, keyed by symbol (or name when there is none).
    pub fn dividend_income(&self) -> HashMap<String, Decimal> {
        self.ledgers
            .iter()
            .filter(|l| !l.dividends.is_zero())
            .map(|l| {
                let label = if l.symbol.is_empty() {
                    l.name.clone()
                } else {
                    l.symbol.clone()
                };
                (label, l.dividends)
            })
            .collect()
    }
}

/// Net positions of a transaction history.
pub fn aggregate_transactions(transactions: Vec<Transaction>) -> Vec<Position> {
    let count = transactions.len();
    let aggregator = TransactionAggregator::from_transactions(transactions);
    let positions = aggregator.to_positions();
    debug!(
        "Aggregated {} transactions into {} open positions ({} instruments seen)",
        count,
        positions.len(),
        aggregator.ledgers().len()
    );
    positions
}
