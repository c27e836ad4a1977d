use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::aggregation::{Transaction, TransactionAggregator};
use crate::constants::DEFAULT_CURRENCY;
use crate::errors::{ImportResult, ValidationError};
use crate::portfolio::{Portfolio, Position};
use crate::utils::{AmountHints, NumberFormat};

/// The fixed set of supported export dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerId {
    Schwab,
    Fidelity,
    Vanguard,
    InteractiveBrokers,
    Etrade,
    Comdirect,
    Wealthsimple,
    Robinhood,
    Trading212,
    Revolut,
    Webull,
    Degiro,
    /// Permissive fallback for unrecognized CSV layouts.
    Generic,
}

impl BrokerId {
    pub const ALL: [BrokerId; 13] = [
        BrokerId::Schwab,
        BrokerId::Fidelity,
        BrokerId::Vanguard,
        BrokerId::InteractiveBrokers,
        BrokerId::Etrade,
        BrokerId::Comdirect,
        BrokerId::Wealthsimple,
        BrokerId::Robinhood,
        BrokerId::Trading212,
        BrokerId::Revolut,
        BrokerId::Webull,
        BrokerId::Degiro,
        BrokerId::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerId::Schwab => "schwab",
            BrokerId::Fidelity => "fidelity",
            BrokerId::Vanguard => "vanguard",
            BrokerId::InteractiveBrokers => "interactive_brokers",
            BrokerId::Etrade => "etrade",
            BrokerId::Comdirect => "comdirect",
            BrokerId::Wealthsimple => "wealthsimple",
            BrokerId::Robinhood => "robinhood",
            BrokerId::Trading212 => "trading212",
            BrokerId::Revolut => "revolut",
            BrokerId::Webull => "webull",
            BrokerId::Degiro => "degiro",
            BrokerId::Generic => "generic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BrokerId::Schwab => "Charles Schwab",
            BrokerId::Fidelity => "Fidelity",
            BrokerId::Vanguard => "Vanguard",
            BrokerId::InteractiveBrokers => "Interactive Brokers",
            BrokerId::Etrade => "E*TRADE",
            BrokerId::Comdirect => "comdirect",
            BrokerId::Wealthsimple => "Wealthsimple",
            BrokerId::Robinhood => "Robinhood",
            BrokerId::Trading212 => "Trading 212",
            BrokerId::Revolut => "Revolut",
            BrokerId::Webull => "Webull",
            BrokerId::Degiro => "DEGIRO",
            BrokerId::Generic => "Generic CSV",
        }
    }

    /// Dialects whose rows are dated events rather than holdings.
    pub fn is_transaction_history(&self) -> bool {
        matches!(
            self,
            BrokerId::Robinhood
                | BrokerId::Trading212
                | BrokerId::Revolut
                | BrokerId::Webull
                | BrokerId::Degiro
        )
    }
}

impl fmt::Display for BrokerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrokerId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '*'))
            .collect();
        match key.as_str() {
            "schwab" | "charlesschwab" => Ok(BrokerId::Schwab),
            "fidelity" => Ok(BrokerId::Fidelity),
            "vanguard" => Ok(BrokerId::Vanguard),
            "interactive_brokers" | "interactivebrokers" | "ibkr" | "ib" => {
                Ok(BrokerId::InteractiveBrokers)
            }
            "etrade" => Ok(BrokerId::Etrade),
            "comdirect" => Ok(BrokerId::Comdirect),
            "wealthsimple" => Ok(BrokerId::Wealthsimple),
            "robinhood" => Ok(BrokerId::Robinhood),
            "trading212" | "t212" => Ok(BrokerId::Trading212),
            "revolut" => Ok(BrokerId::Revolut),
            "webull" => Ok(BrokerId::Webull),
            "degiro" => Ok(BrokerId::Degiro),
            "generic" | "csv" => Ok(BrokerId::Generic),
            _ => Err(ValidationError::UnknownBroker(s.trim().to_string())),
        }
    }
}

/// Caller-tunable knobs every dialect parser receives.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Currency for rows that do not state one.
    pub default_currency: String,
    pub percent_as_fraction: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            default_currency: DEFAULT_CURRENCY.to_string(),
            percent_as_fraction: false,
        }
    }
}

impl ParseOptions {
    pub fn hints(&self, format: NumberFormat) -> AmountHints {
        AmountHints {
            format,
            percent_as_fraction: self.percent_as_fraction,
        }
    }
}

/// Counts rows as they are extracted.
///
/// `Ok(Some(_))` is usable, `Ok(None)` is a well-formed row with nothing to
/// import (cash, deposits, cancelled orders), row-level errors are skipped.
/// Any other error aborts the file.
#[derive(Debug)]
pub struct RowTally<T> {
    broker: BrokerId,
    items: Vec<T>,
    skipped: usize,
    ignored: usize,
    newest_first: bool,
}

impl<T> RowTally<T> {
    pub fn new(broker: BrokerId) -> Self {
        RowTally {
            broker,
            items: Vec::new(),
            skipped: 0,
            ignored: 0,
            newest_first: false,
        }
    }

    /// Tally for exports that list the most recent row first.
    pub fn newest_first(broker: BrokerId) -> Self {
        RowTally {
            newest_first: true,
            ..Self::new(broker)
        }
    }

    pub fn record(&mut self, line: usize, outcome: ImportResult<Option<T>>) -> ImportResult<()> {
        match outcome {
            Ok(Some(item)) => self.items.push(item),
            Ok(None) => self.ignored += 1,
            Err(e) if e.is_row_level() => {
                debug!("{}: skipping line {}: {}", self.broker, line, e);
                self.skipped += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    pub fn usable(&self) -> usize {
        self.items.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn log_summary(broker: BrokerId, usable: usize, skipped: usize, ignored: usize, positions: usize) {
    info!(
        "{}: {} usable rows, {} skipped, {} ignored -> {} positions",
        broker.display_name(),
        usable,
        skipped,
        ignored,
        positions
    );
}

impl RowTally<Position> {
    pub fn into_result(self) -> ParserResult {
        let usable_rows = self.items.len();
        log_summary(self.broker, usable_rows, self.skipped, self.ignored, usable_rows);
        ParserResult {
            broker: self.broker,
            usable_rows,
            skipped_rows: self.skipped,
            portfolio: Portfolio::from_positions(self.items),
            auto_detected: false,
        }
    }
}

impl RowTally<Transaction> {
    /// Folds the collected history into net positions.
    ///
    /// Rows are put back in chronological order first so that same-day
    /// events keep their real sequence through the stable date sort.
    pub fn into_result(mut self) -> ParserResult {
        let usable_rows = self.items.len();
        if self.newest_first {
            self.items.reverse();
        }
        let positions = TransactionAggregator::from_transactions(self.items).to_positions();
        log_summary(self.broker, usable_rows, self.skipped, self.ignored, positions.len());
        ParserResult {
            broker: self.broker,
            usable_rows,
            skipped_rows: self.skipped,
            portfolio: Portfolio::from_positions(positions),
            auto_detected: false,
        }
    }
}

/// Output of one dialect parser for one file.
#[derive(Debug, Clone)]
pub struct ParserResult {
    pub broker: BrokerId,
    /// Throwaway portfolio; only `positions` is meaningful.
    pub portfolio: Portfolio,
    pub usable_rows: usize,
    pub skipped_rows: usize,
    /// Chosen by header sniffing rather than by the caller.
    pub auto_detected: bool,
}

impl ParserResult {
    pub fn positions(&self) -> &[Position] {
        &self.portfolio.positions
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.portfolio.positions
    }

    pub fn with_auto_detected(self, auto_detected: bool) -> Self {
        ParserResult {
            auto_detected,
            ..self
        }
    }
}
