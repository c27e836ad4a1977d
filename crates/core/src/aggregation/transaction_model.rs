use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Economic effect of one history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Buy {
        quantity: Decimal,
        price: Decimal,
        fees: Decimal,
    },
    Sell {
        quantity: Decimal,
        price: Decimal,
    },
    /// Cash distribution. Informational only.
    Dividend { amount: Decimal },
    /// `ratio` new shares per old share (2 for a 2:1 split, 0.1 for 1:10 reverse).
    Split { ratio: Decimal },
    /// Split reported as the number of shares delivered on top of the existing holding.
    SplitShares { quantity: Decimal },
}

/// A dated event from a transaction-history export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub date: DateTime<Utc>,
    pub symbol: String,
    pub name: String,
    pub isin: Option<String>,
    pub currency: String,
    pub asset_type: Option<String>,
    /// Rate from `currency` into the account base currency, when the export has one.
    pub fx_rate: Option<Decimal>,
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn new(
        date: DateTime<Utc>,
        symbol: impl Into<String>,
        currency: impl Into<String>,
        kind: TransactionKind,
    ) -> Self {
        Transaction {
            date,
            symbol: symbol.into(),
            name: String::new(),
            isin: None,
            currency: currency.into(),
            asset_type: None,
            fx_rate: None,
            kind,
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Transaction {
            name: name.into(),
            ..self
        }
    }

    pub fn with_isin(self, isin: Option<String>) -> Self {
        let isin = isin
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());
        Transaction { isin, ..self }
    }

    pub fn with_asset_type(self, asset_type: impl Into<String>) -> Self {
        Transaction {
            asset_type: Some(asset_type.into()),
            ..self
        }
    }

    pub fn with_fx_rate(self, fx_rate: Option<Decimal>) -> Self {
        Transaction { fx_rate, ..self }
    }
}
