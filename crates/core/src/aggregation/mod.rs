//! Aggregation module - transaction histories folded into net holdings.

mod aggregator;
mod transaction_model;


pub use aggregator::{aggregate_transactions, InstrumentLedger, TransactionAggregator};
pub use transaction_model::{Transaction, TransactionKind};
