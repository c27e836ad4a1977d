//! Dialects module - one parser per broker export format plus a generic fallback.

mod asset_type;
mod csv_reader;
mod dialect_registry;
mod dialects_model;
mod holding_row;

mod comdirect;
mod degiro;
mod etrade;
mod fidelity;
mod generic;
mod interactive_brokers;
mod revolut;
mod robinhood;
mod schwab;
mod trading212;
mod vanguard;
mod wealthsimple;
mod webull;


pub use asset_type::{asset_type_from_label, infer_asset_type, resolve_asset_type};
pub use csv_reader::{decode_content, detect_delimiter, read_records, HeaderIndex, Record};
pub use dialect_registry::DETECTION_ORDER;
pub use dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
