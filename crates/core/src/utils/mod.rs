//! Lexical helpers shared by the dialect parsers.

pub mod amount_utils;
pub mod date_utils;

pub use amount_utils::{
    format_amount, is_blank_amount, parse_amount, parse_optional_amount, AmountHints,
    NumberFormat,
};
pub use date_utils::{parse_date, DateLayout};
