//! Closed dispatch from [`BrokerId`] to its parser.

use super::dialects_model::{BrokerId, ParseOptions, ParserResult};
use super::{
    comdirect, degiro, etrade, fidelity, generic, interactive_brokers, revolut, robinhood, schwab,
    trading212, vanguard, wealthsimple, webull,
};
use crate::errors::ImportResult;

/// Header sniffing order. Most distinctive signatures come first so that
/// dialects with overlapping column names do not shadow each other.
pub const DETECTION_ORDER: [BrokerId; 12] = [
    BrokerId::Comdirect,
    BrokerId::InteractiveBrokers,
    BrokerId::Vanguard,
    BrokerId::Trading212,
    BrokerId::Degiro,
    BrokerId::Revolut,
    BrokerId::Robinhood,
    BrokerId::Webull,
    BrokerId::Wealthsimple,
    BrokerId::Schwab,
    BrokerId::Fidelity,
    BrokerId::Etrade,
];

impl BrokerId {
    /// Runs this dialect's parser over decoded text.
    pub fn parse(&self, text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
        match self {
            BrokerId::Schwab => schwab::parse(text, options),
            BrokerId::Fidelity => fidelity::parse(text, options),
            BrokerId::Vanguard => vanguard::parse(text, options),
            BrokerId::InteractiveBrokers => interactive_brokers::parse(text, options),
            BrokerId::Etrade => etrade::parse(text, options),
            BrokerId::Comdirect => comdirect::parse(text, options),
            BrokerId::Wealthsimple => wealthsimple::parse(text, options),
            BrokerId::Robinhood => robinhood::parse(text, options),
            BrokerId::Trading212 => trading212::parse(text, options),
            BrokerId::Revolut => revolut::parse(text, options),
            BrokerId::Webull => webull::parse(text, options),
            BrokerId::Degiro => degiro::parse(text, options),
            BrokerId::Generic => generic::parse(text, options),
        }
    }

    /// Whether `line` looks like this dialect's header. The generic parser claims nothing.
    pub fn is_header_row(&self, line: &str) -> bool {
        match self {
            BrokerId::Schwab => schwab::is_header_row(line),
            BrokerId::Fidelity => fidelity::is_header_row(line),
            BrokerId::Vanguard => vanguard::is_header_row(line),
            BrokerId::InteractiveBrokers => interactive_brokers::is_header_row(line),
            BrokerId::Etrade => etrade::is_header_row(line),
            BrokerId::Comdirect => comdirect::is_header_row(line),
            BrokerId::Wealthsimple => wealthsimple::is_header_row(line),
            BrokerId::Robinhood => robinhood::is_header_row(line),
            BrokerId::Trading212 => trading212::is_header_row(line),
            BrokerId::Revolut => revolut::is_header_row(line),
            BrokerId::Webull => webull::is_header_row(line),
            BrokerId::Degiro => degiro::is_header_row(line),
            BrokerId::Generic => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_order_covers_every_named_dialect() {
        for broker in BrokerId::ALL {
            let listed = DETECTION_ORDER.contains(&broker);
            assert_eq!(listed, broker != BrokerId::Generic, "{}", broker);
        }
    }

    #[test]
    fn test_generic_never_claims_a_header() {
        assert!(!BrokerId::Generic.is_header_row("Symbol,Quantity,Price"));
    }
}
