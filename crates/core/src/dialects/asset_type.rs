//! Asset-type inference from broker labels and descriptive text.

use lazy_static::lazy_static;
use regex::Regex;

use crate::portfolio::{
    ASSET_TYPE_BONDS, ASSET_TYPE_CASH, ASSET_TYPE_CRYPTO, ASSET_TYPE_ETF, ASSET_TYPE_FUNDS,
    ASSET_TYPE_OPTIONS, ASSET_TYPE_STOCKS,
};

lazy_static! {
    /// OCC option symbol, e.g. "AAPL240119C00150000" or "AAPL  240119P00150000"
    static ref OCC_OPTION_SYMBOL: Regex =
        Regex::new(r"^[A-Z]{1,6}\s*\d{6}[CP]\d{8}$").expect("Invalid regex pattern");

    /// Human-readable option description, e.g. "AAPL 01/19/2024 150.00 C"
    static ref OPTION_DESCRIPTION: Regex =
        Regex::new(r"\b(CALL|PUT)\b|\d{2}/\d{2}/\d{4}\s+\d+(\.\d+)?\s+[CP]$").expect("Invalid regex pattern");

    /// Coupon rate in a bond description, e.g. "4.125% 15/11/2032"
    static ref COUPON_RATE: Regex =
        Regex::new(r"\d+(\.\d+)?\s?%\s+\d").expect("Invalid regex pattern");

    /// US mutual fund ticker: five letters ending in X
    static ref MUTUAL_FUND_TICKER: Regex =
        Regex::new(r"^[A-Z]{4}X$").expect("Invalid regex pattern");
}

const CRYPTO_SYMBOLS: [&str; 12] = [
    "BTC", "ETH", "SOL", "ADA", "XRP", "DOGE", "DOT", "LTC", "AVAX", "MATIC", "USDC", "USDT",
];

const ETF_KEYWORDS: [&str; 8] = [
    " ETF", "UCITS", "ISHARES", "SPDR", " ETN", "VANECK", "XTRACKERS", "INDEX TRUST",
];

const BOND_KEYWORDS: [&str; 7] = [
    "BOND", "TREASURY", "T-BILL", "NOTE DUE", "ANLEIHE", "GILT", "DEBENTURE",
];

const FUND_KEYWORDS: [&str; 5] = ["FUND", "FONDS", "ADMIRAL", "INVESTOR SHARES", "PORTFOLIO"];

const CASH_KEYWORDS: [&str; 5] = [
    "MONEY MARKET",
    "CASH",
    "SWEEP",
    "GOVERNMENT PORTFOLIO",
    "FDIC",
];

/// Maps an explicit security-type label (`Equity`, `ETFs & Closed End Funds`,
/// `Mutual Fund`, `Option`, `CRYPTO`, ...) to the asset-type vocabulary.
pub fn asset_type_from_label(label: &str) -> Option<&'static str> {
    let label = label.trim().replace('_', " ").to_uppercase();
    if label.is_empty() {
        return None;
    }
    let asset_type = if label.contains("OPTION") || label == "OPT" {
        ASSET_TYPE_OPTIONS
    } else if label.contains("ETF") || label.contains("EXCHANGE TRADED") || label.contains("ETP") {
        ASSET_TYPE_ETF
    } else if label.contains("CASH") || label.contains("MONEY MARKET") || label == "FOREX" {
        ASSET_TYPE_CASH
    } else if label.contains("CRYPTO") {
        ASSET_TYPE_CRYPTO
    } else if label.contains("BOND") || label.contains("FIXED INCOME") || label == "BILL" {
        ASSET_TYPE_BONDS
    } else if label.contains("FUND") {
        ASSET_TYPE_FUNDS
    } else if label.contains("STOCK")
        || label.contains("EQUIT")
        || label.contains("SHARE")
        || label == "STK"
        || label == "AKTIE"
    {
        ASSET_TYPE_STOCKS
    } else {
        return None;
    };
    Some(asset_type)
}

/// Guesses the asset type from the ticker and description when the export has no type column.
pub fn infer_asset_type(symbol: &str, name: &str) -> &'static str {
    let symbol = symbol.trim().to_uppercase();
    let name = format!(" {} ", name.trim().to_uppercase());

    if symbol.ends_with("**") || CASH_KEYWORDS.iter().any(|k| name.contains(k)) {
        return ASSET_TYPE_CASH;
    }
    if OCC_OPTION_SYMBOL.is_match(&symbol) || OPTION_DESCRIPTION.is_match(name.trim()) {
        return ASSET_TYPE_OPTIONS;
    }
    if ETF_KEYWORDS.iter().any(|k| name.contains(k)) {
        return ASSET_TYPE_ETF;
    }
    let bare_symbol = symbol.split(|c| c == '-' || c == '/').next().unwrap_or("");
    if CRYPTO_SYMBOLS.contains(&bare_symbol) || name.contains("BITCOIN") || name.contains("ETHEREUM") {
        return ASSET_TYPE_CRYPTO;
    }
    if BOND_KEYWORDS.iter().any(|k| name.contains(k)) || COUPON_RATE.is_match(&name) {
        return ASSET_TYPE_BONDS;
    }
    if FUND_KEYWORDS.iter().any(|k| name.contains(k)) || MUTUAL_FUND_TICKER.is_match(&symbol) {
        return ASSET_TYPE_FUNDS;
    }
    ASSET_TYPE_STOCKS
}

/// Label when present and recognized, inference otherwise.
pub fn resolve_asset_type(label: &str, symbol: &str, name: &str) -> &'static str {
    asset_type_from_label(label).unwrap_or_else(|| infer_asset_type(symbol, name))
}
