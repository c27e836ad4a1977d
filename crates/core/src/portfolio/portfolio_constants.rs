/// Asset types
///
/// Closed vocabulary for `Position::asset_type`. Parsers map explicit type
/// columns onto it and fall back to keyword inference on descriptive text.

/// Common and preferred shares. Default when nothing else matches.
pub const ASSET_TYPE_STOCKS: &str = "stocks";

/// Exchange-traded funds and closed-end funds.
pub const ASSET_TYPE_ETF: &str = "etf";

/// Government and corporate bonds, notes, bills.
pub const ASSET_TYPE_BONDS: &str = "bonds";

/// Mutual funds and index funds that do not trade on an exchange.
pub const ASSET_TYPE_FUNDS: &str = "funds";

/// Listed options contracts.
pub const ASSET_TYPE_OPTIONS: &str = "options";

/// Cryptocurrencies.
pub const ASSET_TYPE_CRYPTO: &str = "crypto";

/// Cash balances and money market sweep funds.
pub const ASSET_TYPE_CASH: &str = "cash";

pub const ALL_ASSET_TYPES: [&str; 7] = [
    ASSET_TYPE_STOCKS,
    ASSET_TYPE_ETF,
    ASSET_TYPE_BONDS,
    ASSET_TYPE_FUNDS,
    ASSET_TYPE_OPTIONS,
    ASSET_TYPE_CRYPTO,
    ASSET_TYPE_CASH,
];

pub fn is_known_asset_type(asset_type: &str) -> bool {
    ALL_ASSET_TYPES.contains(&asset_type)
}
