/// Quantity threshold below which a holding counts as closed
pub const QUANTITY_THRESHOLD: &str = "0.00000001";

/// Decimal precision used when recomputing prices
pub const DECIMAL_PRECISION: u32 = 8;

/// Currency assumed when an export carries none
pub const DEFAULT_CURRENCY: &str = "USD";

/// Number of non-empty lines inspected when sniffing a dialect
pub const DEFAULT_DETECTION_LINE_LIMIT: usize = 40;

/// Prefix of deterministic position identifiers
pub const POSITION_ID_PREFIX: &str = "POS";

/// Name given to a portfolio created by an import into an empty store
pub const DEFAULT_PORTFOLIO_NAME: &str = "Imported Portfolio";
