use sha2::{Digest, Sha256};
use std::fmt;

use super::symbol_utils::{canonical_symbol, normalize_name};
use crate::constants::POSITION_ID_PREFIX;
use crate::portfolio::Position;

/// Identity used to decide whether two positions describe the same instrument.
///
/// Precedence: ISIN, then canonical symbol with currency, then normalized
/// name with currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PositionKey {
    Isin(String),
    Symbol { symbol: String, currency: String },
    Name { name: String, currency: String },
}

impl PositionKey {
    /// `None` when the position carries no usable identity.
    pub fn for_position(position: &Position) -> Option<PositionKey> {
        if let Some(isin) = position
            .isin
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
        {
            return Some(PositionKey::Isin(isin));
        }

        let currency = position.currency.trim().to_uppercase();
        let symbol = canonical_symbol(&position.symbol);
        if !symbol.is_empty() {
            return Some(PositionKey::Symbol { symbol, currency });
        }

        let name = normalize_name(&position.name);
        if !name.is_empty() {
            return Some(PositionKey::Name { name, currency });
        }

        None
    }

    /// Deterministic position id: prefix plus the first 16 hex chars of the key's SHA-256.
    pub fn to_position_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_string().as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("{}-{}", POSITION_ID_PREFIX, &digest[..16])
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionKey::Isin(isin) => write!(f, "ISIN|{}", isin),
            PositionKey::Symbol { symbol, currency } => write!(f, "SYMBOL|{}|{}", symbol, currency),
            PositionKey::Name { name, currency } => write!(f, "NAME|{}|{}", name, currency),
        }
    }
}
