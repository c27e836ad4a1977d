use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Policy for a position that already exists when the same instrument arrives again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Sum quantities and amounts.
    #[default]
    Add,
    /// Incoming record wins; the existing id is kept.
    Replace,
    /// Existing record wins.
    Ignore,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Add => "add",
            MergeStrategy::Replace => "replace",
            MergeStrategy::Ignore => "ignore",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(MergeStrategy::Add),
            "replace" => Ok(MergeStrategy::Replace),
            "ignore" => Ok(MergeStrategy::Ignore),
            other => Err(ValidationError::UnknownMergeStrategy(other.to_string())),
        }
    }
}
