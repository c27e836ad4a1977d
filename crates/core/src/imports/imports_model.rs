use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CURRENCY, DEFAULT_DETECTION_LINE_LIMIT};
use crate::dialects::{BrokerId, ParseOptions};
use crate::errors::{Result, ValidationError};
use crate::merge::MergeStrategy;

const PDF_MAGIC: &[u8] = b"%PDF";

/// One uploaded statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFile {
    pub file_name: String,
    pub content: Vec<u8>,
    /// Dialect named by the caller. `None` means detect.
    pub broker: Option<BrokerId>,
}

impl ImportFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        ImportFile {
            file_name: file_name.into(),
            content: content.into(),
            broker: None,
        }
    }

    pub fn with_broker(self, broker: BrokerId) -> Self {
        ImportFile {
            broker: Some(broker),
            ..self
        }
    }

    /// Like [`with_broker`](Self::with_broker) for a caller-supplied identifier.
    /// Blank means detect.
    pub fn with_broker_id(self, broker_id: &str) -> Result<Self> {
        if broker_id.trim().is_empty() {
            return Ok(ImportFile {
                broker: None,
                ..self
            });
        }
        Ok(self.with_broker(broker_id.parse()?))
    }

    /// Binary documents go to the document importer instead of the CSV parsers.
    pub fn is_pdf(&self) -> bool {
        self.file_name.to_lowercase().ends_with(".pdf") || self.content.starts_with(PDF_MAGIC)
    }
}

/// Caller configuration for the import pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    /// Strategy used when the caller does not pass one (default: add)
    pub merge_strategy: Option<MergeStrategy>,
    /// Currency for rows that state none (default: "USD")
    pub default_currency: Option<String>,
    /// Read "12.5%" as 0.125 instead of 12.5 (default: false)
    pub percent_as_fraction: Option<bool>,
    /// Non-empty lines inspected when sniffing the dialect (default: 40)
    pub detection_line_limit: Option<usize>,
    /// Base currency of portfolios created by an import (default: "USD")
    pub base_currency: Option<String>,
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

impl ImportOptions {
    /// Parses and validates options from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: ImportOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.detection_line_limit == Some(0) {
            return Err(ValidationError::InvalidConfig(
                "detectionLineLimit must be at least 1".to_string(),
            )
            .into());
        }
        for (field, code) in [
            ("defaultCurrency", &self.default_currency),
            ("baseCurrency", &self.base_currency),
        ] {
            if let Some(code) = code {
                if !is_currency_code(code.trim()) {
                    return Err(ValidationError::InvalidConfig(format!(
                        "{} '{}' is not a currency code",
                        field, code
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    pub fn effective_merge_strategy(&self) -> MergeStrategy {
        self.merge_strategy.unwrap_or_default()
    }

    pub fn effective_default_currency(&self) -> String {
        self.default_currency
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
    }

    pub fn effective_percent_as_fraction(&self) -> bool {
        self.percent_as_fraction.unwrap_or(false)
    }

    pub fn effective_detection_line_limit(&self) -> usize {
        self.detection_line_limit
            .unwrap_or(DEFAULT_DETECTION_LINE_LIMIT)
    }

    pub fn effective_base_currency(&self) -> String {
        self.base_currency
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
    }

    /// Knobs handed to every dialect parser.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            default_currency: self.effective_default_currency(),
            percent_as_fraction: self.effective_percent_as_fraction(),
        }
    }
}
