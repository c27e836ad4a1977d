//! Locale-aware amount parsing and formatting.
//!
//! Broker exports disagree on almost everything about numbers: decimal mark,
//! thousands grouping, where the currency goes, and how a negative is written.
//! Everything here funnels into `rust_decimal::Decimal`.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{ImportError, ImportResult};

lazy_static! {
    /// Leading ISO currency code, e.g. "USD 240.50"
    static ref LEADING_CURRENCY_CODE: Regex =
        Regex::new(r"^[A-Za-z]{3}\s*").expect("Invalid regex pattern");

    /// Trailing ISO currency code, e.g. "1.234,56 EUR"
    static ref TRAILING_CURRENCY_CODE: Regex =
        Regex::new(r"\s*[A-Za-z]{3}$").expect("Invalid regex pattern");
}

const CURRENCY_SYMBOLS: [char; 8] = ['$', '€', '£', '¥', '₹', '₩', '₣', '¢'];

/// Tokens some brokers print instead of leaving a cell blank.
const EMPTY_AMOUNT_TOKENS: [&str; 6] = ["--", "-", "n/a", "na", "null", "none"];

/// Decimal convention of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// `1,234.56`
    #[default]
    Us,
    /// `1.234,56`
    European,
    /// Decide per value from the rightmost separator.
    Auto,
}

/// Per-dialect hints for [`parse_amount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AmountHints {
    pub format: NumberFormat,
    /// Divide percent values by 100 instead of keeping them as printed.
    pub percent_as_fraction: bool,
}

impl AmountHints {
    pub const US: AmountHints = AmountHints {
        format: NumberFormat::Us,
        percent_as_fraction: false,
    };

    pub const EUROPEAN: AmountHints = AmountHints {
        format: NumberFormat::European,
        percent_as_fraction: false,
    };

    pub const AUTO: AmountHints = AmountHints {
        format: NumberFormat::Auto,
        percent_as_fraction: false,
    };

    pub fn with_percent_as_fraction(self, percent_as_fraction: bool) -> Self {
        AmountHints {
            percent_as_fraction,
            ..self
        }
    }
}

/// Parses a broker amount such as `$1,234.56`, `1.234,56 €`, `(43.64)`,
/// `-$12.00`, `USD 240.50`, `@479.95` or `12.5%`.
pub fn parse_amount(text: &str, hints: &AmountHints) -> ImportResult<Decimal> {
    let malformed = || ImportError::MalformedNumber(text.trim().to_string());

    let mut s = text.trim().trim_matches('"').trim().to_string();
    if s.is_empty() {
        return Err(malformed());
    }

    let mut negative = false;

    // Parentheses may wrap the currency symbol or sit inside it: ($43.64) / $(43.64)
    if let Some(inner) = strip_parentheses(&s) {
        negative = true;
        s = inner;
    }

    s = strip_currency(&s);

    if let Some(inner) = strip_parentheses(&s) {
        negative = !negative;
        s = inner;
    }

    // Sign before or after the currency has been removed above; here it can lead or trail.
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.trim_start().to_string();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start().to_string();
    } else if let Some(rest) = s.strip_suffix('-') {
        negative = !negative;
        s = rest.trim_end().to_string();
    }

    // A currency symbol can also follow the sign: -$12.00
    s = strip_currency(&s);

    let mut percent = false;
    if let Some(rest) = s.strip_suffix('%') {
        percent = true;
        s = rest.trim_end().to_string();
    }

    let body: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}' && *c != '\'')
        .collect();

    if body.is_empty() || !body.chars().any(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let mut value = if body.contains(|c| c == 'e' || c == 'E') {
        Decimal::from_scientific(&body)
            .or_else(|_| Decimal::from_str(&body))
            .map_err(|_| malformed())?
    } else {
        if !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
            return Err(malformed());
        }
        let decimal_separator = match hints.format {
            NumberFormat::Us => '.',
            NumberFormat::European => ',',
            NumberFormat::Auto => infer_decimal_separator(&body),
        };
        let normalized = normalize_separators(&body, decimal_separator).ok_or_else(malformed)?;
        Decimal::from_str(&normalized).map_err(|_| malformed())?
    };

    if negative {
        value = -value;
    }
    if percent && hints.percent_as_fraction {
        value /= Decimal::ONE_HUNDRED;
    }
    Ok(value)
}

/// Like [`parse_amount`] but blank cells and placeholder tokens (`--`, `N/A`) yield `None`.
pub fn parse_optional_amount(text: &str, hints: &AmountHints) -> ImportResult<Option<Decimal>> {
    if is_blank_amount(text) {
        return Ok(None);
    }
    parse_amount(text, hints).map(Some)
}

pub fn is_blank_amount(text: &str) -> bool {
    let trimmed = text.trim().trim_matches('"').trim();
    trimmed.is_empty()
        || EMPTY_AMOUNT_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Renders `value` in the given convention with thousands grouping.
/// `Auto` renders like `Us`.
pub fn format_amount(value: Decimal, format: NumberFormat, decimals: u32) -> String {
    let (decimal_separator, thousands_separator) = match format {
        NumberFormat::European => (',', '.'),
        NumberFormat::Us | NumberFormat::Auto => ('.', ','),
    };

    let rounded = value.round_dp(decimals);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.*}", decimals as usize, rounded.abs());
    let (integer_part, fraction_part) = match plain.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (plain.clone(), None),
    };

    let mut grouped = String::with_capacity(integer_part.len() + integer_part.len() / 3);
    for (idx, ch) in integer_part.chars().enumerate() {
        if idx > 0 && (integer_part.len() - idx) % 3 == 0 {
            grouped.push(thousands_separator);
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(fraction) = fraction_part {
        out.push(decimal_separator);
        out.push_str(&fraction);
    }
    out
}

fn strip_parentheses(s: &str) -> Option<String> {
    s.strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .map(|inner| inner.trim().to_string())
}

fn strip_currency(s: &str) -> String {
    let mut out = s
        .trim()
        .trim_start_matches('@')
        .trim_start_matches(|c| CURRENCY_SYMBOLS.contains(&c))
        .trim_end_matches(|c| CURRENCY_SYMBOLS.contains(&c))
        .trim()
        .to_string();
    out = LEADING_CURRENCY_CODE.replace(&out, "").to_string();
    out = TRAILING_CURRENCY_CODE.replace(&out, "").to_string();
    out.trim().to_string()
}

/// Picks the decimal mark for a body made of digits, `.` and `,`.
fn infer_decimal_separator(body: &str) -> char {
    let dots = body.matches('.').count();
    let commas = body.matches(',').count();
    match (body.rfind('.'), body.rfind(',')) {
        (Some(dot), Some(comma)) => {
            if dot > comma {
                '.'
            } else {
                ','
            }
        }
        (Some(_), None) => {
            if dots > 1 {
                ','
            } else {
                '.'
            }
        }
        (None, Some(comma)) => {
            let digits_after = body.len() - comma - 1;
            if commas > 1 || (digits_after == 3 && comma > 0) {
                '.'
            } else {
                ','
            }
        }
        (None, None) => '.',
    }
}

/// Removes thousands separators and rewrites the decimal mark as `.`.
/// Returns `None` when the grouping is inconsistent with the convention.
fn normalize_separators(body: &str, decimal_separator: char) -> Option<String> {
    let thousands_separator = if decimal_separator == '.' { ',' } else { '.' };

    if body.matches(decimal_separator).count() > 1 {
        return None;
    }

    let (integer_part, fraction_part) = match body.split_once(decimal_separator) {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };

    if let Some(fraction) = fraction_part {
        if fraction.contains(thousands_separator) {
            return None;
        }
    }

    let groups: Vec<&str> = integer_part.split(thousands_separator).collect();
    if groups.len() > 1 {
        let first_ok = !groups[0].is_empty() && groups[0].len() <= 3;
        let rest_ok = groups[1..].iter().all(|g| g.len() == 3);
        if !first_ok || !rest_ok {
            return None;
        }
    }

    let mut normalized: String = groups.concat();
    if normalized.is_empty() {
        normalized.push('0');
    }
    if let Some(fraction) = fraction_part {
        normalized.push('.');
        normalized.push_str(fraction);
    }
    Some(normalized)
}
