//! Low-level CSV access shared by every dialect.
//!
//! Decodes raw bytes, sniffs delimiters, reads flexible records with their
//! source line numbers, and resolves columns by header name.

use csv::{ReaderBuilder, Trim};
use encoding_rs::{UTF_16BE, UTF_16LE};
use log::{debug, warn};

use crate::errors::{ImportError, ImportResult};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Decodes statement bytes to text.
///
/// UTF-8 and UTF-16 byte-order marks are honored. BOM-less input that is not
/// valid UTF-8 is decoded with the encoding `chardetng` guesses for it.
pub fn decode_content(content: &[u8]) -> String {
    if let Some(rest) = content.strip_prefix(&UTF8_BOM[..]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if content.starts_with(&[0xFF, 0xFE]) {
        let (text, _) = UTF_16LE.decode_with_bom_removal(content);
        return text.into_owned();
    }
    if content.starts_with(&[0xFE, 0xFF]) {
        let (text, _) = UTF_16BE.decode_with_bom_removal(content);
        return text.into_owned();
    }

    match std::str::from_utf8(content) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(e) => {
            let mut detector = chardetng::EncodingDetector::new();
            detector.feed(content, true);
            let encoding = detector.guess(None, true);
            debug!(
                "Input is not UTF-8 (invalid at byte {}), decoding as {}",
                e.valid_up_to(),
                encoding.name()
            );
            let (text, _, had_errors) = encoding.decode(content);
            if had_errors {
                warn!(
                    "Some characters could not be decoded as {} and were replaced",
                    encoding.name()
                );
            }
            text.into_owned()
        }
    }
}

/// Picks the delimiter that splits the first lines into the most consistent column counts.
pub fn detect_delimiter(content: &str) -> u8 {
    let mut best_delimiter = b',';
    let mut best_score = 0usize;

    for delimiter in [b',', b';', b'\t'] {
        let score = score_delimiter(content, delimiter);
        if score > best_score {
            best_score = score;
            best_delimiter = delimiter;
        }
    }

    best_delimiter
}

/// Most common non-zero delimiter count times the number of lines sharing it.
fn score_delimiter(content: &str, delimiter: u8) -> usize {
    let counts: Vec<usize> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(10)
        .map(|line| line.bytes().filter(|b| *b == delimiter).count())
        .collect();

    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| c * counts.iter().filter(|&&other| other == c).count())
        .max()
        .unwrap_or(0)
}

/// One CSV record with trimmed cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based line the record starts on.
    pub line: usize,
    /// A blank line separates this record from the previous one.
    pub after_blank: bool,
    cells: Vec<String>,
}

impl Record {
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        Record {
            line,
            after_blank: false,
            cells,
        }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at `idx`, or `""` when the row is shorter.
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Cell for an optional column, `""` when the column is absent.
    pub fn opt_cell(&self, idx: Option<usize>) -> &str {
        idx.map(|i| self.cell(i)).unwrap_or("")
    }

    pub fn first(&self) -> &str {
        self.cell(0)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    fn line_span(&self) -> usize {
        1 + self
            .cells
            .iter()
            .map(|c| c.matches('\n').count())
            .sum::<usize>()
    }
}

/// Reads every non-blank record. Malformed records are logged and dropped.
pub fn read_records(content: &str, delimiter: u8) -> Vec<Record> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let mut records: Vec<Record> = Vec::new();
    let mut next_expected_line = 1usize;
    let mut pending_blank = false;

    for result in reader.records() {
        match result {
            Ok(raw) => {
                let line = raw.position().map(|p| p.line() as usize).unwrap_or(next_expected_line);
                let cells: Vec<String> = raw
                    .iter()
                    .map(|c| c.trim_matches(|ch: char| ch == '\u{feff}' || ch.is_whitespace()).to_string())
                    .collect();
                let mut record = Record::new(line, cells);
                if record.is_blank() {
                    pending_blank = true;
                    next_expected_line = line + 1;
                    continue;
                }
                record.after_blank = pending_blank || (!records.is_empty() && line > next_expected_line);
                pending_blank = false;
                next_expected_line = line + record.line_span();
                records.push(record);
            }
            Err(e) => debug!("Dropping unreadable CSV record: {}", e),
        }
    }

    records
}

/// Splits a single line with CSV quoting rules.
pub fn split_line(line: &str, delimiter: u8) -> Vec<String> {
    read_records(line, delimiter)
        .into_iter()
        .next()
        .map(|r| r.cells)
        .unwrap_or_default()
}

fn normalize_header(name: &str) -> String {
    name.trim_matches(|c: char| c == '"' || c == '\u{feff}' || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case-insensitive lookup of columns by header name.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    columns: Vec<String>,
}

impl HeaderIndex {
    pub fn new(cells: &[String]) -> Self {
        HeaderIndex {
            columns: cells.iter().map(|c| normalize_header(c)).collect(),
        }
    }

    pub fn from_line(line: &str, delimiter: u8) -> Self {
        Self::new(&split_line(line, delimiter))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Exact match after normalization.
    pub fn find(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header(name);
        self.columns.iter().position(|c| *c == wanted)
    }

    /// First of `names` that is present.
    pub fn find_any(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.find(n))
    }

    /// First column whose name starts with `prefix`, e.g. `book value` for `Book Value (CAD)`.
    pub fn find_prefix(&self, prefix: &str) -> Option<usize> {
        let wanted = normalize_header(prefix);
        self.columns.iter().position(|c| c.starts_with(&wanted))
    }

    pub fn contains_all(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.find(n).is_some())
    }

    /// Column that must exist for `dialect` to apply.
    pub fn require(&self, name: &str, dialect: &str) -> ImportResult<usize> {
        self.find(name).ok_or_else(|| {
            ImportError::unrecognized(dialect, format!("missing column '{}'", name))
        })
    }

    pub fn require_any(&self, names: &[&str], dialect: &str) -> ImportResult<usize> {
        self.find_any(names).ok_or_else(|| {
            ImportError::unrecognized(dialect, format!("missing column '{}'", names.join("' / '")))
        })
    }
}

/// True when `line` splits into a header containing every name in `required`.
pub fn header_matches(line: &str, delimiter: u8, required: &[&str]) -> bool {
    HeaderIndex::from_line(line, delimiter).contains_all(required)
}

/// Position of the first record whose cells form a header with all `required` names.
pub fn find_header(records: &[Record], required: &[&str]) -> Option<usize> {
    records
        .iter()
        .position(|r| HeaderIndex::new(r.cells()).contains_all(required))
}
