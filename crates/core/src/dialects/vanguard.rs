//! Vanguard "OfxDownload" export.
//!
//! The file holds one positions block per account followed by a transaction
//! block. A positions block runs from its header to the next blank line or
//! the next header of any kind.

use super::asset_type::infer_asset_type;
use super::csv_reader::{header_matches, read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{optional_amount, required_amount, HoldingRow};
use crate::errors::{ImportError, ImportResult};
use crate::portfolio::Position;
use crate::utils::{AmountHints, NumberFormat};

const DIALECT: BrokerId = BrokerId::Vanguard;
const SIGNATURE: [&str; 5] = [
    "Account Number",
    "Investment Name",
    "Symbol",
    "Shares",
    "Total Value",
];

pub fn is_header_row(line: &str) -> bool {
    header_matches(line, b',', &SIGNATURE)
}

struct Columns {
    name: usize,
    symbol: usize,
    shares: usize,
    share_price: Option<usize>,
    total_value: usize,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        Ok(Columns {
            name: header.require("Investment Name", dialect)?,
            symbol: header.require("Symbol", dialect)?,
            shares: header.require("Shares", dialect)?,
            share_price: header.find("Share Price"),
            total_value: header.require("Total Value", dialect)?,
        })
    }
}

/// Any row that starts another block: the next account's positions or the transactions.
fn starts_new_block(record: &Record) -> bool {
    record.first().eq_ignore_ascii_case("Account Number")
}

fn parse_row(record: &Record, columns: &Columns, hints: &AmountHints) -> ImportResult<Option<Position>> {
    let symbol = record.cell(columns.symbol).to_string();
    let name = record.cell(columns.name).to_string();
    HoldingRow {
        asset_type: Some(infer_asset_type(&symbol, &name)),
        quantity: required_amount(record, columns.shares, "shares", hints)?,
        price: optional_amount(record, columns.share_price, hints)?,
        value: optional_amount(record, Some(columns.total_value), hints)?,
        currency: "USD".to_string(),
        symbol,
        name,
        ..Default::default()
    }
    .into_position(record.line)
    .map(Some)
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, b',');
    let hints = options.hints(NumberFormat::Us);
    let mut tally = RowTally::new(DIALECT);
    let mut columns: Option<Columns> = None;
    let mut found_header = false;

    for record in &records {
        if starts_new_block(record) {
            let header = HeaderIndex::new(record.cells());
            columns = if header.contains_all(&SIGNATURE) {
                found_header = true;
                Some(Columns::resolve(&header)?)
            } else {
                None
            };
            continue;
        }
        if record.after_blank {
            columns = None;
        }
        if let Some(columns) = &columns {
            tally.record(record.line, parse_row(record, columns, &hints))?;
        }
    }

    if !found_header {
        return Err(ImportError::unrecognized(DIALECT.as_str(), "positions header not found"));
    }
    Ok(tally.into_result())
}
