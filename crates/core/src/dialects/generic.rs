//! Permissive parser for CSV layouts no dialect claims.
//!
//! Columns are matched by common header names. The first record that names
//! a quantity column plus a symbol or name column is taken as the header.

use super::asset_type::resolve_asset_type;
use super::csv_reader::{detect_delimiter, read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{optional_amount, required_amount, HoldingRow};
use crate::errors::{ImportError, ImportResult};
use crate::portfolio::Position;
use crate::utils::{AmountHints, NumberFormat};

const DIALECT: BrokerId = BrokerId::Generic;

const SYMBOL_NAMES: [&str; 6] = ["symbol", "ticker", "ticker symbol", "code", "instrument", "wkn"];
const NAME_NAMES: [&str; 7] = [
    "name",
    "description",
    "security",
    "security name",
    "security description",
    "product",
    "holding",
];
const QUANTITY_NAMES: [&str; 8] = [
    "quantity",
    "qty",
    "shares",
    "units",
    "no. of shares",
    "number of shares",
    "position",
    "stück",
];
const PRICE_NAMES: [&str; 8] = [
    "price",
    "last price",
    "close price",
    "closing price",
    "market price",
    "current price",
    "unit price",
    "kurs",
];
const VALUE_NAMES: [&str; 6] = [
    "market value",
    "value",
    "current value",
    "total value",
    "position value",
    "wert",
];
const COST_NAMES: [&str; 5] = ["cost basis", "cost", "total cost", "book value", "purchase value"];
const CURRENCY_NAMES: [&str; 3] = ["currency", "ccy", "curr"];
const TYPE_NAMES: [&str; 6] = [
    "type",
    "asset type",
    "security type",
    "asset class",
    "asset category",
    "category",
];
const SECTOR_NAMES: [&str; 2] = ["sector", "industry"];
const EXCHANGE_NAMES: [&str; 3] = ["exchange", "market", "venue"];

struct Columns {
    symbol: Option<usize>,
    name: Option<usize>,
    quantity: usize,
    price: Option<usize>,
    value: Option<usize>,
    cost: Option<usize>,
    currency: Option<usize>,
    isin: Option<usize>,
    asset_type: Option<usize>,
    sector: Option<usize>,
    exchange: Option<usize>,
}

/// Exact header name first, then a column starting with the first candidate.
fn locate(header: &HeaderIndex, names: &[&str]) -> Option<usize> {
    header
        .find_any(names)
        .or_else(|| names.first().and_then(|n| header.find_prefix(n)))
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> Option<Self> {
        let quantity = locate(header, &QUANTITY_NAMES)?;
        let symbol = locate(header, &SYMBOL_NAMES);
        let name = locate(header, &NAME_NAMES);
        if symbol.is_none() && name.is_none() {
            return None;
        }
        Some(Columns {
            symbol,
            name,
            quantity,
            price: locate(header, &PRICE_NAMES),
            value: locate(header, &VALUE_NAMES),
            cost: locate(header, &COST_NAMES),
            currency: locate(header, &CURRENCY_NAMES),
            isin: header.find("isin"),
            asset_type: locate(header, &TYPE_NAMES),
            sector: locate(header, &SECTOR_NAMES),
            exchange: locate(header, &EXCHANGE_NAMES),
        })
    }
}

fn is_footer(record: &Record) -> bool {
    let first = record.first().to_lowercase();
    first.starts_with("total") || first.starts_with("summe") || first.starts_with("grand total")
}

fn parse_row(
    record: &Record,
    columns: &Columns,
    hints: &AmountHints,
    default_currency: &str,
) -> ImportResult<Option<Position>> {
    if is_footer(record) {
        return Ok(None);
    }
    let symbol = record.opt_cell(columns.symbol).to_string();
    let name = record.opt_cell(columns.name).to_string();
    let currency = match record.opt_cell(columns.currency) {
        "" => default_currency.to_string(),
        c => c.to_uppercase(),
    };

    HoldingRow {
        asset_type: Some(resolve_asset_type(
            record.opt_cell(columns.asset_type),
            &symbol,
            &name,
        )),
        quantity: required_amount(record, columns.quantity, "quantity", hints)?,
        price: optional_amount(record, columns.price, hints)?,
        value: optional_amount(record, columns.value, hints)?,
        cost_basis: optional_amount(record, columns.cost, hints)?,
        isin: Some(record.opt_cell(columns.isin).to_string()).filter(|s| !s.is_empty()),
        sector: record.opt_cell(columns.sector).to_string(),
        exchange: record.opt_cell(columns.exchange).to_string(),
        currency,
        symbol,
        name,
        ..Default::default()
    }
    .into_position(record.line)
    .map(Some)
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, detect_delimiter(text));
    let (header_at, columns) = records
        .iter()
        .enumerate()
        .find_map(|(i, r)| Columns::resolve(&HeaderIndex::new(r.cells())).map(|c| (i, c)))
        .ok_or_else(|| {
            ImportError::EmptyImport("no header with a quantity and a symbol or name column".into())
        })?;
    let rows = &records[header_at + 1..];
    if rows.is_empty() {
        return Err(ImportError::EmptyImport("header without data rows".into()));
    }
    let hints = options.hints(NumberFormat::Auto);

    let mut tally = RowTally::new(DIALECT);
    for record in rows {
        tally.record(
            record.line,
            parse_row(record, &columns, &hints, &options.default_currency),
        )?;
    }
    Ok(tally.into_result())
}
