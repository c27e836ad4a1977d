//! Interactive Brokers activity statement (CSV).
//!
//! Every row is prefixed with its section name and a row kind (`Header`,
//! `Data`, `Total`, ...). Holdings come from `Open Positions` summary rows;
//! ISIN, description and listing exchange are joined in from
//! `Financial Instrument Information`.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;

use super::asset_type::resolve_asset_type;
use super::csv_reader::{read_records, split_line, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{optional_amount, required_amount, HoldingRow};
use crate::errors::{ImportError, ImportResult};
use crate::portfolio::Position;
use crate::utils::{AmountHints, NumberFormat};

const DIALECT: BrokerId = BrokerId::InteractiveBrokers;
const OPEN_POSITIONS: &str = "Open Positions";
const INSTRUMENT_INFO: &str = "Financial Instrument Information";
const STATEMENT: &str = "Statement";

pub fn is_header_row(line: &str) -> bool {
    let cells = split_line(line, b',');
    cells.len() >= 3
        && cells[1] == "Header"
        && (cells[0] == OPEN_POSITIONS || (cells[0] == STATEMENT && cells[2] == "Field Name"))
}

#[derive(Debug, Clone, Default)]
struct InstrumentInfo {
    description: String,
    isin: Option<String>,
    exchange: String,
}

fn looks_like_isin(value: &str) -> bool {
    value.len() == 12
        && value.chars().take(2).all(|c| c.is_ascii_uppercase())
        && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Walks the statement once, tracking the latest header of every section.
struct Sections<'a> {
    headers: HashMap<&'a str, HeaderIndex>,
}

impl<'a> Sections<'a> {
    fn new() -> Self {
        Sections {
            headers: HashMap::new(),
        }
    }

    /// Returns the section header for a data row, updating state on header rows.
    fn observe(&mut self, record: &'a Record) -> Option<(&'a str, &HeaderIndex)> {
        let section = record.cell(0);
        match record.cell(1) {
            "Header" => {
                self.headers.insert(section, HeaderIndex::new(record.cells()));
                None
            }
            "Data" => self.headers.get(section).map(|h| (section, h)),
            _ => None,
        }
    }
}

fn statement_date(records: &[Record]) -> Option<DateTime<Utc>> {
    let period = records
        .iter()
        .find(|r| r.cell(0) == STATEMENT && r.cell(1) == "Data" && r.cell(2) == "Period")?
        .cell(3);
    // "December 1, 2023 - January 5, 2024" or a single day
    let last = period.rsplit(" - ").next()?.trim();
    NaiveDate::parse_from_str(last, "%B %d, %Y")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn instrument_info(records: &[Record]) -> HashMap<String, InstrumentInfo> {
    let mut sections = Sections::new();
    let mut info = HashMap::new();
    for record in records {
        let Some((section, header)) = sections.observe(record) else {
            continue;
        };
        if section != INSTRUMENT_INFO {
            continue;
        }
        let symbol = record.opt_cell(header.find("Symbol"));
        if symbol.is_empty() {
            continue;
        }
        let security_id = record.opt_cell(header.find_any(&["Security ID", "ISIN"]));
        info.insert(
            symbol.to_string(),
            InstrumentInfo {
                description: record.opt_cell(header.find("Description")).to_string(),
                isin: looks_like_isin(security_id).then(|| security_id.to_string()),
                exchange: record.opt_cell(header.find("Listing Exch")).to_string(),
            },
        );
    }
    info
}

fn parse_row(
    record: &Record,
    header: &HeaderIndex,
    instruments: &HashMap<String, InstrumentInfo>,
    hints: &AmountHints,
    as_of: Option<DateTime<Utc>>,
) -> ImportResult<Option<Position>> {
    // Lot rows repeat the summary per tax lot.
    if let Some(idx) = header.find("DataDiscriminator") {
        if !record.cell(idx).eq_ignore_ascii_case("Summary") {
            return Ok(None);
        }
    }

    let dialect = DIALECT.as_str();
    let symbol = record.cell(header.require("Symbol", dialect)?).to_string();
    let info = instruments.get(&symbol).cloned().unwrap_or_default();
    let category = record.opt_cell(header.find("Asset Category"));

    HoldingRow {
        asset_type: Some(resolve_asset_type(category, &symbol, &info.description)),
        quantity: required_amount(record, header.require("Quantity", dialect)?, "quantity", hints)?,
        price: optional_amount(record, header.find("Close Price"), hints)?,
        value: optional_amount(record, header.find("Value"), hints)?,
        cost_basis: optional_amount(record, header.find("Cost Basis"), hints)?,
        unrealized_pnl: optional_amount(record, header.find("Unrealized P/L"), hints)?,
        currency: record.opt_cell(header.find("Currency")).to_string(),
        isin: info.isin,
        exchange: info.exchange,
        name: info.description,
        symbol,
        as_of,
        ..Default::default()
    }
    .into_position(record.line)
    .map(Some)
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, b',');
    if !records
        .iter()
        .any(|r| r.cell(0) == OPEN_POSITIONS && r.cell(1) == "Header")
    {
        return Err(ImportError::unrecognized(DIALECT.as_str(), "no Open Positions section"));
    }

    let instruments = instrument_info(&records);
    let as_of = statement_date(&records);
    let hints = options.hints(NumberFormat::Us);

    let mut sections = Sections::new();
    let mut tally = RowTally::new(DIALECT);
    for record in &records {
        if let Some((OPEN_POSITIONS, header)) = sections.observe(record) {
            tally.record(record.line, parse_row(record, header, &instruments, &hints, as_of))?;
        }
    }
    Ok(tally.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{ASSET_TYPE_CASH, ASSET_TYPE_STOCKS};
    use chrono::Datelike;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "\
Statement,Header,Field Name,Field Value
Statement,Data,BrokerName,Interactive Brokers LLC
Statement,Data,Period,\"December 1, 2023 - January 5, 2024\"
Open Positions,Header,DataDiscriminator,Asset Category,Currency,Symbol,Quantity,Mult,Cost Price,Cost Basis,Close Price,Value,Unrealized P/L,Code
Open Positions,Data,Summary,Stocks,USD,AAPL,50,1,150.25,7512.5,185.92,9296,1783.5,
Open Positions,Data,Lot,Stocks,USD,AAPL,50,1,150.25,7512.5,185.92,9296,1783.5,
Open Positions,Data,Summary,Stocks,EUR,SAP,20,1,120.00,2400.00,140.50,2810.00,410.00,
Open Positions,Data,Summary,Forex,EUR,EUR,1500,1,1.08,1620,1.09,1635,15,
Open Positions,Total,,Stocks,USD,,,,,7512.5,,9296,1783.5,
Financial Instrument Information,Header,Asset Category,Symbol,Description,Conid,Security ID,Listing Exch,Multiplier,Type,Code
Financial Instrument Information,Data,Stocks,AAPL,APPLE INC,265598,US0378331005,NASDAQ,1,COMMON,
Financial Instrument Information,Data,Stocks,SAP,SAP SE,14204,DE0007164600,IBIS,1,COMMON,
";

    #[test]
    fn test_header_detection() {
        assert!(is_header_row("Statement,Header,Field Name,Field Value"));
        assert!(is_header_row(
            "Open Positions,Header,DataDiscriminator,Asset Category,Currency,Symbol,Quantity"
        ));
        assert!(!is_header_row("Trades,Header,DataDiscriminator,Asset Category"));
    }

    #[test]
    fn test_summary_rows_joined_with_instrument_info() {
        let result = parse(SAMPLE, &ParseOptions::default()).unwrap();
        assert_eq!(result.usable_rows, 3);

        let aapl = &result.positions()[0];
        assert_eq!(aapl.quantity, dec!(50));
        assert_eq!(aapl.name, "APPLE INC");
        assert_eq!(aapl.isin.as_deref(), Some("US0378331005"));
        assert_eq!(aapl.exchange, "NASDAQ");
        assert_eq!(aapl.asset_type, ASSET_TYPE_STOCKS);
        assert_eq!(aapl.last_updated.month(), 1);

        let sap = &result.positions()[1];
        assert_eq!(sap.currency, "EUR");
        assert_eq!(sap.cost_basis, dec!(2400));

        assert_eq!(result.positions()[2].asset_type, ASSET_TYPE_CASH);
    }

    #[test]
    fn test_requires_open_positions() {
        let err = parse("Statement,Header,Field Name,Field Value\n", &ParseOptions::default())
            .unwrap_err();
        assert!(err.is_unrecognized_format());
    }
}
