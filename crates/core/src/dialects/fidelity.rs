//! Fidelity "Portfolio Positions" export.
//!
//! Money-market core positions (`SPAXX**`) carry only a current value and
//! become cash holdings at a unit price of 1. The holdings block ends at a
//! blank line followed by a legal disclaimer and the download date.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use super::asset_type::infer_asset_type;
use super::csv_reader::{find_header, header_matches, read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{optional_amount, required_amount, scan_for_date, HoldingRow};
use crate::errors::{ImportError, ImportResult};
use crate::portfolio::{Position, ASSET_TYPE_CASH};
use crate::utils::{AmountHints, DateLayout, NumberFormat};

const DIALECT: BrokerId = BrokerId::Fidelity;
const SIGNATURE: [&str; 5] = [
    "Account Number",
    "Symbol",
    "Description",
    "Quantity",
    "Current Value",
];

lazy_static! {
    static ref DATE_DOWNLOADED: Regex =
        Regex::new(r"(?i)date downloaded\s+(\d{1,2}/\d{1,2}/\d{4})").expect("Invalid regex pattern");
}

pub fn is_header_row(line: &str) -> bool {
    header_matches(line, b',', &SIGNATURE)
}

struct Columns {
    symbol: usize,
    description: usize,
    quantity: usize,
    current_value: usize,
    last_price: Option<usize>,
    cost_basis: Option<usize>,
    gain_loss: Option<usize>,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        Ok(Columns {
            symbol: header.require("Symbol", dialect)?,
            description: header.require("Description", dialect)?,
            quantity: header.require("Quantity", dialect)?,
            current_value: header.require("Current Value", dialect)?,
            last_price: header.find("Last Price"),
            cost_basis: header.find("Cost Basis Total"),
            gain_loss: header.find("Total Gain/Loss Dollar"),
        })
    }
}

fn parse_row(
    record: &Record,
    columns: &Columns,
    hints: &AmountHints,
    as_of: Option<DateTime<Utc>>,
) -> ImportResult<Option<Position>> {
    let symbol = record.cell(columns.symbol).to_string();
    if symbol.eq_ignore_ascii_case("Pending Activity") {
        return Ok(None);
    }
    let name = record.cell(columns.description).to_string();

    let row = if symbol.ends_with("**") {
        let value = required_amount(record, columns.current_value, "current value", hints)?;
        HoldingRow {
            asset_type: Some(ASSET_TYPE_CASH),
            quantity: value,
            price: Some(Decimal::ONE),
            value: Some(value),
            cost_basis: Some(value),
            ..Default::default()
        }
    } else {
        HoldingRow {
            asset_type: Some(infer_asset_type(&symbol, &name)),
            quantity: required_amount(record, columns.quantity, "quantity", hints)?,
            price: optional_amount(record, columns.last_price, hints)?,
            value: optional_amount(record, Some(columns.current_value), hints)?,
            cost_basis: optional_amount(record, columns.cost_basis, hints)?,
            unrealized_pnl: optional_amount(record, columns.gain_loss, hints)?,
            ..Default::default()
        }
    };

    HoldingRow {
        symbol,
        name,
        currency: "USD".to_string(),
        as_of,
        ..row
    }
    .into_position(record.line)
    .map(Some)
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, b',');
    let header_at = find_header(&records, &SIGNATURE)
        .ok_or_else(|| ImportError::unrecognized(DIALECT.as_str(), "positions header not found"))?;
    let header = HeaderIndex::new(records[header_at].cells());
    let columns = Columns::resolve(&header)?;
    let as_of = scan_for_date(&records, &DATE_DOWNLOADED, &[DateLayout::MonthDayYear]);
    let hints = options.hints(NumberFormat::Us);

    let mut tally = RowTally::new(DIALECT);
    for record in &records[header_at + 1..] {
        // Disclaimer lines are single cells after a blank separator.
        if record.after_blank || record.len() < 4 {
            break;
        }
        tally.record(record.line, parse_row(record, &columns, &hints, as_of))?;
    }
    Ok(tally.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{ASSET_TYPE_FUNDS, ASSET_TYPE_STOCKS};
    use chrono::Datelike;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "\
Account Number,Account Name,Symbol,Description,Quantity,Last Price,Last Price Change,Current Value,Today's Gain/Loss Dollar,Today's Gain/Loss Percent,Total Gain/Loss Dollar,Total Gain/Loss Percent,Percent Of Account,Cost Basis Total,Average Cost Basis,Type
Z12345678,Individual,SPAXX**,HELD IN MONEY MARKET,,,,$2345.67,,,,,21.5%,,,Cash,
Z12345678,Individual,FXAIX,FIDELITY 500 INDEX FUND,25.123,$175.23,+$1.20,$4402.31,+$30.15,+0.69%,+$902.31,+25.78%,40.3%,$3500.00,$139.31,Cash,
Z12345678,Individual,AAPL,APPLE INC,20,$185.92,+$2.21,$3718.40,+$44.20,+1.20%,+$718.40,+23.95%,34.1%,$3000.00,$150.00,Margin,
Z12345678,Individual,Pending Activity,,,,,$-150.00,,,,,,,,,

\"The data and information in this spreadsheet is provided to you solely for your use and is not for distribution.\"
\"Brokerage services are provided by Fidelity Brokerage Services LLC (FBS), 900 Salem Street, Smithfield, RI 02917.\"
\"Date downloaded 01/05/2024 4:35 PM ET\"
";

    #[test]
    fn test_header_detection() {
        let header = SAMPLE.lines().next().unwrap();
        assert!(is_header_row(header));
        assert!(!is_header_row("Account Number,Investment Name,Symbol,Shares"));
    }

    #[test]
    fn test_parse_positions() {
        let result = parse(SAMPLE, &ParseOptions::default()).unwrap();
        assert_eq!(result.usable_rows, 3);
        assert_eq!(result.skipped_rows, 0);

        let cash = &result.positions()[0];
        assert_eq!(cash.symbol, "SPAXX**");
        assert_eq!(cash.asset_type, ASSET_TYPE_CASH);
        assert_eq!(cash.quantity, dec!(2345.67));
        assert_eq!(cash.close_price, Decimal::ONE);

        let fund = &result.positions()[1];
        assert_eq!(fund.asset_type, ASSET_TYPE_FUNDS);
        assert_eq!(fund.cost_basis, dec!(3500));
        assert_eq!(fund.unrealized_pnl, dec!(902.31));
        assert_eq!(fund.last_updated.year(), 2024);

        assert_eq!(result.positions()[2].asset_type, ASSET_TYPE_STOCKS);
    }
}
