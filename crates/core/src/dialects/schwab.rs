//! Charles Schwab "Positions" export.
//!
//! Fully quoted CSV. A title line carrying the statement date precedes the
//! header, and the holdings are followed by cash and account-total rows.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use super::asset_type::resolve_asset_type;
use super::csv_reader::{read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{optional_amount, required_amount, scan_for_date, HoldingRow};
use crate::errors::{ImportError, ImportResult};
use crate::portfolio::Position;
use crate::utils::{AmountHints, DateLayout, NumberFormat};

const DIALECT: BrokerId = BrokerId::Schwab;
const SIGNATURE: [&str; 3] = ["Symbol", "Description", "Security Type"];
const QUANTITY_COLUMNS: [&str; 2] = ["Quantity", "Qty (Quantity)"];

lazy_static! {
    static ref STATEMENT_DATE: Regex =
        Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})").expect("Invalid regex pattern");
}

fn is_signature(header: &HeaderIndex) -> bool {
    header.contains_all(&SIGNATURE) && header.find_any(&QUANTITY_COLUMNS).is_some()
}

pub fn is_header_row(line: &str) -> bool {
    is_signature(&HeaderIndex::from_line(line, b','))
}

struct Columns {
    symbol: usize,
    description: usize,
    quantity: usize,
    security_type: usize,
    price: Option<usize>,
    market_value: Option<usize>,
    cost_basis: Option<usize>,
    gain_loss: Option<usize>,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        Ok(Columns {
            symbol: header.require("Symbol", dialect)?,
            description: header.require("Description", dialect)?,
            quantity: header.require_any(&QUANTITY_COLUMNS, dialect)?,
            security_type: header.require("Security Type", dialect)?,
            price: header.find_any(&["Price", "Price ($)"]),
            market_value: header.find_any(&["Market Value", "Mkt Val (Market Value)"]),
            cost_basis: header.find_any(&["Cost Basis", "Cost Basis ($)"]),
            gain_loss: header.find_any(&["Gain/Loss $", "Gain $ (Gain/Loss $)"]),
        })
    }
}

fn is_footer(record: &Record) -> bool {
    let first = record.first().to_lowercase();
    first.starts_with("account total") || first.starts_with("total")
}

fn is_cash_row(record: &Record) -> bool {
    let first = record.first().to_lowercase();
    first.starts_with("cash & cash investments") || first.starts_with("cash and cash investments")
}

fn parse_row(
    record: &Record,
    columns: &Columns,
    hints: &AmountHints,
    as_of: Option<DateTime<Utc>>,
) -> ImportResult<Option<Position>> {
    if is_cash_row(record) {
        return Ok(None);
    }

    let symbol = record.cell(columns.symbol).to_string();
    let name = record.cell(columns.description).to_string();
    let row = HoldingRow {
        asset_type: Some(resolve_asset_type(
            record.cell(columns.security_type),
            &symbol,
            &name,
        )),
        quantity: required_amount(record, columns.quantity, "quantity", hints)?,
        price: optional_amount(record, columns.price, hints)?,
        value: optional_amount(record, columns.market_value, hints)?,
        cost_basis: optional_amount(record, columns.cost_basis, hints)?,
        unrealized_pnl: optional_amount(record, columns.gain_loss, hints)?,
        currency: "USD".to_string(),
        symbol,
        name,
        as_of,
        ..Default::default()
    };
    row.into_position(record.line).map(Some)
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, b',');
    let header_at = records
        .iter()
        .position(|r| is_signature(&HeaderIndex::new(r.cells())))
        .ok_or_else(|| ImportError::unrecognized(DIALECT.as_str(), "positions header not found"))?;
    let columns = Columns::resolve(&HeaderIndex::new(records[header_at].cells()))?;
    let as_of = scan_for_date(
        &records[..header_at],
        &STATEMENT_DATE,
        &[DateLayout::MonthDayYear],
    );
    let hints = options.hints(NumberFormat::Us);

    let mut tally = RowTally::new(DIALECT);
    for record in &records[header_at + 1..] {
        if is_footer(record) {
            break;
        }
        tally.record(record.line, parse_row(record, &columns, &hints, as_of))?;
    }
    Ok(tally.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{ASSET_TYPE_ETF, ASSET_TYPE_OPTIONS, ASSET_TYPE_STOCKS};
    use chrono::Datelike;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#""Positions for account Individual ...123 as of 09:35 AM ET, 01/05/2024","","","","","","","",""
"","","","","","","","",""
"Symbol","Description","Quantity","Price","Market Value","Cost Basis","Gain/Loss %","Gain/Loss $","Security Type"
"AAPL","APPLE INC","50","$185.92","$9,296.00","$7,500.00","23.95%","$1,796.00","Equity"
"VOO","VANGUARD S&P 500 ETF","10","$435.20","$4,352.00","$4,000.00","8.8%","$352.00","ETFs & Closed End Funds"
"AAPL 01/19/2024 200.00 C","CALL APPLE INC $200 EXP 01/19/24","-1","$0.45","($45.00)","($120.00)","62.5%","$75.00","Option"
"BAD","BROKEN ROW","n/a?","$1.00","$1.00","$1.00","0%","$0.00","Equity"
"Cash & Cash Investments","--","--","--","$1,234.56","--","--","--","Cash and Money Market"
"Account Total","--","--","--","$14,837.56","$11,380.00","--","$2,223.00","--"
"#;

    #[test]
    fn test_header_detection() {
        assert!(is_header_row(r#""Symbol","Description","Qty (Quantity)","Price","Security Type""#));
        assert!(!is_header_row("Symbol,Description,Quantity,Type"));
    }

    #[test]
    fn test_parse_positions() {
        let result = parse(SAMPLE, &ParseOptions::default()).unwrap();
        assert_eq!(result.usable_rows, 3);
        assert_eq!(result.skipped_rows, 1);

        let aapl = &result.positions()[0];
        assert_eq!(aapl.symbol, "AAPL");
        assert_eq!(aapl.quantity, dec!(50));
        assert_eq!(aapl.value, dec!(9296));
        assert_eq!(aapl.cost_basis, dec!(7500));
        assert_eq!(aapl.unrealized_pnl, dec!(1796));
        assert_eq!(aapl.asset_type, ASSET_TYPE_STOCKS);
        assert_eq!(aapl.last_updated.day(), 5);

        assert_eq!(result.positions()[1].asset_type, ASSET_TYPE_ETF);

        let option = &result.positions()[2];
        assert_eq!(option.asset_type, ASSET_TYPE_OPTIONS);
        assert_eq!(option.value, dec!(-45));
    }

    #[test]
    fn test_rejects_other_layouts() {
        let err = parse("Ticker,Units\nAAPL,1\n", &ParseOptions::default()).unwrap_err();
        assert!(err.is_unrecognized_format());
    }
}
