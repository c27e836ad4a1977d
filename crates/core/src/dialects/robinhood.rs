//! Robinhood account activity report.
//!
//! Rows are newest first. Descriptions span several lines inside quotes
//! (name, then CUSIP). Only trades, cash dividends and split deliveries
//! affect holdings; transfers and fees are ignored.

use rust_decimal::Decimal;

use super::asset_type::infer_asset_type;
use super::csv_reader::{find_header, header_matches, read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::required_amount;
use crate::aggregation::{Transaction, TransactionKind};
use crate::errors::{ImportError, ImportResult};
use crate::utils::{parse_date, AmountHints, DateLayout, NumberFormat};

const DIALECT: BrokerId = BrokerId::Robinhood;
const SIGNATURE: [&str; 6] = [
    "Activity Date",
    "Instrument",
    "Trans Code",
    "Quantity",
    "Price",
    "Amount",
];

pub fn is_header_row(line: &str) -> bool {
    header_matches(line, b',', &SIGNATURE)
}

struct Columns {
    activity_date: usize,
    instrument: usize,
    description: Option<usize>,
    trans_code: usize,
    quantity: usize,
    price: usize,
    amount: usize,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        Ok(Columns {
            activity_date: header.require("Activity Date", dialect)?,
            instrument: header.require("Instrument", dialect)?,
            description: header.find("Description"),
            trans_code: header.require("Trans Code", dialect)?,
            quantity: header.require("Quantity", dialect)?,
            price: header.require("Price", dialect)?,
            amount: header.require("Amount", dialect)?,
        })
    }
}

fn parse_row(
    record: &Record,
    columns: &Columns,
    hints: &AmountHints,
    currency: &str,
) -> ImportResult<Option<Transaction>> {
    let code = record.cell(columns.trans_code).to_uppercase();
    let symbol = record.cell(columns.instrument).to_string();
    if symbol.is_empty() {
        return Ok(None);
    }

    let kind = match code.as_str() {
        "BUY" => TransactionKind::Buy {
            quantity: required_amount(record, columns.quantity, "quantity", hints)?,
            price: required_amount(record, columns.price, "price", hints)?,
            fees: Decimal::ZERO,
        },
        "SELL" => TransactionKind::Sell {
            quantity: required_amount(record, columns.quantity, "quantity", hints)?,
            price: required_amount(record, columns.price, "price", hints)?,
        },
        "CDIV" => TransactionKind::Dividend {
            amount: required_amount(record, columns.amount, "amount", hints)?,
        },
        "SPL" => TransactionKind::SplitShares {
            quantity: required_amount(record, columns.quantity, "quantity", hints)?,
        },
        _ => return Ok(None),
    };

    let date = parse_date(record.cell(columns.activity_date), &[DateLayout::MonthDayYear])?;
    let name = record
        .opt_cell(columns.description)
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    let asset_type = infer_asset_type(&symbol, &name);
    Ok(Some(
        Transaction::new(date, symbol, currency, kind)
            .with_name(name)
            .with_asset_type(asset_type),
    ))
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, b',');
    let header_at = find_header(&records, &SIGNATURE)
        .ok_or_else(|| ImportError::unrecognized(DIALECT.as_str(), "activity header not found"))?;
    let header = HeaderIndex::new(records[header_at].cells());
    let columns = Columns::resolve(&header)?;
    let hints = options.hints(NumberFormat::Us);

    let mut tally = RowTally::newest_first(DIALECT);
    for record in &records[header_at + 1..] {
        // The disclaimer footer is a single long cell.
        if record.len() < header.columns().len() / 2 {
            break;
        }
        tally.record(
            record.line,
            parse_row(record, &columns, &hints, &options.default_currency),
        )?;
    }
    Ok(tally.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#""Activity Date","Process Date","Settle Date","Instrument","Description","Trans Code","Quantity","Price","Amount"
"1/10/2024","1/10/2024","1/12/2024","AAPL","Apple
CUSIP: 037833100","Sell","5","$190.00","$950.00"
"1/8/2024","1/8/2024","1/10/2024","NVDA","NVIDIA
CUSIP: 67066G104","SPL","9","",""
"1/5/2024","1/5/2024","1/9/2024","AAPL","Cash Div: R/D 2024-01-02 P/D 2024-01-05 - 10 shares at 0.24","CDIV","","","$2.40"
"1/4/2024","1/4/2024","1/8/2024","NVDA","NVIDIA
CUSIP: 67066G104","Buy","1","$480.00","($480.00)"
"1/3/2024","1/3/2024","1/5/2024","AAPL","Apple
CUSIP: 037833100","Buy","10","$180.00","($1,800.00)"
"1/2/2024","1/2/2024","1/4/2024","","ACH Deposit","ACH","","","$5,000.00"
"1/2/2024","1/2/2024","1/4/2024","TSLA","Tesla","Buy","","$230.00","($230.00)"
"","","","","","","","",""
"The data provided is for informational purposes only. Please consult a professional tax service or personal tax advisor if you need instructions on how to calculate cost basis."
"#;

    #[test]
    fn test_newest_first_history_is_aggregated() {
        let result = parse(SAMPLE, &ParseOptions::default()).unwrap();
        assert_eq!(result.usable_rows, 5);
        assert_eq!(result.skipped_rows, 1);

        let positions = result.positions();
        assert_eq!(positions.len(), 2);

        let aapl = positions.iter().find(|p| p.symbol == "AAPL").unwrap();
        assert_eq!(aapl.quantity, dec!(5));
        assert_eq!(aapl.cost_basis, dec!(900));
        assert_eq!(aapl.close_price, dec!(190));
        assert_eq!(aapl.name, "Apple");

        let nvda = positions.iter().find(|p| p.symbol == "NVDA").unwrap();
        assert_eq!(nvda.quantity, dec!(10));
        assert_eq!(nvda.close_price, dec!(48));
        assert_eq!(nvda.cost_basis, dec!(480));
    }

    #[test]
    fn test_same_day_rows_apply_in_export_order() {
        let text = r#""Activity Date","Process Date","Settle Date","Instrument","Description","Trans Code","Quantity","Price","Amount"
"1/3/2024","1/3/2024","1/5/2024","AAPL","Apple","Sell","5","$190.00","$950.00"
"1/3/2024","1/3/2024","1/5/2024","AAPL","Apple","Buy","10","$180.00","($1,800.00)"
"#;
        let result = parse(text, &ParseOptions::default()).unwrap();
        let positions = result.positions();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, dec!(5));
        assert_eq!(positions[0].cost_basis, dec!(900));
        assert_eq!(positions[0].close_price, dec!(190));
    }

    #[test]
    fn test_header_detection() {
        assert!(is_header_row(SAMPLE.lines().next().unwrap()));
        assert!(!is_header_row("Date,Ticker,Type,Quantity"));
    }
}
