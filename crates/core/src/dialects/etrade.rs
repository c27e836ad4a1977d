//! E*TRADE "Portfolio Download" export.
//!
//! An account summary block precedes the positions header. The position
//! rows end with `CASH` and `TOTAL` rows. There is no cost-basis column;
//! cost is quantity times the price paid.

use super::asset_type::infer_asset_type;
use super::csv_reader::{find_header, header_matches, read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{checked_product, optional_amount, required_amount, HoldingRow};
use crate::errors::{ImportError, ImportResult};
use crate::portfolio::Position;
use crate::utils::{AmountHints, NumberFormat};

const DIALECT: BrokerId = BrokerId::Etrade;
const SIGNATURE: [&str; 4] = ["Symbol", "Last Price $", "Quantity", "Value $"];

pub fn is_header_row(line: &str) -> bool {
    header_matches(line, b',', &SIGNATURE)
}

struct Columns {
    symbol: usize,
    last_price: usize,
    quantity: usize,
    value: usize,
    price_paid: Option<usize>,
    total_gain: Option<usize>,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        Ok(Columns {
            symbol: header.require("Symbol", dialect)?,
            last_price: header.require("Last Price $", dialect)?,
            quantity: header.require("Quantity", dialect)?,
            value: header.require("Value $", dialect)?,
            price_paid: header.find("Price Paid $"),
            total_gain: header.find("Total Gain $"),
        })
    }
}

fn parse_row(record: &Record, columns: &Columns, hints: &AmountHints) -> ImportResult<Option<Position>> {
    let symbol = record.cell(columns.symbol).to_string();
    if symbol.eq_ignore_ascii_case("CASH") {
        return Ok(None);
    }

    let quantity = required_amount(record, columns.quantity, "quantity", hints)?;
    let cost_basis = match optional_amount(record, columns.price_paid, hints)? {
        Some(paid) => Some(checked_product(record.line, paid, quantity)?),
        None => None,
    };
    HoldingRow {
        asset_type: Some(infer_asset_type(&symbol, "")),
        quantity,
        price: optional_amount(record, Some(columns.last_price), hints)?,
        value: optional_amount(record, Some(columns.value), hints)?,
        cost_basis,
        unrealized_pnl: optional_amount(record, columns.total_gain, hints)?,
        currency: "USD".to_string(),
        symbol,
        ..Default::default()
    }
    .into_position(record.line)
    .map(Some)
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, b',');
    let header_at = find_header(&records, &SIGNATURE)
        .ok_or_else(|| ImportError::unrecognized(DIALECT.as_str(), "positions header not found"))?;
    let columns = Columns::resolve(&HeaderIndex::new(records[header_at].cells()))?;
    let hints = options.hints(NumberFormat::Us);

    let mut tally = RowTally::new(DIALECT);
    for record in &records[header_at + 1..] {
        if record.after_blank || record.first().eq_ignore_ascii_case("TOTAL") {
            break;
        }
        tally.record(record.line, parse_row(record, &columns, &hints))?;
    }
    Ok(tally.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "\
Account Summary
Account,Net Account Value,Total Gain $,Total Gain %,Day's Gain Unrealized $,Day's Gain Unrealized %,Available For Withdrawal,Cash Purchasing Power
Individual Brokerage -1234,14548.80,2548.80,21.2,99.50,0.68,1500.00,1500.00

View Summary - All Positions
Symbol,Last Price $,Change $,Change %,Quantity,Price Paid $,Day's Gain $,Total Gain $,Total Gain %,Value $
AAPL,185.92,2.21,1.20,50,150.00,110.50,1796.00,23.95,9296.00
MSFT,375.28,-1.10,-0.29,10,300.00,-11.00,752.80,25.09,3752.80
CASH,,,,,,,,,1500.00
TOTAL,,,,,,,,,14548.80

Generated at Jan 05 2024 16:35:12 ET
";

    #[test]
    fn test_parse_positions() {
        let result = parse(SAMPLE, &ParseOptions::default()).unwrap();
        assert_eq!(result.usable_rows, 2);

        let msft = &result.positions()[1];
        assert_eq!(msft.symbol, "MSFT");
        assert_eq!(msft.cost_basis, dec!(3000));
        assert_eq!(msft.unrealized_pnl, dec!(752.80));
        assert_eq!(msft.value, dec!(3752.80));
    }

    #[test]
    fn test_header_detection() {
        assert!(is_header_row(
            "Symbol,Last Price $,Change $,Change %,Quantity,Price Paid $,Day's Gain $,Total Gain $,Total Gain %,Value $"
        ));
        assert!(!is_header_row("Symbol,Last Price,Quantity,Value"));
    }
}
