//! Wealthsimple holdings report.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use super::asset_type::resolve_asset_type;
use super::csv_reader::{find_header, header_matches, read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{optional_amount, required_amount, scan_for_date, HoldingRow};
use crate::errors::{ImportError, ImportResult};
use crate::portfolio::Position;
use crate::utils::{AmountHints, DateLayout, NumberFormat};

const DIALECT: BrokerId = BrokerId::Wealthsimple;
const SIGNATURE: [&str; 5] = ["Symbol", "Name", "Security Type", "Quantity", "Market Price"];

lazy_static! {
    static ref AS_OF: Regex =
        Regex::new(r"(?i)as of\s+(\d{4}-\d{2}-\d{2})").expect("Invalid regex pattern");
}

pub fn is_header_row(line: &str) -> bool {
    header_matches(line, b',', &SIGNATURE)
}

struct Columns {
    symbol: usize,
    name: usize,
    security_type: usize,
    quantity: usize,
    market_price: usize,
    exchange: Option<usize>,
    price_currency: Option<usize>,
    market_value: Option<usize>,
    value_currency: Option<usize>,
    book_value_market: Option<usize>,
    book_value_cad: Option<usize>,
    unrealized: Option<usize>,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        Ok(Columns {
            symbol: header.require("Symbol", dialect)?,
            name: header.require("Name", dialect)?,
            security_type: header.require("Security Type", dialect)?,
            quantity: header.require("Quantity", dialect)?,
            market_price: header.require("Market Price", dialect)?,
            exchange: header.find("Exchange"),
            price_currency: header.find("Market Price Currency"),
            market_value: header.find("Market Value"),
            value_currency: header.find("Market Value Currency"),
            book_value_market: header.find("Book Value (Market)"),
            book_value_cad: header.find("Book Value (CAD)"),
            unrealized: header.find("Market Unrealized Returns"),
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
    let name = record.cell(columns.name).to_string();
    let currency = [columns.price_currency, columns.value_currency]
        .into_iter()
        .map(|idx| record.opt_cell(idx))
        .find(|c| !c.is_empty())
        .unwrap_or("CAD")
        .to_uppercase();
    let cost_basis = match optional_amount(record, columns.book_value_market, hints)? {
        Some(cost) => Some(cost),
        None => optional_amount(record, columns.book_value_cad, hints)?,
    };

    HoldingRow {
        asset_type: Some(resolve_asset_type(
            record.cell(columns.security_type),
            &symbol,
            &name,
        )),
        quantity: required_amount(record, columns.quantity, "quantity", hints)?,
        price: optional_amount(record, Some(columns.market_price), hints)?,
        value: optional_amount(record, columns.market_value, hints)?,
        cost_basis,
        unrealized_pnl: optional_amount(record, columns.unrealized, hints)?,
        exchange: record.opt_cell(columns.exchange).to_string(),
        currency,
        symbol,
        name,
        as_of,
        ..Default::default()
    }
    .into_position(record.line)
    .map(Some)
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, b',');
    let header_at = find_header(&records, &SIGNATURE)
        .ok_or_else(|| ImportError::unrecognized(DIALECT.as_str(), "holdings header not found"))?;
    let columns = Columns::resolve(&HeaderIndex::new(records[header_at].cells()))?;
    let as_of = scan_for_date(&records[header_at + 1..], &AS_OF, &[DateLayout::Iso8601]);
    let hints = options.hints(NumberFormat::Us);

    let mut tally = RowTally::new(DIALECT);
    for record in &records[header_at + 1..] {
        if record.after_blank || record.first().to_lowercase().starts_with("as of") {
            break;
        }
        tally.record(record.line, parse_row(record, &columns, &hints, as_of))?;
    }
    Ok(tally.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{ASSET_TYPE_ETF, ASSET_TYPE_STOCKS};
    use chrono::Datelike;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "\
Account Name,Account Type,Account Classification,Account Number,Symbol,Exchange,MIC,Name,Security Type,Quantity,Position Direction,Market Price,Market Price Currency,Book Value (CAD),Book Value Currency (CAD),Book Value (Market),Book Value Currency (Market),Market Value,Market Value Currency,Market Unrealized Returns,Market Unrealized Returns Currency
TFSA,TFSA,Self Directed,ABC123,SHOP,TSX,XTSE,Shopify Inc,EQUITY,15,LONG,105.20,CAD,1200.00,CAD,1200.00,CAD,1578.00,CAD,378.00,CAD
TFSA,TFSA,Self Directed,ABC123,VFV,TSX,XTSE,Vanguard S&P 500 Index ETF,EXCHANGE_TRADED_FUND,30,LONG,120.50,CAD,3300.00,CAD,3300.00,CAD,3615.00,CAD,315.00,CAD
RRSP,RRSP,Self Directed,DEF456,AAPL,NASDAQ,XNAS,Apple Inc,EQUITY,5,LONG,185.92,USD,1000.00,CAD,740.00,USD,929.60,USD,189.60,USD

\"As of 2024-01-05 17:00 GMT-05:00\"
";

    #[test]
    fn test_parse_holdings() {
        let result = parse(SAMPLE, &ParseOptions::default()).unwrap();
        assert_eq!(result.usable_rows, 3);

        let shop = &result.positions()[0];
        assert_eq!(shop.exchange, "TSX");
        assert_eq!(shop.currency, "CAD");
        assert_eq!(shop.asset_type, ASSET_TYPE_STOCKS);
        assert_eq!(shop.last_updated.day(), 5);

        assert_eq!(result.positions()[1].asset_type, ASSET_TYPE_ETF);

        let aapl = &result.positions()[2];
        assert_eq!(aapl.currency, "USD");
        assert_eq!(aapl.cost_basis, dec!(740));
        assert_eq!(aapl.unrealized_pnl, dec!(189.60));
    }

    #[test]
    fn test_header_detection() {
        assert!(is_header_row(SAMPLE.lines().next().unwrap()));
        assert!(!is_header_row("Symbol,Description,Quantity,Security Type"));
    }
}
