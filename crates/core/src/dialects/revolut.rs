//! Revolut trading account statement.
//!
//! Amounts carry their currency code (`USD 240.50`). Splits are reported as
//! the number of shares added. Cash movements and custody fees are ignored.

use rust_decimal::Decimal;

use super::asset_type::infer_asset_type;
use super::csv_reader::{find_header, header_matches, read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{checked_product, optional_amount, required_amount};
use crate::aggregation::{Transaction, TransactionKind};
use crate::errors::{ImportError, ImportResult};
use crate::utils::{parse_date, AmountHints, DateLayout, NumberFormat};

const DIALECT: BrokerId = BrokerId::Revolut;
const SIGNATURE: [&str; 6] = [
    "Date",
    "Ticker",
    "Type",
    "Quantity",
    "Price per share",
    "Total Amount",
];

pub fn is_header_row(line: &str) -> bool {
    header_matches(line, b',', &SIGNATURE)
}

struct Columns {
    date: usize,
    ticker: usize,
    kind: usize,
    quantity: usize,
    price: usize,
    total: usize,
    currency: Option<usize>,
    fx_rate: Option<usize>,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        Ok(Columns {
            date: header.require("Date", dialect)?,
            ticker: header.require("Ticker", dialect)?,
            kind: header.require("Type", dialect)?,
            quantity: header.require("Quantity", dialect)?,
            price: header.require("Price per share", dialect)?,
            total: header.require("Total Amount", dialect)?,
            currency: header.find("Currency"),
            fx_rate: header.find("FX Rate"),
        })
    }
}

fn parse_row(
    record: &Record,
    columns: &Columns,
    hints: &AmountHints,
    default_currency: &str,
) -> ImportResult<Option<Transaction>> {
    let kind_label = record.cell(columns.kind).to_uppercase();
    let symbol = record.cell(columns.ticker).to_string();
    if symbol.is_empty() {
        return Ok(None);
    }

    let kind = if kind_label.starts_with("BUY") {
        let quantity = required_amount(record, columns.quantity, "quantity", hints)?;
        let price = required_amount(record, columns.price, "price per share", hints)?;
        // The total includes any commission on top of quantity * price.
        let fees = match optional_amount(record, Some(columns.total), hints)? {
            Some(total) => {
                let gross = checked_product(record.line, quantity, price)?;
                total.abs().saturating_sub(gross).max(Decimal::ZERO)
            }
            None => Decimal::ZERO,
        };
        TransactionKind::Buy {
            quantity,
            price,
            fees,
        }
    } else if kind_label.starts_with("SELL") {
        TransactionKind::Sell {
            quantity: required_amount(record, columns.quantity, "quantity", hints)?,
            price: required_amount(record, columns.price, "price per share", hints)?,
        }
    } else if kind_label.starts_with("DIVIDEND") {
        TransactionKind::Dividend {
            amount: required_amount(record, columns.total, "total amount", hints)?,
        }
    } else if kind_label == "STOCK SPLIT" {
        TransactionKind::SplitShares {
            quantity: required_amount(record, columns.quantity, "quantity", hints)?,
        }
    } else {
        return Ok(None);
    };

    let date = parse_date(record.cell(columns.date), &[DateLayout::Iso8601])?;
    let currency = match record.opt_cell(columns.currency) {
        "" => default_currency.to_string(),
        c => c.to_uppercase(),
    };
    let fx_rate = optional_amount(record, columns.fx_rate, hints)?.filter(|r| !r.is_zero());
    let asset_type = infer_asset_type(&symbol, "");

    Ok(Some(
        Transaction::new(date, symbol, currency, kind)
            .with_asset_type(asset_type)
            .with_fx_rate(fx_rate),
    ))
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, b',');
    let header_at = find_header(&records, &SIGNATURE)
        .ok_or_else(|| ImportError::unrecognized(DIALECT.as_str(), "statement header not found"))?;
    let columns = Columns::resolve(&HeaderIndex::new(records[header_at].cells()))?;
    let hints = options.hints(NumberFormat::Us);

    let mut tally = RowTally::new(DIALECT);
    for record in &records[header_at + 1..] {
        tally.record(
            record.line,
            parse_row(record, &columns, &hints, &options.default_currency),
        )?;
    }
    Ok(tally.into_result())
}
