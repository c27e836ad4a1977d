//! Trading 212 transaction history.
//!
//! The column set depends on what happened in the exported period: fee and
//! tax columns only appear when such charges occurred. Every column is
//! looked up by name. Fees are stated in the account currency and converted
//! into the instrument currency with the row's exchange rate.

use rust_decimal::Decimal;

use super::asset_type::infer_asset_type;
use super::csv_reader::{find_header, header_matches, read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{checked_product, optional_amount, required_amount};
use crate::aggregation::{Transaction, TransactionKind};
use crate::constants::DECIMAL_PRECISION;
use crate::errors::{ImportError, ImportResult};
use crate::utils::{parse_date, AmountHints, DateLayout, NumberFormat};

const DIALECT: BrokerId = BrokerId::Trading212;
const SIGNATURE: [&str; 6] = [
    "Action",
    "Time",
    "ISIN",
    "Ticker",
    "No. of shares",
    "Price / share",
];

/// Charges that may show up as their own column, all in account currency.
const FEE_COLUMNS: [&str; 6] = [
    "Currency conversion fee",
    "Transaction fee",
    "Finra fee",
    "Stamp duty",
    "Stamp duty reserve tax",
    "French transaction tax",
];

pub fn is_header_row(line: &str) -> bool {
    header_matches(line, b',', &SIGNATURE)
}

struct Columns {
    action: usize,
    time: usize,
    isin: usize,
    ticker: usize,
    name: Option<usize>,
    shares: usize,
    price: usize,
    price_currency: Option<usize>,
    exchange_rate: Option<usize>,
    fees: Vec<usize>,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        Ok(Columns {
            action: header.require("Action", dialect)?,
            time: header.require("Time", dialect)?,
            isin: header.require("ISIN", dialect)?,
            ticker: header.require("Ticker", dialect)?,
            name: header.find("Name"),
            shares: header.require("No. of shares", dialect)?,
            price: header.require("Price / share", dialect)?,
            price_currency: header.find("Currency (Price / share)"),
            exchange_rate: header.find("Exchange rate"),
            fees: FEE_COLUMNS.iter().filter_map(|c| header.find(c)).collect(),
        })
    }
}

fn parse_row(
    record: &Record,
    columns: &Columns,
    hints: &AmountHints,
    default_currency: &str,
) -> ImportResult<Option<Transaction>> {
    let action = record.cell(columns.action).to_lowercase();
    let is_buy = action.ends_with(" buy");
    let is_sell = action.ends_with(" sell");
    let is_dividend = action.starts_with("dividend");
    if !(is_buy || is_sell || is_dividend) {
        return Ok(None);
    }

    let quantity = required_amount(record, columns.shares, "number of shares", hints)?;
    let price = required_amount(record, columns.price, "price per share", hints)?;
    // Instrument currency units per account currency unit.
    let explicit_rate = optional_amount(record, columns.exchange_rate, hints)?.filter(|r| !r.is_zero());
    let rate = explicit_rate.unwrap_or(Decimal::ONE);

    let kind = if is_buy {
        let mut fees = Decimal::ZERO;
        for &idx in &columns.fees {
            let fee = optional_amount(record, Some(idx), hints)?.unwrap_or_default().abs();
            fees = fees.saturating_add(fee);
        }
        TransactionKind::Buy {
            quantity,
            price,
            fees: checked_product(record.line, fees, rate)?,
        }
    } else if is_sell {
        TransactionKind::Sell { quantity, price }
    } else {
        TransactionKind::Dividend {
            amount: checked_product(record.line, quantity, price)?,
        }
    };

    let date = parse_date(record.cell(columns.time), &[DateLayout::Iso8601])?;
    let symbol = record.cell(columns.ticker).to_string();
    let name = record.opt_cell(columns.name).to_string();
    let currency = match record.opt_cell(columns.price_currency) {
        "" => default_currency.to_string(),
        c => c.to_uppercase(),
    };
    let asset_type = infer_asset_type(&symbol, &name);

    Ok(Some(
        Transaction::new(date, symbol, currency, kind)
            .with_name(name)
            .with_isin(Some(record.cell(columns.isin).to_string()))
            .with_asset_type(asset_type)
            .with_fx_rate(explicit_rate.map(|r| (Decimal::ONE / r).round_dp(DECIMAL_PRECISION))),
    ))
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, b',');
    let header_at = find_header(&records, &SIGNATURE)
        .ok_or_else(|| ImportError::unrecognized(DIALECT.as_str(), "history header not found"))?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::ASSET_TYPE_ETF;
    use rust_decimal_macros::dec;

    const WITH_FEES: &str = "\
Action,Time,ISIN,Ticker,Name,No. of shares,Price / share,Currency (Price / share),Exchange rate,Result,Currency (Result),Total,Currency (Total),Withholding tax,Currency (Withholding tax),Currency conversion fee,Currency (Currency conversion fee),Notes,ID
Deposit,2024-01-02 09:00:00,,,,,,,,,,1000.00,EUR,,,,,,
Market buy,2024-01-03 14:31:22,US0378331005,AAPL,Apple,2,185.00,USD,1.25,,EUR,296.80,EUR,,,0.80,EUR,,EOF123
Limit sell,2024-01-04 15:00:00,US0378331005,AAPL,Apple,1,190.00,USD,1.25,3.60,EUR,152.00,EUR,,,0.30,EUR,,EOF124
Dividend (Dividend),2024-01-05 10:00:00,US0378331005,AAPL,Apple,1,0.24,USD,,,,0.19,EUR,0.04,USD,,,,
";

    const WITHOUT_FEES: &str = "\
Action,Time,ISIN,Ticker,Name,No. of shares,Price / share,Currency (Price / share),Exchange rate,Total,Currency (Total)
Market buy,2024-01-05 14:31:22.125,IE00B4L5Y983,SWDA,iShares Core MSCI World UCITS ETF,3,85.10,EUR,1.00,255.30,EUR
";

    #[test]
    fn test_fees_are_converted_into_cost_basis() {
        let result = parse(WITH_FEES, &ParseOptions::default()).unwrap();
        assert_eq!(result.usable_rows, 3);

        let aapl = &result.positions()[0];
        assert_eq!(aapl.isin.as_deref(), Some("US0378331005"));
        assert_eq!(aapl.currency, "USD");
        assert_eq!(aapl.quantity, dec!(1));
        // (2 * 185 + 0.80 * 1.25) / 2 remaining after selling half
        assert_eq!(aapl.cost_basis, dec!(185.5));
        assert_eq!(aapl.fx_rate_to_base, dec!(0.8));
    }

    #[test]
    fn test_variable_columns() {
        let result = parse(WITHOUT_FEES, &ParseOptions::default()).unwrap();
        let etf = &result.positions()[0];
        assert_eq!(etf.quantity, dec!(3));
        assert_eq!(etf.cost_basis, dec!(255.3));
        assert_eq!(etf.asset_type, ASSET_TYPE_ETF);
    }

    #[test]
    fn test_same_timestamp_rows_apply_in_export_order() {
        let text = "\
Action,Time,ISIN,Ticker,Name,No. of shares,Price / share,Currency (Price / share),Exchange rate,Total,Currency (Total)
Market buy,2024-01-03 14:31:22,US0378331005,AAPL,Apple,10,180.00,USD,1.00,1800.00,USD
Market sell,2024-01-03 14:31:22,US0378331005,AAPL,Apple,4,181.00,USD,1.00,724.00,USD
";
        let result = parse(text, &ParseOptions::default()).unwrap();
        let aapl = &result.positions()[0];
        assert_eq!(aapl.quantity, dec!(6));
        assert_eq!(aapl.cost_basis, dec!(1080));
        assert_eq!(aapl.close_price, dec!(181));
    }

    #[test]
    fn test_header_detection() {
        assert!(is_header_row(WITHOUT_FEES.lines().next().unwrap()));
        assert!(!is_header_row("Action,Time,Ticker,Quantity"));
    }
}
