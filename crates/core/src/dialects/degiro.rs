//! DEGIRO transaction history (`Transactions.csv`).
//!
//! Rows carry no ticker. Instruments are identified by ISIN and named by the
//! product column. Each amount column is followed by an unnamed currency
//! column, so currencies are read positionally.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;

use super::asset_type::infer_asset_type;
use super::csv_reader::{find_header, header_matches, read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{checked_product, optional_amount, required_amount};
use crate::aggregation::{Transaction, TransactionKind};
use crate::constants::DECIMAL_PRECISION;
use crate::errors::{ImportError, ImportResult};
use crate::utils::{parse_date, AmountHints, DateLayout, NumberFormat};

const DIALECT: BrokerId = BrokerId::Degiro;
const SIGNATURE: [&str; 5] = ["Product", "ISIN", "Reference exchange", "Quantity", "Price"];
const FEE_COLUMN: &str = "Transaction and/or third party fees";

pub fn is_header_row(line: &str) -> bool {
    header_matches(line, b',', &SIGNATURE)
}

struct Columns {
    date: usize,
    time: Option<usize>,
    product: usize,
    isin: usize,
    quantity: usize,
    price: usize,
    price_currency: usize,
    exchange_rate: Option<usize>,
    fees: Option<usize>,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        let price = header.require("Price", dialect)?;
        Ok(Columns {
            date: header.require("Date", dialect)?,
            time: header.find("Time"),
            product: header.require("Product", dialect)?,
            isin: header.require("ISIN", dialect)?,
            quantity: header.require("Quantity", dialect)?,
            price,
            price_currency: price + 1,
            exchange_rate: header.find("Exchange rate"),
            fees: header.find(FEE_COLUMN),
        })
    }
}

fn trade_time(record: &Record, columns: &Columns) -> ImportResult<DateTime<Utc>> {
    let date = parse_date(record.cell(columns.date), &[DateLayout::DayMonthYearDash])?;
    let time = NaiveTime::parse_from_str(record.opt_cell(columns.time), "%H:%M")
        .map(|t| t.signed_duration_since(NaiveTime::MIN))
        .unwrap_or_else(|_| Duration::zero());
    Ok(date + time)
}

fn parse_row(
    record: &Record,
    columns: &Columns,
    hints: &AmountHints,
    default_currency: &str,
) -> ImportResult<Option<Transaction>> {
    let signed_quantity = required_amount(record, columns.quantity, "quantity", hints)?;
    if signed_quantity.is_zero() {
        return Ok(None);
    }
    let price = required_amount(record, columns.price, "price", hints)?;
    // Instrument currency units per account currency unit; blank for same-currency trades.
    let explicit_rate = optional_amount(record, columns.exchange_rate, hints)?.filter(|r| !r.is_zero());
    let rate = explicit_rate.unwrap_or(Decimal::ONE);

    let quantity = signed_quantity.abs();
    let kind = if signed_quantity.is_sign_negative() {
        TransactionKind::Sell { quantity, price }
    } else {
        let fee = optional_amount(record, columns.fees, hints)?.unwrap_or_default();
        TransactionKind::Buy {
            quantity,
            price,
            fees: checked_product(record.line, fee.abs(), rate)?,
        }
    };

    let name = record.cell(columns.product).to_string();
    let currency = match record.cell(columns.price_currency) {
        "" => default_currency.to_string(),
        c => c.to_uppercase(),
    };
    let asset_type = infer_asset_type("", &name);

    Ok(Some(
        Transaction::new(trade_time(record, columns)?, "", currency, kind)
            .with_name(name)
            .with_isin(Some(record.cell(columns.isin).to_string()))
            .with_asset_type(asset_type)
            .with_fx_rate(explicit_rate.map(|r| (Decimal::ONE / r).round_dp(DECIMAL_PRECISION))),
    ))
}

pub fn parse(text: &str, options: &ParseOptions) -> ImportResult<ParserResult> {
    let records = read_records(text, b',');
    let header_at = find_header(&records, &SIGNATURE)
        .ok_or_else(|| ImportError::unrecognized(DIALECT.as_str(), "transactions header not found"))?;
    let columns = Columns::resolve(&HeaderIndex::new(records[header_at].cells()))?;
    let hints = options.hints(NumberFormat::European);

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
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "\
Date,Time,Product,ISIN,Reference exchange,Venue,Quantity,Price,,Local value,,Value,,Exchange rate,Transaction and/or third party fees,,Total,,Order ID
15-01-2024,09:04,VANGUARD FTSE ALL-WORLD UCITS ETF,IE00BK5BQT80,EAI,XAMS,10,\"105,20\",EUR,\"-1052,00\",EUR,\"-1052,00\",EUR,,\"-2,00\",EUR,\"-1054,00\",EUR,a1b2
16-01-2024,15:31,APPLE INC - COMMON STOCK,US0378331005,NDQ,XNAS,5,\"185,00\",USD,\"-925,00\",USD,\"-845,00\",EUR,\"1,0947\",\"-0,50\",EUR,\"-845,50\",EUR,c3d4
20-02-2024,10:12,VANGUARD FTSE ALL-WORLD UCITS ETF,IE00BK5BQT80,EAI,XAMS,-4,\"110,00\",EUR,\"440,00\",EUR,\"440,00\",EUR,,,,\"440,00\",EUR,e5f6
21-02-2024,10:15,BROKEN ROW,US0000000000,NDQ,XNAS,abc,\"1,00\",USD,,,,,,,,,,g7h8
";

    #[test]
    fn test_trades_fold_by_isin() {
        let result = parse(SAMPLE, &ParseOptions::default()).unwrap();
        assert_eq!(result.usable_rows, 3);
        assert_eq!(result.skipped_rows, 1);
        assert_eq!(result.positions().len(), 2);

        let vwrl = &result.positions()[0];
        assert_eq!(vwrl.isin.as_deref(), Some("IE00BK5BQT80"));
        assert_eq!(vwrl.symbol, "");
        assert_eq!(vwrl.quantity, dec!(6));
        assert_eq!(vwrl.currency, "EUR");
        // (1052 + 2) * 6 / 10
        assert_eq!(vwrl.cost_basis, dec!(632.4));
        assert_eq!(vwrl.asset_type, crate::portfolio::ASSET_TYPE_ETF);
    }

    #[test]
    fn test_foreign_trade_converts_fee_and_rate() {
        let result = parse(SAMPLE, &ParseOptions::default()).unwrap();
        let apple = &result.positions()[1];
        assert_eq!(apple.currency, "USD");
        assert_eq!(apple.cost_basis, dec!(925) + dec!(0.50) * dec!(1.0947));
        assert_eq!(
            apple.fx_rate_to_base,
            (Decimal::ONE / dec!(1.0947)).round_dp(DECIMAL_PRECISION)
        );
    }

    #[test]
    fn test_header_detection() {
        assert!(is_header_row(SAMPLE.lines().next().unwrap()));
        assert!(!is_header_row("Date,Product,Quantity"));
    }
}
