//! Webull order history. Only filled orders affect holdings.

use rust_decimal::Decimal;

use super::asset_type::infer_asset_type;
use super::csv_reader::{find_header, header_matches, read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{optional_amount, required_amount};
use crate::aggregation::{Transaction, TransactionKind};
use crate::errors::{ImportError, ImportResult};
use crate::utils::{parse_date, AmountHints, DateLayout, NumberFormat};

const DIALECT: BrokerId = BrokerId::Webull;
const SIGNATURE: [&str; 5] = ["Symbol", "Side", "Status", "Filled", "Total Qty"];
const DATE_LAYOUTS: [DateLayout; 2] = [DateLayout::MonthDayYearTime, DateLayout::MonthDayYear];

pub fn is_header_row(line: &str) -> bool {
    header_matches(line, b',', &SIGNATURE)
}

struct Columns {
    name: Option<usize>,
    symbol: usize,
    side: usize,
    status: usize,
    filled: usize,
    price: Option<usize>,
    avg_price: Option<usize>,
    placed_time: Option<usize>,
    filled_time: Option<usize>,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        Ok(Columns {
            name: header.find("Name"),
            symbol: header.require("Symbol", dialect)?,
            side: header.require("Side", dialect)?,
            status: header.require("Status", dialect)?,
            filled: header.require("Filled", dialect)?,
            price: header.find("Price"),
            avg_price: header.find("Avg Price"),
            placed_time: header.find("Placed Time"),
            filled_time: header.find("Filled Time"),
        })
    }
}

fn parse_row(
    record: &Record,
    columns: &Columns,
    hints: &AmountHints,
    currency: &str,
) -> ImportResult<Option<Transaction>> {
    let status = record.cell(columns.status).to_lowercase();
    if status != "filled" && status != "partially filled" {
        return Ok(None);
    }

    let quantity = required_amount(record, columns.filled, "filled quantity", hints)?;
    if quantity.is_zero() {
        return Ok(None);
    }
    let price = match optional_amount(record, columns.avg_price, hints)? {
        Some(avg) => avg,
        None => optional_amount(record, columns.price, hints)?
            .ok_or_else(|| ImportError::malformed_row(record.line, "missing fill price"))?,
    };

    let kind = match record.cell(columns.side).to_lowercase().as_str() {
        "buy" => TransactionKind::Buy {
            quantity,
            price,
            fees: Decimal::ZERO,
        },
        "sell" | "short" => TransactionKind::Sell { quantity, price },
        other => {
            return Err(ImportError::malformed_row(
                record.line,
                format!("unknown side '{}'", other),
            ))
        }
    };

    let time = match record.opt_cell(columns.filled_time) {
        "" => record.opt_cell(columns.placed_time),
        filled => filled,
    };
    let date = parse_date(time, &DATE_LAYOUTS)?;
    let symbol = record.cell(columns.symbol).to_string();
    let name = record.opt_cell(columns.name).to_string();
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
        .ok_or_else(|| ImportError::unrecognized(DIALECT.as_str(), "orders header not found"))?;
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
