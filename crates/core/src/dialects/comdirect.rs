//! comdirect "Depotübersicht" export.
//!
//! Semicolon separated with European decimals. Prices are in the listing
//! currency while the value columns are in EUR, which gives the rate into
//! EUR for foreign positions.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use super::asset_type::infer_asset_type;
use super::csv_reader::{read_records, HeaderIndex, Record};
use super::dialects_model::{BrokerId, ParseOptions, ParserResult, RowTally};
use super::holding_row::{
    checked_product, checked_ratio, optional_amount, required_amount, scan_for_date, HoldingRow,
};
use crate::constants::DECIMAL_PRECISION;
use crate::errors::{ImportError, ImportResult};
use crate::portfolio::Position;
use crate::utils::{AmountHints, DateLayout, NumberFormat};

const DIALECT: BrokerId = BrokerId::Comdirect;
const DELIMITER: u8 = b';';
const SIGNATURE: [&str; 4] = ["Bezeichnung", "ISIN", "Währung", "Kurs"];
const QUANTITY_COLUMNS: [&str; 3] = ["Stück/Nom.", "Stück", "Nominale"];

lazy_static! {
    static ref STAND: Regex =
        Regex::new(r"Stand:\s*(\d{2}\.\d{2}\.\d{4}(?:\s+\d{2}:\d{2}:\d{2})?)").expect("Invalid regex pattern");
}

fn is_signature(header: &HeaderIndex) -> bool {
    header.contains_all(&SIGNATURE) && header.find_any(&QUANTITY_COLUMNS).is_some()
}

pub fn is_header_row(line: &str) -> bool {
    is_signature(&HeaderIndex::from_line(line, DELIMITER))
}

struct Columns {
    quantity: usize,
    name: usize,
    wkn: Option<usize>,
    isin: usize,
    currency: usize,
    price: usize,
    value_eur: Option<usize>,
    cost_eur: Option<usize>,
    exchange: Option<usize>,
}

impl Columns {
    fn resolve(header: &HeaderIndex) -> ImportResult<Self> {
        let dialect = DIALECT.as_str();
        Ok(Columns {
            quantity: header.require_any(&QUANTITY_COLUMNS, dialect)?,
            name: header.require("Bezeichnung", dialect)?,
            wkn: header.find("WKN"),
            isin: header.require("ISIN", dialect)?,
            currency: header.require("Währung", dialect)?,
            price: header.require("Kurs", dialect)?,
            value_eur: header.find_prefix("Wert in"),
            cost_eur: header.find_prefix("Kaufwert in"),
            exchange: header.find("Börse"),
        })
    }
}

fn parse_row(
    record: &Record,
    columns: &Columns,
    hints: &AmountHints,
    as_of: Option<DateTime<Utc>>,
) -> ImportResult<Option<Position>> {
    let quantity = required_amount(record, columns.quantity, "Stück", hints)?;
    let price = required_amount(record, columns.price, "Kurs", hints)?;
    let currency = match record.cell(columns.currency) {
        "" => "EUR".to_string(),
        c => c.to_uppercase(),
    };
    let value_eur = optional_amount(record, columns.value_eur, hints)?;
    let cost_eur = optional_amount(record, columns.cost_eur, hints)?;

    let native_value = checked_product(record.line, quantity, price)?;
    let (value, cost_basis, fx_rate) = match value_eur {
        Some(eur) if currency != "EUR" && !native_value.is_zero() && !eur.is_zero() => {
            let fx = checked_ratio(record.line, eur, native_value)?.round_dp(DECIMAL_PRECISION);
            let cost = match cost_eur {
                Some(c) => {
                    let native_cost = checked_product(record.line, c, native_value)?;
                    Some(checked_ratio(record.line, native_cost, eur)?.round_dp(DECIMAL_PRECISION))
                }
                None => None,
            };
            (native_value, cost, Some(fx))
        }
        Some(eur) => (eur, cost_eur, None),
        None => (native_value, cost_eur, None),
    };

    let name = record.cell(columns.name).to_string();
    let symbol = record.opt_cell(columns.wkn).to_string();
    HoldingRow {
        asset_type: Some(infer_asset_type(&symbol, &name)),
        isin: Some(record.cell(columns.isin).to_string()),
        exchange: record.opt_cell(columns.exchange).to_string(),
        quantity,
        price: Some(price),
        value: Some(value),
        cost_basis,
        fx_rate_to_base: fx_rate,
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
    let records = read_records(text, DELIMITER);
    let header_at = records
        .iter()
        .position(|r| is_signature(&HeaderIndex::new(r.cells())))
        .ok_or_else(|| ImportError::unrecognized(DIALECT.as_str(), "Depot header not found"))?;
    let columns = Columns::resolve(&HeaderIndex::new(records[header_at].cells()))?;
    let as_of = scan_for_date(
        &records[..header_at],
        &STAND,
        &[DateLayout::DayMonthYearDotTime, DateLayout::DayMonthYearDot],
    );
    let hints = options.hints(NumberFormat::European);

    let mut tally = RowTally::new(DIALECT);
    for record in &records[header_at + 1..] {
        if record.first().eq_ignore_ascii_case("Summe") || record.after_blank {
            break;
        }
        tally.record(record.line, parse_row(record, &columns, &hints, as_of))?;
    }
    Ok(tally.into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::ASSET_TYPE_ETF;
    use chrono::Timelike;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "\
\"Depotübersicht\"
\"Depot\";\"Depotnummer 123456789\"
\"Stand: 05.01.2024 17:30:12\"

\"Stück/Nom.\";\"Bezeichnung\";\"WKN\";\"ISIN\";\"Währung\";\"Kurs\";\"Wert in EUR\";\"Kaufwert in EUR\";\"Diff. zum Kauf\";\"Börse\"
\"10\";\"SAP SE\";\"716460\";\"DE0007164600\";\"EUR\";\"140,50\";\"1.405,00\";\"1.200,00\";\"205,00\";\"XETRA\"
\"5\";\"APPLE INC.\";\"865985\";\"US0378331005\";\"USD\";\"200,00\";\"900,00\";\"720,00\";\"180,00\";\"NASDAQ\"
\"25,5\";\"ISHARES CORE MSCI WORLD UCITS ETF\";\"A0RPWH\";\"IE00B4L5Y983\";\"EUR\";\"85,10\";\"2.170,05\";\"1.900,00\";\"270,05\";\"XETRA\"
\"Summe\";\"\";\"\";\"\";\"\";\"\";\"4.475,05\";\"3.820,00\";\"655,05\";\"\"
";

    #[test]
    fn test_header_detection() {
        assert!(is_header_row(
            "\"Stück/Nom.\";\"Bezeichnung\";\"WKN\";\"ISIN\";\"Währung\";\"Kurs\";\"Wert in EUR\""
        ));
        assert!(!is_header_row("Stück,Bezeichnung,ISIN,Währung,Kurs"));
    }

    #[test]
    fn test_parse_positions() {
        let result = parse(SAMPLE, &ParseOptions::default()).unwrap();
        assert_eq!(result.usable_rows, 3);

        let sap = &result.positions()[0];
        assert_eq!(sap.isin.as_deref(), Some("DE0007164600"));
        assert_eq!(sap.value, dec!(1405));
        assert_eq!(sap.cost_basis, dec!(1200));
        assert_eq!(sap.fx_rate_to_base, Decimal::ONE);
        assert_eq!(sap.last_updated.hour(), 17);

        let apple = &result.positions()[1];
        assert_eq!(apple.currency, "USD");
        assert_eq!(apple.value, dec!(1000));
        assert_eq!(apple.fx_rate_to_base, dec!(0.9));
        assert_eq!(apple.cost_basis, dec!(800));
        assert_eq!(apple.value_in_base(), dec!(900));

        let etf = &result.positions()[2];
        assert_eq!(etf.quantity, dec!(25.5));
        assert_eq!(etf.asset_type, ASSET_TYPE_ETF);
    }
}
