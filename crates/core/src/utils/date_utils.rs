use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::{ImportError, ImportResult};

lazy_static! {
    /// Trailing timezone abbreviation such as "EST" or "ET"
    static ref TRAILING_TZ_ABBREVIATION: Regex =
        Regex::new(r"\s+[A-Za-z]{2,5}$").expect("Invalid regex pattern");
}

/// Literal date layouts found in broker exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `01/05/2024`, `1/5/2024`
    MonthDayYear,
    /// `01/05/2024 09:35:12 EST`
    MonthDayYearTime,
    /// `05-01-2024`
    DayMonthYearDash,
    /// `05.01.2024`
    DayMonthYearDot,
    /// `05.01.2024 17:30:12`
    DayMonthYearDotTime,
    /// `2024-01-05`, `2024-01-05 14:31:22`, `2024-01-05T14:31:22.125Z`
    Iso8601,
}

impl DateLayout {
    fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        match self {
            DateLayout::MonthDayYear => parse_naive_date(text, "%m/%d/%Y"),
            DateLayout::MonthDayYearTime => {
                let without_tz = TRAILING_TZ_ABBREVIATION.replace(text, "");
                NaiveDateTime::parse_from_str(&without_tz, "%m/%d/%Y %H:%M:%S")
                    .or_else(|_| NaiveDateTime::parse_from_str(&without_tz, "%m/%d/%Y %H:%M"))
                    .ok()
            }
            DateLayout::DayMonthYearDash => parse_naive_date(text, "%d-%m-%Y"),
            DateLayout::DayMonthYearDot => parse_naive_date(text, "%d.%m.%Y"),
            DateLayout::DayMonthYearDotTime => {
                NaiveDateTime::parse_from_str(text, "%d.%m.%Y %H:%M:%S").ok()
            }
            DateLayout::Iso8601 => parse_iso8601(text),
        }
    }
}

/// Parses `text` with the first layout that accepts it. Times without an
/// offset are taken as UTC.
pub fn parse_date(text: &str, layouts: &[DateLayout]) -> ImportResult<DateTime<Utc>> {
    let trimmed = text.trim().trim_matches('"').trim();
    if trimmed.is_empty() {
        return Err(ImportError::MalformedDate(String::new()));
    }
    layouts
        .iter()
        .find_map(|layout| layout.parse(trimmed))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ImportError::MalformedDate(trimmed.to_string()))
}

fn parse_naive_date(text: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(text, format)
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

fn parse_iso8601(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    parse_naive_date(text, "%Y-%m-%d")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_month_day_year() {
        let dt = parse_date("01/05/2024", &[DateLayout::MonthDayYear]).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 5));

        let unpadded = parse_date("1/5/2024", &[DateLayout::MonthDayYear]).unwrap();
        assert_eq!(unpadded, dt);
    }

    #[test]
    fn test_month_day_year_with_time_and_zone() {
        let dt = parse_date("01/03/2024 09:35:12 EST", &[DateLayout::MonthDayYearTime]).unwrap();
        assert_eq!((dt.month(), dt.day(), dt.hour(), dt.second()), (1, 3, 9, 12));
    }

    #[test]
    fn test_day_month_year_variants() {
        let dash = parse_date("05-01-2024", &[DateLayout::DayMonthYearDash]).unwrap();
        assert_eq!((dash.month(), dash.day()), (1, 5));

        let dot = parse_date("05.01.2024", &[DateLayout::DayMonthYearDot]).unwrap();
        assert_eq!(dot, dash);

        let with_time =
            parse_date("05.01.2024 17:30:12", &[DateLayout::DayMonthYearDotTime]).unwrap();
        assert_eq!((with_time.day(), with_time.hour(), with_time.minute()), (5, 17, 30));
    }

    #[test]
    fn test_iso8601_variants() {
        let layouts = [DateLayout::Iso8601];
        let date_only = parse_date("2024-01-05", &layouts).unwrap();
        assert_eq!(date_only.day(), 5);

        let spaced = parse_date("2024-01-05 14:31:22", &layouts).unwrap();
        assert_eq!(spaced.hour(), 14);

        let zulu = parse_date("2024-01-05T14:31:22.125Z", &layouts).unwrap();
        assert_eq!(zulu.minute(), 31);

        let offset = parse_date("2024-01-05T10:00:00-05:00", &layouts).unwrap();
        assert_eq!(offset.hour(), 15);
    }

    #[test]
    fn test_layouts_tried_in_order() {
        let layouts = [DateLayout::DayMonthYearDot, DateLayout::Iso8601];
        assert!(parse_date("2024-02-29", &layouts).is_ok());
        assert!(parse_date("29.02.2024", &layouts).is_ok());
    }

    #[test]
    fn test_malformed_dates() {
        for input in ["", "yesterday", "13/45/2024", "2024-13-01"] {
            let err = parse_date(input, &[DateLayout::MonthDayYear, DateLayout::Iso8601])
                .unwrap_err();
            assert!(matches!(err, ImportError::MalformedDate(_)));
        }
    }
}
