//! Ticker canonicalization.
//!
//! Brokers decorate the same ticker in different ways: `SAP.DE`, `XETRA:SAP`,
//! `SAP GY EQUITY`, `SPAXX**`. Everything here reduces those to the bare
//! upper-case ticker and reports which venue the decoration named.

/// Exchange codes recognized as symbol decorations, with the venue they map to.
/// An empty venue means the code is dropped without filling `exchange`.
const EXCHANGE_CODES: &[(&str, &str)] = &[
    ("US", ""),
    ("L", "LSE"),
    ("LN", "LSE"),
    ("LSE", "LSE"),
    ("DE", "XETRA"),
    ("GY", "XETRA"),
    ("XETRA", "XETRA"),
    ("ETR", "XETRA"),
    ("F", "FRA"),
    ("GR", "FRA"),
    ("FRA", "FRA"),
    ("PA", "EPA"),
    ("FP", "EPA"),
    ("EPA", "EPA"),
    ("AS", "AMS"),
    ("NA", "AMS"),
    ("AMS", "AMS"),
    ("MI", "BIT"),
    ("IM", "BIT"),
    ("SW", "SIX"),
    ("SE", "SIX"),
    ("TO", "TSX"),
    ("CN", "TSX"),
    ("TSX", "TSX"),
    ("V", "TSXV"),
    ("AX", "ASX"),
    ("AU", "ASX"),
    ("HK", "HKEX"),
    ("T", "TSE"),
    ("JP", "TSE"),
    ("MC", "BME"),
    ("SM", "BME"),
    ("BR", "EBR"),
    ("ST", "STO"),
    ("SS", "SSE"),
    ("OL", "OSL"),
    ("CO", "CPH"),
    ("HE", "HEL"),
    ("VI", "VIE"),
    ("NS", "NSE"),
    ("BO", "BSE"),
    ("NASDAQ", "NASDAQ"),
    ("NYSE", "NYSE"),
    ("AMEX", "AMEX"),
    ("ARCA", "ARCA"),
    ("BATS", "BATS"),
];

const SUFFIX_SEPARATORS: [char; 3] = ['.', ':', ' '];

fn venue_for(code: &str) -> Option<&'static str> {
    EXCHANGE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, venue)| *venue)
}

/// One decoration removed, if any. Returns the shorter symbol and the code.
fn strip_once(symbol: &str) -> Option<(String, Option<&'static str>)> {
    let trimmed = symbol.trim();

    if let Some(rest) = trimmed.strip_suffix(" EQUITY") {
        return Some((rest.trim_end().to_string(), None));
    }

    let without_stars = trimmed.trim_end_matches('*');
    if without_stars.len() != trimmed.len() && !without_stars.is_empty() {
        return Some((without_stars.to_string(), None));
    }

    if let Some(pos) = trimmed.rfind(&SUFFIX_SEPARATORS[..]) {
        let (head, tail) = (&trimmed[..pos], &trimmed[pos + 1..]);
        if !head.trim().is_empty() {
            if let Some(venue) = venue_for(tail) {
                return Some((head.trim_end().to_string(), Some(venue)));
            }
        }
    }

    if let Some((prefix, rest)) = trimmed.split_once(':') {
        if !rest.is_empty() {
            if let Some(venue) = venue_for(prefix.trim()) {
                return Some((rest.trim().to_string(), Some(venue)));
            }
        }
    }

    None
}

/// Canonical ticker plus the venue named by the first stripped decoration
/// that identifies one.
pub fn split_exchange_suffix(raw: &str) -> (String, Option<String>) {
    let mut current = raw.trim().to_uppercase();
    let mut exchange: Option<String> = None;

    loop {
        match strip_once(&current) {
            Some((shorter, venue)) => {
                if exchange.is_none() {
                    exchange = venue.filter(|v| !v.is_empty()).map(str::to_string);
                }
                current = shorter;
            }
            None => {
                let compact: String = current.chars().filter(|c| !c.is_whitespace()).collect();
                if compact == current {
                    break;
                }
                current = compact;
            }
        }
    }

    (current, exchange)
}

/// Upper-case ticker with exchange decorations removed. Stable under repeat application.
pub fn canonical_symbol(raw: &str) -> String {
    split_exchange_suffix(raw).0
}

/// Upper-case name with collapsed whitespace, used as the last-resort identity.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_dotted_suffixes() {
        assert_eq!(canonical_symbol("aapl.us"), "AAPL");
        assert_eq!(canonical_symbol("VOD.L"), "VOD");
        assert_eq!(canonical_symbol(" sap.de "), "SAP");
    }

    #[test]
    fn test_strips_bloomberg_style() {
        assert_eq!(canonical_symbol("AAPL US EQUITY"), "AAPL");
        assert_eq!(canonical_symbol("SAP GY Equity"), "SAP");
    }

    #[test]
    fn test_strips_prefixes_and_colon_suffixes() {
        assert_eq!(canonical_symbol("NASDAQ:MSFT"), "MSFT");
        assert_eq!(canonical_symbol("MSFT:NASDAQ"), "MSFT");
    }

    #[test]
    fn test_strips_repeatedly() {
        assert_eq!(canonical_symbol("XETRA:SAP.DE"), "SAP");
        assert_eq!(canonical_symbol("SPAXX**"), "SPAXX");
    }

    #[test]
    fn test_leaves_share_classes_alone() {
        assert_eq!(canonical_symbol("BRK.B"), "BRK.B");
        assert_eq!(canonical_symbol("BRK B"), "BRKB");
        assert_eq!(canonical_symbol("T"), "T");
        assert_eq!(canonical_symbol(".L"), ".L");
    }

    #[test]
    fn test_reports_exchange() {
        assert_eq!(
            split_exchange_suffix("VOD.L"),
            ("VOD".to_string(), Some("LSE".to_string()))
        );
        assert_eq!(split_exchange_suffix("AAPL.US"), ("AAPL".to_string(), None));
        assert_eq!(
            split_exchange_suffix("SHOP:TSX"),
            ("SHOP".to_string(), Some("TSX".to_string()))
        );
    }

    #[test]
    fn test_canonical_symbol_is_idempotent() {
        for raw in ["aapl.us", "AAPL US EQUITY", "XETRA:SAP.DE", "BRK B", "spaxx**", ""] {
            let once = canonical_symbol(raw);
            assert_eq!(canonical_symbol(&once), once);
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Apple   Inc\t"), "APPLE INC");
    }
}
