#[cfg(test)]
mod tests {
    use crate::detection::*;
    use crate::dialects::{BrokerId, ParseOptions};
    use crate::errors::ImportError;
    use rust_decimal_macros::dec;

    const LIMIT: usize = 40;

    const SCHWAB: &str = r#""Positions for account Individual ...123 as of 09:35 AM ET, 01/05/2024","","","","","","","",""
"Symbol","Description","Quantity","Price","Market Value","Cost Basis","Gain/Loss %","Gain/Loss $","Security Type"
"AAPL","APPLE INC","50","$185.92","$9,296.00","$7,500.00","23.95%","$1,796.00","Equity"
"Account Total","--","--","--","$9,296.00","$7,500.00","--","$1,796.00","--"
"#;

    const TRADING212: &str = "\
Action,Time,ISIN,Ticker,Name,No. of shares,Price / share,Currency (Price / share),Exchange rate,Total,Currency (Total)
Market buy,2024-01-05 14:31:22,IE00B4L5Y983,SWDA,iShares Core MSCI World UCITS ETF,3,85.10,EUR,1.00,255.30,EUR
";

    const UNKNOWN_LAYOUT: &str = "Ticker,Units,Unit Price,Market Value\nMSFT,10,375.00,3750.00\n";

    #[test]
    fn test_blank_input_is_empty_import() {
        let options = ParseOptions::default();
        for text in ["", "   \n\n  \n"] {
            let err = select_parser(None, text, &options, LIMIT).unwrap_err();
            assert!(matches!(err, ImportError::EmptyImport(_)));
        }
    }

    #[test]
    fn test_explicit_broker_is_not_marked_auto_detected() {
        let result =
            select_parser(Some(BrokerId::Schwab), SCHWAB, &ParseOptions::default(), LIMIT).unwrap();
        assert_eq!(result.broker, BrokerId::Schwab);
        assert!(!result.auto_detected);
    }

    #[test]
    fn test_header_sniffing() {
        let result = select_parser(None, TRADING212, &ParseOptions::default(), LIMIT).unwrap();
        assert_eq!(result.broker, BrokerId::Trading212);
        assert!(result.auto_detected);
        assert_eq!(result.positions()[0].quantity, dec!(3));
    }

    #[test]
    fn test_wrong_explicit_broker_falls_back_to_detection() {
        let result =
            select_parser(Some(BrokerId::Schwab), TRADING212, &ParseOptions::default(), LIMIT)
                .unwrap();
        assert_eq!(result.broker, BrokerId::Trading212);
        assert!(result.auto_detected);
    }

    #[test]
    fn test_unknown_layout_uses_generic_parser() {
        let result = select_parser(None, UNKNOWN_LAYOUT, &ParseOptions::default(), LIMIT).unwrap();
        assert_eq!(result.broker, BrokerId::Generic);
        assert_eq!(result.positions()[0].symbol, "MSFT");

        let explicit =
            select_parser(Some(BrokerId::Fidelity), UNKNOWN_LAYOUT, &ParseOptions::default(), LIMIT)
                .unwrap();
        assert_eq!(explicit.broker, BrokerId::Generic);
    }

    #[test]
    fn test_exhausted_chain_reports_explicit_cause() {
        let err = select_parser(
            Some(BrokerId::Schwab),
            "nothing,useful\nhere,either\n",
            &ParseOptions::default(),
            LIMIT,
        )
        .unwrap_err();
        match err {
            ImportError::ImportFailed { broker, cause } => {
                assert_eq!(broker, "schwab");
                assert!(cause.is_unrecognized_format());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_exhausted_chain_without_explicit_broker() {
        let err = select_parser(None, "nothing,useful\nhere,either\n", &ParseOptions::default(), LIMIT)
            .unwrap_err();
        assert!(matches!(err, ImportError::EmptyImport(_)));
    }

    #[test]
    fn test_detection_respects_line_limit() {
        let padded = format!("Report\nGenerated today\nAccount 1\n{}", TRADING212);
        assert_eq!(detect_dialect(&padded, LIMIT), Some(BrokerId::Trading212));
        assert_eq!(detect_dialect(&padded, 3), None);
    }
}
