#[cfg(test)]
mod tests {
    use crate::dialects::BrokerId;
    use crate::errors::{Error, ValidationError};
    use crate::imports::*;
    use crate::merge::MergeStrategy;

    #[test]
    fn test_options_defaults() {
        let options = ImportOptions::default();
        assert_eq!(options.effective_merge_strategy(), MergeStrategy::Add);
        assert_eq!(options.effective_default_currency(), "USD");
        assert_eq!(options.effective_base_currency(), "USD");
        assert_eq!(options.effective_detection_line_limit(), 40);
        assert!(!options.effective_percent_as_fraction());
    }

    #[test]
    fn test_options_from_camel_case_json() {
        let options = ImportOptions::from_json(
            r#"{"mergeStrategy":"replace","defaultCurrency":"eur","detectionLineLimit":10,"percentAsFraction":true}"#,
        )
        .unwrap();
        assert_eq!(options.effective_merge_strategy(), MergeStrategy::Replace);
        assert_eq!(options.effective_detection_line_limit(), 10);

        let parse_options = options.parse_options();
        assert_eq!(parse_options.default_currency, "EUR");
        assert!(parse_options.percent_as_fraction);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        for json in [
            r#"{"detectionLineLimit":0}"#,
            r#"{"baseCurrency":"euro"}"#,
            r#"{"mergeStrategy":"average"}"#,
            r#"not json"#,
        ] {
            let err = ImportOptions::from_json(json).unwrap_err();
            assert!(
                matches!(err, Error::Validation(ValidationError::InvalidConfig(_))),
                "{}: {:?}",
                json,
                err
            );
        }
    }

    #[test]
    fn test_broker_id_on_file() {
        let file = ImportFile::new("positions.csv", b"x".to_vec());
        assert_eq!(file.clone().with_broker_id("IBKR").unwrap().broker, Some(BrokerId::InteractiveBrokers));
        assert_eq!(file.clone().with_broker_id("  ").unwrap().broker, None);
        assert!(matches!(
            file.with_broker_id("mybank"),
            Err(Error::Validation(ValidationError::UnknownBroker(_)))
        ));
    }

    #[test]
    fn test_pdf_routing() {
        assert!(ImportFile::new("Statement.PDF", b"anything".to_vec()).is_pdf());
        assert!(ImportFile::new("upload.bin", b"%PDF-1.7\n".to_vec()).is_pdf());
        assert!(!ImportFile::new("positions.csv", b"Symbol,Quantity".to_vec()).is_pdf());
    }
}
