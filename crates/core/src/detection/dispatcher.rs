use log::{debug, info, warn};

use crate::dialects::{BrokerId, ParseOptions, ParserResult, DETECTION_ORDER};
use crate::errors::{ImportError, ImportResult};

/// First dialect in detection order whose header appears among the first
/// `line_limit` non-empty lines.
pub fn detect_dialect(text: &str, line_limit: usize) -> Option<BrokerId> {
    sniffed_candidates(text, line_limit, None).into_iter().next()
}

/// Dialects, in detection order, whose header appears in the leading lines.
fn sniffed_candidates(text: &str, line_limit: usize, skip: Option<BrokerId>) -> Vec<BrokerId> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(line_limit)
        .collect();
    DETECTION_ORDER
        .iter()
        .copied()
        .filter(|broker| Some(*broker) != skip)
        .filter(|broker| lines.iter().any(|line| broker.is_header_row(line)))
        .collect()
}

/// Parses `text` with the caller's dialect, falling back to header sniffing
/// and finally to the generic parser.
///
/// `UnrecognizedFormat` moves on to the next candidate. Any other file-level
/// error is returned as is. When the caller named a dialect and nothing else
/// could parse the file either, the error is `ImportFailed` carrying the
/// named parser's failure.
pub fn select_parser(
    explicit: Option<BrokerId>,
    text: &str,
    options: &ParseOptions,
    line_limit: usize,
) -> ImportResult<ParserResult> {
    if text.trim().is_empty() {
        return Err(ImportError::EmptyImport("input is blank".to_string()));
    }

    let mut explicit_failure: Option<(BrokerId, ImportError)> = None;
    if let Some(broker) = explicit {
        match broker.parse(text, options) {
            Ok(result) => return Ok(result),
            Err(e) if e.is_unrecognized_format() && broker != BrokerId::Generic => {
                warn!("{} parser rejected the file ({}). Detecting format.", broker.display_name(), e);
                explicit_failure = Some((broker, e));
            }
            Err(e) => return Err(e),
        }
    }

    for broker in sniffed_candidates(text, line_limit, explicit) {
        debug!("Header matches {}", broker.display_name());
        match broker.parse(text, options) {
            Ok(result) => {
                info!("Detected {} export", broker.display_name());
                return Ok(result.with_auto_detected(true));
            }
            Err(e) if e.is_unrecognized_format() => {
                warn!("{} header matched but parsing failed: {}", broker.display_name(), e);
            }
            Err(e) => return Err(e),
        }
    }

    warn!("No known dialect matched. Falling back to generic CSV.");
    match BrokerId::Generic.parse(text, options) {
        Ok(result) => Ok(result.with_auto_detected(true)),
        Err(e) => match explicit_failure {
            Some((broker, cause)) => {
                debug!("Generic fallback failed as well: {}", e);
                Err(ImportError::ImportFailed {
                    broker: broker.as_str().to_string(),
                    cause: Box::new(cause),
                })
            }
            None => Err(e),
        },
    }
}
