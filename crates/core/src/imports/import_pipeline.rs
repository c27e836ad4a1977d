//! Synchronous parse and merge pipeline: bytes in, one accumulated
//! [`ParsedImport`] out. Nothing here touches storage.

use log::{debug, info};

use super::imports_model::{ImportFile, ImportOptions};
use super::imports_traits::DocumentImporterTrait;
use crate::detection::select_parser;
use crate::dialects::decode_content;
use crate::errors::{ImportError, Result};
use crate::merge::fold_parsed_import;
use crate::normalization::normalize_and_deduplicate_positions;
use crate::portfolio::{ImportSource, ParsedImport, Portfolio, Position};

/// Provenance label for positions produced by the document importer
/// when the caller named no broker.
const DOCUMENT_SOURCE: &str = "document";

/// What one file contributed before folding.
struct FileOutcome {
    broker_id: String,
    positions: Vec<Position>,
    usable_rows: usize,
    skipped_rows: usize,
    auto_detected: bool,
}

fn parse_document(
    file: &ImportFile,
    importer: Option<&dyn DocumentImporterTrait>,
) -> Result<FileOutcome> {
    let importer = importer.ok_or_else(|| {
        ImportError::unrecognized("pdf", format!("no document importer for '{}'", file.file_name))
    })?;
    let broker_id = file.broker.map(|b| b.as_str());
    let portfolio = importer.parse(&file.content, broker_id)?;
    let positions = portfolio.positions;
    Ok(FileOutcome {
        broker_id: broker_id.unwrap_or(DOCUMENT_SOURCE).to_string(),
        usable_rows: positions.len(),
        positions,
        skipped_rows: 0,
        auto_detected: false,
    })
}

fn parse_csv(file: &ImportFile, options: &ImportOptions) -> Result<FileOutcome> {
    let text = decode_content(&file.content);
    let result = select_parser(
        file.broker,
        &text,
        &options.parse_options(),
        options.effective_detection_line_limit(),
    )?;
    if result.broker.is_transaction_history() {
        debug!(
            "'{}': {} history rows folded into {} positions",
            file.file_name,
            result.usable_rows,
            result.positions().len()
        );
    }
    Ok(FileOutcome {
        broker_id: result.broker.as_str().to_string(),
        usable_rows: result.usable_rows,
        skipped_rows: result.skipped_rows,
        auto_detected: result.auto_detected,
        positions: result.into_positions(),
    })
}

/// Parses every file, normalizes each file's positions and folds them into
/// one batch with the configured merge strategy.
///
/// Fails with `EmptyImport` when there are no files or no file yielded a
/// usable row.
pub fn parse_import_files(
    files: &[ImportFile],
    options: &ImportOptions,
    document_importer: Option<&dyn DocumentImporterTrait>,
) -> Result<ParsedImport> {
    if files.is_empty() {
        return Err(ImportError::EmptyImport("no files supplied".to_string()).into());
    }
    let strategy = options.effective_merge_strategy();

    let mut batch = ParsedImport::default();
    let mut usable_rows = 0;
    for file in files {
        let outcome = if file.is_pdf() {
            parse_document(file, document_importer)?
        } else {
            parse_csv(file, options)?
        };
        usable_rows += outcome.usable_rows;

        let positions = normalize_and_deduplicate_positions(outcome.positions);
        let mut source = ImportSource::new(&outcome.broker_id, &file.file_name, positions.len());
        source.skipped_rows = outcome.skipped_rows;
        source.auto_detected = outcome.auto_detected;
        info!(
            "Imported '{}' as {}: {} positions, {} rows skipped",
            file.file_name,
            outcome.broker_id,
            positions.len(),
            outcome.skipped_rows
        );

        let next = ParsedImport {
            portfolio: Portfolio::from_positions(positions),
            sources: vec![source],
        };
        batch = fold_parsed_import(batch, next, strategy);
    }

    if usable_rows == 0 {
        return Err(ImportError::EmptyImport(format!(
            "no usable rows in {} file(s)",
            files.len()
        ))
        .into());
    }
    debug!(
        "Batch of {} files produced {} positions",
        files.len(),
        batch.positions().len()
    );
    Ok(batch)
}
