//! Imports module - input files, options and the orchestrating service.

mod import_pipeline;
mod import_service;
mod imports_model;
mod imports_traits;

#[cfg(test)]
mod imports_model_tests;

pub use import_pipeline::parse_import_files;
pub use import_service::ImportService;
pub use imports_model::{ImportFile, ImportOptions};
pub use imports_traits::{DocumentImporterTrait, ImportServiceTrait};
