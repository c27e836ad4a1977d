use async_trait::async_trait;

use super::imports_model::ImportFile;
use crate::merge::MergeStrategy;
use crate::portfolio::{ParsedImport, Portfolio};
use crate::Result;

/// Collaborator for binary statements (PDF). Treated as a black box whose
/// positions are normalized like any parser's.
pub trait DocumentImporterTrait: Send + Sync {
    fn parse(&self, content: &[u8], broker_id: Option<&str>) -> Result<Portfolio>;
}

/// Orchestrates parsing, merging and persistence of uploaded statements.
#[async_trait]
pub trait ImportServiceTrait: Send + Sync {
    /// Runs the pipeline without touching storage.
    fn parse_files(&self, files: &[ImportFile]) -> Result<ParsedImport>;

    /// Merges into the current portfolio (creating one when there is none) and saves it as current.
    async fn import_into_current(
        &self,
        files: &[ImportFile],
        strategy: MergeStrategy,
    ) -> Result<Portfolio>;

    async fn import_into_portfolio(
        &self,
        portfolio_id: &str,
        files: &[ImportFile],
        strategy: MergeStrategy,
    ) -> Result<Portfolio>;

    async fn import_as_new_portfolio(&self, name: &str, files: &[ImportFile]) -> Result<Portfolio>;
}
