use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;

use super::import_pipeline::parse_import_files;
use super::imports_model::{ImportFile, ImportOptions};
use super::imports_traits::{DocumentImporterTrait, ImportServiceTrait};
use crate::constants::DEFAULT_PORTFOLIO_NAME;
use crate::errors::{Error, ValidationError};
use crate::merge::{merge_into_portfolio, MergeStrategy};
use crate::portfolio::{ParsedImport, Portfolio, PortfolioRepositoryTrait};
use crate::Result;

/// Service for importing broker statements into stored portfolios
pub struct ImportService {
    repository: Arc<dyn PortfolioRepositoryTrait>,
    document_importer: Option<Arc<dyn DocumentImporterTrait>>,
    options: ImportOptions,
}

impl ImportService {
    /// Creates a new ImportService instance with injected dependencies
    pub fn new(repository: Arc<dyn PortfolioRepositoryTrait>) -> Self {
        Self {
            repository,
            document_importer: None,
            options: ImportOptions::default(),
        }
    }

    pub fn with_document_importer(self, document_importer: Arc<dyn DocumentImporterTrait>) -> Self {
        Self {
            document_importer: Some(document_importer),
            ..self
        }
    }

    pub fn with_options(self, options: ImportOptions) -> Self {
        Self { options, ..self }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }
}

#[async_trait]
impl ImportServiceTrait for ImportService {
    fn parse_files(&self, files: &[ImportFile]) -> Result<ParsedImport> {
        parse_import_files(files, &self.options, self.document_importer.as_deref())
    }

    async fn import_into_current(
        &self,
        files: &[ImportFile],
        strategy: MergeStrategy,
    ) -> Result<Portfolio> {
        let parsed = self.parse_files(files)?;
        let current = match self.repository.get_current_portfolio().await? {
            Some(portfolio) => portfolio,
            None => {
                debug!("No current portfolio. Creating one for the import.");
                Portfolio::new(DEFAULT_PORTFOLIO_NAME, self.options.effective_base_currency())
            }
        };
        let merged = merge_into_portfolio(&current, parsed, strategy);
        self.repository.save_portfolio(merged.clone(), true).await?;
        info!(
            "Imported {} files into current portfolio '{}' ({} positions)",
            files.len(),
            merged.name,
            merged.positions.len()
        );
        Ok(merged)
    }

    async fn import_into_portfolio(
        &self,
        portfolio_id: &str,
        files: &[ImportFile],
        strategy: MergeStrategy,
    ) -> Result<Portfolio> {
        let parsed = self.parse_files(files)?;
        let target = self
            .repository
            .get_all_portfolios()
            .await?
            .into_iter()
            .find(|p| p.id == portfolio_id)
            .ok_or_else(|| Error::Repository(format!("Portfolio {} not found", portfolio_id)))?;
        let merged = merge_into_portfolio(&target, parsed, strategy);
        self.repository.save_portfolio(merged.clone(), false).await?;
        info!(
            "Imported {} files into portfolio '{}' ({} positions)",
            files.len(),
            merged.name,
            merged.positions.len()
        );
        Ok(merged)
    }

    async fn import_as_new_portfolio(&self, name: &str, files: &[ImportFile]) -> Result<Portfolio> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::InvalidInput("Portfolio name is required".to_string()).into());
        }
        let parsed = self.parse_files(files)?;
        let fresh = Portfolio::new(name, self.options.effective_base_currency());
        let portfolio = merge_into_portfolio(&fresh, parsed, MergeStrategy::Add);
        self.repository.save_portfolio(portfolio.clone(), true).await?;
        info!(
            "Created portfolio '{}' with {} positions",
            portfolio.name,
            portfolio.positions.len()
        );
        Ok(portfolio)
    }
}
