use super::portfolio_model::Portfolio;
use crate::Result;
use async_trait::async_trait;

/// Persistence collaborator.
///
/// The engine never calls this from parsing or merge code. The import service
/// reads through it before running the pipeline and writes through it after.
#[async_trait]
pub trait PortfolioRepositoryTrait: Send + Sync {
    async fn get_current_portfolio(&self) -> Result<Option<Portfolio>>;
    async fn get_all_portfolios(&self) -> Result<Vec<Portfolio>>;
    /// Stores the portfolio, replacing any stored portfolio with the same id.
    async fn save_portfolio(&self, portfolio: Portfolio, set_current: bool) -> Result<()>;
}
