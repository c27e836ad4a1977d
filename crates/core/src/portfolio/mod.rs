//! Portfolio module - canonical position model and persistence contract.

mod portfolio_constants;
mod portfolio_model;
mod portfolio_traits;


pub use portfolio_constants::*;
pub use portfolio_model::{
    is_quantity_significant, ImportSource, ParsedImport, Portfolio, Position,
};
pub use portfolio_traits::PortfolioRepositoryTrait;
