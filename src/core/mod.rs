//! Core business logic abstractions

pub mod analytics;
pub mod cache;
pub mod config;
pub mod currency;
pub mod log;
pub mod portfolio;
pub mod price;
pub mod series;
pub mod valuation;

// Re-export main types for cleaner imports
pub use currency::{CurrencyRateProvider, FxPoint};
pub use portfolio::Holding;
pub use price::{PricePoint, PriceProvider};
pub use series::ValuationPoint;
pub use valuation::{PortfolioValuation, ValuationEngine};
