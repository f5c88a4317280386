pub mod cache;
pub mod export;
pub mod holdings;
pub mod setup;
pub mod ui;
pub mod value;

use crate::core::portfolio::Holding;
use crate::core::{PortfolioValuation, ValuationEngine};
use anyhow::{Result, bail};
use chrono::NaiveDate;

/// Fills in the default range: from the earliest purchase to `today`.
pub fn resolve_range(
    holdings: &[Holding],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let to = to.unwrap_or(today);
    let from = match from {
        Some(from) => from,
        None => holdings
            .iter()
            .map(|h| h.date_bought)
            .min()
            .unwrap_or(to),
    };
    if from > to {
        bail!("Start date {} is after end date {}", from, to);
    }
    Ok((from, to))
}

/// Runs the engine behind a progress bar ticking once per holding.
pub async fn value_with_progress(
    engine: &ValuationEngine<'_>,
    holdings: &[Holding],
    currency: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<PortfolioValuation> {
    let pb = ui::new_progress_bar(holdings.len() as u64, true);
    pb.set_message("Fetching prices and rates...");
    let result = engine
        .value_portfolio(holdings, currency, from, to, &|| pb.inc(1))
        .await;
    pb.finish_and_clear();
    result
}
