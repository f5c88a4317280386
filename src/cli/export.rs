use crate::core::analytics::{
    GainPoint, HoldingSummary, SeriesSummary, gain_series, holding_summaries, portfolio_summary,
};
use crate::core::portfolio::Holding;
use crate::core::valuation::HoldingValuation;
use crate::core::{PortfolioValuation, ValuationEngine, ValuationPoint};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Everything known about a valuation run, as written to disk.
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub reporting_currency: &'a str,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub summary: Option<SeriesSummary>,
    pub series: &'a [ValuationPoint],
    pub cost_series: &'a [ValuationPoint],
    pub gain_series: Vec<GainPoint>,
    pub holding_summaries: Vec<HoldingSummary>,
    pub holdings: &'a [HoldingValuation],
}

impl<'a> From<&'a PortfolioValuation> for ExportDocument<'a> {
    fn from(valuation: &'a PortfolioValuation) -> Self {
        ExportDocument {
            reporting_currency: &valuation.reporting_currency,
            start: valuation.start,
            end: valuation.end,
            summary: portfolio_summary(valuation),
            series: &valuation.series,
            cost_series: &valuation.cost_series,
            gain_series: gain_series(&valuation.series, &valuation.cost_series),
            holding_summaries: holding_summaries(valuation),
            holdings: &valuation.holdings,
        }
    }
}

pub fn write_json(valuation: &PortfolioValuation, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&ExportDocument::from(valuation))?;
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write export file to {}", output.display()))?;
    info!("Exported {} days to {}", valuation.series.len(), output.display());
    Ok(())
}

pub async fn run(
    engine: &ValuationEngine<'_>,
    holdings: &[Holding],
    currency: &str,
    from: NaiveDate,
    to: NaiveDate,
    output: &Path,
) -> Result<()> {
    let valuation = super::value_with_progress(engine, holdings, currency, from, to).await?;
    write_json(&valuation, output)?;
    println!("Valuation written to {}", output.display());
    Ok(())
}
