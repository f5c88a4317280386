use super::ui;
use crate::core::analytics::{GainPoint, SeriesSummary, gain_series, portfolio_summary};
use crate::core::portfolio::Holding;
use crate::core::{PortfolioValuation, ValuationEngine};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

/// Every `step`-th point starting at the first, plus the last point.
pub fn sample_points<T: Copy>(points: &[T], step: usize) -> Vec<T> {
    let step = step.max(1);
    if points.is_empty() {
        return Vec::new();
    }
    let mut sampled: Vec<T> = points.iter().step_by(step).copied().collect();
    if (points.len() - 1) % step != 0
        && let Some(last) = points.last()
    {
        sampled.push(*last);
    }
    sampled
}

fn summary_lines(summary: &SeriesSummary, currency: &str) -> String {
    let gain_pct = summary
        .gain_percent
        .map_or("N/A".to_string(), |p| format!("{p:.2}%"));
    let mut output = format!(
        "Current Value ({}): {}\n",
        ui::style_text(currency, ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:.2}", summary.current.value), ui::StyleType::TotalValue)
    );
    output.push_str(&format!("Cost Basis: {:.2}\n", summary.cost));
    output.push_str(&format!("Gain/Loss: {:+.2} ({})\n", summary.gain, gain_pct));
    output.push_str(&format!(
        "Highest: {:.2} on {}\n",
        summary.max.value, summary.max.date
    ));
    output.push_str(&format!(
        "Lowest: {:.2} on {}",
        summary.min.value, summary.min.date
    ));
    output
}

fn series_table(gains: &[GainPoint], currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell("Cost"),
        ui::header_cell("Change"),
        ui::header_cell("Change (%)"),
    ]);
    for point in gains {
        table.add_row(vec![
            Cell::new(point.date.to_string()),
            ui::amount_cell(point.value),
            ui::amount_cell(point.cost),
            ui::gain_cell(point.actual_change),
            ui::change_cell(point.percent_change),
        ]);
    }
    table.to_string()
}

/// Holdings valued with fallbacks, one line per issue.
pub fn issue_lines(valuation: &PortfolioValuation) -> Option<String> {
    if !valuation.has_issues() {
        return None;
    }
    let mut output = ui::style_text("Data issues:", ui::StyleType::Error);
    for holding in &valuation.holdings {
        for issue in &holding.issues {
            output.push_str(&format!(
                "\n  {} ({}): {}",
                holding.name,
                holding.ticker,
                ui::style_text(&issue.to_string(), ui::StyleType::Subtle)
            ));
        }
    }
    Some(output)
}

pub fn display(valuation: &PortfolioValuation, step: usize) -> String {
    let currency = &valuation.reporting_currency;
    let mut output = format!(
        "{}\n\n",
        ui::style_text(
            &format!("Portfolio from {} to {}", valuation.start, valuation.end),
            ui::StyleType::Title
        )
    );

    let gains = gain_series(&valuation.series, &valuation.cost_series);
    output.push_str(&series_table(&sample_points(&gains, step), currency));

    if let Some(summary) = portfolio_summary(valuation) {
        output.push_str("\n\n");
        output.push_str(&summary_lines(&summary, currency));
    }
    if let Some(issues) = issue_lines(valuation) {
        output.push_str("\n\n");
        output.push_str(&issues);
    }
    output
}

pub async fn run(
    engine: &ValuationEngine<'_>,
    holdings: &[Holding],
    currency: &str,
    from: NaiveDate,
    to: NaiveDate,
    step: usize,
) -> Result<()> {
    let valuation = super::value_with_progress(engine, holdings, currency, from, to).await?;
    println!("{}", display(&valuation, step));
    Ok(())
}
