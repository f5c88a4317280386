use super::ui;
use crate::core::analytics::{HoldingSummary, holding_summaries};
use crate::core::portfolio::Holding;
use crate::core::{PortfolioValuation, ValuationEngine};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

fn extreme_cell(point: Option<crate::core::ValuationPoint>) -> Cell {
    ui::format_optional_cell(point, |p| format!("{:.2} ({})", p.value, p.date))
}

impl HoldingSummary {
    fn table_row(&self) -> Vec<Cell> {
        let issues = if self.issues > 0 {
            Cell::new(self.issues).fg(comfy_table::Color::Red)
        } else {
            Cell::new("")
        };
        vec![
            Cell::new(&self.name),
            Cell::new(&self.ticker),
            Cell::new(&self.currency),
            ui::amount_cell(self.current_value),
            ui::format_optional_cell(self.cost_basis, |c| format!("{c:.2}")),
            ui::change_cell(self.gain_percent),
            extreme_cell(self.max),
            extreme_cell(self.min),
            issues,
        ]
    }
}

pub fn display(valuation: &PortfolioValuation) -> String {
    let currency = &valuation.reporting_currency;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Holding"),
        ui::header_cell("Ticker"),
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell(&format!("Cost ({currency})")),
        ui::header_cell("Gain (%)"),
        ui::header_cell("Highest"),
        ui::header_cell("Lowest"),
        ui::header_cell("Issues"),
    ]);
    for summary in holding_summaries(valuation) {
        table.add_row(summary.table_row());
    }

    let total = valuation.series.last().map_or(0.0, |p| p.value);
    let mut output = format!(
        "{}\n\n",
        ui::style_text(
            &format!("Holdings on {}", valuation.end),
            ui::StyleType::Title
        )
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\nTotal Value ({}): {}",
        ui::style_text(currency, ui::StyleType::TotalLabel),
        ui::style_text(&format!("{total:.2}"), ui::StyleType::TotalValue)
    ));
    if let Some(issues) = super::value::issue_lines(valuation) {
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
) -> Result<()> {
    let valuation = super::value_with_progress(engine, holdings, currency, from, to).await?;
    println!("{}", display(&valuation));
    Ok(())
}
