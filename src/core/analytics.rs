//! Gain/loss series and summary statistics derived from a valuation.
use crate::core::series::ValuationPoint;
use crate::core::valuation::{HoldingValuation, PortfolioValuation};
use chrono::NaiveDate;
use serde::Serialize;

/// Value against cost on one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GainPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub cost: f64,
    pub actual_change: f64,
    /// Absent while nothing has been invested.
    pub percent_change: Option<f64>,
}

fn percent_of(change: f64, cost: f64) -> Option<f64> {
    (cost != 0.0).then(|| change * 100.0 / cost)
}

/// Pairs value and cost points by position; both series cover the same days.
pub fn gain_series(values: &[ValuationPoint], costs: &[ValuationPoint]) -> Vec<GainPoint> {
    values
        .iter()
        .zip(costs)
        .map(|(value, cost)| {
            let actual_change = value.value - cost.value;
            GainPoint {
                date: value.date,
                value: value.value,
                cost: cost.value,
                actual_change,
                percent_change: percent_of(actual_change, cost.value),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub first: ValuationPoint,
    pub current: ValuationPoint,
    pub max: ValuationPoint,
    pub min: ValuationPoint,
    pub cost: f64,
    pub gain: f64,
    pub gain_percent: Option<f64>,
}

impl SeriesSummary {
    /// Summarises `values` against `cost`, the cost basis at the last date.
    /// Ties on max/min keep the earliest date.
    pub fn from_series(values: &[ValuationPoint], cost: f64) -> Option<Self> {
        let first = *values.first()?;
        let current = *values.last()?;
        let mut max = first;
        let mut min = first;
        for point in values {
            if point.value > max.value {
                max = *point;
            }
            if point.value < min.value {
                min = *point;
            }
        }
        let gain = current.value - cost;
        Some(Self {
            first,
            current,
            max,
            min,
            cost,
            gain,
            gain_percent: percent_of(gain, cost),
        })
    }
}

/// Summary of the whole portfolio over the valued range.
pub fn portfolio_summary(valuation: &PortfolioValuation) -> Option<SeriesSummary> {
    let cost = valuation.cost_series.last().map_or(0.0, |p| p.value);
    SeriesSummary::from_series(&valuation.series, cost)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingSummary {
    pub name: String,
    pub ticker: String,
    pub currency: String,
    /// Value on the last owned day of the range; the sale value once sold.
    pub current_value: f64,
    pub value_date: Option<NaiveDate>,
    pub cost_basis: Option<f64>,
    pub gain_percent: Option<f64>,
    pub max: Option<ValuationPoint>,
    pub min: Option<ValuationPoint>,
    pub issues: usize,
}

impl HoldingSummary {
    pub fn from_valuation(holding: &HoldingValuation) -> Self {
        let owned: Vec<ValuationPoint> = holding.owned_points().copied().collect();
        let summary = SeriesSummary::from_series(&owned, holding.cost_basis.unwrap_or(0.0));
        let current = summary.as_ref().map(|s| s.current);
        let current_value = current.map_or(0.0, |p| p.value);
        Self {
            name: holding.name.clone(),
            ticker: holding.ticker.clone(),
            currency: holding.currency.clone(),
            current_value,
            value_date: current.map(|p| p.date),
            cost_basis: holding.cost_basis,
            // Nothing to compare while the holding is not owned in range
            gain_percent: current.and(holding.cost_basis).and_then(|cost| {
                percent_of(current_value - cost, cost)
            }),
            max: summary.as_ref().map(|s| s.max),
            min: summary.as_ref().map(|s| s.min),
            issues: holding.issues.len(),
        }
    }
}

pub fn holding_summaries(valuation: &PortfolioValuation) -> Vec<HoldingSummary> {
    valuation
        .holdings
        .iter()
        .map(HoldingSummary::from_valuation)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::portfolio::tests::date;

    fn points(values: &[(&str, f64)]) -> Vec<ValuationPoint> {
        values
            .iter()
            .map(|(d, value)| ValuationPoint {
                date: date(d),
                value: *value,
            })
            .collect()
    }

    #[test]
    fn test_gain_series() {
        let values = points(&[("2024-01-01", 0.0), ("2024-01-02", 1100.0), ("2024-01-03", 900.0)]);
        let costs = points(&[("2024-01-01", 0.0), ("2024-01-02", 1000.0), ("2024-01-03", 1000.0)]);

        let gains = gain_series(&values, &costs);
        assert_eq!(gains.len(), 3);
        assert_eq!(gains[0].actual_change, 0.0);
        assert_eq!(gains[0].percent_change, None);
        assert_eq!(gains[1].actual_change, 100.0);
        assert_eq!(gains[1].percent_change, Some(10.0));
        assert_eq!(gains[2].actual_change, -100.0);
        assert_eq!(gains[2].percent_change, Some(-10.0));
    }

    #[test]
    fn test_series_summary() {
        let values = points(&[
            ("2024-01-01", 1000.0),
            ("2024-01-02", 1200.0),
            ("2024-01-03", 800.0),
            ("2024-01-04", 1200.0),
            ("2024-01-05", 1100.0),
        ]);
        let summary = SeriesSummary::from_series(&values, 1000.0).unwrap();

        assert_eq!(summary.first.value, 1000.0);
        assert_eq!(summary.current.date, date("2024-01-05"));
        assert_eq!(summary.max.date, date("2024-01-02"));
        assert_eq!(summary.min.date, date("2024-01-03"));
        assert_eq!(summary.gain, 100.0);
        assert_eq!(summary.gain_percent, Some(10.0));
    }

    #[test]
    fn test_empty_series_has_no_summary() {
        assert_eq!(SeriesSummary::from_series(&[], 100.0), None);
    }

    #[test]
    fn test_zero_cost_has_no_percentage() {
        let values = points(&[("2024-01-01", 50.0)]);
        let summary = SeriesSummary::from_series(&values, 0.0).unwrap();
        assert_eq!(summary.gain, 50.0);
        assert_eq!(summary.gain_percent, None);
    }

    #[test]
    fn test_holding_summary_ignores_unowned_days() {
        let holding = HoldingValuation {
            name: "Apple".to_string(),
            ticker: "AAPL".to_string(),
            currency: "USD".to_string(),
            date_bought: date("2024-01-02"),
            date_sold: None,
            points: points(&[
                ("2024-01-01", 0.0),
                ("2024-01-02", 1000.0),
                ("2024-01-03", 1250.0),
                ("2024-01-04", 1250.0),
            ]),
            cost_basis: Some(1000.0),
            issues: Vec::new(),
        };

        let summary = HoldingSummary::from_valuation(&holding);
        assert_eq!(summary.current_value, 1250.0);
        assert_eq!(summary.value_date, Some(date("2024-01-04")));
        assert_eq!(summary.gain_percent, Some(25.0));
        assert_eq!(summary.min.unwrap().date, date("2024-01-02"));
        assert_eq!(summary.max.unwrap().date, date("2024-01-03"));
        assert_eq!(summary.issues, 0);
    }

    #[test]
    fn test_sold_holding_is_measured_at_sale() {
        let holding = HoldingValuation {
            name: "Apple".to_string(),
            ticker: "AAPL".to_string(),
            currency: "USD".to_string(),
            date_bought: date("2023-06-01"),
            date_sold: Some(date("2024-01-02")),
            points: points(&[
                ("2024-01-01", 1400.0),
                ("2024-01-02", 1500.0),
                ("2024-01-03", 0.0),
                ("2024-01-04", 0.0),
            ]),
            cost_basis: Some(1000.0),
            issues: Vec::new(),
        };

        let summary = HoldingSummary::from_valuation(&holding);
        assert_eq!(summary.current_value, 1500.0);
        assert_eq!(summary.value_date, Some(date("2024-01-02")));
        assert_eq!(summary.gain_percent, Some(50.0));
        assert_eq!(summary.min.unwrap().value, 1400.0);
    }

    #[test]
    fn test_holding_sold_before_range_has_no_gain() {
        let holding = HoldingValuation {
            name: "Apple".to_string(),
            ticker: "AAPL".to_string(),
            currency: "USD".to_string(),
            date_bought: date("2023-06-01"),
            date_sold: Some(date("2023-12-31")),
            points: points(&[("2024-01-01", 0.0), ("2024-01-02", 0.0)]),
            cost_basis: Some(1000.0),
            issues: Vec::new(),
        };

        let summary = HoldingSummary::from_valuation(&holding);
        assert_eq!(summary.current_value, 0.0);
        assert_eq!(summary.value_date, None);
        assert_eq!(summary.gain_percent, None);
        assert_eq!(summary.max, None);
    }

    #[test]
    fn test_holding_summary_without_rate() {
        let holding = HoldingValuation {
            name: "Vodafone".to_string(),
            ticker: "VOD".to_string(),
            currency: "GBP".to_string(),
            date_bought: date("2024-01-01"),
            date_sold: None,
            points: points(&[("2024-01-01", 0.0)]),
            cost_basis: None,
            issues: Vec::new(),
        };

        let summary = HoldingSummary::from_valuation(&holding);
        assert_eq!(summary.gain_percent, None);
        assert_eq!(summary.max, None);
    }
}
