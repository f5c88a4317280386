//! Daily valuation of a portfolio in a reporting currency.
//!
//! Every holding is valued on every calendar day of the requested range:
//! `quantity × price × fx_rate × (1 − fx_charge / 100)` while it is owned and
//! zero otherwise. The portfolio series is the per-day sum.
//!
//! Missing data never aborts the run:
//! - a price carries forward from the latest close on or before the day; with
//!   no such close the units are valued at their book cost per unit,
//! - a rate carries forward the same way, falling back to the earliest known
//!   rate; a holding with no rates at all contributes zero.
//!
//! Every fallback is recorded on the holding's [`HoldingValuation::issues`].

use crate::core::currency::{CurrencyRateProvider, is_same_currency};
use crate::core::portfolio::Holding;
use crate::core::price::PriceProvider;
use crate::core::series::{DailySeries, ValuationPoint, days_between};
use anyhow::{Result, bail};
use chrono::{Days, NaiveDate};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// A data problem met while valuing a holding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValuationIssue {
    /// The price request failed.
    PriceUnavailable { reason: String },
    /// Days valued at book cost because no earlier close was known.
    PriceAtBookCost { days: usize },
    /// The FX request failed.
    RateUnavailable { reason: String },
    /// No rate at all, the holding was left out.
    NotConverted { days: usize },
}

impl std::fmt::Display for ValuationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValuationIssue::PriceUnavailable { reason } => write!(f, "prices unavailable: {reason}"),
            ValuationIssue::PriceAtBookCost { days } => {
                write!(f, "valued at book cost on {days} day(s) without a quote")
            }
            ValuationIssue::RateUnavailable { reason } => write!(f, "FX rates unavailable: {reason}"),
            ValuationIssue::NotConverted { days } => {
                write!(f, "left out on {days} day(s) without an FX rate")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingValuation {
    pub name: String,
    pub ticker: String,
    pub currency: String,
    pub date_bought: NaiveDate,
    pub date_sold: Option<NaiveDate>,
    /// One point per day of the range; zero while the holding is not owned.
    pub points: Vec<ValuationPoint>,
    /// `book_cost + commission` converted at the purchase date, when a rate exists.
    pub cost_basis: Option<f64>,
    pub issues: Vec<ValuationIssue>,
}

impl HoldingValuation {
    /// Points on the days the holding was owned, both ends inclusive.
    pub fn owned_points(&self) -> impl Iterator<Item = &ValuationPoint> {
        self.points.iter().filter(|p| {
            self.date_bought <= p.date && self.date_sold.is_none_or(|sold| p.date <= sold)
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioValuation {
    pub reporting_currency: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Total value per day.
    pub series: Vec<ValuationPoint>,
    /// Sum of the cost bases of the holdings owned on each day.
    pub cost_series: Vec<ValuationPoint>,
    pub holdings: Vec<HoldingValuation>,
}

impl PortfolioValuation {
    pub fn has_issues(&self) -> bool {
        self.holdings.iter().any(|h| !h.issues.is_empty())
    }
}

/// Rates converting one holding's currency into the reporting currency.
enum Conversion {
    Identity,
    Rates(DailySeries),
}

impl Conversion {
    fn rate_on(&self, date: NaiveDate) -> Option<f64> {
        match self {
            Conversion::Identity => Some(1.0),
            Conversion::Rates(rates) => rates.nearest(date),
        }
    }
}

pub struct ValuationEngine<'a> {
    price_provider: &'a (dyn PriceProvider + Send + Sync),
    currency_provider: &'a (dyn CurrencyRateProvider + Send + Sync),
    lookback_days: u32,
}

impl<'a> ValuationEngine<'a> {
    pub fn new(
        price_provider: &'a (dyn PriceProvider + Send + Sync),
        currency_provider: &'a (dyn CurrencyRateProvider + Send + Sync),
    ) -> Self {
        Self {
            price_provider,
            currency_provider,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    fn lookback(&self, date: NaiveDate) -> NaiveDate {
        date.checked_sub_days(Days::new(self.lookback_days.into()))
            .unwrap_or(date)
    }

    /// Values `holdings` on every day of `[start, end]`.
    ///
    /// Holdings are fetched concurrently; `update_callback` fires once per
    /// finished holding.
    pub async fn value_portfolio(
        &self,
        holdings: &[Holding],
        reporting_currency: &str,
        start: NaiveDate,
        end: NaiveDate,
        update_callback: &(dyn Fn() + Sync),
    ) -> Result<PortfolioValuation> {
        if start > end {
            bail!("Start date {} is after end date {}", start, end);
        }
        info!(
            "Valuing {} holdings in {} from {} to {}",
            holdings.len(),
            reporting_currency,
            start,
            end
        );

        let futures = holdings.iter().map(|holding| async move {
            let valuation = self
                .value_holding(holding, reporting_currency, start, end)
                .await;
            update_callback();
            valuation
        });
        let valuations = join_all(futures).await;

        let series = sum_points(start, end, valuations.iter().map(|v| v.points.as_slice()));
        let cost_series = days_between(start, end)
            .map(|date| ValuationPoint {
                date,
                value: holdings
                    .iter()
                    .zip(&valuations)
                    .filter(|(holding, _)| holding.is_active_on(date))
                    .filter_map(|(_, valuation)| valuation.cost_basis)
                    .sum(),
            })
            .collect();

        Ok(PortfolioValuation {
            reporting_currency: reporting_currency.to_string(),
            start,
            end,
            series,
            cost_series,
            holdings: valuations,
        })
    }

    async fn value_holding(
        &self,
        holding: &Holding,
        reporting_currency: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HoldingValuation {
        let mut valuation = HoldingValuation {
            name: holding.name.clone(),
            ticker: holding.ticker.clone(),
            currency: holding.currency.clone(),
            date_bought: holding.date_bought,
            date_sold: holding.date_sold,
            points: Vec::new(),
            cost_basis: None,
            issues: Vec::new(),
        };

        let window = holding.active_window(start, end);
        let (prices, conversion) = match window {
            Some((from, to)) => {
                let fetch_from = self.lookback(from);
                futures::join!(
                    self.fetch_prices(holding, fetch_from, to),
                    self.fetch_conversion(
                        holding,
                        reporting_currency,
                        self.lookback(from.min(holding.date_bought)),
                        to,
                    )
                )
            }
            // Nothing to value in range; the cost basis still needs a rate
            None => (
                Ok(DailySeries::default()),
                self.fetch_conversion(
                    holding,
                    reporting_currency,
                    self.lookback(holding.date_bought),
                    holding.date_bought,
                )
                .await,
            ),
        };

        let prices = prices.unwrap_or_else(|reason| {
            valuation
                .issues
                .push(ValuationIssue::PriceUnavailable { reason });
            DailySeries::default()
        });
        let conversion = conversion.unwrap_or_else(|reason| {
            valuation.issues.push(ValuationIssue::RateUnavailable { reason });
            Conversion::Rates(DailySeries::default())
        });

        valuation.cost_basis = conversion
            .rate_on(holding.date_bought)
            .map(|rate| (holding.book_cost + holding.commission) * rate);

        let mut book_cost_days = 0;
        let mut unconverted_days = 0;
        let net_of_charge = 1.0 - holding.fx_charge / 100.0;

        valuation.points = days_between(start, end)
            .map(|date| {
                if !holding.is_active_on(date) {
                    return ValuationPoint { date, value: 0.0 };
                }
                let price = prices.on_or_before(date).unwrap_or_else(|| {
                    book_cost_days += 1;
                    holding.cost_per_unit()
                });
                let value = match conversion.rate_on(date) {
                    Some(rate) => holding.quantity as f64 * price * rate * net_of_charge,
                    None => {
                        unconverted_days += 1;
                        0.0
                    }
                };
                ValuationPoint { date, value }
            })
            .collect();

        if book_cost_days > 0 {
            valuation.issues.push(ValuationIssue::PriceAtBookCost {
                days: book_cost_days,
            });
        }
        if unconverted_days > 0 {
            valuation.issues.push(ValuationIssue::NotConverted {
                days: unconverted_days,
            });
        }
        for issue in &valuation.issues {
            warn!("{} ({}): {}", holding.name, holding.ticker, issue);
        }

        valuation
    }

    async fn fetch_prices(
        &self,
        holding: &Holding,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<DailySeries, String> {
        match self
            .price_provider
            .fetch_prices(&holding.ticker, &holding.exchange, from, to)
            .await
        {
            Ok(points) => {
                debug!("{} closes for {}", points.len(), holding.ticker);
                Ok(points.into_iter().map(|p| (p.date, p.price)).collect())
            }
            Err(e) => Err(format!("{e:#}")),
        }
    }

    async fn fetch_conversion(
        &self,
        holding: &Holding,
        reporting_currency: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Conversion, String> {
        if is_same_currency(&holding.currency, reporting_currency) {
            return Ok(Conversion::Identity);
        }
        match self
            .currency_provider
            .fetch_rates(&holding.currency, reporting_currency, from, to)
            .await
        {
            Ok(points) => {
                debug!(
                    "{} rates for {}/{}",
                    points.len(),
                    holding.currency,
                    reporting_currency
                );
                Ok(Conversion::Rates(
                    points.into_iter().map(|p| (p.date, p.rate)).collect(),
                ))
            }
            Err(e) => Err(format!("{e:#}")),
        }
    }
}

/// Per-day sum of equally dated series covering `[start, end]`.
fn sum_points<'p>(
    start: NaiveDate,
    end: NaiveDate,
    series: impl Iterator<Item = &'p [ValuationPoint]>,
) -> Vec<ValuationPoint> {
    let mut totals: Vec<ValuationPoint> = days_between(start, end)
        .map(|date| ValuationPoint { date, value: 0.0 })
        .collect();
    for points in series {
        for (total, point) in totals.iter_mut().zip(points) {
            debug_assert_eq!(total.date, point.date);
            total.value += point.value;
        }
    }
    totals
}
