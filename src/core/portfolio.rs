//! Portfolio holdings and the `portfolio.json` loader.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// One entry of the portfolio file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Holding {
    pub name: String,
    pub ticker: String,
    pub currency: String,
    pub date_bought: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub date_sold: Option<NaiveDate>,
    #[serde(rename = "holding")]
    pub quantity: u64,
    pub book_cost: f64,
    pub commission: f64,
    pub fx_charge: f64,
    pub exchange: String,
}

// Older portfolio files use "" for a position that is still open.
fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Holding {
    /// True when the holding is owned on `date`; both ends are inclusive.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.date_bought <= date && self.date_sold.is_none_or(|sold| date <= sold)
    }

    /// The part of `[start, end]` during which the holding is owned.
    pub fn active_window(&self, start: NaiveDate, end: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let from = start.max(self.date_bought);
        let to = self.date_sold.map_or(end, |sold| end.min(sold));
        (from <= to).then_some((from, to))
    }

    /// Book cost of a single unit, in the holding's currency.
    pub fn cost_per_unit(&self) -> f64 {
        self.book_cost / self.quantity as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            bail!("Holding '{}' has an empty ticker", self.name);
        }
        if self.currency.trim().is_empty() {
            bail!("Holding '{}' has an empty currency", self.name);
        }
        if self.quantity == 0 {
            bail!("Holding '{}' must hold at least one unit", self.name);
        }
        if let Some(sold) = self.date_sold
            && sold < self.date_bought
        {
            bail!(
                "Holding '{}' was sold on {} before it was bought on {}",
                self.name,
                sold,
                self.date_bought
            );
        }
        if !self.fx_charge.is_finite() || !(0.0..=100.0).contains(&self.fx_charge) {
            bail!(
                "Holding '{}' has an FX charge of {}%, expected 0 to 100",
                self.name,
                self.fx_charge
            );
        }
        for (label, amount) in [("book cost", self.book_cost), ("commission", self.commission)] {
            if !amount.is_finite() || amount < 0.0 {
                bail!("Holding '{}' has an invalid {}: {}", self.name, label, amount);
            }
        }
        Ok(())
    }
}

pub fn parse_portfolio(json: &str) -> Result<Vec<Holding>> {
    let holdings: Vec<Holding> =
        serde_json::from_str(json).context("Portfolio must be a JSON array of holdings")?;
    for (index, holding) in holdings.iter().enumerate() {
        holding
            .validate()
            .with_context(|| format!("Invalid holding at position {}", index + 1))?;
    }
    Ok(holdings)
}

pub fn load_portfolio<P: AsRef<Path>>(path: P) -> Result<Vec<Holding>> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read portfolio file: {}", path.display()))?;
    let holdings = parse_portfolio(&json)
        .with_context(|| format!("Failed to parse portfolio file: {}", path.display()))?;
    debug!("Loaded {} holdings from {}", holdings.len(), path.display());
    Ok(holdings)
}
