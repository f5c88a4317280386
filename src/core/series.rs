//! Date-indexed series helpers shared by the valuation engine and analytics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value on a date, in the reporting currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Sparse daily observations with carry-forward lookup.
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl DailySeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Observation on `date`, or the latest one before it.
    pub fn on_or_before(&self, date: NaiveDate) -> Option<f64> {
        self.points.range(..=date).next_back().map(|(_, v)| *v)
    }

    /// Like [`Self::on_or_before`], falling back to the earliest observation.
    pub fn nearest(&self, date: NaiveDate) -> Option<f64> {
        self.on_or_before(date)
            .or_else(|| self.points.values().next().copied())
    }
}

impl FromIterator<(NaiveDate, f64)> for DailySeries {
    /// Later duplicates of a date replace earlier ones. Non-finite values are dropped.
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().filter(|(_, v)| v.is_finite()).collect(),
        }
    }
}

/// Every calendar day in `[start, end]`. Empty when `start > end`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}
