//! Currency conversion abstractions

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Rate converting one unit of the source currency into the target currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FxPoint {
    pub date: NaiveDate,
    pub rate: f64,
}

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    fn id(&self) -> &'static str;

    async fn fetch_rates(
        &self,
        from: &str,
        to: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FxPoint>>;
}

/// Currency codes compare case-insensitively.
pub fn is_same_currency(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_same_currency() {
        assert!(is_same_currency("USD", "usd"));
        assert!(is_same_currency(" GBP", "GBP"));
        assert!(!is_same_currency("USD", "EUR"));
    }
}
