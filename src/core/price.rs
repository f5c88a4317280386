//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closing price of a ticker on a trading day, in the holding's currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Stable name used to namespace cached responses.
    fn id(&self) -> &'static str;

    /// Identifies the quote a request returns, for caching. Providers that
    /// rewrite the ticker or scale prices must fold that into the key.
    fn cache_key(&self, ticker: &str, exchange: &str) -> String {
        format!("{ticker}|{exchange}")
    }

    /// Daily closes for `ticker` between `start` and `end`, both inclusive.
    /// Non-trading days are simply absent.
    async fn fetch_prices(
        &self,
        ticker: &str,
        exchange: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>>;
}
