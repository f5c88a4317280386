use crate::core::cache::KeyValueCollection;
use crate::core::{CurrencyRateProvider, FxPoint, PricePoint, PriceProvider};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Decides how long a cached response stays valid.
///
/// Closes of past days never change, so a response whose range ends before
/// yesterday is kept until explicitly cleared. Anything reaching yesterday
/// expires after `latest_ttl`: markets west of the local zone may still be
/// trading on what is already today here.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub today: NaiveDate,
    pub latest_ttl: Duration,
}

impl CachePolicy {
    pub fn ttl_for(&self, end: NaiveDate) -> Option<Duration> {
        let yesterday = self.today.pred_opt().unwrap_or(self.today);
        (end >= yesterday).then_some(self.latest_ttl)
    }
}

async fn cached_fetch<V, F>(
    cache: &dyn KeyValueCollection,
    key: String,
    ttl: Option<Duration>,
    fetch: F,
) -> Result<V>
where
    V: Serialize + DeserializeOwned,
    F: Future<Output = Result<V>>,
{
    if let Some(bytes) = cache.get(key.as_bytes()).await {
        match serde_json::from_slice(&bytes) {
            Ok(value) => return Ok(value),
            Err(e) => debug!("Discarding unreadable cache entry {}: {}", key, e),
        }
    }

    // Failures are returned uncached so the next run asks again
    let value = fetch.await?;
    cache
        .put(key.as_bytes(), &serde_json::to_vec(&value)?, ttl)
        .await;
    Ok(value)
}

// Caching for PriceProvider
pub struct CachingPriceProvider<T: PriceProvider> {
    inner: T,
    cache: Arc<dyn KeyValueCollection>,
    policy: CachePolicy,
}

impl<T: PriceProvider> CachingPriceProvider<T> {
    pub fn new(inner: T, cache: Arc<dyn KeyValueCollection>, policy: CachePolicy) -> Self {
        Self {
            inner,
            cache,
            policy,
        }
    }
}

#[async_trait]
impl<T: PriceProvider> PriceProvider for CachingPriceProvider<T> {
    fn id(&self) -> &'static str {
        self.inner.id()
    }

    fn cache_key(&self, ticker: &str, exchange: &str) -> String {
        self.inner.cache_key(ticker, exchange)
    }

    async fn fetch_prices(
        &self,
        ticker: &str,
        exchange: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        let key = format!(
            "{}|{}|{}|{}",
            self.inner.id(),
            self.inner.cache_key(ticker, exchange),
            start,
            end
        );
        cached_fetch(
            self.cache.as_ref(),
            key,
            self.policy.ttl_for(end),
            self.inner.fetch_prices(ticker, exchange, start, end),
        )
        .await
    }
}

// Caching for CurrencyRateProvider
pub struct CachingCurrencyRateProvider<T: CurrencyRateProvider> {
    inner: T,
    cache: Arc<dyn KeyValueCollection>,
    policy: CachePolicy,
}

impl<T: CurrencyRateProvider> CachingCurrencyRateProvider<T> {
    pub fn new(inner: T, cache: Arc<dyn KeyValueCollection>, policy: CachePolicy) -> Self {
        Self {
            inner,
            cache,
            policy,
        }
    }
}

#[async_trait]
impl<T: CurrencyRateProvider> CurrencyRateProvider for CachingCurrencyRateProvider<T> {
    fn id(&self) -> &'static str {
        self.inner.id()
    }

    async fn fetch_rates(
        &self,
        from: &str,
        to: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FxPoint>> {
        let key = format!(
            "{}|{}|{}|{}|{}",
            self.inner.id(),
            from.to_uppercase(),
            to.to_uppercase(),
            start,
            end
        );
        cached_fetch(
            self.cache.as_ref(),
            key,
            self.policy.ttl_for(end),
            self.inner.fetch_rates(from, to, start, end),
        )
        .await
    }
}
