use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::config::ExchangeConfig;
use crate::core::{CurrencyRateProvider, FxPoint, PricePoint, PriceProvider};
use crate::providers::util::{get_text, start_of_day};

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    currency: Option<String>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

/// Daily closes out of a chart response, keyed by exchange-local date.
fn parse_daily_closes(symbol: &str, text: &str) -> Result<Vec<(NaiveDate, f64)>> {
    let data: YahooChartResponse = serde_json::from_str(text)
        .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

    if let Some(err) = data.chart.error {
        return Err(anyhow!(
            "Yahoo error for {}: {} ({})",
            symbol,
            err.description,
            err.code
        ));
    }

    let item = data
        .chart
        .result
        .and_then(|items| items.into_iter().next())
        .ok_or_else(|| anyhow!("No chart data found for symbol: {}", symbol))?;
    debug!(currency = ?item.meta.currency, "Chart metadata for {}", symbol);

    let (Some(timestamps), Some(closes)) = (
        item.timestamp,
        item.indicators
            .and_then(|inds| inds.quote.into_iter().next())
            .and_then(|q| q.close),
    ) else {
        return Ok(Vec::new());
    };

    let mut points: Vec<(NaiveDate, f64)> = timestamps
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let date = DateTime::from_timestamp(ts + item.meta.gmtoffset, 0)?.date_naive();
            close.map(|c| (date, c))
        })
        .collect();

    // The live bar for today can share a date with the last daily bar
    points.sort_by_key(|(date, _)| *date);
    points.reverse();
    points.dedup_by_key(|(date, _)| *date);
    points.reverse();
    Ok(points)
}

fn chart_url(base_url: &str, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
    let period1 = start_of_day(start);
    let period2 = start_of_day(end) + 24 * 60 * 60;
    format!("{base_url}/v8/finance/chart/{symbol}?period1={period1}&period2={period2}&interval=1d")
}

async fn fetch_daily_closes(
    client: &reqwest::Client,
    base_url: &str,
    retries: usize,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(NaiveDate, f64)>> {
    let url = chart_url(base_url, symbol, start, end);
    debug!("Requesting chart data from {}", url);

    let text = get_text(client, &url, retries)
        .await
        .with_context(|| format!("Request failed for symbol: {symbol}"))?;
    let points = parse_daily_closes(symbol, &text)?;
    Ok(points
        .into_iter()
        .filter(|(date, _)| (start..=end).contains(date))
        .collect())
}

/// Yahoo Finance daily closes for listed securities.
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    exchanges: HashMap<String, ExchangeConfig>,
}

impl YahooFinanceProvider {
    pub fn new(
        base_url: &str,
        client: reqwest::Client,
        retries: usize,
        exchanges: HashMap<String, ExchangeConfig>,
    ) -> Self {
        YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retries,
            exchanges,
        }
    }

    fn exchange(&self, exchange: &str) -> ExchangeConfig {
        self.exchanges.get(exchange).cloned().unwrap_or_default()
    }

    /// Yahoo symbol for a ticker, e.g. `LLOY` on `LSE` becomes `LLOY.L`.
    pub fn resolve_symbol(&self, ticker: &str, exchange: &str) -> String {
        match self.exchange(exchange).symbol_suffix {
            Some(suffix) if !ticker.contains('.') => format!("{ticker}{suffix}"),
            _ => ticker.to_string(),
        }
    }
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    fn cache_key(&self, ticker: &str, exchange: &str) -> String {
        format!(
            "{}|x{}",
            self.resolve_symbol(ticker, exchange),
            self.exchange(exchange).price_multiplier
        )
    }

    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(ticker = %ticker, exchange = %exchange)
    )]
    async fn fetch_prices(
        &self,
        ticker: &str,
        exchange: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        let symbol = self.resolve_symbol(ticker, exchange);
        let multiplier = self.exchange(exchange).price_multiplier;

        let closes =
            fetch_daily_closes(&self.client, &self.base_url, self.retries, &symbol, start, end)
                .await?;
        debug!("Fetched {} closes for {}", closes.len(), symbol);

        Ok(closes
            .into_iter()
            .map(|(date, close)| PricePoint {
                date,
                price: close * multiplier,
            })
            .collect())
    }
}

/// Yahoo Finance daily FX rates from the `XXXYYY=X` pairs.
pub struct YahooCurrencyProvider {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
}

impl YahooCurrencyProvider {
    pub fn new(base_url: &str, client: reqwest::Client, retries: usize) -> Self {
        YahooCurrencyProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retries,
        }
    }
}

#[async_trait]
impl CurrencyRateProvider for YahooCurrencyProvider {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    #[instrument(name = "YahooRateFetch", skip(self))]
    async fn fetch_rates(
        &self,
        from: &str,
        to: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FxPoint>> {
        let symbol = format!("{}{}=X", from.to_uppercase(), to.to_uppercase());
        let closes =
            fetch_daily_closes(&self.client, &self.base_url, self.retries, &symbol, start, end)
                .await?;
        debug!("Fetched {} rates for {}", closes.len(), symbol);

        Ok(closes
            .into_iter()
            .map(|(date, rate)| FxPoint { date, rate })
            .collect())
    }
}
