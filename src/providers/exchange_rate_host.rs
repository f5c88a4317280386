use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::core::{CurrencyRateProvider, FxPoint};
use crate::providers::util::get_text;

/// Historical FX rates from the exchangerate.host timeseries endpoint.
pub struct ExchangeRateHostProvider {
    base_url: String,
    access_key: Option<String>,
    client: reqwest::Client,
    retries: usize,
}

#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    success: Option<bool>,
    error: Option<serde_json::Value>,
    #[serde(default)]
    rates: BTreeMap<String, HashMap<String, f64>>,
}

impl ExchangeRateHostProvider {
    pub fn new(
        base_url: &str,
        access_key: Option<String>,
        client: reqwest::Client,
        retries: usize,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key,
            client,
            retries,
        }
    }

    fn timeseries_url(&self, from: &str, to: &str, start: NaiveDate, end: NaiveDate) -> String {
        let mut url = format!(
            "{}/timeseries?start_date={}&end_date={}&base={}&symbols={}",
            self.base_url,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            from,
            to
        );
        if let Some(key) = &self.access_key {
            url.push_str("&access_key=");
            url.push_str(key);
        }
        url
    }
}

#[async_trait]
impl CurrencyRateProvider for ExchangeRateHostProvider {
    fn id(&self) -> &'static str {
        "exchangerate_host"
    }

    async fn fetch_rates(
        &self,
        from: &str,
        to: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FxPoint>> {
        let (from, to) = (from.to_uppercase(), to.to_uppercase());
        let pair = format!("{from}/{to}");
        let url = self.timeseries_url(&from, &to, start, end);
        debug!("Requesting currency rates for {}", pair);

        let text = get_text(&self.client, &url, self.retries)
            .await
            .with_context(|| format!("Request failed for currency pair: {pair}"))?;
        let data: TimeseriesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", pair, e))?;

        if data.success == Some(false) {
            let reason = data
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(anyhow!("exchangerate.host rejected {}: {}", pair, reason));
        }

        let points: Vec<FxPoint> = data
            .rates
            .iter()
            .filter_map(|(day, quotes)| {
                let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
                quotes.get(&to).map(|rate| FxPoint { date, rate: *rate })
            })
            .collect();
        debug!("Fetched {} rates for {}", points.len(), pair);
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::portfolio::tests::date;
    use crate::providers::util::build_client;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str, access_key: Option<&str>) -> ExchangeRateHostProvider {
        ExchangeRateHostProvider::new(
            base_url,
            access_key.map(str::to_string),
            build_client(Duration::from_secs(5)).unwrap(),
            0,
        )
    }

    #[tokio::test]
    async fn test_successful_timeseries_fetch() {
        let mock_server = MockServer::start().await;
        let body = r#"{
            "success": true,
            "timeseries": true,
            "base": "USD",
            "rates": {
                "2024-01-03": {"GBP": 0.79},
                "2024-01-02": {"GBP": 0.785},
                "2024-01-04": {"EUR": 0.91}
            }
        }"#;
        Mock::given(method("GET"))
            .and(path("/timeseries"))
            .and(query_param("start_date", "2024-01-02"))
            .and(query_param("end_date", "2024-01-04"))
            .and(query_param("base", "USD"))
            .and(query_param("symbols", "GBP"))
            .and(query_param("access_key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let rates = provider(&mock_server.uri(), Some("k"))
            .fetch_rates("usd", "gbp", date("2024-01-02"), date("2024-01-04"))
            .await
            .unwrap();

        assert_eq!(
            rates,
            vec![
                FxPoint {
                    date: date("2024-01-02"),
                    rate: 0.785
                },
                FxPoint {
                    date: date("2024-01-03"),
                    rate: 0.79
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_api_rejection() {
        let mock_server = MockServer::start().await;
        let body = r#"{"success": false, "error": {"code": 101, "type": "missing_access_key"}}"#;
        Mock::given(method("GET"))
            .and(path("/timeseries"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server.uri(), None)
            .fetch_rates("USD", "GBP", date("2024-01-02"), date("2024-01-04"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("exchangerate.host rejected USD/GBP"));
        assert!(err.to_string().contains("missing_access_key"));
    }

    #[tokio::test]
    async fn test_http_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/timeseries"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server.uri(), None)
            .fetch_rates("USD", "GBP", date("2024-01-02"), date("2024-01-04"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Request failed for currency pair: USD/GBP");
    }

    #[tokio::test]
    async fn test_access_key_stays_out_of_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/timeseries"))
            .and(query_param("access_key", "SECRETKEY"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server.uri(), Some("SECRETKEY"))
            .fetch_rates("USD", "GBP", date("2024-01-02"), date("2024-01-04"))
            .await
            .unwrap_err();
        let reason = format!("{err:#}");
        assert!(reason.starts_with("Request failed for currency pair: USD/GBP"));
        assert!(!reason.contains("SECRETKEY"), "Leaked key in: {reason}");
    }
}
