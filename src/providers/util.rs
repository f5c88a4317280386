use anyhow::{Error, Result};
use chrono::NaiveDate;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = "folioview/0.1";

/// Builds the HTTP client shared by all providers.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Transport failures, rate limiting and server errors are worth another try.
fn is_retryable(err: &reqwest::Error) -> bool {
    match err.status() {
        Some(status) => status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error(),
        None => true,
    }
}

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts. Client
/// errors other than 429 fail immediately.
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                // URLs can carry credentials in their query string
                let err = err.without_url();
                if attempt > retries || !is_retryable(&err) {
                    return Err(err.into());
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// GETs `url` with retries and returns the body of a successful response.
pub async fn get_text(
    client: &reqwest::Client,
    url: &str,
    retries: usize,
) -> Result<String, Error> {
    let response = with_retry(
        || async move { client.get(url).send().await?.error_for_status() },
        retries,
        500,
    )
    .await?;
    Ok(response.text().await.map_err(reqwest::Error::without_url)?)
}

/// Unix timestamp of midnight UTC starting `date`.
pub fn start_of_day(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}
