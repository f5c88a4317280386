use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::fs;
use tracing::debug;

pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_EXCHANGE_RATE_HOST_URL: &str = "https://api.exchangerate.host";
pub const PORTFOLIO_FILE_NAME: &str = "portfolio.json";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateHostConfig {
    #[serde(default = "default_exchange_rate_host_url")]
    pub base_url: String,
    pub access_key: Option<String>,
}

fn default_exchange_rate_host_url() -> String {
    DEFAULT_EXCHANGE_RATE_HOST_URL.to_string()
}

impl Default for ExchangeRateHostConfig {
    fn default() -> Self {
        Self {
            base_url: default_exchange_rate_host_url(),
            access_key: None,
        }
    }
}

/// Source used for historical currency rates.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FxSource {
    #[default]
    Yahoo,
    ExchangeRateHost,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub fx: FxSource,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: usize,
    pub yahoo: Option<YahooProviderConfig>,
    pub exchange_rate_host: Option<ExchangeRateHostConfig>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> usize {
    3
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            fx: FxSource::default(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            yahoo: Some(YahooProviderConfig {
                base_url: DEFAULT_YAHOO_URL.to_string(),
            }),
            exchange_rate_host: None,
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.yahoo
            .as_ref()
            .map_or(DEFAULT_YAHOO_URL, |p| p.base_url.as_str())
    }
}

/// How tickers listed on an exchange are looked up and scaled.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExchangeConfig {
    /// Appended to the ticker when it carries no suffix of its own, e.g. `.L`.
    pub symbol_suffix: Option<String>,
    /// Multiplied into every quoted price, e.g. `0.01` for pence quotes.
    #[serde(default = "default_price_multiplier")]
    pub price_multiplier: f64,
}

fn default_price_multiplier() -> f64 {
    1.0
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            symbol_suffix: None,
            price_multiplier: default_price_multiplier(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub persist: bool,
    /// Lifetime of responses that include today's (still moving) data.
    #[serde(default = "default_latest_ttl_minutes")]
    pub latest_ttl_minutes: u64,
}

fn default_true() -> bool {
    true
}

fn default_latest_ttl_minutes() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: true,
            latest_ttl_minutes: default_latest_ttl_minutes(),
        }
    }
}

impl CacheConfig {
    pub fn latest_ttl(&self) -> Duration {
        Duration::from_secs(self.latest_ttl_minutes.saturating_mul(60))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ValuationConfig {
    /// Days fetched before a holding's window so a non-trading first day can
    /// carry the previous close forward.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

fn default_lookback_days() -> u32 {
    7
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Reporting currency.
    pub currency: String,
    pub portfolio_path: Option<String>,
    pub data_path: Option<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub exchanges: HashMap<String, ExchangeConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub valuation: ValuationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "folioview")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        if config.currency.trim().is_empty() {
            anyhow::bail!(
                "Reporting currency is empty in config file: {}",
                path.as_ref().display()
            );
        }
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Locates the portfolio file. A configured relative path, and the default
    /// `portfolio.json`, both live next to the config file.
    pub fn portfolio_path(&self, config_path: &Path) -> PathBuf {
        let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        match &self.portfolio_path {
            Some(p) if Path::new(p).is_absolute() => PathBuf::from(p),
            Some(p) => config_dir.join(p),
            None => config_dir.join(PORTFOLIO_FILE_NAME),
        }
    }

    pub fn exchange(&self, name: &str) -> ExchangeConfig {
        self.exchanges.get(name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currency: "GBP"
exchanges:
  LSE:
    symbol_suffix: ".L"
    price_multiplier: 0.01
  NASDAQ: {}
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currency, "GBP");
        assert!(config.portfolio_path.is_none());

        let lse = config.exchange("LSE");
        assert_eq!(lse.symbol_suffix.as_deref(), Some(".L"));
        assert_eq!(lse.price_multiplier, 0.01);

        let nasdaq = config.exchange("NASDAQ");
        assert!(nasdaq.symbol_suffix.is_none());
        assert_eq!(nasdaq.price_multiplier, 1.0);

        // Unknown exchanges fall back to the identity mapping
        assert_eq!(config.exchange("CRYPTO"), ExchangeConfig::default());

        // Defaults for omitted sections
        assert_eq!(config.providers.fx, FxSource::Yahoo);
        assert_eq!(config.providers.yahoo_base_url(), DEFAULT_YAHOO_URL);
        assert_eq!(config.providers.timeout(), Duration::from_secs(30));
        assert!(config.cache.enabled);
        assert!(config.cache.persist);
        assert_eq!(config.cache.latest_ttl(), Duration::from_secs(3600));
        assert_eq!(config.valuation.lookback_days, 7);
    }

    #[test]
    fn test_huge_latest_ttl_saturates() {
        let yaml = format!("currency: USD\ncache:\n  latest_ttl_minutes: {}\n", u64::MAX);
        let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.cache.latest_ttl(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_default_paths_belong_to_folioview() {
        // Platforms without a home directory have no default location
        if let Ok(path) = AppConfig::default_config_path() {
            assert!(path.ends_with("config.yaml"));
            assert!(path.to_string_lossy().contains("folioview"));
            assert!(!path.to_string_lossy().contains("codito"));
        }
    }

    #[test]
    fn test_config_with_providers() {
        let yaml_str = r#"
currency: "EUR"
portfolio_path: "holdings/mine.json"
providers:
  fx: exchange_rate_host
  timeout_secs: 5
  retries: 0
  yahoo:
    base_url: "http://example.com/yahoo"
  exchange_rate_host:
    base_url: "http://example.com/fx"
    access_key: "secret"
cache:
  persist: false
  latest_ttl_minutes: 15
valuation:
  lookback_days: 3
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(config.providers.fx, FxSource::ExchangeRateHost);
        assert_eq!(config.providers.timeout(), Duration::from_secs(5));
        assert_eq!(config.providers.retries, 0);
        assert_eq!(config.providers.yahoo_base_url(), "http://example.com/yahoo");
        let erh = config.providers.exchange_rate_host.as_ref().unwrap();
        assert_eq!(erh.base_url, "http://example.com/fx");
        assert_eq!(erh.access_key.as_deref(), Some("secret"));
        assert!(config.cache.enabled);
        assert!(!config.cache.persist);
        assert_eq!(config.cache.latest_ttl(), Duration::from_secs(900));
        assert_eq!(config.valuation.lookback_days, 3);
    }

    #[test]
    fn test_portfolio_path_resolution() {
        let config_path = Path::new("/home/user/.config/folioview/config.yaml");
        let mut config: AppConfig = serde_yaml::from_str("currency: USD").unwrap();

        assert_eq!(
            config.portfolio_path(config_path),
            PathBuf::from("/home/user/.config/folioview/portfolio.json")
        );

        config.portfolio_path = Some("data/p.json".to_string());
        assert_eq!(
            config.portfolio_path(config_path),
            PathBuf::from("/home/user/.config/folioview/data/p.json")
        );

        config.portfolio_path = Some("/srv/p.json".to_string());
        assert_eq!(config.portfolio_path(config_path), PathBuf::from("/srv/p.json"));
    }

    #[test]
    fn test_load_rejects_empty_currency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "currency: \"\"\n").unwrap();

        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Reporting currency is empty"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");

        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
