pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::cache::{KeyValueCollection, Store};
use crate::core::config::{AppConfig, FxSource};
use crate::core::portfolio::load_portfolio;
use crate::core::{CurrencyRateProvider, PriceProvider, ValuationEngine};
use crate::providers::caching::{CachePolicy, CachingCurrencyRateProvider, CachingPriceProvider};
use crate::providers::exchange_rate_host::ExchangeRateHostProvider;
use crate::providers::util::build_client;
use crate::providers::yahoo_finance::{YahooCurrencyProvider, YahooFinanceProvider};
use crate::store::KeyValueStore;
use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub const PRICE_COLLECTION: &str = "prices";
pub const FX_COLLECTION: &str = "fx_rates";

pub enum AppCommand {
    Value {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        step: usize,
    },
    Holdings {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    Export {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        output: PathBuf,
    },
    ClearCache,
}

/// Today in the local calendar; the default end of every range.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn open_store(config: &AppConfig) -> Result<KeyValueStore> {
    if config.cache.enabled && config.cache.persist {
        Ok(KeyValueStore::open(&config.default_data_path()?))
    } else {
        Ok(KeyValueStore::in_memory())
    }
}

fn collection(
    config: &AppConfig,
    store: &KeyValueStore,
    name: &str,
) -> Option<Arc<dyn KeyValueCollection>> {
    if !config.cache.enabled {
        return None;
    }
    store.get_collection(name, config.cache.persist, true)
}

fn with_price_cache<T: PriceProvider + 'static>(
    inner: T,
    cache: Option<Arc<dyn KeyValueCollection>>,
    policy: CachePolicy,
) -> Box<dyn PriceProvider + Send + Sync> {
    match cache {
        Some(cache) => Box::new(CachingPriceProvider::new(inner, cache, policy)),
        None => Box::new(inner),
    }
}

fn with_rate_cache<T: CurrencyRateProvider + 'static>(
    inner: T,
    cache: Option<Arc<dyn KeyValueCollection>>,
    policy: CachePolicy,
) -> Box<dyn CurrencyRateProvider + Send + Sync> {
    match cache {
        Some(cache) => Box::new(CachingCurrencyRateProvider::new(inner, cache, policy)),
        None => Box::new(inner),
    }
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    portfolio_path: Option<&str>,
) -> Result<()> {
    info!("folioview starting...");

    let config_path = match config_path {
        Some(path) => PathBuf::from(path),
        None => AppConfig::default_config_path()?,
    };
    let config = AppConfig::load_from_path(&config_path)?;
    debug!("Loaded config: {config:#?}");

    let store = open_store(&config)?;
    if let AppCommand::ClearCache = command {
        return cli::cache::clear(&store, &[PRICE_COLLECTION, FX_COLLECTION]).await;
    }

    let portfolio_path = match portfolio_path {
        Some(path) => PathBuf::from(path),
        None => config.portfolio_path(&config_path),
    };
    let holdings = load_portfolio(&portfolio_path)?;

    let policy = CachePolicy {
        today: today(),
        latest_ttl: config.cache.latest_ttl(),
    };
    let client = build_client(config.providers.timeout())?;
    let retries = config.providers.retries;
    let yahoo_url = config.providers.yahoo_base_url();

    let price_provider = with_price_cache(
        YahooFinanceProvider::new(yahoo_url, client.clone(), retries, config.exchanges.clone()),
        collection(&config, &store, PRICE_COLLECTION),
        policy,
    );
    let rate_cache = collection(&config, &store, FX_COLLECTION);
    let currency_provider = match config.providers.fx {
        FxSource::Yahoo => with_rate_cache(
            YahooCurrencyProvider::new(yahoo_url, client.clone(), retries),
            rate_cache,
            policy,
        ),
        FxSource::ExchangeRateHost => {
            let settings = config.providers.exchange_rate_host.clone().unwrap_or_default();
            with_rate_cache(
                ExchangeRateHostProvider::new(
                    &settings.base_url,
                    settings.access_key,
                    client.clone(),
                    retries,
                ),
                rate_cache,
                policy,
            )
        }
    };
    debug!(
        "Using {} for prices and {} for FX rates",
        price_provider.id(),
        currency_provider.id()
    );

    let engine = ValuationEngine::new(price_provider.as_ref(), currency_provider.as_ref())
        .with_lookback_days(config.valuation.lookback_days);
    let currency = config.currency.as_str();

    let result = match command {
        AppCommand::Value { from, to, step } => {
            let (from, to) = cli::resolve_range(&holdings, from, to, today())?;
            cli::value::run(&engine, &holdings, currency, from, to, step).await
        }
        AppCommand::Holdings { from, to } => {
            let (from, to) = cli::resolve_range(&holdings, from, to, today())?;
            cli::holdings::run(&engine, &holdings, currency, from, to).await
        }
        AppCommand::Export { from, to, output } => {
            let (from, to) = cli::resolve_range(&holdings, from, to, today())?;
            cli::export::run(&engine, &holdings, currency, from, to, &output).await
        }
        AppCommand::ClearCache => unreachable!("cache clear returns early"),
    };

    store.persist();
    result
}
