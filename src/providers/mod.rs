pub mod caching;
pub mod exchange_rate_host;
pub mod util;
pub mod yahoo_finance;
