use crate::core::config::{AppConfig, PORTFOLIO_FILE_NAME};
use anyhow::{Context, Result};
use std::path::Path;

// Include the examples as string literals in the binary
const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");
const EXAMPLE_PORTFOLIO: &str = include_str!("../../docs/example_portfolio.json");

/// Creates a default configuration file and example portfolio at the default location
pub fn setup() -> Result<()> {
    setup_at_path(AppConfig::default_config_path()?)
}

/// Creates a default configuration file at `path` and an example portfolio next to it.
///
/// An existing portfolio file is left untouched.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create directory: {}", config_dir.display()))?;

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;
    tracing::info!("Created default configuration at {}", path.display());

    let portfolio_path = config_dir.join(PORTFOLIO_FILE_NAME);
    if portfolio_path.exists() {
        tracing::info!("Keeping existing portfolio at {}", portfolio_path.display());
    } else {
        std::fs::write(&portfolio_path, EXAMPLE_PORTFOLIO).with_context(|| {
            format!("Failed to write portfolio file to {}", portfolio_path.display())
        })?;
        tracing::info!("Created example portfolio at {}", portfolio_path.display());
    }

    println!("Configuration written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FxSource;
    use crate::core::portfolio::{load_portfolio, parse_portfolio};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_setup_creates_config_and_portfolio() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("config.yaml");

        setup_at_path(&config_path)?;

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path)?;
        assert!(content.contains("# Example configuration file for folioview"));
        assert!(content.contains("providers:"));
        assert!(content.contains("currency:"));

        // The written config points at the written portfolio
        let config = AppConfig::load_from_path(&config_path)?;
        let holdings = load_portfolio(config.portfolio_path(&config_path))?;
        assert_eq!(holdings.len(), 2);

        Ok(())
    }

    #[test]
    fn test_setup_fails_if_config_exists() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        // Create a file at the config path
        fs::write(&config_path, "test")?;

        // Try to run setup - it should fail
        let result = setup_at_path(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(&config_path)?, "test");

        Ok(())
    }

    #[test]
    fn test_setup_keeps_existing_portfolio() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let portfolio_path = temp_dir.path().join(PORTFOLIO_FILE_NAME);
        fs::write(&portfolio_path, "[]")?;

        setup_at_path(temp_dir.path().join("config.yaml"))?;
        assert_eq!(fs::read_to_string(&portfolio_path)?, "[]");

        Ok(())
    }

    #[test]
    fn test_example_config_is_valid_yaml() -> Result<()> {
        let config: AppConfig = serde_yaml::from_str(EXAMPLE_CONFIG)
            .context("Failed to parse example config as YAML")?;

        assert_eq!(config.currency, "GBP");
        assert_eq!(config.providers.fx, FxSource::Yahoo);
        assert_eq!(config.exchange("LSE").symbol_suffix.as_deref(), Some(".L"));
        assert_eq!(config.exchange("LSE").price_multiplier, 0.01);
        assert_eq!(config.valuation.lookback_days, 7);

        Ok(())
    }

    #[test]
    fn test_example_portfolio_is_valid() -> Result<()> {
        let holdings = parse_portfolio(EXAMPLE_PORTFOLIO)?;
        assert_eq!(holdings[0].date_sold, None);
        assert!(holdings[1].date_sold.is_some());
        Ok(())
    }
}
