//! Configuration resolution for geoprof-ingest
//!
//! Settings resolve CLI → ENV → TOML → default through the shared helpers.

use geoprof_common::config::{resolve_setting, TomlConfig};
use geoprof_common::{Error, Result};

/// Default state FIPS qualifier (the production deployment's state)
const DEFAULT_STATE_FIPS: &str = "02";
/// Default per-place worker pool size
const DEFAULT_WORKERS: usize = 4;

/// Fully-resolved runtime settings for one pipeline run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// State FIPS qualifier for state-scoped source queries
    pub state_fips: String,
    /// Census API key
    pub census_api_key: String,
    /// Health data portal app token
    pub health_app_token: String,
    /// Worker pool size for the per-place fan-out
    pub workers: usize,
}

/// CLI-supplied overrides, highest priority in the resolution chain
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub state_fips: Option<String>,
    pub census_api_key: Option<String>,
    pub health_app_token: Option<String>,
    pub workers: Option<usize>,
}

impl IngestConfig {
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<IngestConfig> {
        let state_fips = resolve_setting(
            "state-fips",
            cli.state_fips.as_deref(),
            "GEOPROF_STATE_FIPS",
            toml.state_fips.as_deref(),
            Some(DEFAULT_STATE_FIPS),
        )?;
        let census_api_key = resolve_setting(
            "census-api-key",
            cli.census_api_key.as_deref(),
            "GEOPROF_CENSUS_API_KEY",
            toml.census_api_key.as_deref(),
            None,
        )?;
        let health_app_token = resolve_setting(
            "health-app-token",
            cli.health_app_token.as_deref(),
            "GEOPROF_HEALTH_APP_TOKEN",
            toml.health_app_token.as_deref(),
            None,
        )?;

        let workers = match cli.workers {
            Some(w) => w,
            None => match std::env::var("GEOPROF_WORKERS") {
                Ok(raw) => raw.parse().map_err(|_| {
                    Error::Config(format!("GEOPROF_WORKERS is not a number: '{}'", raw))
                })?,
                Err(_) => toml.workers.unwrap_or(DEFAULT_WORKERS),
            },
        };
        if workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }

        Ok(IngestConfig {
            state_fips,
            census_api_key,
            health_app_token,
            workers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_keys() -> CliOverrides {
        CliOverrides {
            census_api_key: Some("CENSUS".to_string()),
            health_app_token: Some("HEALTH".to_string()),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn test_defaults_apply() {
        let config = IngestConfig::resolve(&cli_with_keys(), &TomlConfig::default()).unwrap();
        assert_eq!(config.state_fips, "02");
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let toml = TomlConfig {
            state_fips: Some("06".to_string()),
            workers: Some(8),
            ..TomlConfig::default()
        };
        let config = IngestConfig::resolve(&cli_with_keys(), &toml).unwrap();
        assert_eq!(config.state_fips, "06");
        assert_eq!(config.workers, 8);
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml = TomlConfig {
            state_fips: Some("06".to_string()),
            ..TomlConfig::default()
        };
        let mut cli = cli_with_keys();
        cli.state_fips = Some("48".to_string());
        cli.workers = Some(2);
        let config = IngestConfig::resolve(&cli, &toml).unwrap();
        assert_eq!(config.state_fips, "48");
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn test_missing_credentials_fail() {
        let err = IngestConfig::resolve(&CliOverrides::default(), &TomlConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), "Config");
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut cli = cli_with_keys();
        cli.workers = Some(0);
        let err = IngestConfig::resolve(&cli, &TomlConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "Config");
    }
}
