//! Configuration loading and resolution
//!
//! Settings resolve through a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Contents of the optional geoprof TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// State FIPS qualifier applied to state-scoped source queries
    pub state_fips: Option<String>,
    /// Census API key
    pub census_api_key: Option<String>,
    /// Health data portal app token
    pub health_app_token: Option<String>,
    /// Worker pool size for per-place fan-out
    pub workers: Option<usize>,
}

impl TomlConfig {
    /// Load a TOML config file from an explicit path, or from the default
    /// platform location when no path is given. A missing default file is
    /// not an error; a missing explicit file is.
    pub fn load(explicit_path: Option<&Path>) -> Result<TomlConfig> {
        let path = match explicit_path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Config(format!("config file not found: {}", p.display())));
                }
                p.to_path_buf()
            }
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(TomlConfig::default()),
            },
        };

        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("invalid config file {}: {}", path.display(), e)))
    }
}

/// Default configuration file path for the platform
/// (e.g. `~/.config/geoprof/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("geoprof").join("config.toml"))
}

/// Resolve one string setting through the CLI → ENV → TOML → default chain.
///
/// Warns when the setting is supplied by more than one source, since that
/// usually indicates a stale config file.
pub fn resolve_setting(
    name: &str,
    cli_value: Option<&str>,
    env_var: &str,
    toml_value: Option<&str>,
    default: Option<&str>,
) -> Result<String> {
    let env_value = std::env::var(env_var).ok();

    let mut sources = Vec::new();
    if cli_value.is_some() {
        sources.push("command line");
    }
    if env_value.is_some() {
        sources.push("environment");
    }
    if toml_value.is_some() {
        sources.push("TOML");
    }
    if sources.len() > 1 {
        warn!(
            setting = name,
            "{} found in multiple sources: {}. Using {} (highest priority).",
            name,
            sources.join(", "),
            sources[0]
        );
    }

    cli_value
        .map(str::to_string)
        .or(env_value)
        .or_else(|| toml_value.map(str::to_string))
        .or_else(|| default.map(str::to_string))
        .ok_or_else(|| Error::Config(format!("{} not configured (set --{} or {})", name, name, env_var)))
}
