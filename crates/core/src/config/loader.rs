use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Default config location: `$SB_CONFIG`, else `$HOME/.config/sb/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("SB_CONFIG") {
        return PathBuf::from(path);
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".config/sb/config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

/// Load configuration from file with environment variable overrides.
///
/// Overrides use `SB_` and `__` as the nesting separator, e.g.
/// `SB_CLIENTS__SEEDBOX__PASSWORD`. Figment lowercases env keys, so only
/// lowercase client names can be overridden this way.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("SB_").ignore(&["config"]).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
