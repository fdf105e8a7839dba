use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::AppConfig;

/// Get the default logtail data directory: ~/.logtail
pub fn get_logtail_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".logtail"))
}

pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str::<AppConfig>(&s).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_default() -> Result<AppConfig, ConfigError> {
    // Priority 1: $LOGTAIL_CONFIG
    let explicit = std::env::var_os("LOGTAIL_CONFIG")
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty());

    // Priority 2: ~/.logtail/config.toml
    let home_config = get_logtail_data_dir().map(|d| d.join("config.toml"));

    // Priority 3: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg = if let Some(path) = explicit {
        load_from_path(&path)?
    } else if let Some(path) = home_config.filter(|p| p.exists()) {
        load_from_path(&path)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg);

    // Surface bad `since`/`tail` values at startup rather than on the first stream.
    cfg.logs.stream_options()?;

    Ok(cfg)
}

pub fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("LOGTAIL_DOCKER_BIN") {
        if !v.trim().is_empty() {
            cfg.docker.binary = v;
        }
    }
    if let Ok(v) = std::env::var("LOGTAIL_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v;
        }
    }
}
