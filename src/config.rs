// Configuration loading and parsing (config/battleboard.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub live: LiveConfig,
}

/// `[server]` section: where the platform lives.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the REST API (e.g. `http://localhost:8000/api`).
    pub api_base_url: String,
    /// Base URL of the WebSocket endpoint (e.g. `ws://localhost:8000`).
    pub ws_base_url: String,
    /// Per-request timeout for snapshot fetches, in seconds.
    pub request_timeout_secs: u64,
}

/// `[live]` section: freshness and degraded-mode policy.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    /// Minimum snapshot age before an explicit refresh actually refetches.
    /// The live log is the primary source of freshness; refetching more
    /// often than this is wasted work.
    pub snapshot_staleness_secs: u64,
    /// Whether to fall back to periodic snapshot refetching when the live
    /// link closes.
    pub polling_fallback: bool,
    /// Refetch interval while in polling fallback, in seconds.
    pub poll_interval_secs: u64,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

const CONFIG_FILE: &str = "battleboard.toml";

/// Load and validate configuration from `config/battleboard.toml` relative
/// to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy the
/// default file. Prefer `load_config()` which handles initialization.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Ensure `config/battleboard.toml` exists by copying it from `defaults/`
/// when missing. Returns `true` if the file was copied.
pub fn ensure_config_file(base_dir: &Path) -> Result<bool, ConfigError> {
    let default_path = base_dir.join("defaults").join(CONFIG_FILE);
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE);

    if target.exists() {
        return Ok(false);
    }
    if !default_path.exists() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither {} nor defaults/{} found in {}; run from the project root",
                target.display(),
                CONFIG_FILE,
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;
    std::fs::copy(&default_path, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", default_path.display()),
    })?;

    Ok(true)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying the default file first when missing.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.api_base_url.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.api_base_url".into(),
            message: "must not be empty".into(),
        });
    }

    let ws = &config.server.ws_base_url;
    if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
        return Err(ConfigError::ValidationError {
            field: "server.ws_base_url".into(),
            message: format!("must start with ws:// or wss://, got `{ws}`"),
        });
    }

    if config.server.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.request_timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.live.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "live.poll_interval_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
