//! Configuration loader
//!
//! Loads application configuration from a file with environment overrides.
//!
//! ## Loading Strategy
//! 1. Search the standard locations for a config file
//! 2. Parse it (JSON or TOML by extension), or start from defaults when no
//!    file exists
//! 3. Overlay `KIDDO_*` environment variables
//! 4. Validate the result
//!
//! ## Environment Variables
//! - `KIDDO_CONFIG`: Explicit config file path (checked first)
//! - `KIDDO_LOG_LEVEL`: Log level or filter directive
//! - `KIDDO_LOG_JSON`: Emit JSON logs (true/false)
//! - `KIDDO_INGEST_BACKOFF_SECS`: Pause between connector fetch passes
//! - `KIDDO_CONSUME_BACKOFF_SECS`: Pause after a queue fault
//! - `KIDDO_MAX_REDELIVERIES`: Requeues allowed before dead-lettering
//! - `KIDDO_QUEUE_CAPACITY`: Upper bound on queued plus in-flight events
//! - `KIDDO_DEFAULT_CALENDAR_ID`: Calendar used when a sink names none
//!
//! ## File Locations
//! The loader checks the following paths (in order):
//! 1. `$KIDDO_CONFIG`
//! 2. `./kiddo.toml`
//! 3. `./kiddo.json`
//! 4. `./config/kiddo.toml`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use kiddo_domain::{Config, KiddoError, Result};

use crate::errors::InfraError;

/// Load configuration from the first config file found, with environment
/// overrides applied on top.
///
/// A missing config file is not an error: defaults are used instead.
///
/// # Errors
/// Returns `KiddoError::Config` if:
/// - The file format is invalid
/// - An environment override has an invalid value
/// - The resulting configuration fails validation
pub fn load() -> Result<Config> {
    let mut config = match find_config_path() {
        Some(path) => read_config(&path)?,
        None => {
            tracing::info!("No config file found, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `KiddoError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(KiddoError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            KiddoError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    let config = read_config(&config_path)?;
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| KiddoError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents)
            .map_err(|e| KiddoError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(KiddoError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Search the standard paths for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(explicit) = std::env::var_os("KIDDO_CONFIG") {
        candidates.push(PathBuf::from(explicit));
    }

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("kiddo.toml"),
            cwd.join("kiddo.json"),
            cwd.join("config").join("kiddo.toml"),
        ]);
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Overlay `KIDDO_*` environment variables onto `config`
///
/// # Errors
/// Returns `KiddoError::Config` if a set variable has an invalid value.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(level) = env_string("KIDDO_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env_bool("KIDDO_LOG_JSON") {
        config.logging.format = if json { "json" } else { "compact" }.to_string();
    }
    if let Some(secs) = env_parse("KIDDO_INGEST_BACKOFF_SECS")? {
        config.pipeline.ingest_backoff_secs = secs;
    }
    if let Some(secs) = env_parse("KIDDO_CONSUME_BACKOFF_SECS")? {
        config.pipeline.consume_backoff_secs = secs;
    }
    if let Some(max) = env_parse("KIDDO_MAX_REDELIVERIES")? {
        config.queue.max_redeliveries = Some(max);
    }
    if let Some(capacity) = env_parse("KIDDO_QUEUE_CAPACITY")? {
        config.queue.max_capacity = Some(capacity);
    }
    if let Some(calendar_id) = env_string("KIDDO_DEFAULT_CALENDAR_ID") {
        config.pipeline.default_calendar_id = calendar_id;
    }
    Ok(())
}

/// Non-empty environment variable
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse a numeric environment variable
///
/// # Errors
/// Returns `KiddoError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| KiddoError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
/// Returns `None` when the variable is not set.
fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
