//! Configuration loader
//!
//! Loads a client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `SPBRIDGE_PRODUCTION_HOSTS` is missing, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Unset fields keep their defaults in both sources.
//!
//! ## Environment Variables
//! - `SPBRIDGE_PRODUCTION_HOSTS`: Comma-separated live hostnames (required)
//! - `SPBRIDGE_LIST_PATH`: List API path relative to the site
//! - `SPBRIDGE_CONTEXT_INFO_PATH`: Context-info path relative to the site
//! - `SPBRIDGE_ACCOUNT_NAME_PREFIX`: Claims prefix for email lookups
//! - `SPBRIDGE_REFRESH_INTERVAL_MS`: Token renewal interval
//! - `SPBRIDGE_MAX_RENEWALS`: Renewal budget of the bounded policy
//! - `SPBRIDGE_UNBOUNDED_RENEWAL`: Renew until shutdown (true/false)
//! - `SPBRIDGE_DEV_LOAD_DELAY_MS`: Fixed local-mode latency
//! - `SPBRIDGE_DEV_LOAD_DELAY_MIN_MS` / `SPBRIDGE_DEV_LOAD_DELAY_MAX_MS`:
//!   Random local-mode latency range
//! - `SPBRIDGE_REQUEST_TIMEOUT_MS`: Per-request timeout
//! - `SPBRIDGE_MAX_ATTEMPTS`: Transport attempts per call
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./spbridge.json` or `./spbridge.toml` (current working directory)
//! 2. `../spbridge.{json,toml}` and `../../spbridge.{json,toml}`
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use spbridge_domain::{ClientConfig, RenewalPolicy, Result, SpError};

const CONFIG_FILE_NAMES: [&str; 2] = ["spbridge.json", "spbridge.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `SpError::Config` if the configuration cannot be loaded from
/// either source or holds invalid values.
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `SpError::Config` if `SPBRIDGE_PRODUCTION_HOSTS` is missing or a
/// numeric variable cannot be parsed.
pub fn load_from_env() -> Result<ClientConfig> {
    let hosts = env_var("SPBRIDGE_PRODUCTION_HOSTS")?;
    let mut config = ClientConfig {
        production_hosts: hosts
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .collect(),
        ..ClientConfig::default()
    };

    if let Some(path) = env_opt("SPBRIDGE_LIST_PATH") {
        config.list_path = path;
    }
    if let Some(path) = env_opt("SPBRIDGE_CONTEXT_INFO_PATH") {
        config.context_info_path = path;
    }
    if let Some(prefix) = env_opt("SPBRIDGE_ACCOUNT_NAME_PREFIX") {
        config.account_name_prefix = prefix;
    }
    if let Some(interval) = env_parse("SPBRIDGE_REFRESH_INTERVAL_MS")? {
        config.form_digest_refresh_interval_ms = interval;
    }

    if env_bool("SPBRIDGE_UNBOUNDED_RENEWAL", false) {
        config.renewal_policy = RenewalPolicy::Unbounded;
    } else if let Some(max_renewals) = env_parse("SPBRIDGE_MAX_RENEWALS")? {
        config.renewal_policy = RenewalPolicy::Bounded { max_renewals };
    }

    if let Some(delay) = env_parse("SPBRIDGE_DEV_LOAD_DELAY_MS")? {
        config.dev_load_delay_ms = Some(delay);
    }
    config.dev_load_delay_min_ms = env_parse("SPBRIDGE_DEV_LOAD_DELAY_MIN_MS")?;
    config.dev_load_delay_max_ms = env_parse("SPBRIDGE_DEV_LOAD_DELAY_MAX_MS")?;

    if let Some(timeout) = env_parse("SPBRIDGE_REQUEST_TIMEOUT_MS")? {
        config.request_timeout_ms = timeout;
    }
    if let Some(attempts) = env_parse("SPBRIDGE_MAX_ATTEMPTS")? {
        config.max_attempts = attempts;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SpError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SpError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SpError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SpError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`); files without
/// an extension are read as JSON.
///
/// # Errors
/// Returns `SpError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SpError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SpError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(SpError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `SpError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| SpError::Config(format!("Missing required environment variable: {}", key)))
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Parse an optional numeric environment variable.
///
/// # Errors
/// Returns `SpError::Config` if the variable is set but not a valid number.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| SpError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
