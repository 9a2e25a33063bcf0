//! Configuration management for Tgcast
//!
//! Values come from an optional TOML file, then a `.env` file, then the
//! process environment, later sources overriding earlier ones. Validation
//! happens once, when the [`Config`] is built.

use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub const DEFAULT_SESSION_NAME: &str = "session";
pub const DEFAULT_RATE_LIMIT: u32 = 1;

/// Environment variable names
pub const ENV_API_ID: &str = "API_ID";
pub const ENV_API_HASH: &str = "API_HASH";
pub const ENV_PHONE_NUMBER: &str = "PHONE_NUMBER";
pub const ENV_SESSION_NAME: &str = "SESSION_NAME";
pub const ENV_SESSION_STRING: &str = "SESSION_STRING";
pub const ENV_RATE_LIMIT: &str = "RATE_LIMIT";
pub const ENV_RETRY_DIR: &str = "TGCAST_RETRY_DIR";
pub const ENV_CONFIG_PATH: &str = "TGCAST_CONFIG";

/// Validated, read-only process configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_id: i32,
    pub api_hash: SecretString,
    pub phone_number: String,
    pub session_name: String,
    pub session_string: Option<SecretString>,
    /// Maximum messages per second
    pub rate_limit: u32,
    /// Directory holding retry files and the saved session
    pub retry_dir: PathBuf,
}

/// Raw values from a TOML config file; every field is optional
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub api_id: Option<i64>,
    pub api_hash: Option<String>,
    pub phone_number: Option<String>,
    pub session_name: Option<String>,
    pub session_string: Option<String>,
    pub rate_limit: Option<i64>,
    pub retry_dir: Option<String>,
}

impl FileConfig {
    /// Load a config file from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: FileConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }
}

impl Config {
    /// Load configuration from the config file, `.env` and the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = load_file_config()?;
        Self::from_lookup(file, |name| std::env::var(name).ok())
    }

    /// Build a configuration from file values and a variable lookup
    ///
    /// Non-empty values returned by `lookup` override the file. Fails if any
    /// required value is absent or a numeric value does not parse.
    pub fn from_lookup<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_id = var(ENV_API_ID).or_else(|| file.api_id.map(|id| id.to_string()));
        let api_hash = var(ENV_API_HASH).or(file.api_hash);
        let phone_number = var(ENV_PHONE_NUMBER).or(file.phone_number);

        let (api_id, api_hash, phone_number) = match (api_id, api_hash, phone_number) {
            (Some(id), Some(hash), Some(phone)) => (id, hash, phone),
            (id, hash, phone) => {
                let missing: Vec<&str> = [
                    (ENV_API_ID, id.is_none()),
                    (ENV_API_HASH, hash.is_none()),
                    (ENV_PHONE_NUMBER, phone.is_none()),
                ]
                .iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| *name)
                .collect();

                return Err(ConfigError::MissingVariable(format!(
                    "{}. Get API credentials from https://my.telegram.org/apps",
                    missing.join(", ")
                ))
                .into());
            }
        };

        let api_id = api_id
            .trim()
            .parse::<i32>()
            .map_err(|e| ConfigError::InvalidValue {
                name: ENV_API_ID.to_string(),
                reason: format!("'{}' is not an integer ({})", api_id.trim(), e),
            })?;

        let rate_limit = match var(ENV_RATE_LIMIT).or_else(|| file.rate_limit.map(|r| r.to_string())) {
            Some(raw) => parse_rate_limit(&raw)?,
            None => DEFAULT_RATE_LIMIT,
        };

        let session_name = var(ENV_SESSION_NAME)
            .or(file.session_name)
            .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string());

        let session_string = var(ENV_SESSION_STRING)
            .or(file.session_string)
            .filter(|s| !s.trim().is_empty())
            .map(SecretString::from);

        let retry_dir = var(ENV_RETRY_DIR)
            .or(file.retry_dir)
            .map(|dir| PathBuf::from(shellexpand::tilde(&dir).to_string()))
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            api_id,
            api_hash: SecretString::from(api_hash),
            phone_number: phone_number.trim().to_string(),
            session_name,
            session_string,
            rate_limit,
            retry_dir,
        })
    }

    /// Fixed pause between two consecutive sends
    pub fn inter_message_delay(&self) -> Duration {
        Duration::from_secs(1) / self.rate_limit
    }

    /// Path of the session file written by `tgcast-setup`
    pub fn session_file(&self) -> PathBuf {
        self.retry_dir.join(format!("{}.session", self.session_name))
    }
}

fn parse_rate_limit(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(ConfigError::InvalidValue {
            name: ENV_RATE_LIMIT.to_string(),
            reason: format!("'{}' must be a positive integer (messages per second)", raw.trim()),
        }
        .into()),
    }
}

fn load_file_config() -> Result<FileConfig> {
    match resolve_config_path() {
        Some(path) if path.exists() => FileConfig::load_from_path(&path),
        Some(path) if std::env::var(ENV_CONFIG_PATH).is_ok() => {
            // An explicitly requested file must exist
            Err(ConfigError::ReadError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            ))
            .into())
        }
        _ => Ok(FileConfig::default()),
    }
}

/// Resolve the configuration file path under the XDG config directory
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    dirs::config_dir().map(|dir| dir.join("tgcast").join("config.toml"))
}

/// Resolve the retry directory without requiring credentials
///
/// Used by tooling that only touches retry files.
pub fn resolve_retry_dir() -> Result<PathBuf> {
    dotenvy::dotenv().ok();

    if let Some(dir) = std::env::var(ENV_RETRY_DIR).ok().filter(|d| !d.trim().is_empty()) {
        return Ok(PathBuf::from(shellexpand::tilde(&dir).to_string()));
    }

    let file = load_file_config()?;
    Ok(file
        .retry_dir
        .map(|dir| PathBuf::from(shellexpand::tilde(&dir).to_string()))
        .unwrap_or_else(|| PathBuf::from(".")))
}
