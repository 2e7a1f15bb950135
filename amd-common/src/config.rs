//! Configuration loading and data folder resolution

use std::path::PathBuf;

use crate::{Error, Result};

/// Service configuration, assembled once at startup and passed explicitly to
/// the components that need it.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    /// Folder holding the SQLite database
    pub data_dir: PathBuf,
    /// Access token the external license server must present
    pub license_access_token: String,
    /// Password assigned to the seeded administrator account
    pub default_admin_password: String,
    /// Defaults applied to newly provisioned recognition configurations
    pub recognizer: RecognizerDefaults,
}

/// Default recognizer parameters for new accounts
#[derive(Debug, Clone)]
pub struct RecognizerDefaults {
    pub encoding: String,
    pub rate: i64,
    pub interval_length: f64,
    pub predictions: i64,
    pub prediction_criteria: String,
}

impl Default for RecognizerDefaults {
    fn default() -> Self {
        Self {
            encoding: "slin".to_string(),
            rate: 8000,
            interval_length: 2.0,
            predictions: 2,
            prediction_criteria: String::new(),
        }
    }
}

impl Config {
    /// Assemble configuration from the CLI argument and environment.
    ///
    /// The data folder follows the four-tier resolution in [`resolve_data_dir`];
    /// the remaining knobs come from environment variables with compiled
    /// defaults.
    pub fn load(cli_data_dir: Option<&str>) -> Result<Self> {
        let port = env_or("AMD_PORT", "5000");
        let port: u16 = port
            .parse()
            .map_err(|_| Error::Config(format!("AMD_PORT is not a valid port: {}", port)))?;

        let rate = parse_env_or("DEFAULT_AUDIO_RATE", 8000)?;
        let interval_length = parse_env_or("DEFAULT_MAX_AUDIO_INTERVAL", 2.0)?;
        let predictions = parse_env_or("DEFAULT_MAX_PREDICTIONS", 2)?;

        Ok(Self {
            host: env_or("AMD_HOST", "127.0.0.1"),
            port,
            data_dir: resolve_data_dir(cli_data_dir),
            license_access_token: env_or("LICENSE_SERVER_ACCESS_TOKEN", "TOKEN"),
            default_admin_password: env_or("USER_DEFAULT_PASSWORD", "password"),
            recognizer: RecognizerDefaults {
                encoding: env_or("DEFAULT_AUDIO_ENCODING", "slin"),
                rate,
                interval_length,
                predictions,
                prediction_criteria: env_or("DEFAULT_PREDICTION_CRITERIA", ""),
            },
        })
    }

    /// Path of the SQLite database inside the data folder
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("amd.db")
    }
}

/// Resolve the data folder with the following priority order:
/// 1. Command-line argument (highest priority)
/// 2. `AMD_DATA_DIR` environment variable
/// 3. `data_dir` key in the TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("AMD_DATA_DIR") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = config_file_path() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_dir) = config.get("data_dir").and_then(|v| v.as_str()) {
                    return PathBuf::from(data_dir);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_dir()
}

/// Locate the config file for the platform, if one exists
fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("amd-admin").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    let system_config = PathBuf::from("/etc/amd-admin/config.toml");
    if system_config.exists() {
        return Ok(system_config);
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("amd-admin"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/amd-admin"))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match std::env::var(name) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", name, raw))),
        _ => Ok(default),
    }
}
