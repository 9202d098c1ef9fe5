//! Runtime configuration, read from the environment (and `.env` if present).

use std::path::PathBuf;
use std::time::Duration;

use snapcode_crypto::ApiKey;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";
pub const DEFAULT_KEY_PREFIX: &str = "GEMINI_";

/// Where the sealed credential lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    File,
    Keychain,
}

impl std::str::FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keychain" => Ok(Self::Keychain),
            _ => Err(ConfigError::InvalidValue {
                key: "SNAPCODE_STORE".to_string(),
                message: format!("unknown store: {s}, expected 'file' or 'keychain'"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Operator-provisioned key. Fixed for the process lifetime.
    pub env_api_key: Option<ApiKey>,
    pub key_prefix: String,
    pub api_base: String,
    pub model: String,
    pub store: StoreKind,
    pub data_dir: PathBuf,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let env_api_key = get("SNAPCODE_API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .and_then(|v| ApiKey::parse(&v));

        let data_dir = match get("SNAPCODE_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir().ok_or(ConfigError::NoDataDir)?.join(".snapcode"),
        };

        Ok(Self {
            env_api_key,
            key_prefix: get("SNAPCODE_KEY_PREFIX").unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            api_base: get("SNAPCODE_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: get("SNAPCODE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            store: get("SNAPCODE_STORE")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(StoreKind::File),
            data_dir,
            probe_timeout: seconds(get("SNAPCODE_PROBE_TIMEOUT_SECS"), "SNAPCODE_PROBE_TIMEOUT_SECS", 10)?,
            request_timeout: seconds(get("SNAPCODE_REQUEST_TIMEOUT_SECS"), "SNAPCODE_REQUEST_TIMEOUT_SECS", 120)?,
        })
    }

    /// Path of the JSON file store
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("credentials.json")
    }
}

fn seconds(value: Option<String>, key: &str, default: u64) -> Result<Duration, ConfigError> {
    let secs = value
        .map(|s| s.trim().parse::<u64>())
        .transpose()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be a positive integer: {e}"),
        })?
        .unwrap_or(default);
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
