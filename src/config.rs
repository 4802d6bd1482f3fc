//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Service configuration, built once from environment variables at startup
/// and passed by reference into the scheduler and cycle.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Twilio account SID.
    pub twilio_account_sid: String,
    /// Twilio auth token.
    pub twilio_auth_token: SecretString,
    /// Sender address, e.g. "whatsapp:+14155238886".
    pub from_number: String,
    /// Fixed destination address, e.g. "whatsapp:+491701234567".
    pub to_number: String,
    /// Path to the Google authorized-user token file.
    pub token_path: PathBuf,
    /// Path to the append-only processed-id log.
    pub processed_log_path: PathBuf,
    /// Time between notification cycles.
    pub poll_interval: Duration,
    /// Maximum unread messages fetched per cycle.
    pub batch_size: usize,
    /// Maximum delivery retries after the first attempt.
    pub max_retries: u32,
}

impl RelayConfig {
    /// Build config from environment variables.
    ///
    /// The Twilio credentials and addresses are required; everything else
    /// falls back to a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let twilio_account_sid = require_env("TWILIO_ACCOUNT_SID")?;
        let twilio_auth_token = SecretString::from(require_env("TWILIO_AUTH_TOKEN")?);
        let from_number = require_env("TWILIO_WHATSAPP_NUMBER")?;
        let to_number = require_env("TO_WHATSAPP_NUMBER")?;

        let token_path = std::env::var("GMAIL_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("token.json"));

        let processed_log_path = std::env::var("PROCESSED_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("processed_ids.txt"));

        let poll_interval = Duration::from_secs(parse_env("POLL_INTERVAL_SECS", 60)?);
        let batch_size = parse_env("BATCH_SIZE", 10)?;
        let max_retries = parse_env("MAX_RETRIES", 3)?;

        Ok(Self {
            twilio_account_sid,
            twilio_auth_token,
            from_number,
            to_number,
            token_path,
            processed_log_path,
            poll_interval,
            batch_size,
            max_retries,
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}
