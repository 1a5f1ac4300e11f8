use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::infrastructure::{AfricasTalkingSettings, DarajaSettings};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MPESA_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
const DEFAULT_AT_BASE_URL: &str = "https://api.sandbox.africastalking.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Upper bound on every call to Daraja, the SMS gateway and the live hub.
    pub outbound_timeout: Duration,
    pub mpesa: DarajaSettings,
    /// Public base URL Daraja calls back on.
    pub callback_base_url: String,
    pub callback_token: Option<String>,
    pub sms: AfricasTalkingSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));
        let or_default =
            |name: &'static str, default: &str| optional(name).unwrap_or_else(|| default.to_string());

        let port = match optional("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };
        let timeout_secs: u64 = match optional("OUTBOUND_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: "OUTBOUND_TIMEOUT_SECS",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "OUTBOUND_TIMEOUT_SECS",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            host: or_default("HOST", DEFAULT_HOST),
            port,
            outbound_timeout: Duration::from_secs(timeout_secs),
            mpesa: DarajaSettings {
                base_url: or_default("MPESA_BASE_URL", DEFAULT_MPESA_BASE_URL),
                consumer_key: required("MPESA_CONSUMER_KEY")?,
                consumer_secret: required("MPESA_CONSUMER_SECRET")?,
                short_code: required("MPESA_SHORT_CODE")?,
                passkey: required("MPESA_PASSKEY")?,
            },
            callback_base_url: required("MPESA_CALLBACK_URL")?,
            callback_token: optional("MPESA_CALLBACK_TOKEN"),
            sms: AfricasTalkingSettings {
                base_url: or_default("AT_BASE_URL", DEFAULT_AT_BASE_URL),
                username: required("AT_USERNAME")?,
                api_key: required("AT_API_KEY")?,
                sender_id: optional("AT_SENDER_ID"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn minimal() -> HashMap<&'static str, String> {
        [
            ("DATABASE_URL", "postgres://localhost/market"),
            ("MPESA_CONSUMER_KEY", "key"),
            ("MPESA_CONSUMER_SECRET", "secret"),
            ("MPESA_SHORT_CODE", "174379"),
            ("MPESA_PASSKEY", "passkey"),
            ("MPESA_CALLBACK_URL", "https://market.example"),
            ("AT_USERNAME", "sandbox"),
            ("AT_API_KEY", "at-key"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config = load(&minimal()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.outbound_timeout, Duration::from_secs(10));
        assert_eq!(config.mpesa.base_url, DEFAULT_MPESA_BASE_URL);
        assert_eq!(config.sms.base_url, DEFAULT_AT_BASE_URL);
        assert_eq!(config.callback_token, None);
        assert_eq!(config.sms.sender_id, None);
    }

    #[test]
    fn missing_required_variable_is_named() {
        let mut vars = minimal();
        vars.remove("MPESA_PASSKEY");
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Missing("MPESA_PASSKEY")
        );
    }

    #[test]
    fn blank_values_count_as_unset() {
        let mut vars = minimal();
        vars.insert("MPESA_CALLBACK_TOKEN", "  ".to_string());
        assert_eq!(load(&vars).unwrap().callback_token, None);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut vars = minimal();
        vars.insert("PORT", "eighty".to_string());
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));

        let mut vars = minimal();
        vars.insert("OUTBOUND_TIMEOUT_SECS", "0".to_string());
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid {
                name: "OUTBOUND_TIMEOUT_SECS",
                ..
            })
        ));
    }
}
