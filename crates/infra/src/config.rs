//! Process configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use accountgate_auth::AuthressConfig;
use accountgate_auth::client::{DEFAULT_AUTHRESS_API_URL, DEFAULT_SERVICE_CLIENT_ACCESS_KEY};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_MAX_ACCOUNTS_PER_USER: usize = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Base url used in links returned to clients.
    pub public_base_url: String,
    pub authress: AuthressConfig,
    pub max_accounts_per_user: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            authress: AuthressConfig::default(),
            max_accounts_per_user: DEFAULT_MAX_ACCOUNTS_PER_USER,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    /// Unset or blank variables take their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", &bind_raw, e))?;

        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let api_url = get("AUTHRESS_API_URL")
            .unwrap_or_else(|| DEFAULT_AUTHRESS_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(api_url.starts_with("https://") || api_url.starts_with("http://")) {
            return Err(ConfigError::invalid(
                "AUTHRESS_API_URL",
                &api_url,
                "expected an http(s) url",
            ));
        }

        let service_client_access_key = get("AUTHRESS_SERVICE_CLIENT_ACCESS_KEY")
            .unwrap_or_else(|| DEFAULT_SERVICE_CLIENT_ACCESS_KEY.to_string());

        let max_accounts_per_user = match get("MAX_ACCOUNTS_PER_USER") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::invalid("MAX_ACCOUNTS_PER_USER", &raw, e))?,
            None => DEFAULT_MAX_ACCOUNTS_PER_USER,
        };

        let timeout_secs = match get("AUTHRESS_REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(
                        "AUTHRESS_REQUEST_TIMEOUT_SECS",
                        &raw,
                        "must be greater than zero",
                    ));
                }
                Ok(secs) => secs,
                Err(e) => {
                    return Err(ConfigError::invalid("AUTHRESS_REQUEST_TIMEOUT_SECS", &raw, e));
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let config = Self {
            bind_addr,
            public_base_url,
            authress: AuthressConfig {
                api_url,
                service_client_access_key,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            max_accounts_per_user,
        };

        if config.authress.api_url == DEFAULT_AUTHRESS_API_URL {
            tracing::warn!("AUTHRESS_API_URL is not set; using the placeholder domain");
        }
        if config.authress.service_client_access_key == DEFAULT_SERVICE_CLIENT_ACCESS_KEY {
            tracing::warn!("AUTHRESS_SERVICE_CLIENT_ACCESS_KEY is not set; calls to Authress will be rejected");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn values_are_read_and_normalized() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("PUBLIC_BASE_URL", "https://api.example.com/"),
            ("AUTHRESS_API_URL", "https://auth.example.com/"),
            ("AUTHRESS_SERVICE_CLIENT_ACCESS_KEY", "sc_1.kid.acc_1.key"),
            ("MAX_ACCOUNTS_PER_USER", "5"),
            ("AUTHRESS_REQUEST_TIMEOUT_SECS", "3"),
            ("BLANK", "  "),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.public_base_url, "https://api.example.com");
        assert_eq!(config.authress.api_url, "https://auth.example.com");
        assert_eq!(config.authress.service_client_access_key, "sc_1.kid.acc_1.key");
        assert_eq!(config.max_accounts_per_user, 5);
        assert_eq!(config.authress.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("MAX_ACCOUNTS_PER_USER", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MAX_ACCOUNTS_PER_USER", .. }));

        assert!(AppConfig::from_lookup(lookup_from(&[("BIND_ADDR", "nowhere")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("AUTHRESS_API_URL", "auth.example.com")])).is_err());
        assert!(
            AppConfig::from_lookup(lookup_from(&[("AUTHRESS_REQUEST_TIMEOUT_SECS", "0")])).is_err()
        );
    }
}
