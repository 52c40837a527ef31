//! Process configuration, read once from the environment at startup.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use secrecy::SecretString;

use crate::app::WorkerConfig;
use crate::domain::{ConfigError, NetworkBinding, NetworkBindings};

/// Network names as they appear in the record source
pub const SKALE_NETWORK: &str = "SKALE";
pub const MYRIA_NETWORK: &str = "Myria";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Application configuration
pub struct Config {
    /// Record source URL; may embed an API key
    pub database_url: SecretString,
    /// Role-removal webhook
    pub bot_url: String,
    pub bindings: NetworkBindings,
    pub worker: WorkerConfig,
    pub http_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bot_url", &self.bot_url)
            .field("bindings", &self.bindings)
            .field("worker", &self.worker)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        let database_url = SecretString::from(require("DATABASE_URL")?);
        let bot_url = require("BOT_URL")?;

        let bindings = NetworkBindings::new()
            .with(
                SKALE_NETWORK,
                NetworkBinding {
                    rpc_url: require("SKALE_RPC")?,
                    contract_address: parse_address(
                        "SKALE_CONTRACT_ADDRESS",
                        &require("SKALE_CONTRACT_ADDRESS")?,
                    )?,
                },
            )
            .with(
                MYRIA_NETWORK,
                NetworkBinding {
                    rpc_url: require("MYRIA_RPC")?,
                    contract_address: parse_address(
                        "MYRIA_CONTRACT_ADDRESS",
                        &require("MYRIA_CONTRACT_ADDRESS")?,
                    )?,
                },
            );

        let interval = match lookup("RECONCILE_INTERVAL_SECS") {
            Some(v) => Duration::from_secs(parse_secs("RECONCILE_INTERVAL_SECS", &v)?),
            None => WorkerConfig::default().interval,
        };

        let http_timeout = Duration::from_secs(match lookup("HTTP_TIMEOUT_SECS") {
            Some(v) => parse_secs("HTTP_TIMEOUT_SECS", &v)?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        });

        Ok(Self {
            database_url,
            bot_url,
            bindings,
            worker: WorkerConfig { interval },
            http_timeout,
        })
    }
}

fn parse_address(key: &str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim()).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        }),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("DATABASE_URL", "https://db.example.com/holders".to_string()),
            ("BOT_URL", "https://bot.example.com/removeRole".to_string()),
            ("SKALE_RPC", "https://skale.example.com".to_string()),
            (
                "SKALE_CONTRACT_ADDRESS",
                "0x1111111111111111111111111111111111111111".to_string(),
            ),
            ("MYRIA_RPC", "https://myria.example.com".to_string()),
            (
                "MYRIA_CONTRACT_ADDRESS",
                "0x2222222222222222222222222222222222222222".to_string(),
            ),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(
            config.database_url.expose_secret(),
            "https://db.example.com/holders"
        );
        assert_eq!(config.worker.interval, Duration::from_secs(6 * 60 * 60));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.bindings.len(), 2);

        let skale = config.bindings.resolve("SKALE").unwrap();
        assert_eq!(skale.rpc_url, "https://skale.example.com");
        assert_eq!(skale.contract_address, Address::repeat_byte(0x11));
        assert!(config.bindings.resolve("Myria").is_some());
    }

    #[test]
    fn test_config_missing_required() {
        let mut env = base_env();
        env.remove("BOT_URL");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref k) if k == "BOT_URL"));
    }

    #[test]
    fn test_config_empty_value_is_missing() {
        let mut env = base_env();
        env.insert("MYRIA_RPC", String::new());
        assert!(matches!(
            load(&env).unwrap_err(),
            ConfigError::MissingVar(_)
        ));
    }

    #[test]
    fn test_config_invalid_contract_address() {
        let mut env = base_env();
        env.insert("SKALE_CONTRACT_ADDRESS", "not-an-address".to_string());
        let err = load(&env).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "SKALE_CONTRACT_ADDRESS")
        );
    }

    #[test]
    fn test_config_custom_interval() {
        let mut env = base_env();
        env.insert("RECONCILE_INTERVAL_SECS", "60".to_string());
        env.insert("HTTP_TIMEOUT_SECS", "5".to_string());
        let config = load(&env).unwrap();
        assert_eq!(config.worker.interval, Duration::from_secs(60));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_zero_interval_rejected() {
        let mut env = base_env();
        env.insert("RECONCILE_INTERVAL_SECS", "0".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_config_debug_redacts_database_url() {
        let config = load(&base_env()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("db.example.com"));
        assert!(debug.contains("[REDACTED]"));
    }
}
