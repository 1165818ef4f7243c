use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

use crate::infrastructure::{messaging::webhook::WebhookConfig, repositories::redis::RedisConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env param {0}")]
    Missing(&'static str),
    #[error("invalid value '{value}' for env param {name}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub batch_size: u32,
    pub interval: Duration,
    pub resume_on_boot: bool,
}

pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    pub log: LogConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub webhook: WebhookConfig,
    pub dispatch: DispatchConfig,
}

impl Config {
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|name| var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let env = Env { lookup };

        Ok(Config {
            port: env.parsed("PORT", 8080)?,
            scheme: env.string("SCHEME", "http"),
            host: env.string("HOST", "localhost"),
            log: LogConfig {
                level: env.string("LOG_LEVEL", "info"),
                format: match env.string("LOG_FORMAT", "json").to_ascii_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" | "text" => LogFormat::Pretty,
                    other => {
                        return Err(ConfigError::Invalid {
                            name: "LOG_FORMAT",
                            value: other.to_string(),
                        });
                    }
                },
            },
            database: DatabaseConfig {
                url: env.required("DATABASE_URL")?,
                max_connections: env.positive("DATABASE_MAX_CONNECTIONS", 5)?,
            },
            redis: RedisConfig {
                url: env.string("REDIS_URL", "redis://127.0.0.1:6379"),
                status_key: env.string("REDIS_STATUS_KEY", "dispatcher:status"),
                sent_prefix: env.string("REDIS_SENT_PREFIX", "dispatcher:sent:"),
                cache_ttl: Duration::from_secs(env.positive("REDIS_CACHE_TTL_SECS", 86_400)?),
            },
            webhook: WebhookConfig {
                url: env.required("WEBHOOK_URL")?,
                timeout: Duration::from_millis(env.positive("WEBHOOK_TIMEOUT_MS", 10_000)?),
            },
            dispatch: DispatchConfig {
                batch_size: env.positive("DISPATCH_BATCH_SIZE", 2)?,
                interval: Duration::from_secs(env.positive("DISPATCH_INTERVAL_SECS", 120)?),
                resume_on_boot: env.parsed("DISPATCH_RESUME_ON_BOOT", true)?,
            },
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.raw(name).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.raw(name).ok_or(ConfigError::Missing(name))
    }

    fn parsed<T: std::str::FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.raw(name) {
            None => Ok(default),
            Some(value) => value
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { name, value }),
        }
    }

    fn positive<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr + PartialOrd + Default + ToString,
    {
        let value = self.parsed(name, default)?;
        if value <= T::default() {
            return Err(ConfigError::Invalid {
                name,
                value: value.to_string(),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/messages"),
        ("WEBHOOK_URL", "http://localhost:9000/hook"),
    ];

    #[test]
    fn defaults_apply_when_only_required_params_are_set() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.dispatch.batch_size, 2);
        assert_eq!(config.dispatch.interval, Duration::from_secs(120));
        assert!(config.dispatch.resume_on_boot);
        assert_eq!(config.webhook.timeout, Duration::from_secs(10));
        assert_eq!(config.redis.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.redis.sent_prefix, "dispatcher:sent:");
    }

    #[test]
    fn missing_webhook_url_is_reported_by_name() {
        let err = Config::from_lookup(lookup(&[REQUIRED[0]]))
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::Missing("WEBHOOK_URL"));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DISPATCH_BATCH_SIZE", "0"));
        let err = Config::from_lookup(lookup(&pairs)).err().unwrap();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "DISPATCH_BATCH_SIZE",
                value: "0".to_string()
            }
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "9090"),
            ("LOG_FORMAT", "pretty"),
            ("DISPATCH_INTERVAL_SECS", "5"),
            ("WEBHOOK_TIMEOUT_MS", "250"),
            ("DISPATCH_RESUME_ON_BOOT", "false"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.dispatch.interval, Duration::from_secs(5));
        assert_eq!(config.webhook.timeout, Duration::from_millis(250));
        assert!(!config.dispatch.resume_on_boot);
    }

    #[test]
    fn unparsable_port_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
    }
}
