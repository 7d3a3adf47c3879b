//! Environment-driven configuration.
//!
//! Variables:
//! - `DATABASE_URL` (required unless `STORAGE_BACKEND=memory`)
//! - `APP_HOST` (default: `0.0.0.0`), `APP_PORT` (default: `3000`)
//! - `APP_LOG_LEVEL` (default: `info`; `RUST_LOG` wins when set)
//! - `STORAGE_BACKEND` = `fs` (default) | `s3` | `memory`
//! - `STORAGE_ROOT` (default: `uploads`)
//! - `S3_BUCKET` (required for s3), `S3_REGION` (default: `us-east-1`), `S3_ENDPOINT`
//! - `RUN_MIGRATIONS` (default: `true`)

use std::collections::HashMap;
use std::net::SocketAddr;

use opendal::{Operator, Scheme};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to build storage operator: {0}")]
    Storage(#[from] opendal::Error),
}

/// Where uploaded files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Fs {
        root: String,
    },
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
        root: String,
    },
    Memory,
}

impl StorageConfig {
    pub fn operator(&self) -> Result<Operator, ConfigError> {
        let op = match self {
            StorageConfig::Fs { root } => {
                let mut map = HashMap::new();
                map.insert("root".to_string(), root.clone());
                Operator::via_map(Scheme::Fs, map)?
            }
            StorageConfig::S3 {
                bucket,
                region,
                endpoint,
                root,
            } => {
                let mut map = HashMap::new();
                map.insert("bucket".to_string(), bucket.clone());
                map.insert("region".to_string(), region.clone());
                map.insert("root".to_string(), root.clone());
                if let Some(endpoint) = endpoint {
                    map.insert("endpoint".to_string(), endpoint.clone());
                }
                Operator::via_map(Scheme::S3, map)?
            }
            StorageConfig::Memory => Operator::via_map(Scheme::Memory, HashMap::new())?,
        };
        Ok(op)
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    pub run_migrations: bool,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Read `.env` (if any) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let port = match get("APP_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|err| ConfigError::Invalid {
                var: "APP_PORT",
                value: raw.clone(),
                reason: err.to_string(),
            })?,
            None => 3000,
        };

        let root = get("STORAGE_ROOT").unwrap_or_else(|| "uploads".to_string());
        let backend = get("STORAGE_BACKEND").unwrap_or_else(|| "fs".to_string());
        let kind = backend.trim().to_ascii_lowercase();
        let storage = match kind.as_str() {
            "fs" => StorageConfig::Fs { root },
            "s3" => StorageConfig::S3 {
                bucket: get("S3_BUCKET").ok_or(ConfigError::Missing("S3_BUCKET"))?,
                region: get("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                endpoint: get("S3_ENDPOINT"),
                root,
            },
            "memory" => StorageConfig::Memory,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND",
                    value: backend,
                    reason: "expected fs, s3 or memory".to_string(),
                })
            }
        };

        let database_url = get("DATABASE_URL");
        if database_url.is_none() && storage != StorageConfig::Memory {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let run_migrations = match get("RUN_MIGRATIONS") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "RUN_MIGRATIONS",
                value: raw.clone(),
                reason: "expected true or false".to_string(),
            })?,
            None => true,
        };

        Ok(Self {
            database_url,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            storage,
            run_migrations,
            telemetry: TelemetryConfig {
                log_level: get("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            },
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|err: std::net::AddrParseError| ConfigError::Invalid {
            var: "APP_HOST",
            value: self.host.clone(),
            reason: err.to_string(),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/fleet")]))
            .expect("config loads");
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.storage, StorageConfig::Fs { root: "uploads".to_string() });
        assert!(config.run_migrations);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.bind_addr().expect("addr").port(), 3000);
    }

    #[test]
    fn memory_backend_does_not_need_a_database() {
        let config = AppConfig::from_lookup(lookup(&[("STORAGE_BACKEND", "memory")]))
            .expect("config loads");
        assert_eq!(config.storage, StorageConfig::Memory);
        assert!(config.database_url.is_none());
        assert!(config.storage.operator().is_ok());
    }

    #[test]
    fn invalid_values_fail_with_typed_errors() {
        let bad_port = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/fleet"),
            ("APP_PORT", "eighty"),
        ]));
        assert!(matches!(bad_port, Err(ConfigError::Invalid { var: "APP_PORT", .. })));

        let bad_backend = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/fleet"),
            ("STORAGE_BACKEND", "ftp"),
        ]));
        assert!(matches!(bad_backend, Err(ConfigError::Invalid { var: "STORAGE_BACKEND", .. })));

        let no_bucket = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/fleet"),
            ("STORAGE_BACKEND", "s3"),
        ]));
        assert!(matches!(no_bucket, Err(ConfigError::Missing("S3_BUCKET"))));

        let no_database = AppConfig::from_lookup(lookup(&[]));
        assert!(matches!(no_database, Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn s3_settings_are_collected() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/fleet"),
            ("STORAGE_BACKEND", "S3"),
            ("S3_BUCKET", "fleet-docs"),
            ("S3_ENDPOINT", "http://minio:9000"),
            ("RUN_MIGRATIONS", "false"),
        ]))
        .expect("config loads");
        assert_eq!(
            config.storage,
            StorageConfig::S3 {
                bucket: "fleet-docs".to_string(),
                region: "us-east-1".to_string(),
                endpoint: Some("http://minio:9000".to_string()),
                root: "uploads".to_string(),
            }
        );
        assert!(!config.run_migrations);
    }
}
