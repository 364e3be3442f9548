//! Process configuration read from the environment (and `.env`, if present).

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use costbook_observability::{LogFormat, LogSettings};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Postgres catalog connection string; the seeded in-memory catalog is
    /// used when absent.
    pub database_url: Option<String>,
    pub log: LogSettings,
}

impl ApiConfig {
    /// Loads `.env` (a missing file is fine), then reads:
    ///
    /// - `COSTBOOK_BIND_ADDR` (default `0.0.0.0:8080`)
    /// - `DATABASE_URL`
    /// - `COSTBOOK_LOG_FORMAT` (`json` or `pretty`)
    /// - `COSTBOOK_LOG_FILTER` (used when `RUST_LOG` is unset)
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("COSTBOOK_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "COSTBOOK_BIND_ADDR",
                message: e.to_string(),
            })?;

        let format = match get("COSTBOOK_LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(|message| ConfigError::Invalid {
                key: "COSTBOOK_LOG_FORMAT",
                message,
            })?,
            None => LogFormat::default(),
        };
        let mut log = LogSettings {
            format,
            ..LogSettings::default()
        };
        if let Some(filter) = get("COSTBOOK_LOG_FILTER") {
            log.default_filter = filter;
        }

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.log, LogSettings::default());
    }

    #[test]
    fn reads_every_variable() {
        let cfg = config(&[
            ("COSTBOOK_BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/costbook"),
            ("COSTBOOK_LOG_FORMAT", "pretty"),
            ("COSTBOOK_LOG_FILTER", "debug"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/costbook"));
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        assert_eq!(cfg.log.default_filter, "debug");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("DATABASE_URL", "  "), ("COSTBOOK_BIND_ADDR", "")]).unwrap();
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = config(&[("COSTBOOK_BIND_ADDR", "not-an-addr")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "COSTBOOK_BIND_ADDR", .. }));

        let err = config(&[("COSTBOOK_LOG_FORMAT", "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "COSTBOOK_LOG_FORMAT", .. }));
    }
}
