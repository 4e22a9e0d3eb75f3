//! Startup configuration read from `MEDTRACK_*` environment variables.

use med_engine::{EngineConfig, DEFAULT_LOW_STOCK_THRESHOLD};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8002";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MEDTRACK_LISTEN is not a socket address: {0}")]
    Listen(String),
    #[error("MEDTRACK_LOW_STOCK_THRESHOLD must be a non-negative integer or \"off\": {0}")]
    Threshold(String),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen: SocketAddr,
    pub engine: EngineConfig,
    /// Append events to this JSONL file instead of logging them.
    pub event_log: Option<PathBuf>,
    /// SQLite database file; only honoured when built with the `sqlite` feature.
    pub sqlite_path: Option<PathBuf>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_raw = get("MEDTRACK_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen_raw
            .parse()
            .map_err(|_| ConfigError::Listen(listen_raw.clone()))?;
        let low_stock_threshold = match get("MEDTRACK_LOW_STOCK_THRESHOLD") {
            None => Some(DEFAULT_LOW_STOCK_THRESHOLD),
            Some(v) => parse_threshold(&v)?,
        };
        let path = |key: &str| get(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        Ok(Self {
            listen,
            engine: EngineConfig {
                low_stock_threshold,
            },
            event_log: path("MEDTRACK_EVENT_LOG"),
            sqlite_path: path("MEDTRACK_SQLITE_PATH"),
        })
    }
}

fn parse_threshold(raw: &str) -> Result<Option<i64>, ConfigError> {
    let v = raw.trim();
    if v.eq_ignore_ascii_case("off") {
        return Ok(None);
    }
    match v.parse::<i64>() {
        Ok(n) if n >= 0 => Ok(Some(n)),
        _ => Err(ConfigError::Threshold(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.listen.port(), 8002);
        assert_eq!(cfg.engine.low_stock_threshold, Some(5));
        assert!(cfg.event_log.is_none());
        assert!(cfg.sqlite_path.is_none());
    }

    #[test]
    fn threshold_can_be_set_or_disabled() {
        let cfg = config(&[("MEDTRACK_LOW_STOCK_THRESHOLD", "12")]).unwrap();
        assert_eq!(cfg.engine.low_stock_threshold, Some(12));
        let cfg = config(&[("MEDTRACK_LOW_STOCK_THRESHOLD", "OFF")]).unwrap();
        assert_eq!(cfg.engine.low_stock_threshold, None);
        for bad in ["-1", "lots"] {
            let err = config(&[("MEDTRACK_LOW_STOCK_THRESHOLD", bad)]).unwrap_err();
            assert!(matches!(err, ConfigError::Threshold(_)));
        }
    }

    #[test]
    fn bad_listen_address_fails() {
        let err = config(&[("MEDTRACK_LISTEN", "localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::Listen(_)));
        let cfg = config(&[
            ("MEDTRACK_LISTEN", "127.0.0.1:9000"),
            ("MEDTRACK_EVENT_LOG", "/tmp/events.jsonl"),
        ])
        .unwrap();
        assert_eq!(cfg.listen.port(), 9000);
        assert_eq!(cfg.event_log, Some(PathBuf::from("/tmp/events.jsonl")));
    }
}
