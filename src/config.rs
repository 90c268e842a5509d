//! Konfigurace z prostředí (`.env` se načítá v main přes dotenv).
//!
//! Chybějící proměnná = default, nečitelná hodnota = default + warn.

use odds_feed::FetcherConfig;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::state::UpdateMode;
use crate::store::{DataSource, StoreConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub fetcher: FetcherConfig,
    pub store: StoreConfig,
    pub data_source: DataSource,
    /// HTTP state endpoint; bez proměnné se nespouští.
    pub bind: Option<SocketAddr>,
    /// JSONL audit log; bez proměnné se nepíše.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Stejné jako `from_env`, jen s vlastním zdrojem hodnot (testy).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut fetcher = FetcherConfig::default();
        if let Some(url) = lookup("ODDSBOARD_EVENTS_URL").filter(|u| !u.trim().is_empty()) {
            fetcher.url = url.trim().to_string();
        }
        if let Some(ms) = parsed::<u64>(&lookup, "ODDSBOARD_TIMEOUT_MS") {
            fetcher.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parsed::<u32>(&lookup, "ODDSBOARD_RETRY_ATTEMPTS") {
            fetcher.max_attempts = n.max(1);
        }
        if let Some(ms) = parsed::<u64>(&lookup, "ODDSBOARD_RETRY_DELAY_MS") {
            fetcher.retry_base_delay = Duration::from_millis(ms);
        }

        let mut store = StoreConfig::default();
        if let Some(ms) = parsed::<u64>(&lookup, "ODDSBOARD_POLL_INTERVAL_MS") {
            store.polling_interval_ms = ms;
        }
        if let Some(mode) = parsed::<UpdateMode>(&lookup, "ODDSBOARD_UPDATE_MODE") {
            store.update_mode = mode;
        }
        if let Some(fallback) = lookup("ODDSBOARD_FALLBACK_TO_MOCK") {
            match parse_flag(&fallback) {
                Some(v) => store.fallback_to_mock = v,
                None => warn!("ODDSBOARD_FALLBACK_TO_MOCK={:?} is not a boolean, using default", fallback),
            }
        }
        store.snapshot_path = lookup("ODDSBOARD_SNAPSHOT_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            fetcher,
            store,
            data_source: parsed::<DataSource>(&lookup, "ODDSBOARD_DATA_SOURCE").unwrap_or_default(),
            bind: parsed::<SocketAddr>(&lookup, "ODDSBOARD_BIND"),
            log_dir: lookup("ODDSBOARD_LOG_DIR")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("{}={:?} ignored: {}", key, raw, e);
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let c = config(&[]);
        assert_eq!(c.fetcher.timeout, Duration::from_secs(10));
        assert_eq!(c.fetcher.max_attempts, 3);
        assert_eq!(c.fetcher.retry_base_delay, Duration::from_millis(1000));
        assert_eq!(c.store.polling_interval_ms, 5000);
        assert_eq!(c.store.update_mode, UpdateMode::Api);
        assert!(c.store.fallback_to_mock);
        assert_eq!(c.data_source, DataSource::Remote);
        assert!(c.bind.is_none());
        assert!(c.log_dir.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let c = config(&[
            ("ODDSBOARD_EVENTS_URL", "http://127.0.0.1:9000/events"),
            ("ODDSBOARD_TIMEOUT_MS", "2500"),
            ("ODDSBOARD_RETRY_ATTEMPTS", "5"),
            ("ODDSBOARD_POLL_INTERVAL_MS", "1500"),
            ("ODDSBOARD_UPDATE_MODE", "Mock"),
            ("ODDSBOARD_DATA_SOURCE", "json"),
            ("ODDSBOARD_FALLBACK_TO_MOCK", "off"),
            ("ODDSBOARD_BIND", "127.0.0.1:8090"),
            ("ODDSBOARD_LOG_DIR", "logs"),
        ]);
        assert_eq!(c.fetcher.url, "http://127.0.0.1:9000/events");
        assert_eq!(c.fetcher.timeout, Duration::from_millis(2500));
        assert_eq!(c.fetcher.max_attempts, 5);
        assert_eq!(c.store.polling_interval_ms, 1500);
        assert_eq!(c.store.update_mode, UpdateMode::Mock);
        assert_eq!(c.data_source, DataSource::Bundled);
        assert!(!c.store.fallback_to_mock);
        assert_eq!(c.bind, Some("127.0.0.1:8090".parse().unwrap()));
        assert_eq!(c.log_dir, Some(PathBuf::from("logs")));
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let c = config(&[
            ("ODDSBOARD_TIMEOUT_MS", "soon"),
            ("ODDSBOARD_UPDATE_MODE", "websocket"),
            ("ODDSBOARD_FALLBACK_TO_MOCK", "maybe"),
            ("ODDSBOARD_BIND", "localhost"),
            ("ODDSBOARD_RETRY_ATTEMPTS", "0"),
        ]);
        assert_eq!(c.fetcher.timeout, Duration::from_secs(10));
        assert_eq!(c.store.update_mode, UpdateMode::Api);
        assert!(c.store.fallback_to_mock);
        assert!(c.bind.is_none());
        assert_eq!(c.fetcher.max_attempts, 1);
    }
}
