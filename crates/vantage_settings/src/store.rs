use crate::{env_opt, env_or, SettingsError};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_DATABASE_URI: &str = "sqlite://./vantage_store/metrics.db";
const SQLITE_PREFIX: &str = "sqlite://";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoreSettings {
    pub database_uri: String,
    pub max_connections: u32,

    /// Entries older than this are treated as misses and dropped. `None` keeps
    /// entries until they are invalidated explicitly.
    pub ttl_seconds: Option<u64>,

    /// Number of deserialized records kept in memory in front of the database.
    pub hot_cache_capacity: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_uri: DEFAULT_DATABASE_URI.to_string(),
            max_connections: 4,
            ttl_seconds: None,
            hot_cache_capacity: 1000,
        }
    }
}

impl StoreSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let defaults = Self::default();

        let database_uri = env_or("VANTAGE_DATABASE_URI", defaults.database_uri)?;
        let max_connections = env_or("VANTAGE_MAX_CONNECTIONS", defaults.max_connections)?;
        let ttl_seconds = env_opt::<u64>("VANTAGE_CACHE_TTL_SECS")?;
        let hot_cache_capacity =
            env_or("VANTAGE_HOT_CACHE_CAPACITY", defaults.hot_cache_capacity)?;

        if max_connections == 0 {
            return Err(SettingsError::InvalidValue {
                key: "VANTAGE_MAX_CONNECTIONS".to_string(),
                value: "0".to_string(),
                reason: "at least one connection is required".to_string(),
            });
        }

        if ttl_seconds == Some(0) {
            warn!("VANTAGE_CACHE_TTL_SECS is 0, every cached metric will be recomputed");
        }

        Ok(Self {
            database_uri,
            max_connections,
            ttl_seconds,
            hot_cache_capacity,
        })
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }

    /// Filesystem path for `sqlite://` URIs, `None` for in-memory databases.
    pub fn sqlite_path(&self) -> Option<String> {
        let path = self.database_uri.strip_prefix(SQLITE_PREFIX)?;
        let path = path.split('?').next().unwrap_or(path);

        if path.is_empty() || path == ":memory:" {
            None
        } else {
            Some(path.to_string())
        }
    }

    pub fn with_database_uri(mut self, uri: impl Into<String>) -> Self {
        self.database_uri = uri.into();
        self
    }

    pub fn with_ttl_seconds(mut self, ttl: Option<u64>) -> Self {
        self.ttl_seconds = ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_path() {
        let settings = StoreSettings::default();
        assert_eq!(
            settings.sqlite_path().as_deref(),
            Some("./vantage_store/metrics.db")
        );

        let memory = StoreSettings::default().with_database_uri("sqlite://:memory:");
        assert_eq!(memory.sqlite_path(), None);

        let with_params = StoreSettings::default().with_database_uri("sqlite:///tmp/m.db?mode=rwc");
        assert_eq!(with_params.sqlite_path().as_deref(), Some("/tmp/m.db"));
    }

    #[test]
    fn test_ttl_conversion() {
        let settings = StoreSettings::default().with_ttl_seconds(Some(90));
        assert_eq!(settings.ttl(), Some(Duration::from_secs(90)));
        assert_eq!(StoreSettings::default().ttl(), None);
    }
}
