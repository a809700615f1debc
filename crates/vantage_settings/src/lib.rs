use std::path::PathBuf;
use std::str::FromStr;

pub mod error;
pub mod store;

pub use error::SettingsError;
pub use store::StoreSettings;

/// Reads `key` from the environment and parses it, falling back to `default`
/// when unset.
pub(crate) fn env_or<T>(key: &str, default: T) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| SettingsError::InvalidValue {
                key: key.to_string(),
                value,
                reason: e.to_string(),
            }),
        Err(_) => Ok(default),
    }
}

/// Like `env_or` with no default: unset maps to `None`.
pub(crate) fn env_opt<T>(key: &str) -> Result<Option<T>, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SettingsError::InvalidValue {
                key: key.to_string(),
                value,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// Top-level process settings.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct VantageConfig {
    pub store_settings: StoreSettings,
}

impl VantageConfig {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            store_settings: StoreSettings::from_env()?,
        })
    }

    /// Local SQLite paths get their parent directory created; other URIs are
    /// returned untouched.
    pub fn prepare_storage(&self) -> Result<(), SettingsError> {
        if let Some(path) = self.store_settings.sqlite_path() {
            let parent = PathBuf::from(&path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("./"));

            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(&parent).map_err(|source| {
                    SettingsError::CreateDirectoryError {
                        path: parent.display().to_string(),
                        source,
                    }
                })?;
            }
        }
        Ok(())
    }
}
