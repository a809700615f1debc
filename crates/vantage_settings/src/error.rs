use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to create storage directory {path}: {source}")]
    CreateDirectoryError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
