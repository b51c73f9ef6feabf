use std::io;

use thiserror::Error;

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("path resolution error: {0}")]
    PathResolution(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("obfuscation error: {0}")]
    Obfuscation(String),
}
