use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    JSON(#[from] serde_json::Error),
    #[error(transparent)]
    YAML(#[from] serde_yaml::Error),
    #[error(transparent)]
    Regex(#[from] fancy_regex::Error),
    #[error("unknown mapping table: {0}")]
    UnknownMapping(String),
    #[error("unknown property: {0}")]
    UnknownProperty(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("malformed snapshot {path}: {message}")]
    Snapshot { path: PathBuf, message: String },
    #[error("adapter {engine} failed: {message}")]
    Adapter { engine: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
