use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Fetch for {reference} did not resolve within {after:?}")]
    FetchTimedOut { reference: String, after: Duration },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Stage worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
