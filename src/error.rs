use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgrometError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("No supported fields requested: {0}")]
    UnsupportedField(String),

    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, AgrometError>;
