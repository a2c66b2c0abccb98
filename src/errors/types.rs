use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZeronError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Scan cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for ZeronError {
    fn from(e: rusqlite::Error) -> Self {
        ZeronError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for ZeronError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ZeronError::Timeout(e.to_string())
        } else {
            ZeronError::Network(e.to_string())
        }
    }
}
