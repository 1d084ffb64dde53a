use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpamError {
    #[error("format error: {0}")]
    Format(String),

    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type IpamResult<T> = Result<T, IpamError>;
