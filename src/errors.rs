use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("STORE_CORRUPT: {0}")]
    StoreCorrupt(String),
    #[error("HISTORY_INVARIANT: {0}")]
    History(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
