use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage medium failed to read, write or delete.
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Another writer kept changing the key between our read and write.
    #[error("write conflict on {key} after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
