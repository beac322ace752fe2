use chirpy_crypto::password::PasswordError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("database document could not be encoded or decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("database lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Hash(#[from] PasswordError),
    #[error("not found")]
    NotFound,
    #[error("a user with that email already exists")]
    EmailTaken,
    #[error("refresh token expired")]
    Expired,
    #[error("requester is not the author")]
    Forbidden,
}
