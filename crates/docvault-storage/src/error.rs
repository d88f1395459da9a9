use docvault_crypto::CryptoError;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(#[from] opendal::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("invalid stored record {path}: {reason}")]
    InvalidRecord { path: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl StorageError {
    /// Text safe to show an end user. Crypto details never leave the process.
    pub fn user_message(&self) -> String {
        match self {
            StorageError::NotFound(_) => "document not found".to_string(),
            StorageError::InvalidRequest(reason) => reason.clone(),
            StorageError::Crypto(e) => e.user_message().to_string(),
            StorageError::Backend(_) | StorageError::InvalidRecord { .. } => {
                docvault_crypto::error::USER_FACING_MESSAGE.to_string()
            }
        }
    }

    pub(crate) fn from_read(path: &str, err: opendal::Error) -> Self {
        if err.kind() == opendal::ErrorKind::NotFound {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::Backend(err)
        }
    }
}
