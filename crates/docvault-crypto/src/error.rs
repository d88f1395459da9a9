use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Message shown to end users for any cryptographic failure.
///
/// Deliberately identical for every variant so a caller probing uploads or
/// previews cannot tell a bad key from a corrupt envelope.
pub const USER_FACING_MESSAGE: &str = "cannot process document";

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("secure random source unavailable: {0}")]
    RandomSourceUnavailable(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("authentication failed: wrong key or tampered envelope")]
    Authentication,

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("encryption failed: {0}")]
    Encryption(String),
}

impl CryptoError {
    /// Generic text for user-visible surfaces. Details belong in logs only.
    pub fn user_message(&self) -> &'static str {
        USER_FACING_MESSAGE
    }

    /// True when the data itself failed verification, as opposed to being unparseable.
    pub fn is_authentication(&self) -> bool {
        matches!(self, CryptoError::Authentication)
    }
}
