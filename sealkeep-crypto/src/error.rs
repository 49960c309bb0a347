//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in key generation, key-file handling and envelope
/// encryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key pair generation failed: {0}")]
    Generation(String),

    #[error("malformed data: {0}")]
    Format(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("key wrap failed: {0}")]
    KeyWrap(String),

    #[error("key unwrap failed: {0}")]
    KeyUnwrap(String),

    #[error("private key passphrase required but none was supplied")]
    PassphraseRequired,

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

impl CryptoError {
    /// True for failures caused by malformed input rather than by a wrong key.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

impl From<serde_json::Error> for CryptoError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(format!("key pair JSON: {e}"))
    }
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        Self::Format(format!("invalid hex: {e}"))
    }
}
