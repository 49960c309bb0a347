//! Custody error types.

use sealkeep_crypto::CryptoError;
use thiserror::Error;

/// Result type for custody operations.
pub type CustodyResult<T> = Result<T, CustodyError>;

/// Errors that can occur while loading, creating or using the owner's keys.
#[derive(Debug, Error)]
pub enum CustodyError {
    #[error("key file store error: {0}")]
    Store(String),

    #[error("passphrase provider failed: {0}")]
    PassphraseProvider(String),

    #[error("key custodian not initialized")]
    NotInitialized,

    #[error("background task failed: {0}")]
    Task(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Coarse classification of a [`CustodyError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Key pair creation failed.
    Generation,
    /// Reading or writing the key file failed.
    Store,
    /// Malformed key file, hex or JSON.
    Format,
    /// Symmetric decryption or RSA wrap/unwrap failed.
    Crypto,
    /// A passphrase could not be obtained.
    PassphraseProvider,
    /// An operation was called in the wrong custodian state.
    Precondition,
    /// Runtime failure unrelated to the inputs.
    Internal,
}

impl CustodyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(_) => ErrorKind::Store,
            Self::PassphraseProvider(_) => ErrorKind::PassphraseProvider,
            Self::NotInitialized => ErrorKind::Precondition,
            Self::Task(_) => ErrorKind::Internal,
            Self::Crypto(e) => match e {
                CryptoError::Generation(_) => ErrorKind::Generation,
                CryptoError::Format(_) => ErrorKind::Format,
                CryptoError::PassphraseRequired => ErrorKind::PassphraseProvider,
                CryptoError::Encryption(_)
                | CryptoError::Decryption(_)
                | CryptoError::KeyWrap(_)
                | CryptoError::KeyUnwrap(_)
                | CryptoError::InvalidKeyLength { .. } => ErrorKind::Crypto,
            },
        }
    }
}

impl From<tokio::task::JoinError> for CustodyError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_errors_are_classified() {
        let e = CustodyError::from(CryptoError::KeyUnwrap("bad".into()));
        assert_eq!(e.kind(), ErrorKind::Crypto);
        let e = CustodyError::from(CryptoError::Format("short".into()));
        assert_eq!(e.kind(), ErrorKind::Format);
        let e = CustodyError::from(CryptoError::Generation("entropy".into()));
        assert_eq!(e.kind(), ErrorKind::Generation);
        let e = CustodyError::from(CryptoError::PassphraseRequired);
        assert_eq!(e.kind(), ErrorKind::PassphraseProvider);
    }

    #[test]
    fn display_includes_source_message() {
        let e = CustodyError::from(CryptoError::Decryption("bad padding".into()));
        assert_eq!(e.to_string(), "crypto error: decryption failed: bad padding");
        assert_eq!(CustodyError::NotInitialized.kind(), ErrorKind::Precondition);
    }
}
