//! Passphrase sources.
//!
//! A passphrase argument is either absent, a literal value, or a deferred
//! provider (for example an interactive prompt) that is awaited only when the
//! passphrase is actually needed. A deferred provider runs at most once.

use crate::error::{CustodyError, CustodyResult};
use futures::future::BoxFuture;
use sealkeep_crypto::Passphrase;
use std::fmt;
use std::future::Future;

/// Future returned by a deferred passphrase provider.
pub type PassphraseFuture = BoxFuture<'static, anyhow::Result<Passphrase>>;

/// Where a passphrase comes from.
#[derive(Default)]
pub enum PassphraseSource {
    /// No passphrase supplied.
    #[default]
    Absent,
    /// A passphrase known up front.
    Literal(Passphrase),
    /// A provider awaited on first use.
    Deferred(Box<dyn FnOnce() -> PassphraseFuture + Send>),
}

impl PassphraseSource {
    pub fn literal(passphrase: impl Into<Passphrase>) -> Self {
        Self::Literal(passphrase.into())
    }

    /// Wraps an async provider. It is not invoked until [`resolve`](Self::resolve).
    pub fn deferred<F, Fut>(provider: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Passphrase>> + Send + 'static,
    {
        Self::Deferred(Box::new(move || Box::pin(provider())))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Resolves the source, awaiting a deferred provider if there is one.
    pub async fn resolve(self) -> CustodyResult<Option<Passphrase>> {
        match self {
            Self::Absent => Ok(None),
            Self::Literal(passphrase) => Ok(Some(passphrase)),
            Self::Deferred(provider) => provider()
                .await
                .map(Some)
                .map_err(|e| CustodyError::PassphraseProvider(format!("{e:#}"))),
        }
    }

    /// Resolves the source, failing when no passphrase is available.
    pub async fn require(self, purpose: &str) -> CustodyResult<Passphrase> {
        self.resolve()
            .await?
            .ok_or_else(|| CustodyError::PassphraseProvider(format!("{purpose} is required")))
    }
}

impl fmt::Debug for PassphraseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Literal(_) => f.write_str("Literal(<redacted>)"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Passphrase> for PassphraseSource {
    fn from(passphrase: Passphrase) -> Self {
        Self::Literal(passphrase)
    }
}

impl From<&str> for PassphraseSource {
    fn from(passphrase: &str) -> Self {
        Self::literal(passphrase)
    }
}

impl From<String> for PassphraseSource {
    fn from(passphrase: String) -> Self {
        Self::literal(passphrase)
    }
}

impl<T: Into<Passphrase>> From<Option<T>> for PassphraseSource {
    fn from(passphrase: Option<T>) -> Self {
        passphrase.map_or(Self::Absent, |p| Self::Literal(p.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn literal_resolves_immediately() {
        let p = PassphraseSource::from("secret").resolve().await.unwrap();
        assert_eq!(p, Some(Passphrase::from("secret")));
    }

    #[tokio::test]
    async fn absent_resolves_to_none() {
        assert!(PassphraseSource::Absent.resolve().await.unwrap().is_none());
        assert!(PassphraseSource::from(None::<&str>).is_absent());
    }

    #[tokio::test]
    async fn deferred_runs_only_when_resolved() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source = PassphraseSource::deferred(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::Ok(Passphrase::from("typed"))
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let p = source.resolve().await.unwrap();
        assert_eq!(p, Some(Passphrase::from("typed")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deferred_failure_is_provider_error() {
        let source = PassphraseSource::deferred(|| async {
            Err::<Passphrase, _>(anyhow::anyhow!("prompt cancelled"))
        });
        let err = source.resolve().await.unwrap_err();
        assert!(matches!(
            err,
            CustodyError::PassphraseProvider(ref m) if m.contains("prompt cancelled")
        ));
    }

    #[tokio::test]
    async fn require_rejects_absent() {
        let err = PassphraseSource::Absent.require("key-file passphrase").await.unwrap_err();
        assert!(err.to_string().contains("key-file passphrase is required"));
    }

    #[test]
    fn debug_is_redacted() {
        let rendered = format!("{:?}", PassphraseSource::from("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
