//! The owner's key custodian.
//!
//! A custodian starts `Uninitialized`. [`KeyCustodian::initialize`] consumes
//! it and returns a `Ready` custodian holding the key pair, either loaded
//! from an existing key file or freshly generated and written on first run.
//!
//! Initialization is not arbitrated: two concurrent first runs against the
//! same empty store both generate and both write, and the last write wins.
//! Callers must serialize initialization. Once ready, `encrypt` and
//! `decrypt` only read the immutable key pair and may run concurrently.

use crate::config::{CustodyConfig, KeyFileEncoding};
use crate::error::{CustodyError, CustodyResult};
use crate::passphrase::PassphraseSource;
use crate::store::KeyFileStore;
use sealkeep_crypto::keyfile::{decode_key_file, encode_key_file, KeyFileInput};
use sealkeep_crypto::{envelope, generate_key_pair, Envelope, KeyPair, Passphrase};
use std::sync::Arc;
use tracing::{debug, info};

/// Lifecycle of a [`KeyCustodian`].
#[derive(Clone, Debug, Default)]
pub enum CustodianState {
    #[default]
    Uninitialized,
    Ready(Arc<KeyPair>),
}

/// Holds the owner's key pair and manages its key file.
pub struct KeyCustodian<S> {
    store: S,
    config: CustodyConfig,
    state: CustodianState,
}

impl<S: KeyFileStore> KeyCustodian<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, CustodyConfig::default())
    }

    pub fn with_config(store: S, config: CustodyConfig) -> Self {
        Self {
            store,
            config,
            state: CustodianState::Uninitialized,
        }
    }

    pub fn state(&self) -> &CustodianState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, CustodianState::Ready(_))
    }

    /// Loads the key pair from `key_file_name`, or generates and persists a
    /// new one if the key file does not exist yet.
    ///
    /// `private_key_passphrase` is only consulted on first run; when loading
    /// an existing key file a deferred provider is never invoked. An absent
    /// private-key passphrase makes generation pick a random one, which is
    /// then stored inside the key file.
    pub async fn initialize(
        self,
        key_file_name: &str,
        key_file_passphrase: impl Into<PassphraseSource>,
        private_key_passphrase: impl Into<PassphraseSource>,
    ) -> CustodyResult<Self> {
        if self.is_ready() {
            debug!("re-initializing key custodian from {key_file_name}");
        }

        let exists = self.store.exists(key_file_name).await?;
        let key_file_passphrase = key_file_passphrase
            .into()
            .require("key-file passphrase")
            .await?;

        let key_pair = if exists {
            self.load(key_file_name, &key_file_passphrase).await?
        } else {
            let private_key_passphrase = private_key_passphrase.into().resolve().await?;
            self.create(key_file_name, &key_file_passphrase, private_key_passphrase)
                .await?
        };

        Ok(Self {
            state: CustodianState::Ready(Arc::new(key_pair)),
            ..self
        })
    }

    async fn load(&self, key_file_name: &str, passphrase: &Passphrase) -> CustodyResult<KeyPair> {
        let blob = self.store.read(key_file_name).await?;
        let key_pair = decode_key_file(detect_encoding(&blob), passphrase)?;
        info!("loaded key pair from {key_file_name}");
        Ok(key_pair)
    }

    async fn create(
        &self,
        key_file_name: &str,
        key_file_passphrase: &Passphrase,
        private_key_passphrase: Option<Passphrase>,
    ) -> CustodyResult<KeyPair> {
        let params = self.config.key_gen.clone();
        info!(
            "no key file at {key_file_name}, generating {}-bit RSA key pair",
            params.modulus_bits
        );

        let key_pair = tokio::task::spawn_blocking(move || {
            generate_key_pair(private_key_passphrase.as_ref(), &params)
        })
        .await??;

        let blob = encode_key_file(&key_pair, key_file_passphrase)?;
        let blob = match self.config.key_file_encoding {
            KeyFileEncoding::Raw => blob,
            KeyFileEncoding::Hex => hex::encode(blob).into_bytes(),
        };
        self.store.write(key_file_name, &blob).await?;
        info!("wrote new key file to {key_file_name}");

        Ok(key_pair)
    }

    /// The held key pair. Fails with [`CustodyError::NotInitialized`] before
    /// [`initialize`](Self::initialize) has succeeded.
    pub fn key_pair(&self) -> CustodyResult<&Arc<KeyPair>> {
        match &self.state {
            CustodianState::Ready(key_pair) => Ok(key_pair),
            CustodianState::Uninitialized => Err(CustodyError::NotInitialized),
        }
    }

    /// SPKI PEM public key to hand to data producers.
    pub fn public_key(&self) -> CustodyResult<&str> {
        Ok(&self.key_pair()?.public_key)
    }

    /// Seals `payload` to the held public key.
    pub async fn encrypt(&self, payload: &[u8]) -> CustodyResult<Envelope> {
        let public_key = self.public_key()?;
        Ok(envelope::seal(payload, public_key)?)
    }

    /// Opens an envelope with the held key pair.
    ///
    /// If the key pair carries its own generated passphrase,
    /// `private_key_passphrase` is ignored and a deferred provider is not
    /// invoked.
    pub async fn decrypt(
        &self,
        sealed: &Envelope,
        private_key_passphrase: impl Into<PassphraseSource>,
    ) -> CustodyResult<Vec<u8>> {
        let key_pair = Arc::clone(self.key_pair()?);
        let passphrase = if key_pair.has_stored_passphrase() {
            None
        } else {
            Some(
                private_key_passphrase
                    .into()
                    .require("private-key passphrase")
                    .await?,
            )
        };

        let wrapped_key = sealed.wrapped_key.clone();
        let secret = tokio::task::spawn_blocking(move || {
            envelope::unwrap_secret(&wrapped_key, &key_pair, passphrase.as_ref())
        })
        .await??;
        Ok(envelope::open_payload(&secret, &sealed.payload)?)
    }
}

/// Key files may be stored as raw bytes or as hex text. Raw ciphertext that
/// happens to be entirely ASCII hex digits is vanishingly unlikely.
fn detect_encoding(blob: &[u8]) -> KeyFileInput<'_> {
    match std::str::from_utf8(blob) {
        Ok(text) if looks_like_hex(text.trim()) => KeyFileInput::Hex(text),
        _ => KeyFileInput::Bytes(blob),
    }
}

fn looks_like_hex(text: &str) -> bool {
    !text.is_empty() && text.len() % 2 == 0 && text.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKeyFileStore;

    #[test]
    fn detects_hex_and_raw() {
        assert!(matches!(detect_encoding(b"00ff\n"), KeyFileInput::Hex(_)));
        assert!(matches!(detect_encoding(&[0, 159, 146, 150]), KeyFileInput::Bytes(_)));
        assert!(matches!(detect_encoding(b"abc"), KeyFileInput::Bytes(_)));
        assert!(matches!(detect_encoding(b""), KeyFileInput::Bytes(_)));
    }

    #[tokio::test]
    async fn uninitialized_custodian_guards_accessors() {
        let custodian = KeyCustodian::new(MemoryKeyFileStore::new());
        assert!(!custodian.is_ready());
        assert!(matches!(custodian.state(), CustodianState::Uninitialized));
        assert!(matches!(custodian.public_key(), Err(CustodyError::NotInitialized)));
        assert!(matches!(
            custodian.encrypt(b"x").await,
            Err(CustodyError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn missing_key_file_passphrase_fails_before_generation() {
        let store = Arc::new(MemoryKeyFileStore::new());
        let err = KeyCustodian::new(store.clone())
            .initialize("keys", PassphraseSource::Absent, PassphraseSource::Absent)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CustodyError::PassphraseProvider(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn ready_state_shares_the_key_pair() {
        let store = MemoryKeyFileStore::new();
        let custodian = KeyCustodian::with_config(store, CustodyConfig::fast_keys())
            .initialize("keys", "kfp1", PassphraseSource::Absent)
            .await
            .unwrap();
        match custodian.state() {
            CustodianState::Ready(key_pair) => {
                assert!(Arc::ptr_eq(key_pair, custodian.key_pair().unwrap()));
            }
            CustodianState::Uninitialized => panic!("custodian should be ready"),
        }
    }
}
