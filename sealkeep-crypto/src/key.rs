//! Passphrases and passphrase-derived cipher keys.
//!
//! Derivation is a single unsalted SHA-256 over the passphrase bytes, so the
//! same passphrase always yields the same key. Key files written by earlier
//! releases depend on this, which is why no salt or work factor is applied.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of a derived AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Secret bytes used either as a key-file passphrase or a private-key
/// passphrase. UTF-8 text and raw buffers are treated the same.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(Zeroizing<Vec<u8>>);

impl Passphrase {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl From<&[u8]> for Passphrase {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl From<Vec<u8>> for Passphrase {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// A 256-bit AES key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Derives an AES-256 key from arbitrary secret bytes: `SHA-256(secret)`.
pub fn derive_key(secret: &[u8]) -> DerivedKey {
    let digest = Sha256::digest(secret);
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&digest);
    DerivedKey(bytes)
}

/// Fills a fresh buffer with `len` bytes from the OS CSPRNG.
pub fn random_bytes(len: usize) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(vec![0u8; len]);
    OsRng.fill_bytes(&mut bytes);
    bytes
}
