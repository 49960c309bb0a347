//! Encryption layer for sealkeep.
//!
//! Provides hybrid envelope encryption for arbitrary payloads using:
//! - RSA-OAEP (SHA-256) to wrap a random per-message secret
//! - AES-256-CBC, keyed by `SHA-256(secret)`, for the payload itself
//! - Passphrase-protected storage of the RSA key pair (the key file)
//!
//! # Architecture
//!
//! There are two independent passphrases:
//!
//! 1. **Key-file passphrase**: `SHA-256(passphrase)` keys the AES-256-CBC
//!    encryption of the serialized key pair at rest.
//!
//! 2. **Private-key passphrase**: encrypts the PKCS8 private key inside the
//!    key pair. When the owner does not supply one, a random passphrase is
//!    generated and stored inside the (encrypted) key file.
//!
//! # Limitations
//!
//! AES-CBC carries no authentication tag. Tampered ciphertext usually fails
//! padding checks but can decrypt to garbage without an error; callers
//! needing tamper detection must add their own MAC.

pub mod cipher;
pub mod envelope;
mod error;
pub mod key;
pub mod keyfile;
pub mod keypair;

pub use envelope::{open, seal, Envelope, SECRET_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, DerivedKey, Passphrase, KEY_SIZE};
pub use keyfile::{decode_key_file, encode_key_file, encode_key_file_hex, KeyFileInput};
pub use keypair::{generate_key_pair, parse_public_key, KeyGenParams, KeyPair};
