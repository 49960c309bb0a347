//! At-rest key file format.
//!
//! A key file is `IV || AES-256-CBC(JSON(KeyPair))`, keyed by
//! `SHA-256(key-file passphrase)`. Callers may persist it as raw bytes or as
//! the equivalent lowercase hex text; both decode.

use crate::cipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, Passphrase};
use crate::keypair::KeyPair;
use zeroize::Zeroizing;

/// Encoded key file as handed to [`decode_key_file`].
#[derive(Clone, Copy, Debug)]
pub enum KeyFileInput<'a> {
    /// Raw `IV || ciphertext` bytes.
    Bytes(&'a [u8]),
    /// The same bytes as hex text.
    Hex(&'a str),
}

impl<'a> From<&'a [u8]> for KeyFileInput<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for KeyFileInput<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for KeyFileInput<'a> {
    fn from(hex: &'a str) -> Self {
        Self::Hex(hex)
    }
}

impl<'a> From<&'a String> for KeyFileInput<'a> {
    fn from(hex: &'a String) -> Self {
        Self::Hex(hex)
    }
}

impl KeyFileInput<'_> {
    fn to_bytes(self) -> CryptoResult<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.to_vec()),
            Self::Hex(text) => Ok(hex::decode(text.trim())?),
        }
    }
}

/// Serializes and encrypts a key pair into raw key-file bytes.
pub fn encode_key_file(key_pair: &KeyPair, passphrase: &Passphrase) -> CryptoResult<Vec<u8>> {
    let json = Zeroizing::new(serde_json::to_vec(key_pair)?);
    let key = derive_key(passphrase.as_bytes());
    cipher::encrypt(&key, &json)
}

/// Same as [`encode_key_file`], rendered as hex text.
pub fn encode_key_file_hex(key_pair: &KeyPair, passphrase: &Passphrase) -> CryptoResult<String> {
    encode_key_file(key_pair, passphrase).map(hex::encode)
}

/// Decrypts and parses a key file.
///
/// A wrong passphrase is usually reported as [`CryptoError::Decryption`];
/// when the garbage happens to carry valid padding it fails JSON parsing
/// instead and is reported as [`CryptoError::Format`].
pub fn decode_key_file<'a>(
    input: impl Into<KeyFileInput<'a>>,
    passphrase: &Passphrase,
) -> CryptoResult<KeyPair> {
    let bytes = input.into().to_bytes()?;
    let key = derive_key(passphrase.as_bytes());
    let json = Zeroizing::new(cipher::decrypt(&key, &bytes)?);
    let text = std::str::from_utf8(&json)
        .map_err(|e| CryptoError::Format(format!("key file is not UTF-8: {e}")))?;
    Ok(serde_json::from_str(text)?)
}
