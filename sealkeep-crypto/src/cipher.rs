//! AES-256-CBC with a random per-message IV.
//!
//! Output layout is `IV (16 bytes) || CIPHERTEXT`, PKCS#7 padded. There is no
//! authentication tag: a flipped ciphertext bit usually surfaces as a padding
//! error but may also decrypt to garbage.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Size of the CBC initialization vector in bytes.
pub const IV_SIZE: usize = 16;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Encrypts `plaintext` and returns `IV || ciphertext`.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| CryptoError::Encryption(format!("cipher init: {e}")))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts an `IV || ciphertext` blob produced by [`encrypt`].
pub fn decrypt(key: &DerivedKey, blob: &[u8]) -> CryptoResult<Vec<u8>> {
    if blob.len() < IV_SIZE + BLOCK_SIZE {
        return Err(CryptoError::Format(format!(
            "ciphertext too short: {} bytes, need at least {}",
            blob.len(),
            IV_SIZE + BLOCK_SIZE
        )));
    }
    let (iv, ciphertext) = blob.split_at(IV_SIZE);
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::Format(format!(
            "ciphertext length {} is not a multiple of the block size",
            ciphertext.len()
        )));
    }

    Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
        .map_err(|e| CryptoError::Decryption(format!("cipher init: {e}")))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| {
            CryptoError::Decryption("bad padding (wrong key or corrupted ciphertext)".to_string())
        })
}

/// Encrypts and renders the result as `hex(IV) || hex(ciphertext)`.
pub fn encrypt_hex(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<String> {
    encrypt(key, plaintext).map(hex::encode)
}

/// Inverse of [`encrypt_hex`].
pub fn decrypt_hex(key: &DerivedKey, blob: &str) -> CryptoResult<Vec<u8>> {
    let bytes = hex::decode(blob.trim())?;
    decrypt(key, &bytes)
}
