//! Per-message hybrid encryption.
//!
//! Each message gets a fresh 64-byte random secret. The payload is encrypted
//! with AES-256-CBC under `SHA-256(secret)`, and the raw secret is wrapped
//! with the recipient's RSA public key (OAEP, SHA-256). The wrapped key and
//! the payload must be kept together; losing either makes the message
//! unrecoverable.

use crate::cipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, random_bytes, Passphrase};
use crate::keypair::{parse_public_key, KeyPair};
use rand::rngs::OsRng;
use rsa::Oaep;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Size of the per-message secret in bytes.
pub const SECRET_SIZE: usize = 64;

/// Output of [`seal`]: an RSA-wrapped secret plus the hex payload it unlocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// RSA-OAEP ciphertext of the 64-byte secret.
    #[serde(with = "hex::serde")]
    pub wrapped_key: Vec<u8>,
    /// `hex(IV) || hex(AES-256-CBC ciphertext)`.
    pub payload: String,
}

/// Encrypts `payload` for the holder of the private half of `public_key_pem`.
pub fn seal(payload: &[u8], public_key_pem: &str) -> CryptoResult<Envelope> {
    let public_key = parse_public_key(public_key_pem)?;

    let secret = random_bytes(SECRET_SIZE);
    let key = derive_key(&secret);
    let payload = cipher::encrypt_hex(&key, payload)?;

    let wrapped_key = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &secret)
        .map_err(|e| CryptoError::KeyWrap(e.to_string()))?;

    Ok(Envelope {
        wrapped_key,
        payload,
    })
}

/// Decrypts an envelope with the held key pair.
///
/// The private key is unlocked with the passphrase stored in the key pair
/// when present; `passphrase` is only consulted otherwise.
pub fn open(
    envelope: &Envelope,
    key_pair: &KeyPair,
    passphrase: Option<&Passphrase>,
) -> CryptoResult<Vec<u8>> {
    let secret = unwrap_secret(&envelope.wrapped_key, key_pair, passphrase)?;
    open_payload(&secret, &envelope.payload)
}

/// The RSA half of [`open`]: unlocks the private key and recovers the
/// per-message secret. This is the expensive step.
pub fn unwrap_secret(
    wrapped_key: &[u8],
    key_pair: &KeyPair,
    passphrase: Option<&Passphrase>,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let unlock = match key_pair.stored_passphrase() {
        Some(stored) => stored,
        None => passphrase.cloned().ok_or(CryptoError::PassphraseRequired)?,
    };

    let private_key = key_pair.rsa_private_key(&unlock)?;
    let secret = Zeroizing::new(
        private_key
            .decrypt(Oaep::new::<Sha256>(), wrapped_key)
            .map_err(|e| CryptoError::KeyUnwrap(e.to_string()))?,
    );
    if secret.len() != SECRET_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: SECRET_SIZE,
            actual: secret.len(),
        });
    }
    Ok(secret)
}

/// The symmetric half of [`open`]: decrypts a hex payload under
/// `SHA-256(secret)`.
pub fn open_payload(secret: &[u8], payload: &str) -> CryptoResult<Vec<u8>> {
    let key = derive_key(secret);
    cipher::decrypt_hex(&key, payload)
}
