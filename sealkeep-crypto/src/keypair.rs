//! RSA key pair generation.
//!
//! The public half is exported as SPKI PEM. The private half is exported as
//! an encrypted PKCS8 PEM (PBES2: PBKDF2-HMAC-SHA256 + AES-256-CBC) keyed by
//! the private-key passphrase. That PKCS8 layer is independent of the
//! key-file encryption in [`crate::keyfile`].

use crate::error::{CryptoError, CryptoResult};
use crate::key::{random_bytes, Passphrase};
use pkcs5::pbes2;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default RSA modulus size in bits.
pub const DEFAULT_MODULUS_BITS: usize = 4096;

/// Default PBKDF2 iteration count for the PKCS8 private-key encryption.
pub const DEFAULT_PKCS8_ITERATIONS: u32 = 2048;

/// Length of an auto-generated private-key passphrase, before hex encoding.
pub const GENERATED_PASSPHRASE_SIZE: usize = 32;

const ENCRYPTED_PRIVATE_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// Parameters for [`generate_key_pair`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyGenParams {
    /// RSA modulus size in bits.
    pub modulus_bits: usize,

    /// PBKDF2 iterations used when encrypting the PKCS8 private key.
    pub pkcs8_iterations: u32,
}

impl Default for KeyGenParams {
    fn default() -> Self {
        Self {
            modulus_bits: DEFAULT_MODULUS_BITS,
            pkcs8_iterations: DEFAULT_PKCS8_ITERATIONS,
        }
    }
}

impl KeyGenParams {
    pub fn with_modulus_bits(mut self, bits: usize) -> Self {
        self.modulus_bits = bits;
        self
    }
}

/// An RSA key pair as persisted in the key file.
///
/// `passphrase` is set only when the private-key passphrase was generated
/// rather than supplied, since nothing else could recover it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    /// SPKI public key, PEM encoded.
    pub public_key: String,
    /// Encrypted PKCS8 private key, PEM encoded.
    pub private_key: String,
    /// Hex-encoded auto-generated private-key passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

impl KeyPair {
    /// True when the private-key passphrase travels with the key pair.
    pub fn has_stored_passphrase(&self) -> bool {
        self.passphrase.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// The passphrase stored alongside the key pair, if any.
    pub fn stored_passphrase(&self) -> Option<Passphrase> {
        self.passphrase
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Passphrase::from)
    }

    /// Parses the public half.
    pub fn rsa_public_key(&self) -> CryptoResult<RsaPublicKey> {
        parse_public_key(&self.public_key)
    }

    /// Decrypts and parses the private half.
    pub fn rsa_private_key(&self, passphrase: &Passphrase) -> CryptoResult<RsaPrivateKey> {
        RsaPrivateKey::from_pkcs8_encrypted_pem(&self.private_key, passphrase.as_bytes()).map_err(
            |e| CryptoError::KeyUnwrap(format!("cannot open private key (wrong passphrase?): {e}")),
        )
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<encrypted>")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Parses an SPKI PEM public key.
pub fn parse_public_key(pem: &str) -> CryptoResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .map_err(|e| CryptoError::Format(format!("invalid public key PEM: {e}")))
}

/// Generates a fresh RSA key pair.
///
/// With `passphrase == None` a random 32-byte passphrase is generated,
/// hex encoded, used for the PKCS8 encryption and returned in
/// [`KeyPair::passphrase`]. A supplied passphrase is used as-is and not
/// echoed back.
pub fn generate_key_pair(
    passphrase: Option<&Passphrase>,
    params: &KeyGenParams,
) -> CryptoResult<KeyPair> {
    let (pkcs8_passphrase, echoed) = match passphrase {
        Some(p) => (p.clone(), None),
        None => {
            let generated = hex::encode(random_bytes(GENERATED_PASSPHRASE_SIZE).as_slice());
            (Passphrase::from(generated.as_str()), Some(generated))
        }
    };

    let private = RsaPrivateKey::new(&mut OsRng, params.modulus_bits)
        .map_err(|e| CryptoError::Generation(e.to_string()))?;
    let public = RsaPublicKey::from(&private);

    let public_key = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::Generation(format!("public key export: {e}")))?;
    let private_key = export_encrypted_private_key(&private, &pkcs8_passphrase, params)?;

    Ok(KeyPair {
        public_key,
        private_key,
        passphrase: echoed,
    })
}

fn export_encrypted_private_key(
    private: &RsaPrivateKey,
    passphrase: &Passphrase,
    params: &KeyGenParams,
) -> CryptoResult<String> {
    let document = private
        .to_pkcs8_der()
        .map_err(|e| CryptoError::Generation(format!("private key export: {e}")))?;
    let info = pkcs8::PrivateKeyInfo::try_from(document.as_bytes())
        .map_err(|e| CryptoError::Generation(format!("private key export: {e}")))?;

    let mut salt = [0u8; 16];
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);
    let pbes2_params =
        pbes2::Parameters::pbkdf2_sha256_aes256cbc(params.pkcs8_iterations, &salt, &iv)
            .map_err(|e| CryptoError::Generation(format!("PBES2 parameters: {e}")))?;

    let encrypted = info
        .encrypt_with_params(pbes2_params, passphrase.as_bytes())
        .map_err(|e| CryptoError::Generation(format!("private key encryption: {e}")))?;
    let pem = encrypted
        .to_pem(ENCRYPTED_PRIVATE_KEY_LABEL, LineEnding::LF)
        .map_err(|e| CryptoError::Generation(format!("private key PEM: {e}")))?;

    Ok(pem.as_str().to_owned())
}
