//! Custody configuration.

use sealkeep_crypto::KeyGenParams;
use serde::{Deserialize, Serialize};

/// How the key file is laid out in the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFileEncoding {
    /// Raw `IV || ciphertext` bytes.
    #[default]
    Raw,
    /// The same bytes as hex text.
    Hex,
}

/// Configuration for a [`KeyCustodian`](crate::KeyCustodian).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustodyConfig {
    /// Parameters for first-run key pair generation.
    pub key_gen: KeyGenParams,

    /// Encoding used when writing and reading the key file.
    pub key_file_encoding: KeyFileEncoding,
}

impl CustodyConfig {
    /// Smaller keys for tests: 2048-bit modulus instead of 4096.
    pub fn fast_keys() -> Self {
        Self {
            key_gen: KeyGenParams::default().with_modulus_bits(2048),
            ..Self::default()
        }
    }

    pub fn with_encoding(mut self, encoding: KeyFileEncoding) -> Self {
        self.key_file_encoding = encoding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CustodyConfig::default();
        assert_eq!(config.key_gen.modulus_bits, 4096);
        assert_eq!(config.key_file_encoding, KeyFileEncoding::Raw);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: CustodyConfig =
            serde_json::from_str(r#"{ "key_file_encoding": "hex" }"#).unwrap();
        assert_eq!(config.key_file_encoding, KeyFileEncoding::Hex);
        assert_eq!(config.key_gen, KeyGenParams::default());

        let config: CustodyConfig =
            serde_json::from_str(r#"{ "key_gen": { "modulus_bits": 3072 } }"#).unwrap();
        assert_eq!(config.key_gen.modulus_bits, 3072);
        assert_eq!(config.key_gen.pkcs8_iterations, 2048);
    }
}
