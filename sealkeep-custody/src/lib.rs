//! Key custody for sealkeep.
//!
//! Provides the owner-side lifecycle around `sealkeep-crypto`:
//! - Load-or-create of the RSA key pair against a [`KeyFileStore`]
//! - Literal or deferred (async) passphrase sources
//! - Envelope encrypt/decrypt with the held key pair
//!
//! # Example
//!
//! ```no_run
//! use sealkeep_custody::{FsKeyFileStore, KeyCustodian, PassphraseSource};
//!
//! # async fn run() -> sealkeep_custody::CustodyResult<()> {
//! let custodian = KeyCustodian::new(FsKeyFileStore::new("/var/lib/app"))
//!     .initialize("keys.bin", "key-file passphrase", PassphraseSource::Absent)
//!     .await?;
//!
//! let sealed = custodian.encrypt(b"hello world").await?;
//! let plaintext = custodian.decrypt(&sealed, PassphraseSource::Absent).await?;
//! assert_eq!(plaintext, b"hello world");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod custodian;
pub mod error;
pub mod passphrase;
pub mod store;

pub use config::{CustodyConfig, KeyFileEncoding};
pub use custodian::{CustodianState, KeyCustodian};
pub use error::{CustodyError, CustodyResult, ErrorKind};
pub use passphrase::{PassphraseFuture, PassphraseSource};
pub use sealkeep_crypto::{Envelope, KeyPair, Passphrase};
pub use store::{FsKeyFileStore, KeyFileStore, MemoryKeyFileStore};
