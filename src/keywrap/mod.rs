//! Key wrapping: the boundary to the external key-management service.
//!
//! The encryptor only knows the `KeyWrapClient` trait.  It calls `wrap`
//! exactly once per document and never retries; any failure aborts the
//! whole operation.  `transit` holds the HashiCorp Vault implementation.

pub mod transit;

use crate::crypto::DATA_KEY_LEN;
use crate::errors::Result;

pub use transit::{approle_login, VaultTransitClient};

/// Where a wrapping key lives, recorded in the document metadata so a
/// decrypting tool knows whom to ask for the unwrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLocation {
    pub vault_address: String,
    pub engine_path: String,
}

/// Capability to wrap (encrypt) a raw data key with a named master key.
pub trait KeyWrapClient {
    /// Wrap `plaintext_key` with the master key `key_name`, returning the
    /// service's opaque ciphertext token.
    fn wrap(&self, key_name: &str, plaintext_key: &[u8; DATA_KEY_LEN]) -> Result<String>;

    /// The service location to record next to the wrapped key.
    fn location(&self) -> KeyLocation;
}

impl<T: KeyWrapClient + ?Sized> KeyWrapClient for &T {
    fn wrap(&self, key_name: &str, plaintext_key: &[u8; DATA_KEY_LEN]) -> Result<String> {
        (**self).wrap(key_name, plaintext_key)
    }

    fn location(&self) -> KeyLocation {
        (**self).location()
    }
}
