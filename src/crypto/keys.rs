//! The per-document data key.
//!
//! A `DataKey` lives for exactly one encryption call.  Its bytes are
//! zeroed when it is dropped and its `Debug` output is redacted, so the
//! key cannot leak through logs.

use std::fmt;

use rand::RngCore;
use zeroize::Zeroize;

/// Length of the data key (256 bits, for AES-256).
pub const DATA_KEY_LEN: usize = 32;

/// A random 32-byte key that encrypts every leaf of one document.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct DataKey {
    bytes: [u8; DATA_KEY_LEN],
}

impl DataKey {
    /// Generate a fresh key from the OS random number generator.
    pub fn generate() -> Self {
        let mut bytes = [0u8; DATA_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Wrap existing key bytes.
    pub fn from_bytes(bytes: [u8; DATA_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to hand them to the key wrapper).
    pub fn as_bytes(&self) -> &[u8; DATA_KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataKey(<redacted>)")
    }
}
