//! Document MAC.
//!
//! Every leaf value is hashed with SHA-512 in document order, whether it
//! ends up encrypted or not.  The uppercase hex digest is then encrypted
//! with the data key, using the `lastmodified` timestamp as AAD, and
//! stored in the metadata block.  Decrypting tools refuse files whose
//! MAC is missing or does not match.

use sha2::{Digest, Sha512};

use super::encryption::encrypt_leaf;
use super::keys::DataKey;
use crate::document::{EncryptedLeaf, Scalar, ScalarKind};
use crate::errors::Result;

/// Accumulates the SHA-512 digest over leaf values.
#[derive(Default)]
pub struct MacHasher {
    hasher: Sha512,
}

impl MacHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one leaf value.  Nulls contribute nothing.
    pub fn update(&mut self, value: &Scalar) {
        if !matches!(value, Scalar::Null) {
            self.hasher.update(value.mac_bytes());
        }
    }

    /// Uppercase hex of the digest.
    pub fn finish_hex(self) -> String {
        self.hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect()
    }

    /// Finish the digest and encrypt it under `key` with `last_modified` as AAD.
    pub fn seal(self, key: &DataKey, last_modified: &str) -> Result<EncryptedLeaf> {
        let hex = self.finish_hex();
        encrypt_leaf(key, hex.as_bytes(), last_modified.as_bytes(), ScalarKind::Str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_digest_is_sha512_of_nothing() {
        let hex = MacHasher::new().finish_hex();
        assert!(hex.starts_with("CF83E1357EEFB8BD"));
        assert_eq!(hex.len(), 128);
    }

    #[test]
    fn nulls_do_not_change_the_digest() {
        let mut a = MacHasher::new();
        a.update(&Scalar::String("x".into()));
        let mut b = MacHasher::new();
        b.update(&Scalar::Null);
        b.update(&Scalar::String("x".into()));
        assert_eq!(a.finish_hex(), b.finish_hex());
    }

    #[test]
    fn booleans_hash_capitalised() {
        let mut a = MacHasher::new();
        a.update(&Scalar::Bool(true));
        let mut b = MacHasher::new();
        b.update(&Scalar::String("True".into()));
        assert_eq!(a.finish_hex(), b.finish_hex());
    }
}
