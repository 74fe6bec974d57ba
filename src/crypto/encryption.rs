//! AES-256-GCM authenticated encryption of single leaf values.
//!
//! Each call to `encrypt_leaf` generates a fresh random 12-byte nonce.
//! The additional authenticated data binds the ciphertext to the
//! position of the value in the document, so a value moved to another
//! key fails authentication on decrypt.
//!
//! The aead crate returns `ciphertext || tag`; we split the trailing
//! 16-byte tag off so it can be rendered as its own envelope field.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm};

use super::keys::DataKey;
use crate::document::{EncryptedLeaf, ScalarKind};
use crate::errors::{Result, SopsTransitError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key`, authenticating `aad` alongside it.
pub fn encrypt_leaf(
    key: &DataKey,
    plaintext: &[u8],
    aad: &[u8],
    kind: ScalarKind,
) -> Result<EncryptedLeaf> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| SopsTransitError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut sealed = cipher
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|e| SopsTransitError::EncryptionFailed(format!("encryption error: {e}")))?;

    if sealed.len() < TAG_LEN {
        return Err(SopsTransitError::EncryptionFailed(
            "cipher output shorter than the authentication tag".into(),
        ));
    }
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok(EncryptedLeaf {
        data: sealed,
        iv: nonce.to_vec(),
        tag,
        kind,
    })
}
