//! Cryptographic primitives for sops-transit.
//!
//! This module provides:
//! - AES-256-GCM encryption of single leaf values (`encryption`)
//! - The zeroizing per-document data key (`keys`)
//! - The SHA-512 document MAC (`mac`)

pub mod encryption;
pub mod keys;
pub mod mac;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt_leaf, DataKey, ...};
pub use encryption::{encrypt_leaf, NONCE_LEN, TAG_LEN};
pub use keys::{DataKey, DATA_KEY_LEN};
pub use mac::MacHasher;
