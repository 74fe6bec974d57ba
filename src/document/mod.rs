//! Document model: the recursive tree every codec parses into.
//!
//! This module provides:
//! - `Node`, `Scalar` and `PathSegment` (`tree`)
//! - `EncryptedLeaf` and its `ENC[...]` string form (`leaf`)

pub mod leaf;
pub mod tree;

pub use leaf::{EncryptedLeaf, ScalarKind};
pub use tree::{Node, PathSegment, Scalar};
