// crates/mintgate-merkle/src/lib.rs

//! Merkle whitelist commitment over 20-byte identities.
//!
//! - Leaf hash: `H(identity_bytes)`.
//! - Inner node: `H(min(a, b) || max(a, b))` (see [`NodeHasher::hash_sorted_pair`]).
//! - Odd node at a level: carried up unchanged, never paired with itself.
//! - Leaves are sorted by digest before building unless [`LeafOrder::Insertion`]
//!   is requested, so the default root depends only on the identity multiset.
//!
//! Proofs carry no left/right bits; a verifier only needs the sibling list and
//! the root. Any implementation that follows the three rules above reaches the
//! same boolean.
//!
//! Helpers are provided to write a [`WhitelistManifest`] (root + count +
//! hasher) and a [`ProofBundle`] (identity → path) as JSON or CBOR.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::module_name_repetitions)]

/// Manifest and proof-bundle distribution files.
pub mod manifest;
/// Tree builder and proof generator.
pub mod tree;
/// Stateless proof verification.
pub mod verify;

pub use manifest::*;
pub use tree::*;
pub use verify::*;

pub use mintgate_crypto::{Blake3Hasher, HasherKind, Keccak256Hasher, NodeHasher};

use mintgate_core::Identity;
use thiserror::Error;

/// Failures from building or querying a whitelist tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WhitelistError {
    /// Build attempted with zero identities.
    #[error("cannot build a whitelist from zero identities")]
    EmptyWhitelist,
    /// Proof requested for an identity whose leaf is absent.
    #[error("identity {0} is not in the whitelist")]
    NotFound(Identity),
}
