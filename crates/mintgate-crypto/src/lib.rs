// crates/mintgate-crypto/src/lib.rs

//! Minimal crypto substrate: the one-way hash used for whitelist leaves and
//! inner Merkle nodes.
//!
//! Both the proof generator and any independent verifier must agree on the
//! combining rule bit-for-bit, so it lives here in one place:
//!
//! - leaf:  `H(identity_bytes)`
//! - inner: `H(min(a, b) || max(a, b))`, ordering by lexicographic byte compare
//!
//! [`Keccak256Hasher`] is the default (matches Ethereum `keccak256`, so roots
//! can be checked by EVM contracts). [`Blake3Hasher`] is available for
//! deployments that do not need EVM compatibility.

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

use serde::{Deserialize, Serialize};
use sha3::{Digest as _, Keccak256};
use std::fmt;

/// Fixed-width hash output.
pub type Digest = [u8; 32];

/// Hashing primitive used by the whitelist tree.
///
/// Implementors are zero-sized markers; the API is associated functions so a
/// hasher can be picked with a type parameter (`WhitelistTree::<Blake3Hasher>`).
pub trait NodeHasher {
    /// Which primitive this is, recorded in manifests.
    const KIND: HasherKind;

    /// Hash an arbitrary byte string.
    fn hash(data: &[u8]) -> Digest;

    /// Hash the concatenation `left || right` (no reordering).
    fn hash_pair(left: &Digest, right: &Digest) -> Digest;

    /// Hash two children after ordering them lexicographically.
    ///
    /// Commutative: `hash_sorted_pair(a, b) == hash_sorted_pair(b, a)`.
    #[inline]
    fn hash_sorted_pair(a: &Digest, b: &Digest) -> Digest {
        if a <= b {
            Self::hash_pair(a, b)
        } else {
            Self::hash_pair(b, a)
        }
    }
}

/// Ethereum-flavoured Keccak-256 (pre-NIST padding, not SHA3-256).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Keccak256Hasher;

impl NodeHasher for Keccak256Hasher {
    const KIND: HasherKind = HasherKind::Keccak256;

    fn hash(data: &[u8]) -> Digest {
        Keccak256::digest(data).into()
    }

    fn hash_pair(left: &Digest, right: &Digest) -> Digest {
        let mut h = Keccak256::new();
        h.update(left);
        h.update(right);
        h.finalize().into()
    }
}

/// BLAKE3 with the default (unkeyed) mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blake3Hasher;

impl NodeHasher for Blake3Hasher {
    const KIND: HasherKind = HasherKind::Blake3;

    fn hash(data: &[u8]) -> Digest {
        *blake3::hash(data).as_bytes()
    }

    fn hash_pair(left: &Digest, right: &Digest) -> Digest {
        let mut h = blake3::Hasher::new();
        h.update(left);
        h.update(right);
        *h.finalize().as_bytes()
    }
}

/// Serialized tag naming the hash primitive a commitment was built with.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HasherKind {
    /// [`Keccak256Hasher`].
    #[default]
    Keccak256,
    /// [`Blake3Hasher`].
    Blake3,
}

impl HasherKind {
    /// Borrow the canonical string.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keccak256 => "keccak256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HasherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
