//! Canonical core types used across the MINTGATE workspace.
//!
//! These live in `mintgate-core` and are re-exported at the crate root so other
//! crates can import via `mintgate_core::Identity`, `mintgate_core::AuthPath`, etc.
//!
//! All fixed-width byte strings render as lowercase `0x`-prefixed hex, which is
//! also their serde form. That keeps JSON distribution files readable and lets
//! identities be map keys.

use crate::hex_serde::{self, ParseDigestError};
use crate::Digest;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of an identity in bytes.
pub const IDENTITY_LEN: usize = 20;

/// Rejected identity input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IdentityError {
    /// Byte length other than [`IDENTITY_LEN`].
    #[error("invalid identity: expected {expected} bytes, got {got}")]
    InvalidIdentity {
        /// Required width.
        expected: usize,
        /// Width that was supplied.
        got: usize,
    },
    /// Text form was not hex.
    #[error("invalid identity: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// A 20-byte account address.
///
/// No internal structure: equality and ordering are plain byte comparisons.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// Wrap raw bytes.
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Validate a byte slice of unknown length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentityError> {
        let arr: [u8; IDENTITY_LEN] =
            bytes
                .try_into()
                .map_err(|_| IdentityError::InvalidIdentity {
                    expected: IDENTITY_LEN,
                    got: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Borrow the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; IDENTITY_LEN]> for Identity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Identity {
    type Error = IdentityError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(hex_serde::strip_0x(s.trim()))?;
        Self::from_slice(&raw)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({self})")
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Trusted Merkle root of a whitelist campaign.
///
/// Replaced only by an administrative rotation; every rotation invalidates
/// proofs issued against the previous root.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerkleRoot(#[serde(with = "hex_serde::digest")] Digest);

impl MerkleRoot {
    /// Wrap a digest.
    #[inline]
    #[must_use]
    pub const fn new(digest: Digest) -> Self {
        Self(digest)
    }

    /// Raw digest bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &Digest {
        &self.0
    }

    /// Copy out the digest.
    #[inline]
    #[must_use]
    pub const fn to_digest(self) -> Digest {
        self.0
    }
}

impl From<Digest> for MerkleRoot {
    fn from(d: Digest) -> Self {
        Self(d)
    }
}

impl FromStr for MerkleRoot {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex_serde::parse_digest(s).map(Self)
    }
}

impl fmt::Display for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MerkleRoot({self})")
    }
}

/// Sibling hashes from leaf to root.
///
/// Position bits are not carried: inner nodes sort their children before
/// hashing, so the sibling value alone is enough to fold upward.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthPath(#[serde(with = "hex_serde::digest_vec")] Vec<Digest>);

impl AuthPath {
    /// Wrap a sibling list.
    #[inline]
    #[must_use]
    pub const fn new(siblings: Vec<Digest>) -> Self {
        Self(siblings)
    }

    /// Number of siblings.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` for a single-leaf tree's path.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the siblings.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Digest] {
        &self.0
    }

    /// Iterate siblings leaf → root.
    pub fn iter(&self) -> std::slice::Iter<'_, Digest> {
        self.0.iter()
    }

    /// Unwrap into the sibling list.
    #[must_use]
    pub fn into_inner(self) -> Vec<Digest> {
        self.0
    }
}

impl From<Vec<Digest>> for AuthPath {
    fn from(v: Vec<Digest>) -> Self {
        Self(v)
    }
}

impl FromIterator<Digest> for AuthPath {
    fn from_iter<I: IntoIterator<Item = Digest>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AuthPath {
    type Item = &'a Digest;
    type IntoIter = std::slice::Iter<'a, Digest>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Comma-separated hex digests; the empty string is the empty path.
impl FromStr for AuthPath {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(hex_serde::parse_digest)
            .collect()
    }
}

impl fmt::Display for AuthPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "0x{}", hex::encode(d))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rejects_wrong_length() {
        assert_eq!(
            Identity::from_slice(&[0u8; 19]),
            Err(IdentityError::InvalidIdentity {
                expected: 20,
                got: 19
            })
        );
        assert!(matches!(
            "0x1234".parse::<Identity>(),
            Err(IdentityError::InvalidIdentity { got: 2, .. })
        ));
        assert!(matches!(
            "0xzz000000000000000000000000000000000000zz".parse::<Identity>(),
            Err(IdentityError::InvalidHex(_))
        ));
        assert_eq!(
            "0x0g".parse::<Identity>(),
            Err(IdentityError::InvalidHex(hex::FromHexError::InvalidHexCharacter {
                c: 'g',
                index: 1
            }))
        );
    }

    #[test]
    fn identity_text_form() {
        let id: Identity = "0x5FC0BE7A7D67A98BEA9AAD9E4583332E44E19F0F".parse().unwrap();
        assert_eq!(id.to_string(), "0x5fc0be7a7d67a98bea9aad9e4583332e44e19f0f");
        let bare: Identity = "5fc0be7a7d67a98bea9aad9e4583332e44e19f0f".parse().unwrap();
        assert_eq!(id, bare);
    }

    #[test]
    fn identity_orders_bytewise() {
        let a = Identity::new([0u8; 20]);
        let mut hi = [0u8; 20];
        hi[0] = 1;
        assert!(a < Identity::new(hi));
    }

    #[test]
    fn auth_path_text_form() {
        let p = AuthPath::new(vec![[1u8; 32], [2u8; 32]]);
        let s = p.to_string();
        assert_eq!(s.split(',').count(), 2);
        assert_eq!(s.parse::<AuthPath>().unwrap(), p);
        assert!("".parse::<AuthPath>().unwrap().is_empty());
    }

    #[test]
    fn json_forms_are_hex() {
        let root = MerkleRoot::new([0xabu8; 32]);
        let js = serde_json::to_string(&root).unwrap();
        assert_eq!(js, format!("\"0x{}\"", "ab".repeat(32)));
        let back: MerkleRoot = serde_json::from_str(&js).unwrap();
        assert_eq!(back, root);

        let id = Identity::new([7u8; 20]);
        let js = serde_json::to_string(&id).unwrap();
        assert_eq!(js, format!("\"0x{}\"", "07".repeat(20)));
    }
}
