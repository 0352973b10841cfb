//! `0x`-prefixed hex text for 32-byte digests.
//!
//! Use with `#[serde(with = "mintgate_core::hex_serde::digest")]` on a
//! `[u8; 32]` field, or `digest_vec` on a `Vec<[u8; 32]>`. Decoding accepts
//! the prefix in either case, or no prefix at all.

use crate::Digest;
use thiserror::Error;

/// Rejected digest text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseDigestError {
    /// Decoded to the wrong number of bytes.
    #[error("expected 32-byte digest, got {0} bytes")]
    Length(usize),
    /// Not hex.
    #[error("invalid digest hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Drop a leading `0x`/`0X` if present.
#[inline]
#[must_use]
pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parse one digest from hex text.
pub fn parse_digest(s: &str) -> Result<Digest, ParseDigestError> {
    let raw = hex::decode(strip_0x(s.trim()))?;
    let len = raw.len();
    raw.try_into().map_err(|_| ParseDigestError::Length(len))
}

/// Render one digest as `0x…`.
#[inline]
#[must_use]
pub fn format_digest(d: &Digest) -> String {
    format!("0x{}", hex::encode(d))
}

/// Serde adapter for a single digest.
pub mod digest {
    use super::{format_digest, parse_digest};
    use crate::Digest;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `0x…`.
    pub fn serialize<S: Serializer>(d: &Digest, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_digest(d))
    }

    /// Deserialize from hex text.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Digest, D::Error> {
        let s = String::deserialize(d)?;
        parse_digest(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for a list of digests.
pub mod digest_vec {
    use super::{format_digest, parse_digest};
    use crate::Digest;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a list of `0x…` strings.
    pub fn serialize<S: Serializer>(v: &[Digest], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(v.len()))?;
        for d in v {
            seq.serialize_element(&format_digest(d))?;
        }
        seq.end()
    }

    /// Deserialize from a list of hex strings.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Digest>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.iter()
            .map(|s| parse_digest(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_prefix_variants() {
        let want = [0x11u8; 32];
        let bare = "11".repeat(32);
        assert_eq!(parse_digest(&bare).unwrap(), want);
        assert_eq!(parse_digest(&format!("0x{bare}")).unwrap(), want);
        assert_eq!(parse_digest(&format!("0X{bare}")).unwrap(), want);
    }

    #[test]
    fn parse_rejects_short() {
        assert_eq!(parse_digest("0xabcd"), Err(ParseDigestError::Length(2)));
        assert!(matches!(parse_digest("0xnothex"), Err(ParseDigestError::Hex(_))));
        assert_eq!(
            parse_digest("abc"),
            Err(ParseDigestError::Hex(hex::FromHexError::OddLength))
        );
    }
}
