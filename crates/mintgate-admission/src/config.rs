//! Sale parameters loaded from TOML.
//!
//! ```toml
//! admin = "0x1111111111111111111111111111111111111111"
//! max_supply = 5000
//! reserved_cap = 250
//! presale_cap = 2
//! public_cap = 10
//! price_wei = "80000000000000000"
//! presale_enabled = false
//! public_enabled = false
//! paused = false
//! # root = "0x…"   (optional initial whitelist root)
//! ```
//!
//! Every field except `admin` has a default. `price_wei` is a decimal string
//! because TOML integers stop at 64 bits; a bare integer is accepted too.

use std::path::{Path, PathBuf};

use mintgate_core::{Identity, MerkleRoot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default global supply.
pub const DEFAULT_MAX_SUPPLY: u64 = 5000;
/// Default reserved allocation.
pub const DEFAULT_RESERVED_CAP: u64 = 250;
/// Default per-address presale cap.
pub const DEFAULT_PRESALE_CAP: u64 = 2;
/// Default per-address public cap.
pub const DEFAULT_PUBLIC_CAP: u64 = 10;
/// Default unit price: 0.08 ether in wei.
pub const DEFAULT_PRICE_WEI: u128 = 80_000_000_000_000_000;

/// Failures loading or validating a [`SaleConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("read config {path}: {source}")]
    Io {
        /// Path attempted.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// TOML syntax or schema error.
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Reserved allocation larger than total supply.
    #[error("reserved_cap {reserved_cap} exceeds max_supply {max_supply}")]
    ReservedExceedsSupply {
        /// Configured reserved cap.
        reserved_cap: u64,
        /// Configured supply.
        max_supply: u64,
    },
}

/// Initial parameters of a sale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaleConfig {
    /// Administrator identity.
    pub admin: Identity,
    /// Global supply bound.
    #[serde(default = "default_max_supply")]
    pub max_supply: u64,
    /// Reserved allocation bound.
    #[serde(default = "default_reserved_cap")]
    pub reserved_cap: u64,
    /// Per-address cap while minting in presale.
    #[serde(default = "default_presale_cap")]
    pub presale_cap: u64,
    /// Per-address cap while minting in public.
    #[serde(default = "default_public_cap")]
    pub public_cap: u64,
    /// Unit price in wei.
    #[serde(default = "default_price_wei", with = "wei")]
    pub price_wei: u128,
    /// Presale phase open at start.
    #[serde(default)]
    pub presale_enabled: bool,
    /// Public phase open at start.
    #[serde(default)]
    pub public_enabled: bool,
    /// Sale paused at start.
    #[serde(default)]
    pub paused: bool,
    /// Whitelist root in force at start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<MerkleRoot>,
}

const fn default_max_supply() -> u64 {
    DEFAULT_MAX_SUPPLY
}
const fn default_reserved_cap() -> u64 {
    DEFAULT_RESERVED_CAP
}
const fn default_presale_cap() -> u64 {
    DEFAULT_PRESALE_CAP
}
const fn default_public_cap() -> u64 {
    DEFAULT_PUBLIC_CAP
}
const fn default_price_wei() -> u128 {
    DEFAULT_PRICE_WEI
}

impl SaleConfig {
    /// Defaults for everything but the administrator.
    #[must_use]
    pub const fn with_admin(admin: Identity) -> Self {
        Self {
            admin,
            max_supply: DEFAULT_MAX_SUPPLY,
            reserved_cap: DEFAULT_RESERVED_CAP,
            presale_cap: DEFAULT_PRESALE_CAP,
            public_cap: DEFAULT_PUBLIC_CAP,
            price_wei: DEFAULT_PRICE_WEI,
            presale_enabled: false,
            public_enabled: false,
            paused: false,
            root: None,
        }
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p).map_err(|source| ConfigError::Io {
            path: p.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    /// Cross-field checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reserved_cap > self.max_supply {
            return Err(ConfigError::ReservedExceedsSupply {
                reserved_cap: self.reserved_cap,
                max_supply: self.max_supply,
            });
        }
        Ok(())
    }
}

/// `u128` as a decimal string; bare integers accepted on input.
mod wei {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        d.deserialize_any(WeiVisitor)
    }

    struct WeiVisitor;

    impl Visitor<'_> for WeiVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative wei amount as a decimal string or integer")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            let digits: String = v.chars().filter(|c| *c != '_').collect();
            digits
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(u128::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg = SaleConfig::from_toml_str(&format!("admin = \"{ADMIN}\"")).unwrap();
        assert_eq!(cfg, SaleConfig::with_admin(ADMIN.parse().unwrap()));
        assert_eq!(cfg.price_wei, 80_000_000_000_000_000);
        assert!(!cfg.presale_enabled && !cfg.public_enabled && !cfg.paused);
        assert!(cfg.root.is_none());
    }

    #[test]
    fn full_file_parses() {
        let src = format!(
            r#"
            admin = "{ADMIN}"
            max_supply = 300
            reserved_cap = 50
            presale_cap = 3
            public_cap = 7
            price_wei = "1_000_000_000_000_000_000_000"
            presale_enabled = true
            paused = true
            root = "0x{}"
            "#,
            "ab".repeat(32)
        );
        let cfg = SaleConfig::from_toml_str(&src).unwrap();
        assert_eq!(cfg.max_supply, 300);
        assert_eq!(cfg.reserved_cap, 50);
        assert_eq!(cfg.presale_cap, 3);
        assert_eq!(cfg.public_cap, 7);
        assert_eq!(cfg.price_wei, 1_000_000_000_000_000_000_000);
        assert!(cfg.presale_enabled && cfg.paused && !cfg.public_enabled);
        assert_eq!(cfg.root, Some(MerkleRoot::new([0xab; 32])));
    }

    #[test]
    fn integer_price_accepted() {
        let cfg =
            SaleConfig::from_toml_str(&format!("admin = \"{ADMIN}\"\nprice_wei = 42")).unwrap();
        assert_eq!(cfg.price_wei, 42);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            SaleConfig::from_toml_str("max_supply = 10"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SaleConfig::from_toml_str("admin = \"0x1234\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SaleConfig::from_toml_str(&format!("admin = \"{ADMIN}\"\nprice_wei = \"-1\"")),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SaleConfig::from_toml_str(&format!(
                "admin = \"{ADMIN}\"\nmax_supply = 10\nreserved_cap = 11"
            )),
            Err(ConfigError::ReservedExceedsSupply { reserved_cap: 11, max_supply: 10 })
        ));
    }

    #[test]
    fn toml_write_read_keeps_price_exact() {
        let mut cfg = SaleConfig::with_admin(ADMIN.parse().unwrap());
        cfg.price_wei = u128::MAX;
        let text = toml::to_string(&cfg).unwrap();
        assert!(text.contains(&format!("\"{}\"", u128::MAX)), "{text}");
        assert_eq!(SaleConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SaleConfig::load("/nonexistent/mintgate/sale.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }), "{err}");
    }
}
