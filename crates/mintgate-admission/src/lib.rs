// crates/mintgate-admission/src/lib.rs

//! Tiered mint admission over a Merkle whitelist.
//!
//! A [`Sale`] decides whether a mint request may proceed and, if so, records
//! it and asks a [`Ledger`] to issue the units. Three request kinds exist:
//!
//! - **reserved**: administrator only, bounded by the reserved cap;
//! - **presale**: requires a whitelist proof against the current root;
//! - **public**: open to anyone while the public phase is enabled.
//!
//! Presale and public mints are bounded by a per-address cap and a price;
//! reserved mints by the reserved cap instead. Every path is bounded by the
//! global supply.
//! Checks run in a fixed order and the first failure is reported; a rejected
//! request never changes state. Acceptance, counter updates and the ledger
//! call happen under one lock, and a ledger failure rolls the counters back.
//!
//! Administrative changes (root rotation, phase and pause toggles, price,
//! caps, withdrawals) are admin-gated and appended to an audit log.

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

/// Sale configuration (TOML).
pub mod config;
/// Audit events.
pub mod events;
/// Issuance port and in-memory adapter.
pub mod ledger;
/// The admission state machine.
pub mod sale;

pub use config::{ConfigError, SaleConfig};
pub use events::SaleEvent;
pub use ledger::{IssuedRange, Ledger, LedgerError, MemoryLedger};
pub use sale::{Caps, MintKind, MintReceipt, MintRequest, PhaseFlags, Sale, SaleStatus};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A toggleable sale phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Whitelist-gated sale.
    Presale,
    /// Open sale.
    Public,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Presale => "presale",
            Self::Public => "public",
        })
    }
}

/// Issuance tier: which path a mint went through and which cap bounds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Administrator allocation.
    Reserved,
    /// Whitelist phase.
    Presale,
    /// Open phase.
    Public,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reserved => "reserved",
            Self::Presale => "presale",
            Self::Public => "public",
        })
    }
}

impl From<Phase> for Tier {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Presale => Self::Presale,
            Phase::Public => Self::Public,
        }
    }
}

/// Reasons a mint request or administrative call is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// Sale is paused; no mint path is open.
    #[error("minting is paused")]
    MintingPaused,
    /// Caller is not the administrator.
    #[error("caller is not the sale administrator")]
    Unauthorized,
    /// The requested phase is switched off.
    #[error("{0} phase is not enabled")]
    PhaseNotEnabled(Phase),
    /// Quantity must be at least one.
    #[error("mint quantity must be non-zero")]
    ZeroQuantity,
    /// Proof does not fold to the current root (or no root is set).
    #[error("requester is not whitelisted")]
    NotWhitelisted,
    /// Requester's cumulative mints would exceed the phase cap.
    #[error("per-address cap exceeded: minted {minted} + requested {requested} > cap {cap}")]
    PerAddressCapExceeded {
        /// Units already attributed to the requester.
        minted: u64,
        /// Units requested.
        requested: u64,
        /// Cap of the phase in force.
        cap: u64,
    },
    /// Reserved issuance would exceed the reserved allocation.
    #[error("reserved cap exceeded: issued {issued} + requested {requested} > cap {cap}")]
    ReservedCapExceeded {
        /// Reserved units issued so far.
        issued: u64,
        /// Units requested.
        requested: u64,
        /// Reserved allocation.
        cap: u64,
    },
    /// Issuance would exceed the global supply.
    #[error("supply exceeded: issued {issued} + requested {requested} > max {max}")]
    SupplyExceeded {
        /// Units issued so far.
        issued: u64,
        /// Units requested.
        requested: u64,
        /// Global maximum.
        max: u64,
    },
    /// Payment is below `price * quantity`.
    #[error("insufficient payment: paid {paid} wei, required {required} wei")]
    InsufficientPayment {
        /// Wei attached.
        paid: u128,
        /// Wei required (`u128::MAX` when the product overflows).
        required: u128,
    },
    /// The ledger refused; all counters were restored.
    #[error("ledger issuance failed: {0}")]
    LedgerIssuanceFailed(LedgerError),
    /// A cap change would put a counter above its bound.
    #[error("invalid {tier} cap {requested}: {reason}")]
    InvalidCap {
        /// Cap being changed.
        tier: Tier,
        /// Requested value.
        requested: u64,
        /// What it conflicts with.
        reason: &'static str,
    },
}

impl AdmissionError {
    /// Stable short name of the variant, for tallies and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MintingPaused => "minting_paused",
            Self::Unauthorized => "unauthorized",
            Self::PhaseNotEnabled(_) => "phase_not_enabled",
            Self::ZeroQuantity => "zero_quantity",
            Self::NotWhitelisted => "not_whitelisted",
            Self::PerAddressCapExceeded { .. } => "per_address_cap_exceeded",
            Self::ReservedCapExceeded { .. } => "reserved_cap_exceeded",
            Self::SupplyExceeded { .. } => "supply_exceeded",
            Self::InsufficientPayment { .. } => "insufficient_payment",
            Self::LedgerIssuanceFailed(_) => "ledger_issuance_failed",
            Self::InvalidCap { .. } => "invalid_cap",
        }
    }
}
