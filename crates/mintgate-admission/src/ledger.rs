//! Issuance port.
//!
//! The sale decides *whether* units may be issued; a [`Ledger`] performs the
//! issuance and tracks ownership. [`MemoryLedger`] is the in-process adapter
//! used by the CLI simulation and the tests.

use std::collections::{BTreeMap, HashMap};

use mintgate_core::Identity;
use thiserror::Error;

/// Contiguous id range issued by one `mint_to` call (inclusive both ends).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssuedRange {
    /// First id issued.
    pub first_id: u64,
    /// Last id issued.
    pub last_id: u64,
}

impl IssuedRange {
    /// Number of ids in the range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.last_id - self.first_id + 1
    }
}

/// Errors surfaced by a ledger backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Quantity of zero is never issued.
    #[error("cannot issue zero units")]
    ZeroQuantity,
    /// Id space exhausted.
    #[error("token id space exhausted")]
    IdOverflow,
    /// Backend-specific refusal.
    #[error("ledger rejected issuance: {0}")]
    Rejected(String),
}

/// Destination for accepted mints.
pub trait Ledger {
    /// Issue `quantity` new units to `to`, returning the ids assigned.
    fn mint_to(&mut self, to: &Identity, quantity: u64) -> Result<IssuedRange, LedgerError>;

    /// Units currently owned by `owner`.
    fn balance_of(&self, owner: &Identity) -> u64;

    /// Units issued over the ledger's lifetime.
    fn total_issued(&self) -> u64;
}

/// In-memory ledger with sequential ids starting at 1.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    next_id: u64,
    balances: HashMap<Identity, u64>,
    // first id of each issued range -> owner
    ranges: BTreeMap<u64, Identity>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            balances: HashMap::new(),
            ranges: BTreeMap::new(),
        }
    }

    /// Owner of token `id`, if issued.
    #[must_use]
    pub fn owner_of(&self, id: u64) -> Option<Identity> {
        if id == 0 || id >= self.next_id {
            return None;
        }
        self.ranges.range(..=id).next_back().map(|(_, owner)| *owner)
    }

    /// Number of distinct holders.
    #[must_use]
    pub fn holders(&self) -> usize {
        self.balances.len()
    }
}

impl Ledger for MemoryLedger {
    fn mint_to(&mut self, to: &Identity, quantity: u64) -> Result<IssuedRange, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::ZeroQuantity);
        }
        let first_id = self.next_id;
        let last_id = first_id
            .checked_add(quantity - 1)
            .ok_or(LedgerError::IdOverflow)?;
        let next_id = last_id.checked_add(1).ok_or(LedgerError::IdOverflow)?;

        self.next_id = next_id;
        self.ranges.insert(first_id, *to);
        *self.balances.entry(*to).or_insert(0) += quantity;
        Ok(IssuedRange { first_id, last_id })
    }

    fn balance_of(&self, owner: &Identity) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn total_issued(&self) -> u64 {
        self.next_id - 1
    }
}
