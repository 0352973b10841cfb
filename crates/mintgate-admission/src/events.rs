//! Audit log entries appended by the sale.

use mintgate_core::{Identity, MerkleRoot};
use serde::{Deserialize, Serialize};

use crate::{Phase, Tier};

/// One state-changing action, in the order it was applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SaleEvent {
    /// Whitelist root replaced; proofs against `old` stop verifying.
    RootRotated {
        /// Previous root, if one was set.
        old: Option<MerkleRoot>,
        /// Root now in force.
        new: MerkleRoot,
    },
    /// Phase switched on or off.
    PhaseToggled {
        /// Which phase.
        phase: Phase,
        /// New state.
        enabled: bool,
    },
    /// Pause switched on or off.
    PauseToggled {
        /// New state.
        paused: bool,
    },
    /// Unit price changed.
    PriceChanged {
        /// Previous price in wei.
        #[serde(with = "wei_str")]
        old: u128,
        /// New price in wei.
        #[serde(with = "wei_str")]
        new: u128,
    },
    /// A cap changed.
    CapChanged {
        /// Which cap.
        tier: Tier,
        /// Previous value.
        old: u64,
        /// New value.
        new: u64,
    },
    /// Units issued.
    Minted {
        /// Path taken.
        tier: Tier,
        /// Recipient.
        requester: Identity,
        /// Units issued.
        quantity: u64,
        /// First id.
        first_id: u64,
        /// Last id.
        last_id: u64,
    },
    /// Proceeds paid out to the administrator.
    Withdrawn {
        /// Recipient.
        to: Identity,
        /// Wei paid out.
        #[serde(with = "wei_str")]
        amount: u128,
    },
}

// JSON numbers lose precision past 2^53 in most consumers.
mod wei_str {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}
