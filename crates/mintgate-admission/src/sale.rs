//! The admission state machine.
//!
//! Everything mutable lives in one state struct behind a single
//! `parking_lot::Mutex`, ledger included, so the check, the counter updates
//! and the issuance call form one critical section.
//!
//! Check order (first failure wins):
//!
//! 1. paused
//! 2. reserved: caller is admin; presale/public: phase enabled
//! 3. quantity non-zero
//! 4. presale: proof verifies against the current root
//! 5. presale/public: per-address cap
//! 6. reserved: reserved cap; presale/public: payment
//! 7. global supply

use std::collections::HashMap;
use std::marker::PhantomData;

use mintgate_core::{AuthPath, Identity, MerkleRoot};
use mintgate_crypto::{Keccak256Hasher, NodeHasher};
use mintgate_merkle::verify;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SaleConfig};
use crate::events::SaleEvent;
use crate::ledger::Ledger;
use crate::{AdmissionError, Phase, Tier};

/// Pause and phase switches. Independent; every combination is legal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PhaseFlags {
    /// Blocks every mint path.
    pub paused: bool,
    /// Presale open.
    pub presale_enabled: bool,
    /// Public sale open.
    pub public_enabled: bool,
}

impl PhaseFlags {
    /// State of one phase switch.
    #[must_use]
    pub const fn is_enabled(&self, phase: Phase) -> bool {
        match phase {
            Phase::Presale => self.presale_enabled,
            Phase::Public => self.public_enabled,
        }
    }
}

/// Supply bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Caps {
    /// Global supply.
    pub max_supply: u64,
    /// Reserved allocation.
    pub reserved: u64,
    /// Per-address bound checked on presale mints.
    pub presale: u64,
    /// Per-address bound checked on public mints.
    pub public: u64,
}

impl Caps {
    /// Per-address bound for `phase`.
    #[must_use]
    pub const fn per_address(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Presale => self.presale,
            Phase::Public => self.public,
        }
    }
}

/// Which path a request takes; presale carries the claimant's proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MintKind {
    /// Administrator allocation.
    Reserved,
    /// Whitelist-gated mint.
    Presale {
        /// Sibling path from the requester's leaf to the current root.
        proof: AuthPath,
    },
    /// Open mint.
    Public,
}

impl MintKind {
    /// Tier this request is counted against.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        match self {
            Self::Reserved => Tier::Reserved,
            Self::Presale { .. } => Tier::Presale,
            Self::Public => Tier::Public,
        }
    }
}

/// One mint attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintRequest {
    /// Caller and recipient.
    pub requester: Identity,
    /// Units requested.
    pub quantity: u64,
    /// Wei attached.
    pub payment: u128,
    /// Path and its credentials.
    pub kind: MintKind,
}

impl MintRequest {
    /// Reserved request (no payment).
    #[must_use]
    pub const fn reserved(requester: Identity, quantity: u64) -> Self {
        Self {
            requester,
            quantity,
            payment: 0,
            kind: MintKind::Reserved,
        }
    }

    /// Presale request with the requester's proof.
    #[must_use]
    pub const fn presale(requester: Identity, quantity: u64, payment: u128, proof: AuthPath) -> Self {
        Self {
            requester,
            quantity,
            payment,
            kind: MintKind::Presale { proof },
        }
    }

    /// Public request.
    #[must_use]
    pub const fn public(requester: Identity, quantity: u64, payment: u128) -> Self {
        Self {
            requester,
            quantity,
            payment,
            kind: MintKind::Public,
        }
    }
}

/// Result of an accepted mint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MintReceipt {
    /// Path taken.
    pub kind: Tier,
    /// Recipient.
    pub requester: Identity,
    /// Units issued.
    pub quantity: u64,
    /// First id issued.
    pub first_id: u64,
    /// Last id issued.
    pub last_id: u64,
    /// Global issued count after this mint.
    pub total_issued: u64,
}

/// Point-in-time view of the sale counters and parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SaleStatus {
    /// Administrator.
    pub admin: Identity,
    /// Switches.
    pub flags: PhaseFlags,
    /// Bounds.
    pub caps: Caps,
    /// Unit price in wei.
    pub price_wei: u128,
    /// Root in force.
    pub root: Option<MerkleRoot>,
    /// Reserved units issued.
    pub reserved_issued: u64,
    /// All units issued.
    pub total_issued: u64,
    /// Distinct requesters with a non-zero count.
    pub minters: usize,
    /// Unwithdrawn proceeds in wei.
    pub proceeds: u128,
}

struct SaleState<L> {
    admin: Identity,
    flags: PhaseFlags,
    caps: Caps,
    price: u128,
    root: Option<MerkleRoot>,
    reserved_issued: u64,
    total_issued: u64,
    minted_by: HashMap<Identity, u64>,
    proceeds: u128,
    events: Vec<SaleEvent>,
    ledger: L,
}

impl<L> SaleState<L> {
    fn require_admin(&self, caller: &Identity) -> Result<(), AdmissionError> {
        if *caller == self.admin {
            Ok(())
        } else {
            debug!(%caller, "administrative call rejected");
            Err(AdmissionError::Unauthorized)
        }
    }

    fn minted(&self, who: &Identity) -> u64 {
        self.minted_by.get(who).copied().unwrap_or(0)
    }
}

/// `current + add <= cap`, with overflow counted as exceeding.
fn fits(current: u64, add: u64, cap: u64) -> bool {
    matches!(current.checked_add(add), Some(n) if n <= cap)
}

/// Merkle-whitelisted tiered mint sale over ledger `L`, verifying proofs
/// with hasher `H`.
pub struct Sale<L, H = Keccak256Hasher> {
    state: Mutex<SaleState<L>>,
    _hasher: PhantomData<fn() -> H>,
}

impl<L: Ledger> Sale<L, Keccak256Hasher> {
    /// Sale with Keccak-256 proofs.
    pub fn new(config: &SaleConfig, ledger: L) -> Result<Self, ConfigError> {
        Self::with_hasher(config, ledger)
    }
}

impl<L: Ledger, H: NodeHasher> Sale<L, H> {
    /// Sale whose whitelist was built with `H`.
    pub fn with_hasher(config: &SaleConfig, ledger: L) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = SaleState {
            admin: config.admin,
            flags: PhaseFlags {
                paused: config.paused,
                presale_enabled: config.presale_enabled,
                public_enabled: config.public_enabled,
            },
            caps: Caps {
                max_supply: config.max_supply,
                reserved: config.reserved_cap,
                presale: config.presale_cap,
                public: config.public_cap,
            },
            price: config.price_wei,
            root: config.root,
            reserved_issued: 0,
            total_issued: 0,
            minted_by: HashMap::new(),
            proceeds: 0,
            events: Vec::new(),
            ledger,
        };
        info!(
            admin = %config.admin,
            max_supply = config.max_supply,
            reserved_cap = config.reserved_cap,
            hasher = %H::KIND,
            "sale opened"
        );
        Ok(Self {
            state: Mutex::new(state),
            _hasher: PhantomData,
        })
    }

    /* ------------------------------ mint paths ------------------------------ */

    /// Evaluate and, if admitted, execute one request.
    pub fn submit(&self, req: MintRequest) -> Result<MintReceipt, AdmissionError> {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        let tier = req.kind.tier();

        if let Err(err) = Self::admit(st, &req) {
            debug!(%tier, requester = %req.requester, quantity = req.quantity, %err, "mint rejected");
            return Err(err);
        }

        let q = req.quantity;
        let prior_minted = st.minted_by.get(&req.requester).copied();
        let prior_total = st.total_issued;
        let prior_reserved = st.reserved_issued;
        let prior_proceeds = st.proceeds;

        // Bounds were checked in `admit`, so these cannot overflow.
        *st.minted_by.entry(req.requester).or_insert(0) += q;
        st.total_issued += q;
        if tier == Tier::Reserved {
            st.reserved_issued += q;
        }
        st.proceeds = st.proceeds.saturating_add(req.payment);

        match st.ledger.mint_to(&req.requester, q) {
            Ok(range) => {
                st.events.push(SaleEvent::Minted {
                    tier,
                    requester: req.requester,
                    quantity: q,
                    first_id: range.first_id,
                    last_id: range.last_id,
                });
                info!(
                    %tier,
                    requester = %req.requester,
                    quantity = q,
                    first_id = range.first_id,
                    last_id = range.last_id,
                    total_issued = st.total_issued,
                    "mint accepted"
                );
                Ok(MintReceipt {
                    kind: tier,
                    requester: req.requester,
                    quantity: q,
                    first_id: range.first_id,
                    last_id: range.last_id,
                    total_issued: st.total_issued,
                })
            }
            Err(err) => {
                match prior_minted {
                    Some(n) => {
                        st.minted_by.insert(req.requester, n);
                    }
                    None => {
                        st.minted_by.remove(&req.requester);
                    }
                }
                st.total_issued = prior_total;
                st.reserved_issued = prior_reserved;
                st.proceeds = prior_proceeds;
                warn!(%tier, requester = %req.requester, quantity = q, %err, "ledger refused; mint rolled back");
                Err(AdmissionError::LedgerIssuanceFailed(err))
            }
        }
    }

    /// Administrator allocation.
    pub fn mint_reserved(&self, caller: Identity, quantity: u64) -> Result<MintReceipt, AdmissionError> {
        self.submit(MintRequest::reserved(caller, quantity))
    }

    /// Whitelist-gated mint.
    pub fn mint_presale(
        &self,
        caller: Identity,
        quantity: u64,
        payment: u128,
        proof: AuthPath,
    ) -> Result<MintReceipt, AdmissionError> {
        self.submit(MintRequest::presale(caller, quantity, payment, proof))
    }

    /// Open mint.
    pub fn mint_public(
        &self,
        caller: Identity,
        quantity: u64,
        payment: u128,
    ) -> Result<MintReceipt, AdmissionError> {
        self.submit(MintRequest::public(caller, quantity, payment))
    }

    fn admit(st: &SaleState<L>, req: &MintRequest) -> Result<(), AdmissionError> {
        if st.flags.paused {
            return Err(AdmissionError::MintingPaused);
        }
        let q = req.quantity;

        match &req.kind {
            MintKind::Reserved => {
                st.require_admin(&req.requester)?;
                if q == 0 {
                    return Err(AdmissionError::ZeroQuantity);
                }
                if !fits(st.reserved_issued, q, st.caps.reserved) {
                    return Err(AdmissionError::ReservedCapExceeded {
                        issued: st.reserved_issued,
                        requested: q,
                        cap: st.caps.reserved,
                    });
                }
            }
            MintKind::Presale { proof } => {
                Self::admit_phase(st, req, Phase::Presale, Some(proof))?;
            }
            MintKind::Public => {
                Self::admit_phase(st, req, Phase::Public, None)?;
            }
        }

        if !fits(st.total_issued, q, st.caps.max_supply) {
            return Err(AdmissionError::SupplyExceeded {
                issued: st.total_issued,
                requested: q,
                max: st.caps.max_supply,
            });
        }
        Ok(())
    }

    fn admit_phase(
        st: &SaleState<L>,
        req: &MintRequest,
        phase: Phase,
        proof: Option<&AuthPath>,
    ) -> Result<(), AdmissionError> {
        if !st.flags.is_enabled(phase) {
            return Err(AdmissionError::PhaseNotEnabled(phase));
        }
        let q = req.quantity;
        if q == 0 {
            return Err(AdmissionError::ZeroQuantity);
        }
        if let Some(proof) = proof {
            let member = st
                .root
                .is_some_and(|root| verify::<H>(&root, &req.requester, proof));
            if !member {
                return Err(AdmissionError::NotWhitelisted);
            }
        }

        let minted = st.minted(&req.requester);
        let cap = st.caps.per_address(phase);
        if !fits(minted, q, cap) {
            return Err(AdmissionError::PerAddressCapExceeded {
                minted,
                requested: q,
                cap,
            });
        }

        match st.price.checked_mul(u128::from(q)) {
            Some(required) if req.payment >= required => Ok(()),
            required => Err(AdmissionError::InsufficientPayment {
                paid: req.payment,
                required: required.unwrap_or(u128::MAX),
            }),
        }
    }

    /* ----------------------------- administration ---------------------------- */

    /// Replace the whitelist root. Proofs against the old root stop verifying.
    pub fn set_root(&self, caller: &Identity, root: MerkleRoot) -> Result<(), AdmissionError> {
        let mut st = self.state.lock();
        st.require_admin(caller)?;
        let old = st.root.replace(root);
        st.events.push(SaleEvent::RootRotated { old, new: root });
        info!(old = ?old, new = %root, "whitelist root rotated");
        Ok(())
    }

    /// Switch a phase on or off.
    pub fn set_phase(&self, caller: &Identity, phase: Phase, enabled: bool) -> Result<(), AdmissionError> {
        let mut st = self.state.lock();
        st.require_admin(caller)?;
        match phase {
            Phase::Presale => st.flags.presale_enabled = enabled,
            Phase::Public => st.flags.public_enabled = enabled,
        }
        st.events.push(SaleEvent::PhaseToggled { phase, enabled });
        info!(%phase, enabled, "phase toggled");
        Ok(())
    }

    /// Pause or resume every mint path.
    pub fn set_paused(&self, caller: &Identity, paused: bool) -> Result<(), AdmissionError> {
        let mut st = self.state.lock();
        st.require_admin(caller)?;
        st.flags.paused = paused;
        st.events.push(SaleEvent::PauseToggled { paused });
        info!(paused, "pause toggled");
        Ok(())
    }

    /// Change the unit price.
    pub fn set_price(&self, caller: &Identity, price_wei: u128) -> Result<(), AdmissionError> {
        let mut st = self.state.lock();
        st.require_admin(caller)?;
        let old = std::mem::replace(&mut st.price, price_wei);
        st.events.push(SaleEvent::PriceChanged { old, new: price_wei });
        info!(old, new = price_wei, "price changed");
        Ok(())
    }

    /// Change a cap.
    ///
    /// The reserved cap may not drop below reserved units already issued nor
    /// rise above the global supply. Per-address caps accept any value; a
    /// lowered cap only blocks further mints.
    pub fn set_cap(&self, caller: &Identity, tier: Tier, cap: u64) -> Result<(), AdmissionError> {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        st.require_admin(caller)?;
        let slot = match tier {
            Tier::Reserved => {
                if cap < st.reserved_issued {
                    return Err(AdmissionError::InvalidCap {
                        tier,
                        requested: cap,
                        reason: "below reserved units already issued",
                    });
                }
                if cap > st.caps.max_supply {
                    return Err(AdmissionError::InvalidCap {
                        tier,
                        requested: cap,
                        reason: "above max supply",
                    });
                }
                &mut st.caps.reserved
            }
            Tier::Presale => &mut st.caps.presale,
            Tier::Public => &mut st.caps.public,
        };
        let old = std::mem::replace(slot, cap);
        st.events.push(SaleEvent::CapChanged { tier, old, new: cap });
        info!(%tier, old, new = cap, "cap changed");
        Ok(())
    }

    /// Pay out and zero the accumulated proceeds.
    pub fn withdraw(&self, caller: &Identity) -> Result<u128, AdmissionError> {
        let mut st = self.state.lock();
        st.require_admin(caller)?;
        let amount = std::mem::take(&mut st.proceeds);
        st.events.push(SaleEvent::Withdrawn { to: *caller, amount });
        info!(to = %caller, amount, "proceeds withdrawn");
        Ok(amount)
    }

    /* --------------------------------- queries -------------------------------- */

    /// `true` if `path` proves `identity` against the current root.
    #[must_use]
    pub fn is_whitelisted(&self, identity: &Identity, path: &AuthPath) -> bool {
        self.state
            .lock()
            .root
            .is_some_and(|root| verify::<H>(&root, identity, path))
    }

    /// Reserved units still issuable.
    #[must_use]
    pub fn remaining_reserved(&self) -> u64 {
        let st = self.state.lock();
        st.caps.reserved.saturating_sub(st.reserved_issued)
    }

    /// Units still issuable overall.
    #[must_use]
    pub fn remaining_supply(&self) -> u64 {
        let st = self.state.lock();
        st.caps.max_supply.saturating_sub(st.total_issued)
    }

    /// Current switches.
    #[must_use]
    pub fn phase_flags(&self) -> PhaseFlags {
        self.state.lock().flags
    }

    /// Cumulative units attributed to `identity` across all paths.
    #[must_use]
    pub fn minted_by(&self, identity: &Identity) -> u64 {
        self.state.lock().minted(identity)
    }

    /// All units issued.
    #[must_use]
    pub fn total_issued(&self) -> u64 {
        self.state.lock().total_issued
    }

    /// Reserved units issued.
    #[must_use]
    pub fn reserved_issued(&self) -> u64 {
        self.state.lock().reserved_issued
    }

    /// Unit price in wei.
    #[must_use]
    pub fn price(&self) -> u128 {
        self.state.lock().price
    }

    /// Root in force, if any.
    #[must_use]
    pub fn root(&self) -> Option<MerkleRoot> {
        self.state.lock().root
    }

    /// Current bounds.
    #[must_use]
    pub fn caps(&self) -> Caps {
        self.state.lock().caps
    }

    /// Unwithdrawn proceeds in wei.
    #[must_use]
    pub fn proceeds(&self) -> u128 {
        self.state.lock().proceeds
    }

    /// Administrator identity.
    #[must_use]
    pub fn admin(&self) -> Identity {
        self.state.lock().admin
    }

    /// Copy of the audit log.
    #[must_use]
    pub fn events(&self) -> Vec<SaleEvent> {
        self.state.lock().events.clone()
    }

    /// Counters and parameters in one consistent read.
    #[must_use]
    pub fn status(&self) -> SaleStatus {
        let st = self.state.lock();
        SaleStatus {
            admin: st.admin,
            flags: st.flags,
            caps: st.caps,
            price_wei: st.price,
            root: st.root,
            reserved_issued: st.reserved_issued,
            total_issued: st.total_issued,
            minters: st.minted_by.len(),
            proceeds: st.proceeds,
        }
    }

    /// Ledger balance of `owner`.
    #[must_use]
    pub fn balance_of(&self, owner: &Identity) -> u64 {
        self.state.lock().ledger.balance_of(owner)
    }

    /// Units the ledger reports as issued.
    #[must_use]
    pub fn ledger_total_issued(&self) -> u64 {
        self.state.lock().ledger.total_issued()
    }

    /// Run `f` against the ledger under the sale lock.
    ///
    /// The lock is not reentrant: calling back into this `Sale` from `f`
    /// deadlocks.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&L) -> R) -> R {
        f(&self.state.lock().ledger)
    }

    /// Consume the sale and hand back its ledger.
    #[must_use]
    pub fn into_ledger(self) -> L {
        self.state.into_inner().ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    fn admin() -> Identity {
        Identity::new([0xad; 20])
    }

    fn sale() -> Sale<MemoryLedger> {
        Sale::new(&SaleConfig::with_admin(admin()), MemoryLedger::new()).unwrap()
    }

    #[test]
    fn fits_handles_overflow() {
        assert!(fits(0, 5, 5));
        assert!(!fits(1, 5, 5));
        assert!(!fits(u64::MAX, 1, u64::MAX));
    }

    #[test]
    fn price_overflow_is_insufficient_payment() {
        let s = sale();
        s.set_phase(&admin(), Phase::Public, true).unwrap();
        s.set_price(&admin(), u128::MAX / 2).unwrap();
        let err = s.mint_public(Identity::new([1; 20]), 3, u128::MAX).unwrap_err();
        assert!(matches!(err, AdmissionError::InsufficientPayment { .. }), "{err}");
    }

    #[test]
    fn zero_price_accepts_zero_payment() {
        let s = sale();
        s.set_phase(&admin(), Phase::Public, true).unwrap();
        s.set_price(&admin(), 0).unwrap();
        let r = s.mint_public(Identity::new([1; 20]), 10, 0).unwrap();
        assert_eq!((r.first_id, r.last_id), (1, 10));
    }

    #[test]
    fn reserved_counts_toward_cumulative_minted_by() {
        let s = sale();
        s.set_phase(&admin(), Phase::Public, true).unwrap();
        s.mint_reserved(admin(), 9).unwrap();
        assert_eq!(s.minted_by(&admin()), 9);
        let price = s.price();
        s.mint_public(admin(), 1, price).unwrap();
        let err = s.mint_public(admin(), 1, price).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::PerAddressCapExceeded {
                minted: 10,
                requested: 1,
                cap: 10
            }
        );
    }

    #[test]
    fn reserved_cap_bounds() {
        let s = sale();
        assert!(matches!(
            s.set_cap(&admin(), Tier::Reserved, 5001),
            Err(AdmissionError::InvalidCap { .. })
        ));
        s.mint_reserved(admin(), 20).unwrap();
        assert!(matches!(
            s.set_cap(&admin(), Tier::Reserved, 19),
            Err(AdmissionError::InvalidCap { .. })
        ));
        s.set_cap(&admin(), Tier::Reserved, 20).unwrap();
        assert_eq!(s.remaining_reserved(), 0);
        assert_eq!(s.caps().reserved, 20);
    }

    #[test]
    fn status_matches_queries() {
        let s = sale();
        s.mint_reserved(admin(), 3).unwrap();
        let st = s.status();
        assert_eq!(st.total_issued, s.total_issued());
        assert_eq!(st.reserved_issued, 3);
        assert_eq!(st.minters, 1);
        assert_eq!(st.flags, PhaseFlags::default());
        assert_eq!(s.remaining_supply(), 4997);
        assert_eq!(s.into_ledger().owner_of(3), Some(admin()));
    }
}
