//! A shared sale under contention never overshoots its bounds.

use std::sync::Arc;
use std::thread;

use mintgate_admission::{AdmissionError, Ledger, MemoryLedger, Phase, Sale, SaleConfig};
use mintgate_core::Identity;
use mintgate_merkle::WhitelistTree;
use proptest::prelude::*;

const PRICE: u128 = 1_000;

#[test]
fn supply_is_never_overshot() {
    let owner = Identity::new([0xaa; 20]);
    let mut cfg = SaleConfig::with_admin(owner);
    cfg.max_supply = 300;
    cfg.reserved_cap = 50;
    cfg.public_enabled = true;
    cfg.price_wei = PRICE;
    let sale = Arc::new(Sale::new(&cfg, MemoryLedger::new()).unwrap());

    let handles: Vec<_> = (0..8u8)
        .map(|t| {
            let sale = Arc::clone(&sale);
            thread::spawn(move || {
                let mut accepted = 0u64;
                for i in 0..40u8 {
                    let buyer = Identity::new([t.wrapping_mul(41).wrapping_add(i); 20]);
                    match sale.mint_public(buyer, 3, PRICE * 3) {
                        Ok(r) => accepted += r.quantity,
                        Err(
                            AdmissionError::SupplyExceeded { .. }
                            | AdmissionError::PerAddressCapExceeded { .. },
                        ) => {}
                        Err(e) => panic!("unexpected rejection: {e}"),
                    }
                    if t == 0 && i % 8 == 0 {
                        let _ = sale.mint_reserved(owner, 5);
                    }
                }
                accepted
            })
        })
        .collect();

    let public: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(sale.total_issued() <= 300);
    assert!(sale.reserved_issued() <= 50);
    assert_eq!(sale.total_issued(), public + sale.reserved_issued());
    assert_eq!(sale.ledger_total_issued(), sale.total_issued());
    assert_eq!(sale.proceeds(), u128::from(public) * PRICE);
}

#[test]
fn per_address_cap_holds_under_contention() {
    let owner = Identity::new([0xaa; 20]);
    let member = Identity::new([0x01; 20]);
    let tree: WhitelistTree = WhitelistTree::build(&[member, Identity::new([0x02; 20])]).unwrap();
    let proof = tree.prove(&member).unwrap().into_path();

    let mut cfg = SaleConfig::with_admin(owner);
    cfg.presale_enabled = true;
    cfg.price_wei = PRICE;
    cfg.root = Some(tree.root());
    let sale = Arc::new(Sale::new(&cfg, MemoryLedger::new()).unwrap());

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let sale = Arc::clone(&sale);
            let proof = proof.clone();
            thread::spawn(move || sale.mint_presale(member, 1, PRICE, proof).is_ok())
        })
        .collect();
    let ok = handles.into_iter().map(|h| h.join().unwrap()).filter(|b| *b).count();
    assert_eq!(ok, 2);
    assert_eq!(sale.minted_by(&member), 2);
    assert_eq!(sale.with_ledger(|l| l.balance_of(&member)), 2);
}

#[derive(Clone, Debug)]
enum Op {
    Reserved(u64),
    Public(u8, u64, bool),
    Pause(bool),
    TogglePublic(bool),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..30).prop_map(Op::Reserved),
        (0u8..6, 0u64..6, any::<bool>()).prop_map(|(w, q, paid)| Op::Public(w, q, paid)),
        any::<bool>().prop_map(Op::Pause),
        any::<bool>().prop_map(Op::TogglePublic),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn counters_respect_bounds_for_any_sequence(ops in proptest::collection::vec(arb_op(), 1..80)) {
        let owner = Identity::new([0xaa; 20]);
        let mut cfg = SaleConfig::with_admin(owner);
        cfg.max_supply = 60;
        cfg.reserved_cap = 25;
        cfg.public_cap = 7;
        cfg.price_wei = PRICE;
        let sale = Sale::new(&cfg, MemoryLedger::new()).unwrap();

        let buyers: Vec<Identity> = (0u8..6).map(|w| Identity::new([w; 20])).collect();
        for op in ops {
            let before = sale.status();
            let minted_before: Vec<u64> = buyers.iter().map(|b| sale.minted_by(b)).collect();
            let res = match op {
                Op::Reserved(q) => sale.mint_reserved(owner, q).map(|_| ()),
                Op::Public(w, q, paid) => {
                    let pay = if paid { PRICE * u128::from(q) } else { 0 };
                    sale.mint_public(Identity::new([w; 20]), q, pay).map(|_| ())
                }
                Op::Pause(p) => { sale.set_paused(&owner, p).unwrap(); continue; }
                Op::TogglePublic(on) => { sale.set_phase(&owner, Phase::Public, on).unwrap(); continue; }
            };
            let minted_after: Vec<u64> = buyers.iter().map(|b| sale.minted_by(b)).collect();
            if res.is_err() {
                prop_assert_eq!(sale.status(), before);
                prop_assert_eq!(&minted_after, &minted_before);
            }
            prop_assert!(sale.total_issued() <= 60);
            prop_assert!(sale.reserved_issued() <= 25);
            prop_assert!(minted_after.iter().all(|&m| m <= 7));
            prop_assert_eq!(sale.ledger_total_issued(), sale.total_issued());
        }
    }
}
