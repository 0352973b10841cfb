//! Membership soundness and completeness over random identity sets.
//!
//! For every non-empty set, each member's generated path verifies and every
//! non-member fails with any path drawn from the tree.

use std::collections::BTreeSet;

use mintgate_core::{AuthPath, Identity};
use mintgate_merkle::{
    verify, Blake3Hasher, Keccak256Hasher, LeafOrder, NodeHasher, WhitelistTree,
};
use proptest::collection::btree_set;
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng as _, SeedableRng};

/// Two disjoint sets: `n` members and `m` outsiders.
fn disjoint_sets(seed: u64, n: usize, m: usize) -> (Vec<Identity>, Vec<Identity>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut all = BTreeSet::new();
    while all.len() < n + m {
        all.insert(Identity::new(rng.random::<[u8; 20]>()));
    }
    let mut all: Vec<Identity> = all.into_iter().collect();
    // Shuffle-free split: members from the front of a random-keyed order.
    let outsiders = all.split_off(n);
    (all, outsiders)
}

fn check_set<H: NodeHasher>(members: &[Identity], outsiders: &[Identity]) {
    let tree = WhitelistTree::<H>::build(members).expect("non-empty set");
    let root = tree.root();
    let bound = (members.len() as f64).log2().ceil() as usize;

    let mut some_path = AuthPath::default();
    for id in members {
        let path = tree.prove(id).expect("member").into_path();
        assert!(path.len() <= bound, "path longer than ceil(log2 n)");
        assert!(verify::<H>(&root, id, &path), "member {id} rejected");
        some_path = path;
    }

    for id in outsiders {
        assert!(tree.prove(id).is_err());
        assert!(!verify::<H>(&root, id, &some_path), "outsider {id} accepted");
        assert!(!verify::<H>(&root, id, &AuthPath::default()));
    }
}

#[test]
fn members_verify_outsiders_fail_at_fixed_sizes() {
    for (seed, n) in [(1u64, 1usize), (2, 2), (3, 3), (10, 10), (1000, 1000)] {
        let (members, outsiders) = disjoint_sets(seed, n, 16);
        check_set::<Keccak256Hasher>(&members, &outsiders);
    }
}

#[test]
fn blake3_trees_behave_the_same() {
    let (members, outsiders) = disjoint_sets(7, 33, 8);
    check_set::<Blake3Hasher>(&members, &outsiders);
}

#[test]
fn outsider_cannot_reuse_member_proofs() {
    let (members, outsiders) = disjoint_sets(99, 10, 1);
    let tree = WhitelistTree::<Keccak256Hasher>::build(&members).unwrap();
    let root = tree.root();
    for id in &members {
        let stolen = tree.prove(id).unwrap().into_path();
        assert!(!verify::<Keccak256Hasher>(&root, &outsiders[0], &stolen));
    }
}

fn arb_identity() -> impl Strategy<Value = Identity> {
    any::<[u8; 20]>().prop_map(Identity::new)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        .. ProptestConfig::default()
    })]

    #[test]
    fn random_sets_prove_and_verify(
        members in btree_set(arb_identity(), 1..=64),
        outsider in arb_identity(),
    ) {
        prop_assume!(!members.contains(&outsider));
        let members: Vec<Identity> = members.into_iter().collect();
        let tree = WhitelistTree::<Keccak256Hasher>::build(&members).unwrap();
        let root = tree.root();
        for id in &members {
            let path = tree.prove(id).unwrap().into_path();
            prop_assert!(verify::<Keccak256Hasher>(&root, id, &path));
            prop_assert!(!verify::<Keccak256Hasher>(&root, &outsider, &path));
        }
    }

    #[test]
    fn sorted_root_is_a_function_of_the_set(
        members in btree_set(arb_identity(), 1..=40),
        rotate in 0usize..40,
    ) {
        let forward: Vec<Identity> = members.iter().copied().collect();
        let mut rotated = forward.clone();
        let k = rotate % rotated.len();
        rotated.rotate_left(k);
        rotated.reverse();

        let a = WhitelistTree::<Keccak256Hasher>::build(&forward).unwrap().root();
        let b = WhitelistTree::<Keccak256Hasher>::build(&rotated).unwrap().root();
        prop_assert_eq!(a, b);

        // Insertion order still yields a verifiable tree.
        let ins = WhitelistTree::<Keccak256Hasher>::build_with_order(&rotated, LeafOrder::Insertion).unwrap();
        for id in &rotated {
            let path = ins.prove(id).unwrap().into_path();
            prop_assert!(verify::<Keccak256Hasher>(&ins.root(), id, &path));
        }
    }
}
