//! Stateless membership verification.
//!
//! The verifier depends only on the hash primitive and the trusted root. It is
//! total: malformed or forged input yields `false`, never an error or panic.

use mintgate_core::{AuthPath, Digest, Identity, MerkleRoot};
use mintgate_crypto::{Blake3Hasher, HasherKind, Keccak256Hasher, NodeHasher};

use crate::tree::leaf_hash;

/// Recompute the root from `identity` and `path`; `true` iff it equals `root`.
#[must_use]
pub fn verify<H: NodeHasher>(root: &MerkleRoot, identity: &Identity, path: &AuthPath) -> bool {
    verify_leaf::<H>(root, leaf_hash::<H>(identity), path.as_slice())
}

/// Same as [`verify`] for a pre-hashed leaf.
#[must_use]
pub fn verify_leaf<H: NodeHasher>(root: &MerkleRoot, leaf: Digest, siblings: &[Digest]) -> bool {
    let folded = siblings
        .iter()
        .fold(leaf, |acc, sib| H::hash_sorted_pair(&acc, sib));
    folded == *root.as_bytes()
}

/// [`verify`] with the hasher picked at runtime (e.g. from a manifest).
#[must_use]
pub fn verify_with(
    kind: HasherKind,
    root: &MerkleRoot,
    identity: &Identity,
    path: &AuthPath,
) -> bool {
    match kind {
        HasherKind::Keccak256 => verify::<Keccak256Hasher>(root, identity, path),
        HasherKind::Blake3 => verify::<Blake3Hasher>(root, identity, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WhitelistTree;

    fn set() -> Vec<Identity> {
        (0..6u8).map(|i| Identity::new([i.wrapping_mul(37); 20])).collect()
    }

    #[test]
    fn accepts_members_rejects_swapped_identity() {
        let ids = set();
        let tree = WhitelistTree::<Keccak256Hasher>::build(&ids).unwrap();
        let root = tree.root();
        let path = tree.prove(&ids[2]).unwrap().into_path();
        assert!(verify::<Keccak256Hasher>(&root, &ids[2], &path));
        // Someone else's proof does not carry over.
        assert!(!verify::<Keccak256Hasher>(&root, &ids[3], &path));
        assert!(!verify::<Keccak256Hasher>(
            &root,
            &Identity::new([0xff; 20]),
            &path
        ));
    }

    #[test]
    fn tampered_path_fails() {
        let ids = set();
        let tree = WhitelistTree::<Keccak256Hasher>::build(&ids).unwrap();
        let mut sibs = tree.prove(&ids[0]).unwrap().into_path().into_inner();
        sibs[0][0] ^= 1;
        assert!(!verify::<Keccak256Hasher>(
            &tree.root(),
            &ids[0],
            &AuthPath::new(sibs.clone())
        ));
        sibs.truncate(0);
        assert!(!verify::<Keccak256Hasher>(
            &tree.root(),
            &ids[0],
            &AuthPath::new(sibs)
        ));
    }

    #[test]
    fn hasher_mismatch_fails() {
        let ids = set();
        let tree = WhitelistTree::<Blake3Hasher>::build(&ids).unwrap();
        let path = tree.prove(&ids[1]).unwrap().into_path();
        assert!(verify_with(HasherKind::Blake3, &tree.root(), &ids[1], &path));
        assert!(!verify_with(
            HasherKind::Keccak256,
            &tree.root(),
            &ids[1],
            &path
        ));
    }

    #[test]
    fn verify_is_repeatable() {
        let ids = set();
        let tree = WhitelistTree::<Keccak256Hasher>::build(&ids).unwrap();
        let root = tree.root();
        let path = tree.prove(&ids[4]).unwrap().into_path();
        let first = verify::<Keccak256Hasher>(&root, &ids[4], &path);
        let second = verify::<Keccak256Hasher>(&root, &ids[4], &path);
        assert!(first && second);
        assert_eq!(root, tree.root());
    }
}
