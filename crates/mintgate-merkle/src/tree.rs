//! Whitelist tree: leaves, retained levels and proof generation.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use mintgate_core::{hex_serde, AuthPath, Digest, Identity, MerkleRoot};
use mintgate_crypto::{Keccak256Hasher, NodeHasher};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::manifest::{ProofBundle, WhitelistManifest};
use crate::WhitelistError;

/// How leaves are arranged before the first reduction.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LeafOrder {
    /// Sort leaf digests lexicographically; root is independent of input order.
    #[default]
    Sorted,
    /// Keep caller order; permuting the input may change the root.
    Insertion,
}

impl fmt::Display for LeafOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sorted => "sorted",
            Self::Insertion => "insertion",
        })
    }
}

/// Leaf digest for an identity.
#[inline]
#[must_use]
pub fn leaf_hash<H: NodeHasher>(identity: &Identity) -> Digest {
    H::hash(identity.as_bytes())
}

/// One recorded level of an authentication path.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofStep {
    /// Tree height of the node being folded (0 = leaf level).
    pub height: u32,
    /// Sibling digest at that height.
    #[serde(with = "hex_serde::digest")]
    pub sibling: Digest,
}

/// Membership proof for one identity.
///
/// Levels where the node was carried up without a sibling are absent, so
/// `steps.len()` may be shorter than the tree depth.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembershipProof {
    /// Claimed member.
    pub identity: Identity,
    /// Position of the member's leaf in the ordered leaf level.
    pub leaf_index: usize,
    /// Siblings leaf → root with their heights.
    pub steps: Vec<ProofStep>,
}

impl MembershipProof {
    /// Wire form: sibling digests only.
    #[must_use]
    pub fn path(&self) -> AuthPath {
        self.steps.iter().map(|s| s.sibling).collect()
    }

    /// Consume into the wire form.
    #[must_use]
    pub fn into_path(self) -> AuthPath {
        self.steps.into_iter().map(|s| s.sibling).collect()
    }
}

/// Merkle tree over whitelisted identities.
///
/// Every level is retained (`levels[0]` = ordered leaves, last = `[root]`) so
/// proofs are served without rebuilding.
#[derive(Clone, Debug)]
pub struct WhitelistTree<H: NodeHasher = Keccak256Hasher> {
    levels: Vec<Vec<Digest>>,
    positions: HashMap<Digest, usize>,
    order: LeafOrder,
    _hasher: PhantomData<H>,
}

impl<H: NodeHasher> WhitelistTree<H> {
    /// Build with sorted leaves.
    pub fn build(identities: &[Identity]) -> Result<Self, WhitelistError> {
        Self::build_with_order(identities, LeafOrder::Sorted)
    }

    /// Build with an explicit leaf order.
    ///
    /// Duplicate identities are kept (each occupies a leaf); proofs for a
    /// duplicated identity use its first position.
    pub fn build_with_order(
        identities: &[Identity],
        order: LeafOrder,
    ) -> Result<Self, WhitelistError> {
        if identities.is_empty() {
            return Err(WhitelistError::EmptyWhitelist);
        }

        let mut leaves: Vec<Digest> = identities.iter().map(leaf_hash::<H>).collect();
        if order == LeafOrder::Sorted {
            leaves.sort_unstable();
        }

        let mut positions = HashMap::with_capacity(leaves.len());
        let mut duplicates = 0usize;
        for (i, leaf) in leaves.iter().enumerate() {
            match positions.entry(*leaf) {
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
                Entry::Occupied(_) => duplicates += 1,
            }
        }
        if duplicates > 0 {
            warn!(
                duplicates,
                "whitelist input contains duplicate identities; leaves kept as given"
            );
        }

        let levels = build_levels::<H>(leaves);
        let tree = Self {
            levels,
            positions,
            order,
            _hasher: PhantomData,
        };
        debug!(
            n_leaves = tree.len(),
            depth = tree.depth(),
            hasher = %H::KIND,
            %order,
            root = %tree.root(),
            "built whitelist tree"
        );
        Ok(tree)
    }

    /// The commitment.
    #[must_use]
    pub fn root(&self) -> MerkleRoot {
        // `build_levels` always ends with a single-node level.
        let top = self.levels.last().map_or(&[][..], Vec::as_slice);
        MerkleRoot::new(top.first().copied().unwrap_or_default())
    }

    /// Number of leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Always `false`; an empty tree cannot be built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of reductions from leaves to root (`ceil(log2 n)`).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Leaf order used at build time.
    #[must_use]
    pub const fn order(&self) -> LeafOrder {
        self.order
    }

    /// Ordered leaf digests.
    #[must_use]
    pub fn leaves(&self) -> &[Digest] {
        self.levels.first().map_or(&[][..], Vec::as_slice)
    }

    /// Position of an identity's leaf, if present.
    #[must_use]
    pub fn leaf_index(&self, identity: &Identity) -> Option<usize> {
        self.positions.get(&leaf_hash::<H>(identity)).copied()
    }

    /// Membership test against the tree itself (no proof involved).
    #[must_use]
    pub fn contains(&self, identity: &Identity) -> bool {
        self.leaf_index(identity).is_some()
    }

    /// Generate the authentication path for `identity`.
    pub fn prove(&self, identity: &Identity) -> Result<MembershipProof, WhitelistError> {
        let leaf_index = self
            .leaf_index(identity)
            .ok_or(WhitelistError::NotFound(*identity))?;

        let mut idx = leaf_index;
        let mut steps = Vec::with_capacity(self.depth());
        for (height, level) in self.levels[..self.depth()].iter().enumerate() {
            let sib = idx ^ 1;
            // A trailing odd node has no sibling at this height.
            if sib < level.len() {
                steps.push(ProofStep {
                    height: height as u32,
                    sibling: level[sib],
                });
            }
            idx >>= 1;
        }

        Ok(MembershipProof {
            identity: *identity,
            leaf_index,
            steps,
        })
    }

    /// Paths for every given identity, keyed by identity.
    ///
    /// Fails on the first identity that is not a member.
    pub fn prove_all<'a, I>(&self, identities: I) -> Result<ProofBundle, WhitelistError>
    where
        I: IntoIterator<Item = &'a Identity>,
    {
        let mut bundle = ProofBundle::new(H::KIND, self.order, self.root());
        for id in identities {
            bundle.insert(*id, self.prove(id)?.into_path());
        }
        Ok(bundle)
    }

    /// Publishable summary of this tree.
    #[must_use]
    pub fn manifest(&self) -> WhitelistManifest {
        WhitelistManifest::new(H::KIND, self.order, self.root(), self.len() as u64)
    }
}

/// Reduce leaves to a root, retaining every level.
fn build_levels<H: NodeHasher>(leaves: Vec<Digest>) -> Vec<Vec<Digest>> {
    let mut levels = Vec::new();
    let mut cur = leaves;
    while cur.len() > 1 {
        let mut next = Vec::with_capacity((cur.len() + 1) / 2);
        for pair in cur.chunks(2) {
            match pair {
                [a, b] => next.push(H::hash_sorted_pair(a, b)),
                // Promote odd node (carried up unchanged).
                _ => next.extend_from_slice(pair),
            }
        }
        levels.push(std::mem::replace(&mut cur, next));
    }
    levels.push(cur);
    levels
}
