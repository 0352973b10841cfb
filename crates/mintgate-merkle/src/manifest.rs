//! Off-chain distribution files.
//!
//! - [`WhitelistManifest`]: the published root plus what a third party needs to
//!   recompute it (hasher, leaf order, leaf count).
//! - [`ProofBundle`]: per-identity authentication paths, delivered out of band.
//!
//! Both are written as JSON or CBOR by file extension.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use mintgate_core::{io as core_io, read_identity_list, AuthPath, Identity, MerkleRoot};
use mintgate_crypto::{Blake3Hasher, HasherKind, Keccak256Hasher};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::tree::{LeafOrder, WhitelistTree};
use crate::verify::verify_with;
use crate::WhitelistError;

/// Format version for manifests and bundles.
pub const MANIFEST_VERSION: u32 = 1;

/// Compact commitment over an identity list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhitelistManifest {
    /// Schema/encoding version.
    pub version: u32,
    /// Hash primitive for leaves and inner nodes.
    pub hasher: HasherKind,
    /// Leaf arrangement before reduction.
    pub leaf_order: LeafOrder,
    /// Merkle root over the leaves.
    pub root: MerkleRoot,
    /// Number of leaves (identities, duplicates included).
    pub n_leaves: u64,
}

impl WhitelistManifest {
    /// Construct at the current [`MANIFEST_VERSION`].
    #[must_use]
    pub const fn new(
        hasher: HasherKind,
        leaf_order: LeafOrder,
        root: MerkleRoot,
        n_leaves: u64,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION,
            hasher,
            leaf_order,
            root,
            n_leaves,
        }
    }
}

/// Authentication paths keyed by identity, all against one root.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofBundle {
    /// Schema/encoding version.
    pub version: u32,
    /// Hash primitive the paths were generated with.
    pub hasher: HasherKind,
    /// Leaf arrangement of the source tree.
    pub leaf_order: LeafOrder,
    /// Root every path folds to.
    pub root: MerkleRoot,
    /// Identity → sibling path.
    pub proofs: BTreeMap<Identity, AuthPath>,
}

impl ProofBundle {
    /// Empty bundle for `root`.
    #[must_use]
    pub const fn new(hasher: HasherKind, leaf_order: LeafOrder, root: MerkleRoot) -> Self {
        Self {
            version: MANIFEST_VERSION,
            hasher,
            leaf_order,
            root,
            proofs: BTreeMap::new(),
        }
    }

    /// Add or replace one identity's path.
    pub fn insert(&mut self, identity: Identity, path: AuthPath) {
        self.proofs.insert(identity, path);
    }

    /// Look up one identity's path.
    #[must_use]
    pub fn get(&self, identity: &Identity) -> Option<&AuthPath> {
        self.proofs.get(identity)
    }

    /// Number of identities covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    /// `true` if no paths are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }

    /// Check one identity against the bundle's own root.
    #[must_use]
    pub fn verify(&self, identity: &Identity) -> bool {
        self.get(identity)
            .is_some_and(|path| verify_with(self.hasher, &self.root, identity, path))
    }
}

/// Build a manifest with the hasher picked at runtime.
pub fn commit_identities(
    identities: &[Identity],
    hasher: HasherKind,
    order: LeafOrder,
) -> Result<WhitelistManifest, WhitelistError> {
    Ok(match hasher {
        HasherKind::Keccak256 => {
            WhitelistTree::<Keccak256Hasher>::build_with_order(identities, order)?.manifest()
        }
        HasherKind::Blake3 => {
            WhitelistTree::<Blake3Hasher>::build_with_order(identities, order)?.manifest()
        }
    })
}

/// Build a manifest and a full proof bundle with the hasher picked at runtime.
pub fn commit_identities_with_proofs(
    identities: &[Identity],
    hasher: HasherKind,
    order: LeafOrder,
) -> Result<(WhitelistManifest, ProofBundle), WhitelistError> {
    match hasher {
        HasherKind::Keccak256 => {
            let tree = WhitelistTree::<Keccak256Hasher>::build_with_order(identities, order)?;
            Ok((tree.manifest(), tree.prove_all(identities)?))
        }
        HasherKind::Blake3 => {
            let tree = WhitelistTree::<Blake3Hasher>::build_with_order(identities, order)?;
            Ok((tree.manifest(), tree.prove_all(identities)?))
        }
    }
}

/// Read an address list, compute the manifest, write it (and optionally the
/// proof bundle), and return the manifest.
pub fn commit_identity_file<P, Q>(
    addresses_path: P,
    out_manifest_path: Q,
    out_proofs_path: Option<&Path>,
    hasher: HasherKind,
    order: LeafOrder,
) -> Result<WhitelistManifest>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path = addresses_path.as_ref();
    let ids = read_identity_list(path).with_context(|| format!("read addresses {}", path.display()))?;

    let manifest = if let Some(proofs_path) = out_proofs_path {
        let (manifest, bundle) = commit_identities_with_proofs(&ids, hasher, order)?;
        write_bundle_auto(proofs_path, &bundle)?;
        info!(
            n = bundle.len(),
            proofs = %proofs_path.display(),
            "wrote proof bundle"
        );
        manifest
    } else {
        commit_identities(&ids, hasher, order)?
    };

    write_manifest_auto(&out_manifest_path, &manifest)?;
    info!(
        n_leaves = manifest.n_leaves,
        root = %manifest.root,
        manifest = %out_manifest_path.as_ref().display(),
        "committed whitelist"
    );
    Ok(manifest)
}

/// Verify that an address-list file matches a manifest file (by recomputing the root).
pub fn verify_identity_file_against_manifest<P: AsRef<Path>, Q: AsRef<Path>>(
    addresses_path: P,
    manifest_path: Q,
) -> Result<()> {
    let path = addresses_path.as_ref();
    let man = read_manifest_auto(&manifest_path)?;
    let ids = read_identity_list(path).with_context(|| format!("read addresses {}", path.display()))?;
    validate_identities_against_manifest(&ids, &man)
}

/// In-memory validator: recompute and compare root and leaf count.
pub fn validate_identities_against_manifest(
    identities: &[Identity],
    man: &WhitelistManifest,
) -> Result<()> {
    if man.version != MANIFEST_VERSION {
        bail!(
            "unsupported manifest version {} (expected {})",
            man.version,
            MANIFEST_VERSION
        );
    }
    let recomputed = commit_identities(identities, man.hasher, man.leaf_order)?;
    if recomputed.root != man.root {
        bail!(
            "root mismatch: manifest={}, recomputed={}",
            man.root,
            recomputed.root
        );
    }
    if recomputed.n_leaves != man.n_leaves {
        bail!(
            "leaf count mismatch: manifest={}, recomputed={}",
            man.n_leaves,
            recomputed.n_leaves
        );
    }
    Ok(())
}

/* -------------------- Manifest / bundle IO (JSON/CBOR) -------------------- */

/// Auto-detect read by extension `.json` / `.cbor`.
pub fn read_manifest_auto<P: AsRef<Path>>(path: P) -> Result<WhitelistManifest> {
    core_io::read_auto(path).context("read whitelist manifest")
}

/// Auto-detect write (defaults to JSON if unknown).
pub fn write_manifest_auto<P: AsRef<Path>>(path: P, v: &WhitelistManifest) -> Result<()> {
    core_io::write_auto(path, v).context("write whitelist manifest")
}

/// Auto-detect read by extension `.json` / `.cbor`.
pub fn read_bundle_auto<P: AsRef<Path>>(path: P) -> Result<ProofBundle> {
    core_io::read_auto(path).context("read proof bundle")
}

/// Auto-detect write (defaults to JSON if unknown).
pub fn write_bundle_auto<P: AsRef<Path>>(path: P, v: &ProofBundle) -> Result<()> {
    core_io::write_auto(path, v).context("write proof bundle")
}
