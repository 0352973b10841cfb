//! mintgate-core — canonical types and I/O shared across the MINTGATE workspace.
//!
//! This crate defines the **stable boundary** used by the other crates:
//! - canonical data types (`Identity`, `MerkleRoot`, `AuthPath`),
//! - hex text forms and serde adapters for fixed-width byte strings,
//! - JSON/CBOR I/O with extension-based auto-detection, and
//! - a line-oriented reader for address lists.
//!
//! ```
//! use mintgate_core::Identity;
//!
//! let id: Identity = "0x5fc0be7a7d67a98bea9aad9e4583332e44e19f0f".parse()?;
//! assert_eq!(id.to_string(), "0x5fc0be7a7d67a98bea9aad9e4583332e44e19f0f");
//! # Ok::<(), mintgate_core::IdentityError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Small, explicit allowlist to keep docs readable and APIs ergonomic.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Hex serde adapters for digests and digest lists.
pub mod hex_serde;
/// JSON/CBOR helpers and auto-detecting read/write APIs.
pub mod io;
/// Owning line reader for address-list files.
pub mod io_lines;
/// Canonical core data types shared across the workspace.
pub mod types;

// ---- Re-exports for workspace compatibility ----
pub use io::*;
pub use io_lines::{read_identity_list, write_identity_list, IdentityLines};
pub use mintgate_crypto::Digest;
pub use types::*;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use mintgate_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::types::{AuthPath, Identity, IdentityError, MerkleRoot, IDENTITY_LEN};
    pub use mintgate_crypto::{Blake3Hasher, Digest, HasherKind, Keccak256Hasher, NodeHasher};
}
