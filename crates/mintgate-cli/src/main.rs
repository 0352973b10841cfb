// crates/mintgate-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mintgate_admission::{
    AdmissionError, MemoryLedger, MintReceipt, Phase, Sale, SaleConfig, SaleEvent, SaleStatus, Tier,
};
use mintgate_core::{
    ensure_parent_dir, read_identity_list, write_identity_list, write_json, AuthPath, Identity,
    MerkleRoot,
};
use mintgate_merkle::{
    commit_identity_file, read_bundle_auto, read_manifest_auto,
    verify_identity_file_against_manifest, verify_with,
    Blake3Hasher, HasherKind, Keccak256Hasher, LeafOrder, NodeHasher, WhitelistTree,
};
use rand::{rngs::StdRng, Rng as _, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "mintgate",
    about = "MINTGATE whitelist and mint admission CLI",
    long_about = "MINTGATE whitelist and mint admission CLI.\n\nUse this tool to generate address lists, commit them to a Merkle root, issue and check membership proofs, and dry-run a sale campaign.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write `count` distinct random addresses, one per line.
    Generate {
        /// Number of addresses (>0)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        count: u64,

        /// RNG seed for a reproducible list (OS entropy if absent)
        #[arg(long)]
        seed: Option<u64>,

        /// Output path for the address list
        #[arg(long, default_value = "addresses.txt")]
        out: PathBuf,
    },

    /// Commit an address list to a Merkle root and write a manifest
    Build {
        /// Input address list (one 0x-hex address per line)
        #[arg(long)]
        addresses: PathBuf,

        /// Node hash primitive
        #[arg(long, value_enum, default_value_t = HasherOpt::Keccak256)]
        hasher: HasherOpt,

        /// Leaf arrangement before reduction
        #[arg(long, value_enum, default_value_t = OrderOpt::Sorted)]
        order: OrderOpt,

        /// Output path for the manifest (CBOR/JSON)
        #[arg(long, default_value = "manifest.json")]
        out: PathBuf,

        /// Also write a proof bundle for every address (CBOR/JSON)
        #[arg(long)]
        proofs: Option<PathBuf>,
    },

    /// Check that an address list recomputes a manifest's root and leaf count
    VerifyCommit {
        /// Input address list (one 0x-hex address per line)
        #[arg(long)]
        addresses: PathBuf,

        /// Input manifest (CBOR/JSON)
        #[arg(long)]
        manifest: PathBuf,
    },

    /// Print the root and authentication path for one address
    Prove {
        /// Input address list (one 0x-hex address per line)
        #[arg(long)]
        addresses: PathBuf,

        /// Address to prove
        #[arg(long)]
        address: Identity,

        /// Node hash primitive
        #[arg(long, value_enum, default_value_t = HasherOpt::Keccak256)]
        hasher: HasherOpt,

        /// Leaf arrangement before reduction
        #[arg(long, value_enum, default_value_t = OrderOpt::Sorted)]
        order: OrderOpt,
    },

    /// Check an address's proof against a manifest root
    Verify {
        /// Input manifest (CBOR/JSON)
        #[arg(long)]
        manifest: PathBuf,

        /// Address to check
        #[arg(long)]
        address: Identity,

        /// Proof bundle to take the path from (CBOR/JSON)
        #[arg(long, conflicts_with = "path", required_unless_present = "path")]
        proofs: Option<PathBuf>,

        /// Comma-separated sibling digests, leaf to root
        #[arg(long)]
        path: Option<AuthPath>,
    },

    /// Dry-run a campaign against an in-memory ledger.
    ///
    /// Script: unpause; issue the reserved allocation in batches; open the
    /// presale and mint the presale cap for every listed address; try one
    /// unlisted address; close the presale, open the public sale and top
    /// every listed address up to the public cap; withdraw proceeds.
    Simulate {
        /// Sale configuration (TOML)
        #[arg(long)]
        config: PathBuf,

        /// Whitelisted address list (one 0x-hex address per line)
        #[arg(long)]
        addresses: PathBuf,

        /// Node hash primitive
        #[arg(long, value_enum, default_value_t = HasherOpt::Keccak256)]
        hasher: HasherOpt,

        /// Leaf arrangement before reduction
        #[arg(long, value_enum, default_value_t = OrderOpt::Sorted)]
        order: OrderOpt,

        /// Write the audit log here (JSON)
        #[arg(long)]
        events: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum HasherOpt {
    /// Ethereum keccak256
    Keccak256,
    /// BLAKE3
    Blake3,
}

impl From<HasherOpt> for HasherKind {
    fn from(h: HasherOpt) -> Self {
        match h {
            HasherOpt::Keccak256 => Self::Keccak256,
            HasherOpt::Blake3 => Self::Blake3,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum OrderOpt {
    /// Sort leaves by digest (root depends only on the set)
    Sorted,
    /// Keep list order
    Insertion,
}

impl From<OrderOpt> for LeafOrder {
    fn from(o: OrderOpt) -> Self {
        match o {
            OrderOpt::Sorted => Self::Sorted,
            OrderOpt::Insertion => Self::Insertion,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Generate { count, seed, out } => generate(count, seed, out),

        Cmd::Build {
            addresses,
            hasher,
            order,
            out,
            proofs,
        } => build(addresses, hasher.into(), order.into(), out, proofs),

        Cmd::VerifyCommit {
            addresses,
            manifest,
        } => verify_commit(&addresses, &manifest),

        Cmd::Prove {
            addresses,
            address,
            hasher,
            order,
        } => prove(addresses, address, hasher.into(), order.into()),

        Cmd::Verify {
            manifest,
            address,
            proofs,
            path,
        } => verify(manifest, address, proofs, path),

        Cmd::Simulate {
            config,
            addresses,
            hasher,
            order,
            events,
        } => simulate(config, addresses, hasher.into(), order.into(), events),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn random_identities(count: u64, seed: Option<u64>) -> Vec<Identity> {
    let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let n = usize::try_from(count).unwrap_or(usize::MAX);
    let mut seen = HashSet::with_capacity(n.min(1 << 20));
    let mut out = Vec::with_capacity(n.min(1 << 20));
    while out.len() < n {
        let id = Identity::new(rng.random::<[u8; 20]>());
        if seen.insert(id) {
            out.push(id);
        }
    }
    out
}

fn generate(count: u64, seed: Option<u64>, out: PathBuf) -> Result<()> {
    info!(count, ?seed, out=%out.display(), "generating addresses");
    let ids = random_identities(count, seed);

    ensure_parent_dir(&out)?;
    write_identity_list(&out, &ids)
        .with_context(|| format!("writing address list to {}", out.display()))?;

    println!("Generated {} addresses → {}", ids.len(), out.display());
    Ok(())
}

fn build(
    addresses: PathBuf,
    hasher: HasherKind,
    order: LeafOrder,
    out: PathBuf,
    proofs: Option<PathBuf>,
) -> Result<()> {
    info!(addresses=%addresses.display(), out=%out.display(), %hasher, %order, "building whitelist");
    ensure_parent_dir(&out)?;
    if let Some(p) = &proofs {
        ensure_parent_dir(p)?;
    }

    let man = commit_identity_file(&addresses, &out, proofs.as_deref(), hasher, order)
        .with_context(|| {
            format!(
                "committing {} to manifest {}",
                addresses.display(),
                out.display()
            )
        })?;

    println!(
        "Committed {} addresses ({hasher}, {order}) → root {} → {}",
        man.n_leaves,
        man.root,
        out.display()
    );
    if let Some(p) = proofs {
        println!("Proof bundle → {}", p.display());
    }
    Ok(())
}

fn verify_commit(addresses: &Path, manifest: &Path) -> Result<()> {
    info!(addresses=%addresses.display(), manifest=%manifest.display(), "verifying commit");
    verify_identity_file_against_manifest(addresses, manifest).with_context(|| {
        format!(
            "verifying that {} matches manifest {}",
            addresses.display(),
            manifest.display()
        )
    })?;

    println!(
        "OK: {} matches manifest {}",
        addresses.display(),
        manifest.display()
    );
    Ok(())
}

/// Root and path for `address` under the chosen hasher.
fn prove_one(
    ids: &[Identity],
    address: &Identity,
    hasher: HasherKind,
    order: LeafOrder,
) -> Result<(MerkleRoot, usize, AuthPath)> {
    fn go<H: NodeHasher>(
        ids: &[Identity],
        address: &Identity,
        order: LeafOrder,
    ) -> Result<(MerkleRoot, usize, AuthPath)> {
        let tree = WhitelistTree::<H>::build_with_order(ids, order)?;
        let proof = tree.prove(address)?;
        Ok((tree.root(), proof.leaf_index, proof.into_path()))
    }
    match hasher {
        HasherKind::Keccak256 => go::<Keccak256Hasher>(ids, address, order),
        HasherKind::Blake3 => go::<Blake3Hasher>(ids, address, order),
    }
}

fn prove(addresses: PathBuf, address: Identity, hasher: HasherKind, order: LeafOrder) -> Result<()> {
    info!(addresses=%addresses.display(), %address, %hasher, %order, "proving membership");
    let ids = read_identity_list(&addresses)
        .with_context(|| format!("reading addresses from {}", addresses.display()))?;
    let (root, leaf_index, path) = prove_one(&ids, &address, hasher, order)?;

    println!("address:    {address}");
    println!("root:       {root}");
    println!("leaf_index: {leaf_index}");
    println!("depth:      {}", path.len());
    println!("path:       {path}");
    Ok(())
}

fn verify(
    manifest: PathBuf,
    address: Identity,
    proofs: Option<PathBuf>,
    path: Option<AuthPath>,
) -> Result<()> {
    info!(manifest=%manifest.display(), %address, "verifying membership");
    let man = read_manifest_auto(&manifest)
        .with_context(|| format!("reading manifest {}", manifest.display()))?;

    let path = match (proofs, path) {
        (Some(bundle_path), _) => {
            let bundle = read_bundle_auto(&bundle_path)
                .with_context(|| format!("reading proof bundle {}", bundle_path.display()))?;
            if bundle.root != man.root || bundle.hasher != man.hasher {
                bail!(
                    "proof bundle {} was built for root {} ({}), manifest has {} ({})",
                    bundle_path.display(),
                    bundle.root,
                    bundle.hasher,
                    man.root,
                    man.hasher
                );
            }
            match bundle.get(&address) {
                Some(p) => p.clone(),
                None => bail!("{address} has no entry in {}", bundle_path.display()),
            }
        }
        (None, Some(p)) => p,
        (None, None) => bail!("one of --proofs or --path is required"),
    };

    if !verify_with(man.hasher, &man.root, &address, &path) {
        bail!("{address} is NOT whitelisted under root {}", man.root);
    }
    println!("OK: {address} is whitelisted under root {}", man.root);
    Ok(())
}

/* ------------------------------- simulation ------------------------------- */

const RESERVED_BATCH: u64 = 50;

#[derive(Debug, Default, Serialize)]
struct Tally {
    accepted: u64,
    reserved_units: u64,
    presale_units: u64,
    public_units: u64,
    rejected: BTreeMap<&'static str, u64>,
}

impl Tally {
    fn record(&mut self, outcome: Result<MintReceipt, AdmissionError>) -> bool {
        match outcome {
            Ok(r) => {
                self.accepted += 1;
                match r.kind {
                    Tier::Reserved => self.reserved_units += r.quantity,
                    Tier::Presale => self.presale_units += r.quantity,
                    Tier::Public => self.public_units += r.quantity,
                }
                true
            }
            Err(e) => {
                *self.rejected.entry(e.code()).or_insert(0) += 1;
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct CampaignReport {
    hasher: HasherKind,
    whitelist_size: usize,
    tally: Tally,
    #[serde(serialize_with = "wei_string")]
    withdrawn_wei: u128,
    holders: usize,
    status: SaleStatus,
}

fn wei_string<S: serde::Serializer>(v: &u128, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(v)
}

fn payment_for(price: u128, quantity: u64) -> u128 {
    price.saturating_mul(u128::from(quantity))
}

fn run_campaign<H: NodeHasher>(
    cfg: &SaleConfig,
    ids: &[Identity],
    order: LeafOrder,
) -> Result<(CampaignReport, Vec<SaleEvent>)> {
    let tree = WhitelistTree::<H>::build_with_order(ids, order)?;
    let sale = Sale::<MemoryLedger, H>::with_hasher(cfg, MemoryLedger::new())?;
    let admin = cfg.admin;

    match cfg.root {
        Some(r) if r == tree.root() => {}
        Some(r) => {
            warn!(configured=%r, computed=%tree.root(), "configured root does not match address list; rotating");
            sale.set_root(&admin, tree.root())?;
        }
        None => sale.set_root(&admin, tree.root())?,
    }
    sale.set_paused(&admin, false)?;

    let mut tally = Tally::default();

    // Reserved allocation.
    while sale.remaining_reserved() > 0 {
        let q = sale.remaining_reserved().min(RESERVED_BATCH);
        if !tally.record(sale.mint_reserved(admin, q)) {
            break;
        }
    }

    // Presale.
    sale.set_phase(&admin, Phase::Presale, true)?;
    let caps = sale.caps();
    let price = sale.price();
    for id in ids {
        let proof = tree.prove(id)?.into_path();
        tally.record(sale.mint_presale(*id, caps.presale, payment_for(price, caps.presale), proof));
    }
    if let Some(first) = ids.first() {
        let outsider = random_identities(1, Some(0)).into_iter().find(|o| !tree.contains(o));
        if let Some(outsider) = outsider {
            let borrowed = tree.prove(first)?.into_path();
            tally.record(sale.mint_presale(outsider, 1, price, borrowed));
        }
    }

    // Public.
    sale.set_phase(&admin, Phase::Presale, false)?;
    sale.set_phase(&admin, Phase::Public, true)?;
    for id in ids {
        let q = caps.public.saturating_sub(sale.minted_by(id));
        if q > 0 {
            tally.record(sale.mint_public(*id, q, payment_for(price, q)));
        }
    }

    let withdrawn_wei = sale.withdraw(&admin)?;
    let holders = sale.with_ledger(MemoryLedger::holders);
    let report = CampaignReport {
        hasher: H::KIND,
        whitelist_size: ids.len(),
        tally,
        withdrawn_wei,
        holders,
        status: sale.status(),
    };
    Ok((report, sale.events()))
}

fn simulate(
    config: PathBuf,
    addresses: PathBuf,
    hasher: HasherKind,
    order: LeafOrder,
    events: Option<PathBuf>,
) -> Result<()> {
    info!(config=%config.display(), addresses=%addresses.display(), %hasher, %order, "simulating campaign");
    let cfg = SaleConfig::load(&config)
        .with_context(|| format!("loading sale config {}", config.display()))?;
    let ids = read_identity_list(&addresses)
        .with_context(|| format!("reading addresses from {}", addresses.display()))?;
    if ids.is_empty() {
        bail!("address list {} is empty", addresses.display());
    }

    let (report, log) = match hasher {
        HasherKind::Keccak256 => run_campaign::<Keccak256Hasher>(&cfg, &ids, order)?,
        HasherKind::Blake3 => run_campaign::<Blake3Hasher>(&cfg, &ids, order)?,
    };

    if let Some(p) = events {
        ensure_parent_dir(&p)?;
        write_json(&p, &log).with_context(|| format!("writing audit log to {}", p.display()))?;
        info!(n = log.len(), events=%p.display(), "wrote audit log");
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize campaign report")?
    );
    Ok(())
}
