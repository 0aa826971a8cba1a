//! vesta-cli — Operator interface for a Vesta vesting state directory.
//!
//! Every command opens the RocksDB store, runs one engine call and prints
//! the result as JSON. `--now` pins the call timestamp for replays and
//! tests; it defaults to the wall clock.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;

use vesta_core::merkle::{MerkleLeaf, MerkleTree};
use vesta_core::types::{AccountId, Hash256, VestingRecord};
use vesta_engine::{EngineConfig, Receipt, TracingSink, VestingEngine, VestingService};
use vesta_store::{RocksStore, StoreConfig};

/// Vesta vesting engine command-line interface.
#[derive(Parser, Debug)]
#[command(name = "vesta-cli", version, about = "Vesting, forfeiture and pool distribution")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Data directory for vesting state
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Call timestamp in Unix seconds (default: now)
    #[arg(long, global = true)]
    now: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Credit value from outside the system.
    Deposit { account: AccountId, amount: u64 },
    /// Move value between two accounts, forfeiting any unvested shortfall.
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: u64,
    },
    /// Claim the account's share of the forfeited pool.
    Claim { account: AccountId },
    /// Apply pending vesting transitions and accrual.
    Touch { account: AccountId },
    /// Show balance, vested amount, claimable share and records.
    Status { account: AccountId },
    /// Mark an account exempt (or clear the mark with --off).
    Exempt {
        account: AccountId,
        #[arg(long)]
        off: bool,
    },
    /// Publish a Merkle root for the distribution path.
    SetRoot { root: Hash256 },
    /// Build a Merkle tree from a JSON leaf file and print root and proofs.
    BuildRoot(BuildRootArgs),
    /// Claim a Merkle-path allocation.
    MerkleClaim(MerkleClaimArgs),
    /// Credit the distribution reserve backing Merkle claims.
    FundReserve { amount: u64 },
    /// Recompute aggregates from scratch and report inconsistencies.
    Audit,
}

#[derive(Args, Debug)]
struct BuildRootArgs {
    /// JSON array of {"index", "account", "amount"} objects
    leaves: PathBuf,

    /// Also publish the resulting root
    #[arg(long)]
    publish: bool,
}

#[derive(Args, Debug)]
struct MerkleClaimArgs {
    index: u64,
    account: AccountId,
    amount: u64,

    /// Sibling hashes, leaf to root (comma-separated hex)
    #[arg(long, value_delimiter = ',')]
    proof: Vec<Hash256>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.global.log_level, &cli.global.log_format);

    let config = StoreConfig {
        data_dir: cli.global.data_dir.clone().unwrap_or(StoreConfig::default().data_dir),
        log_level: cli.global.log_level.clone(),
    };
    let now = cli.global.now.unwrap_or_else(wall_clock);
    info!("Vesta CLI v{}", env!("CARGO_PKG_VERSION"));
    info!("data_dir: {:?}", config.data_dir);

    let service = open_service(&config)?;
    let output = run(&service, cli.command, now)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Open the store under `config` and wrap it in a logging service.
fn open_service(config: &StoreConfig) -> Result<VestingService<RocksStore>> {
    let store = RocksStore::open(config.db_path())
        .with_context(|| format!("Failed to open store at {}", config.db_path().display()))?;
    let engine = VestingEngine::new(store, EngineConfig::default())?;
    let service = VestingService::new(engine);
    service.add_sink(Arc::new(TracingSink));
    Ok(service)
}

fn run(service: &VestingService<RocksStore>, command: Commands, now: u64) -> Result<Value> {
    let output = match command {
        Commands::Deposit { account, amount } => receipt_json(&service.deposit(&account, amount, now)?),
        Commands::Transfer { from, to, amount } => {
            receipt_json(&service.move_funds(&from, &to, amount, now)?)
        }
        Commands::Claim { account } => receipt_json(&service.claim(&account, now)?),
        Commands::Touch { account } => receipt_json(&service.touch_account(&account, now)?),
        Commands::Status { account } => {
            let records: Vec<Value> = service.records(&account)?.iter().map(record_json).collect();
            json!({
                "account": account,
                "now": now,
                "balance": service.balance_of(&account)?,
                "vested": service.vested_balance(&account, now)?,
                "claimable": service.claimable(&account, now)?,
                "records": records,
            })
        }
        Commands::Exempt { account, off } => {
            service.set_exempt(&account, !off)?;
            json!({ "account": account, "exempt": !off })
        }
        Commands::SetRoot { root } => {
            service.set_merkle_root(root)?;
            json!({ "root": root })
        }
        Commands::BuildRoot(args) => build_root(service, args)?,
        Commands::MerkleClaim(args) => receipt_json(&service.merkle_claim(
            args.index,
            &args.account,
            args.amount,
            &args.proof,
        )?),
        Commands::FundReserve { amount } => receipt_json(&service.fund_reserve(amount)?),
        Commands::Audit => {
            let report = service.audit()?;
            json!({
                "clean": report.is_clean(),
                "accounts": report.accounts,
                "records": report.records,
                "forfeited_pool": report.globals.forfeited_pool,
                "pool_balance": report.pool_balance,
                "total_weighted_contribution": report.globals.total_weighted_contribution.to_string(),
                "recomputed_weight": report.recomputed_weight.to_string(),
                "violations": report.violations,
            })
        }
    };
    Ok(output)
}

fn build_root(service: &VestingService<RocksStore>, args: BuildRootArgs) -> Result<Value> {
    let raw = std::fs::read_to_string(&args.leaves)
        .with_context(|| format!("Failed to read {}", args.leaves.display()))?;
    let leaves: Vec<MerkleLeaf> = serde_json::from_str(&raw).context("Invalid leaf file")?;
    if leaves.is_empty() {
        bail!("Leaf file contains no entries");
    }

    let tree = MerkleTree::from_leaves(&leaves);
    let root = tree.root();
    if args.publish {
        service.set_merkle_root(root)?;
    }

    let mut proofs = Vec::with_capacity(tree.leaf_count());
    for (pos, leaf) in leaves.iter().enumerate() {
        let proof = tree.proof(pos).context("proof position out of range")?;
        proofs.push(json!({ "leaf": leaf, "proof": proof }));
    }
    Ok(json!({ "root": root, "published": args.publish, "leaves": proofs }))
}

/// Multipliers are u128 fixed point and go out as decimal strings.
fn record_json(record: &VestingRecord) -> Value {
    json!({
        "principal": record.principal,
        "locked": record.locked,
        "vest_start": record.vest_start,
        "vest_complete": record.vest_complete,
        "fully_vested": record.fully_vested,
        "multiplier": record.multiplier.to_string(),
        "last_accrual": record.last_accrual,
        "claimed_share": record.claimed_share,
        "last_deposit_time": record.last_deposit_time,
    })
}

fn receipt_json(receipt: &Receipt) -> Value {
    json!({
        "amount": receipt.amount,
        "forfeited": receipt.forfeited,
        "events": receipt.events,
    })
}

fn wall_clock() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
