use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use privacy_pool::{
    config::Config,
    events::leaves_from_events,
    utils::{field_from_hex, field_to_hex},
    Address, Halo2Verifier, MerkleTree, NativeBalances, PoolState, PoseidonHasher, PrivacyPool,
    TxContext, WithdrawKeys, WithdrawalProof,
};
use std::fs;
use std::path::{Path, PathBuf};

type Pool = PrivacyPool<Halo2Verifier, NativeBalances>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply if it does not exist
    #[arg(short, long, env = "POOL_CONFIG", default_value = "pool.toml")]
    config: PathBuf,

    /// State file, overriding `[state] file` from the configuration
    #[arg(short, long, env = "POOL_STATE")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty pool state file
    Init {
        #[arg(long)]
        denomination: Option<u64>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        governance: Option<Address>,
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },
    /// Credit an account with native funds
    Fund {
        #[arg(long)]
        account: Address,
        #[arg(long)]
        amount: u64,
    },
    /// Deposit one denomination under a commitment
    Deposit {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        commitment: String,
    },
    /// Submit a withdrawal proof file
    Withdraw {
        #[arg(short, long)]
        proof_file: PathBuf,
        /// Submitting account; defaults to the proof's relayer
        #[arg(long)]
        caller: Option<Address>,
    },
    /// Revoke the commitment at a leaf index (governance only)
    Revoke {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        index: u64,
    },
    /// Print the pool status
    Status,
    /// Check whether nullifier hashes have been spent
    IsSpent {
        #[arg(required = true)]
        nullifier_hashes: Vec<String>,
    },
}

fn load_pool(path: &Path, keys: &WithdrawKeys) -> Result<Pool> {
    let state = PoolState::load_from_file(path)?;
    debug!("Loaded {} events from {}", state.pool.events.len(), path.display());
    PrivacyPool::from_snapshot(state.pool, PoseidonHasher, keys.verifier(), state.balances)
        .context("State file does not describe a valid pool")
}

fn save_pool(path: &Path, pool: &Pool) -> Result<()> {
    let state = PoolState {
        pool: pool.snapshot(),
        balances: pool.assets().clone(),
    };
    state.save_to_file(path)?;
    debug!("Saved pool state to {}", path.display());
    Ok(())
}

fn read_proof_file(path: &Path, config: &Config) -> Result<WithdrawalProof> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to read proof file metadata: {}", path.display()))?;
    if metadata.len() > config.proof.max_file_size {
        return Err(anyhow::anyhow!(
            "Proof file too large: {} bytes (max {} bytes)",
            metadata.len(),
            config.proof.max_file_size
        ));
    }

    let content = fs::read_to_string(path).context("Failed to read proof file")?;
    let proof: WithdrawalProof =
        serde_json::from_str(&content).context("Failed to parse proof JSON")?;
    proof
        .validate(config.proof.max_zk_proof_size)
        .context("Proof validation failed")?;
    Ok(proof)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_from_file_or_default(&args.config);
    let state_path = args.state.clone().unwrap_or_else(|| config.state.file.clone());
    debug!("Using state file {}", state_path.display());

    info!("Generating withdrawal circuit keys (k={})", config.proof.circuit_k);
    let keys = WithdrawKeys::generate(config.proof.circuit_k)
        .map_err(|e| anyhow::anyhow!("Failed to generate circuit keys: {e:?}"))?;

    match args.command {
        Command::Init {
            denomination,
            height,
            governance,
            force,
        } => {
            if state_path.exists() && !force {
                return Err(anyhow::anyhow!(
                    "State file already exists: {} (use --force to overwrite)",
                    state_path.display()
                ));
            }
            let mut params = config.to_params()?;
            if let Some(denomination) = denomination {
                params.denomination = denomination;
            }
            if let Some(height) = height {
                params.height = height;
            }
            if governance.is_some() {
                params.governance = governance;
            }

            let pool = PrivacyPool::new(
                params,
                PoseidonHasher,
                keys.verifier(),
                NativeBalances::new(),
            )?;
            save_pool(&state_path, &pool)?;
            println!("Initialized pool at {}", state_path.display());
            println!("  Root: {}", field_to_hex(pool.current_root()));
        }
        Command::Fund { account, amount } => {
            let mut pool = load_pool(&state_path, &keys)?;
            pool.assets_mut().credit(account, amount)?;
            save_pool(&state_path, &pool)?;
            println!(
                "Funded {account}: balance {}",
                pool.assets().balance_of(&account)
            );
        }
        Command::Deposit { from, commitment } => {
            let commitment = field_from_hex(&commitment).context("Invalid commitment")?;
            let mut pool = load_pool(&state_path, &keys)?;
            let ctx = TxContext::now(from)?;
            let index = pool.deposit(&ctx, commitment)?;
            save_pool(&state_path, &pool)?;
            println!("Deposit accepted");
            println!("  Leaf Index: {index}");
            println!("  Root: {}", field_to_hex(pool.current_root()));
        }
        Command::Withdraw { proof_file, caller } => {
            info!("Loading proof from: {}", proof_file.display());
            let proof = read_proof_file(&proof_file, &config)?;
            let ctx = TxContext::now(caller.unwrap_or(proof.relayer))?;

            let mut pool = load_pool(&state_path, &keys)?;
            let nullifier_hash = proof.nullifier_hash;
            pool.withdraw(&ctx, &proof.into_request())?;
            save_pool(&state_path, &pool)?;
            println!("Withdrawal accepted");
            println!("  Nullifier Hash: {}", field_to_hex(nullifier_hash));
        }
        Command::Revoke { caller, index } => {
            let mut pool = load_pool(&state_path, &keys)?;
            let leaves = leaves_from_events(pool.events(), pool.tree().empty_leaf());
            let tree = MerkleTree::new(PoseidonHasher, pool.tree().height(), leaves)?;
            if tree.root() != pool.current_root() {
                return Err(anyhow::anyhow!(
                    "Event log does not reproduce the current root; state file is inconsistent"
                ));
            }
            let request = tree
                .revocation_request(index)
                .with_context(|| format!("No deposit at leaf index {index}"))?;

            let ctx = TxContext::now(caller)?;
            let root = pool.revoke(&ctx, &request)?;
            save_pool(&state_path, &pool)?;
            println!("Revoked leaf {index}");
            println!("  Commitment: {}", field_to_hex(request.commitment));
            println!("  New Root: {}", field_to_hex(root));
        }
        Command::Status => {
            let pool = load_pool(&state_path, &keys)?;
            let params = pool.params();
            println!("Pool status:");
            println!("  Root: {}", field_to_hex(pool.current_root()));
            println!("  Deposits: {}", pool.tree().next_index());
            println!("  Capacity: {}", pool.tree().capacity());
            println!("  Denomination: {}", params.denomination);
            match params.governance {
                Some(governance) => println!("  Governance: {governance}"),
                None => println!("  Governance: none"),
            }
            println!("  Balance: {}", pool.assets().pool_balance());
            println!("  Spent Nullifiers: {}", pool.ledger().nullifiers().count());
            println!("  Events: {}", pool.events().len());
        }
        Command::IsSpent { nullifier_hashes } => {
            let pool = load_pool(&state_path, &keys)?;
            let parsed = nullifier_hashes
                .iter()
                .map(|hash| {
                    field_from_hex(hash).with_context(|| format!("Invalid nullifier hash {hash}"))
                })
                .collect::<Result<Vec<_>>>()?;
            for (hash, spent) in parsed.iter().zip(pool.is_spent_batch(&parsed)) {
                println!("{} {}", field_to_hex(*hash), if spent { "spent" } else { "unspent" });
            }
        }
    }

    Ok(())
}
