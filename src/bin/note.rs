use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use privacy_pool::{
    config::Config,
    events::leaves_from_events,
    hasher::empty_leaf,
    types::unix_now,
    utils::{field_to_hex, hex_field, FieldElement},
    Address, MerkleTree, Note, PoolState, PoseidonHasher, PublicInputs, WithdrawKeys,
    WithdrawalProof,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply if it does not exist
    #[arg(short, long, env = "POOL_CONFIG", default_value = "pool.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a fresh deposit note
    New {
        #[arg(short, long, default_value = "note.json")]
        output: PathBuf,
    },
    /// Build a withdrawal proof for a deposited note
    Prove {
        #[arg(short, long)]
        note: PathBuf,
        /// Pool state file, overriding `[state] file` from the configuration
        #[arg(short, long, env = "POOL_STATE")]
        state: Option<PathBuf>,
        #[arg(long)]
        recipient: Address,
        /// Relayer receiving the fee; defaults to the recipient
        #[arg(long)]
        relayer: Option<Address>,
        #[arg(long, default_value_t = 0)]
        fee: u64,
        #[arg(long, default_value_t = 0)]
        refund: u64,
        #[arg(short, long, default_value = "proof.json")]
        output: PathBuf,
    },
}

/// A note together with the values derived from it.
#[derive(Debug, Serialize, Deserialize)]
struct NoteFile {
    #[serde(flatten)]
    note: Note,
    #[serde(with = "hex_field")]
    commitment: FieldElement,
    #[serde(with = "hex_field")]
    nullifier_hash: FieldElement,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_from_file_or_default(&args.config);
    let hasher = PoseidonHasher;

    match args.command {
        Command::New { output } => {
            let note = Note::random();
            let file = NoteFile {
                commitment: note.commitment(&hasher),
                nullifier_hash: note.nullifier_hash(&hasher),
                note,
            };
            let json = serde_json::to_string_pretty(&file).context("Failed to serialize note")?;
            fs::write(&output, json)
                .with_context(|| format!("Failed to write note file: {}", output.display()))?;

            println!("Note written to {}", output.display());
            println!("  Commitment: {}", field_to_hex(file.commitment));
        }
        Command::Prove {
            note,
            state,
            recipient,
            relayer,
            fee,
            refund,
            output,
        } => {
            let content = fs::read_to_string(&note)
                .with_context(|| format!("Failed to read note file: {}", note.display()))?;
            let file: NoteFile =
                serde_json::from_str(&content).context("Failed to parse note JSON")?;
            let commitment = file.note.commitment(&hasher);

            let state_path = state.unwrap_or_else(|| config.state.file.clone());
            let pool = PoolState::load_from_file(&state_path)?.pool;
            let leaves = leaves_from_events(&pool.events, empty_leaf());
            let tree = MerkleTree::new(hasher, pool.height, leaves)?;

            let index = tree
                .leaves()
                .iter()
                .position(|leaf| *leaf == commitment)
                .context("Note commitment is not in the pool")?;
            let path = tree
                .generate_proof(index as u64)
                .context("Failed to build inclusion path")?;
            if Some(path.root) != pool.current_root() {
                return Err(anyhow::anyhow!(
                    "Event log does not reproduce the pool root; state file is inconsistent"
                ));
            }
            info!("Found commitment at leaf {index}");
            debug!("Inclusion path: {path}");

            let inputs = PublicInputs {
                root: path.root,
                nullifier_hash: file.note.nullifier_hash(&hasher),
                recipient,
                relayer: relayer.unwrap_or(recipient),
                fee,
                refund,
            };

            info!("Generating withdrawal proof (k={})", config.proof.circuit_k);
            let keys = WithdrawKeys::generate(config.proof.circuit_k)
                .map_err(|e| anyhow::anyhow!("Failed to generate circuit keys: {e:?}"))?;
            let zkp_proof = keys
                .prover()
                .generate_proof(&inputs)
                .map_err(|e| anyhow::anyhow!("Failed to generate proof: {e:?}"))?;

            let proof = WithdrawalProof {
                root: inputs.root,
                nullifier_hash: inputs.nullifier_hash,
                recipient: inputs.recipient,
                relayer: inputs.relayer,
                fee: inputs.fee,
                refund: inputs.refund,
                zkp_proof,
                timestamp: unix_now()?,
            };
            let json =
                serde_json::to_string_pretty(&proof).context("Failed to serialize proof")?;
            fs::write(&output, json)
                .with_context(|| format!("Failed to write proof file: {}", output.display()))?;

            println!("Proof written to {}", output.display());
            println!("  Root: {}", field_to_hex(proof.root));
            println!("  Nullifier Hash: {}", field_to_hex(proof.nullifier_hash));
            println!("  ZK Proof Size: {} bytes", proof.zkp_proof.len());
        }
    }

    Ok(())
}
