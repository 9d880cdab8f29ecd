//! Fixed-denomination privacy pool
//!
//! Depositors insert a commitment `H(nullifier, secret)` into an incremental
//! Merkle tree and later withdraw to any address by presenting a
//! zero-knowledge proof against one of the recent tree roots together with the
//! note's nullifier hash. Governance may revoke a deposited commitment, which
//! empties its leaf and invalidates every earlier root.
//!
//! # Components
//!
//! - [`PrivacyPool`]: deposit, withdraw and revoke over the pieces below
//! - [`IncrementalMerkleTree`]: append-only accumulator with [`RootHistory`]
//! - [`Ledger`]: submitted commitments and spent nullifier hashes
//! - [`MerkleTree`]: full reference tree used to build paths and revocation witnesses
//! - [`ProofVerifier`] / [`AssetTransfer`]: collaborator seams
//! - [`circuit`]: Halo2 withdrawal circuit, prover and verifier
//!
//! # Example
//!
//! ```
//! use privacy_pool::{
//!     Address, NativeBalances, PoolParams, PoseidonHasher, PrivacyPool, PublicInputs,
//!     TxContext, FieldElement,
//! };
//!
//! let alice = Address::new([1; 20]);
//! let mut assets = NativeBalances::new();
//! assets.credit(alice, 10).unwrap();
//!
//! let params = PoolParams { denomination: 10, height: 8, ..PoolParams::default() };
//! let accept = |_: &[u8], _: &PublicInputs| true;
//! let mut pool = PrivacyPool::new(params, PoseidonHasher, accept, assets).unwrap();
//!
//! let index = pool.deposit(&TxContext::new(alice, 0), FieldElement::from(42)).unwrap();
//! assert_eq!(index, 0);
//! ```

pub mod accumulator;
pub mod circuit;
pub mod config;
pub mod error;
pub mod events;
pub mod hasher;
pub mod history;
pub mod ledger;
pub mod merkle;
pub mod note;
pub mod pool;
pub mod revocation;
pub mod state;
pub mod transfer;
pub mod types;
pub mod utils;
pub mod verifier;


pub use accumulator::IncrementalMerkleTree;
pub use circuit::{Halo2Verifier, WithdrawCircuit, WithdrawKeys, WithdrawProver};
pub use error::PoolError;
pub use events::PoolEvent;
pub use hasher::{FieldHasher, PoseidonHasher};
pub use history::RootHistory;
pub use ledger::Ledger;
pub use merkle::{MerkleProof, MerkleTree};
pub use note::Note;
pub use pool::{PoolParams, PrivacyPool};
pub use revocation::RevocationRequest;
pub use state::{PoolSnapshot, PoolState};
pub use transfer::{AssetTransfer, NativeBalances, Payout, TransferError};
pub use types::{Address, PublicInputs, TxContext, WithdrawalProof, WithdrawalRequest};
pub use utils::FieldElement;
pub use verifier::ProofVerifier;

/// Circuit parameter for the Halo2 proving system.
///
/// The withdrawal circuit only lays out its six public inputs, so `2^5 = 32`
/// rows leave room for the blinding rows halo2 reserves.
///
/// # Security Considerations
///
/// Changing `CIRCUIT_K` requires regenerating all proving and verifying keys.
/// Prover and verifier must use the same value, or verification will fail.
pub const CIRCUIT_K: u32 = 5;
