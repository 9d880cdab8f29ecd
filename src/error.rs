//! Error types surfaced by pool operations.

use crate::transfer::TransferError;

/// Reasons a deposit, withdrawal or revocation is rejected.
///
/// Every variant aborts the operation with no state change. Relayers match on
/// the variant to tell a stale root apart from a spent note or a bad proof.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The commitment was submitted before (possibly since revoked)
    #[error("Commitment has already been submitted")]
    DuplicateCommitment,
    /// The nullifier hash has already been used for a withdrawal
    #[error("Nullifier hash has already been spent")]
    AlreadySpent,
    /// The claimed root is not in the recent root history
    #[error("Merkle root is not in the recent root history")]
    UnknownRoot,
    /// The proof verifier rejected the public inputs
    #[error("Withdrawal proof is invalid")]
    InvalidProof,
    /// Relayer fee exceeds the pool denomination
    #[error("Fee {fee} exceeds pool denomination {denomination}")]
    FeeTooHigh { fee: u64, denomination: u64 },
    /// The commitment equals the empty-leaf digest reserved for empty slots
    #[error("Commitment is the reserved empty-leaf value")]
    ReservedCommitment,
    /// Every leaf slot is taken
    #[error("Merkle tree is full ({capacity} leaves)")]
    TreeFull { capacity: u64 },
    /// The revocation path does not reproduce the latest root
    #[error("Membership proof does not match the current root")]
    InvalidMembershipProof,
    /// The last-leaf path does not reproduce the revoked root
    #[error("Revocation witness is inconsistent with the revoked tree")]
    InconsistentRevocation,
    /// The transfer collaborator refused to move funds
    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] TransferError),
    /// Caller is not the governance account
    #[error("Caller is not authorized to revoke commitments")]
    Unauthorized,
    /// Construction parameters are out of range
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),
    /// Persisted state does not describe a consistent pool
    #[error("Invalid pool snapshot: {0}")]
    InvalidSnapshot(String),
}
