//! The privacy pool: deposits, proof-gated withdrawals and revocation.
//!
//! Operations run one at a time to completion (`&mut self`) and are
//! all-or-nothing. Collaborators never receive a handle to the pool, so a
//! transfer can not re-enter an operation that is still running.

use crate::accumulator::{IncrementalMerkleTree, DEFAULT_TREE_HEIGHT};
use crate::error::PoolError;
use crate::events::PoolEvent;
use crate::hasher::{FieldHasher, PoseidonHasher};
use crate::history::ROOT_HISTORY_SIZE;
use crate::ledger::Ledger;
use crate::revocation::RevocationRequest;
use crate::transfer::{AssetTransfer, Payout};
use crate::types::{Address, TxContext, WithdrawalRequest};
use crate::utils::{field_to_hex, FieldElement};
use crate::verifier::ProofVerifier;
use log::{info, warn};

/// Parameters fixed when a pool is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolParams {
    pub height: u32,
    pub root_history_size: usize,
    /// Amount every deposit pays in and every withdrawal pays out
    pub denomination: u64,
    /// Only account allowed to revoke; `None` disables revocation
    pub governance: Option<Address>,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            height: DEFAULT_TREE_HEIGHT,
            root_history_size: ROOT_HISTORY_SIZE,
            denomination: 1_000_000_000,
            governance: None,
        }
    }
}

/// Fixed-denomination pool owning the tree, the ledger and its collaborators.
pub struct PrivacyPool<V, T, H: FieldHasher = PoseidonHasher> {
    pub(crate) params: PoolParams,
    pub(crate) tree: IncrementalMerkleTree<H>,
    pub(crate) ledger: Ledger,
    pub(crate) events: Vec<PoolEvent>,
    verifier: V,
    assets: T,
}

impl<V, T, H> PrivacyPool<V, T, H>
where
    V: ProofVerifier,
    T: AssetTransfer,
    H: FieldHasher,
{
    /// Creates an empty pool.
    pub fn new(params: PoolParams, hasher: H, verifier: V, assets: T) -> Result<Self, PoolError> {
        if params.denomination == 0 {
            return Err(PoolError::InvalidConfig(
                "denomination must be greater than zero".to_string(),
            ));
        }
        let tree = IncrementalMerkleTree::new(hasher, params.height, params.root_history_size)?;
        info!(
            "Created pool: height {}, root history {}, denomination {}",
            params.height, params.root_history_size, params.denomination
        );

        Ok(Self::from_parts(
            params,
            tree,
            Ledger::new(),
            Vec::new(),
            verifier,
            assets,
        ))
    }

    /// Inserts `commitment` and collects one denomination from the caller.
    ///
    /// Returns the leaf index assigned to the commitment.
    pub fn deposit(
        &mut self,
        ctx: &TxContext,
        commitment: FieldElement,
    ) -> Result<u64, PoolError> {
        if commitment == self.tree.empty_leaf() {
            warn!("Rejected deposit: commitment is the empty leaf");
            return Err(PoolError::ReservedCommitment);
        }
        if self.ledger.is_recorded(&commitment) {
            warn!("Rejected deposit: duplicate commitment {}", field_to_hex(commitment));
            return Err(PoolError::DuplicateCommitment);
        }

        let tree_before = self.tree.clone();
        let leaf_index = self.tree.insert(commitment)?;
        self.ledger.record_commitment(commitment)?;

        if let Err(e) = self.assets.transfer_in(&ctx.caller, self.params.denomination) {
            warn!("Deposit transfer from {} failed: {e}", ctx.caller);
            self.tree = tree_before;
            self.ledger.release_commitment(&commitment);
            return Err(e.into());
        }

        info!(
            "Deposit: commitment {} at leaf {leaf_index}",
            field_to_hex(commitment)
        );
        self.events.push(PoolEvent::Deposit {
            commitment,
            leaf_index,
            timestamp: ctx.timestamp,
        });

        Ok(leaf_index)
    }

    /// Releases one denomination if the proof checks out against a known root.
    ///
    /// Checks run in order: fee bound, nullifier, root, proof.
    pub fn withdraw(
        &mut self,
        _ctx: &TxContext,
        request: &WithdrawalRequest,
    ) -> Result<(), PoolError> {
        let inputs = &request.inputs;

        if inputs.fee > self.params.denomination {
            return Err(PoolError::FeeTooHigh {
                fee: inputs.fee,
                denomination: self.params.denomination,
            });
        }
        if self.ledger.is_spent(&inputs.nullifier_hash) {
            warn!(
                "Rejected withdrawal: nullifier {} already spent",
                field_to_hex(inputs.nullifier_hash)
            );
            return Err(PoolError::AlreadySpent);
        }
        if !self.tree.is_known_root(&inputs.root) {
            warn!("Rejected withdrawal: unknown root {}", field_to_hex(inputs.root));
            return Err(PoolError::UnknownRoot);
        }
        if !self.verifier.verify(&request.proof, inputs) {
            warn!("Rejected withdrawal: invalid proof");
            return Err(PoolError::InvalidProof);
        }

        self.ledger.mark_spent(inputs.nullifier_hash)?;

        let payout = Payout {
            recipient: inputs.recipient,
            relayer: inputs.relayer,
            amount: self.params.denomination,
            fee: inputs.fee,
            refund: inputs.refund,
        };
        if let Err(e) = self.assets.transfer_out(&payout) {
            warn!("Withdrawal payout to {} failed: {e}", inputs.recipient);
            self.ledger.release_nullifier(&inputs.nullifier_hash);
            return Err(e.into());
        }

        info!(
            "Withdrawal to {} (relayer {}, fee {})",
            inputs.recipient, inputs.relayer, inputs.fee
        );
        self.events.push(PoolEvent::Withdrawal {
            recipient: inputs.recipient,
            nullifier_hash: inputs.nullifier_hash,
            relayer: inputs.relayer,
            fee: inputs.fee,
        });

        Ok(())
    }

    /// Empties the leaf of a deposited commitment. Governance only.
    ///
    /// All earlier roots become unknown, so pending withdrawals must be
    /// re-proven against the returned root. The commitment stays recorded and
    /// its denomination stays in the pool.
    pub fn revoke(
        &mut self,
        ctx: &TxContext,
        request: &RevocationRequest,
    ) -> Result<FieldElement, PoolError> {
        if self.params.governance != Some(ctx.caller) {
            warn!("Rejected revocation from unauthorized caller {}", ctx.caller);
            return Err(PoolError::Unauthorized);
        }
        if !self.ledger.is_recorded(&request.commitment) {
            return Err(PoolError::InvalidMembershipProof);
        }

        let root = self.tree.revoke_leaf(request)?;

        info!(
            "Revoked commitment {} at leaf {}",
            field_to_hex(request.commitment),
            request.leaf_index
        );
        self.events.push(PoolEvent::Revoked {
            commitment: request.commitment,
            leaf_index: request.leaf_index,
            timestamp: ctx.timestamp,
        });

        Ok(root)
    }
}

impl<V, T, H: FieldHasher> PrivacyPool<V, T, H> {
    pub(crate) fn from_parts(
        params: PoolParams,
        tree: IncrementalMerkleTree<H>,
        ledger: Ledger,
        events: Vec<PoolEvent>,
        verifier: V,
        assets: T,
    ) -> Self {
        Self {
            params,
            tree,
            ledger,
            events,
            verifier,
            assets,
        }
    }

    #[must_use]
    pub fn is_spent(&self, nullifier_hash: &FieldElement) -> bool {
        self.ledger.is_spent(nullifier_hash)
    }

    #[must_use]
    pub fn is_spent_batch(&self, nullifier_hashes: &[FieldElement]) -> Vec<bool> {
        self.ledger.is_spent_batch(nullifier_hashes)
    }

    #[must_use]
    pub fn current_root(&self) -> FieldElement {
        self.tree.current_root()
    }

    #[must_use]
    pub fn is_known_root(&self, root: &FieldElement) -> bool {
        self.tree.is_known_root(root)
    }

    #[must_use]
    pub fn is_commitment_recorded(&self, commitment: &FieldElement) -> bool {
        self.ledger.is_recorded(commitment)
    }

    #[must_use]
    pub fn denomination(&self) -> u64 {
        self.params.denomination
    }

    #[must_use]
    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    /// Read-only view of the incremental tree state.
    #[must_use]
    pub fn tree(&self) -> &IncrementalMerkleTree<H> {
        &self.tree
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    #[must_use]
    pub fn assets(&self) -> &T {
        &self.assets
    }

    /// Mutable access to the transfer backend, e.g. to fund test accounts.
    pub fn assets_mut(&mut self) -> &mut T {
        &mut self.assets
    }

    #[must_use]
    pub fn verifier(&self) -> &V {
        &self.verifier
    }
}
