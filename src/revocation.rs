//! Retroactive revocation of a single leaf.
//!
//! A revocation empties one leaf and must show that nothing else moved. Three
//! roots are derived and compared before any state is touched:
//!
//! 1. the target commitment replayed along `path` must give the latest root;
//! 2. the empty leaf replayed along the same `path` gives the revoked root;
//! 3. the last inserted leaf replayed along `last_path` must give that same
//!    revoked root. This walk also yields the new `filled_subtrees`.
//!
//! On success every root-history slot is overwritten with the revoked root,
//! so any proof built against an earlier root is rejected afterwards.

use crate::accumulator::IncrementalMerkleTree;
use crate::error::PoolError;
use crate::hasher::FieldHasher;
use crate::utils::{hex_field, hex_field_vec, FieldElement};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Witness for revoking the commitment at `leaf_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRequest {
    /// Commitment to revoke
    #[serde(with = "hex_field")]
    pub commitment: FieldElement,
    /// Index the commitment was inserted at
    pub leaf_index: u64,
    /// Siblings of the target leaf in the current tree, leaf level first
    #[serde(with = "hex_field_vec")]
    pub path: Vec<FieldElement>,
    /// The most recently inserted commitment
    #[serde(with = "hex_field")]
    pub last_commitment: FieldElement,
    /// Siblings of the last leaf in the revoked tree, leaf level first
    #[serde(with = "hex_field_vec")]
    pub last_path: Vec<FieldElement>,
}

impl<H: FieldHasher> IncrementalMerkleTree<H> {
    /// Empties the leaf described by `request` and returns the new root.
    ///
    /// Fails with [`PoolError::InvalidMembershipProof`] when the target path
    /// does not reproduce the latest root, and with
    /// [`PoolError::InconsistentRevocation`] when the last-leaf path does not
    /// reproduce the revoked root. The tree is unchanged on failure.
    pub fn revoke_leaf(&mut self, request: &RevocationRequest) -> Result<FieldElement, PoolError> {
        let height = self.height as usize;

        if request.leaf_index >= self.next_index || request.path.len() != height {
            warn!(
                "Rejected revocation of leaf {}: index or path length out of range",
                request.leaf_index
            );
            return Err(PoolError::InvalidMembershipProof);
        }

        if request.commitment == self.empty_leaf() {
            warn!(
                "Rejected revocation of leaf {}: slot already holds the empty leaf",
                request.leaf_index
            );
            return Err(PoolError::InvalidMembershipProof);
        }

        let current_root = self.current_root();
        let proven_root = self.root_from_path(request.commitment, request.leaf_index, &request.path);
        if proven_root != current_root {
            warn!(
                "Rejected revocation of leaf {}: membership path does not match current root",
                request.leaf_index
            );
            return Err(PoolError::InvalidMembershipProof);
        }

        let empty = self.empty_leaf();
        let revoked_root = self.root_from_path(empty, request.leaf_index, &request.path);

        let last_index = self.next_index - 1;
        let last_leaf = if last_index == request.leaf_index {
            if request.last_commitment != request.commitment {
                return Err(PoolError::InconsistentRevocation);
            }
            empty
        } else {
            request.last_commitment
        };

        let (rederived_root, filled_subtrees) =
            self.replay_last_leaf(last_leaf, last_index, &request.last_path)?;
        if rederived_root != revoked_root {
            warn!(
                "Rejected revocation of leaf {}: last-leaf path does not match revoked root",
                request.leaf_index
            );
            return Err(PoolError::InconsistentRevocation);
        }

        self.filled_subtrees = filled_subtrees;
        self.history.reset_to(revoked_root);
        debug!(
            "Revoked leaf {}, root history reset",
            request.leaf_index
        );

        Ok(revoked_root)
    }

    /// Walks from the last leaf to the root, recording the left node of every
    /// level the way insertion does.
    fn replay_last_leaf(
        &self,
        leaf: FieldElement,
        index: u64,
        siblings: &[FieldElement],
    ) -> Result<(FieldElement, Vec<FieldElement>), PoolError> {
        if siblings.len() != self.height as usize {
            return Err(PoolError::InconsistentRevocation);
        }

        let mut filled = self.filled_subtrees.clone();
        let mut current = leaf;
        let mut index = index;

        for (level, sibling) in siblings.iter().enumerate() {
            current = if index % 2 == 0 {
                filled[level] = current;
                self.hasher.hash_two(current, *sibling)
            } else {
                filled[level] = *sibling;
                self.hasher.hash_two(*sibling, current)
            };
            index /= 2;
        }

        Ok((current, filled))
    }
}
