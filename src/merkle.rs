//! Full reference Merkle tree.
//!
//! The pool itself keeps only the incremental state. This tree holds every
//! leaf (as an indexer rebuilds them from deposit and revocation events) and
//! produces the inclusion paths and revocation witnesses callers submit.
//! It pads with the same empty-subtree roots and uses the same parity
//! convention as [`crate::accumulator`].

use crate::error::PoolError;
use crate::hasher::{zero_hashes, FieldHasher, PoseidonHasher};
use crate::revocation::RevocationRequest;
use crate::utils::{field_to_hex, FieldElement};
use std::fmt;

/// A Merkle proof for leaf inclusion.
///
/// Contains the leaf value, root hash, sibling hashes (leaf level first) and leaf index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf: FieldElement,
    pub root: FieldElement,
    pub siblings: Vec<FieldElement>,
    pub index: u64,
}

/// A fixed-height binary Merkle tree storing all occupied leaves.
#[derive(Debug, Clone)]
pub struct MerkleTree<H: FieldHasher = PoseidonHasher> {
    hasher: H,
    height: u32,
    zeros: Vec<FieldElement>,
    leaves: Vec<FieldElement>,
    root: FieldElement,
}

impl<H: FieldHasher> MerkleTree<H> {
    /// Create a tree of `height` levels holding `leaves` at indices `0..leaves.len()`.
    ///
    /// # Errors
    /// Returns [`PoolError::TreeFull`] if there are more leaves than `2^height`.
    pub fn new(hasher: H, height: u32, leaves: Vec<FieldElement>) -> Result<Self, PoolError> {
        if height == 0 || height > crate::accumulator::MAX_TREE_HEIGHT {
            return Err(PoolError::InvalidConfig(format!(
                "tree height out of range: {height}"
            )));
        }
        let capacity = 1u64 << height;
        if leaves.len() as u64 > capacity {
            return Err(PoolError::TreeFull { capacity });
        }

        let zeros = zero_hashes(&hasher, height as usize);
        let mut tree = MerkleTree {
            hasher,
            height,
            root: zeros[height as usize],
            zeros,
            leaves,
        };
        tree.recompute_root();
        Ok(tree)
    }

    fn levels(&self) -> Vec<Vec<FieldElement>> {
        let mut levels = Vec::with_capacity(self.height as usize + 1);
        levels.push(self.leaves.clone());

        for level in 0..self.height as usize {
            let current = &levels[level];
            let next: Vec<FieldElement> = current
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(self.zeros[level]);
                    self.hasher.hash_two(pair[0], right)
                })
                .collect();
            levels.push(next);
        }

        levels
    }

    fn recompute_root(&mut self) {
        let levels = self.levels();
        self.root = levels[self.height as usize]
            .first()
            .copied()
            .unwrap_or(self.zeros[self.height as usize]);
    }

    #[must_use]
    pub fn root(&self) -> FieldElement {
        self.root
    }

    #[must_use]
    pub fn leaves(&self) -> &[FieldElement] {
        &self.leaves
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn empty_leaf(&self) -> FieldElement {
        self.zeros[0]
    }

    /// Append a leaf, returning its index.
    ///
    /// Rebuilds every level, so a loop of pushes is quadratic. Build from the
    /// full leaf list with [`MerkleTree::new`] instead.
    pub fn push(&mut self, leaf: FieldElement) -> Result<u64, PoolError> {
        let capacity = 1u64 << self.height;
        let index = self.leaves.len() as u64;
        if index >= capacity {
            return Err(PoolError::TreeFull { capacity });
        }
        self.leaves.push(leaf);
        self.recompute_root();
        Ok(index)
    }

    /// Overwrite an occupied leaf. Returns `false` if `index` is not occupied.
    ///
    /// Like [`MerkleTree::push`] this rebuilds every level.
    pub fn set_leaf(&mut self, index: u64, value: FieldElement) -> bool {
        let Some(slot) = usize::try_from(index)
            .ok()
            .and_then(|i| self.leaves.get_mut(i))
        else {
            return false;
        };
        *slot = value;
        self.recompute_root();
        true
    }

    /// Generate a Merkle proof for a leaf at the given index.
    ///
    /// # Returns
    /// `Some(MerkleProof)` if the index is occupied, `None` otherwise
    #[must_use]
    pub fn generate_proof(&self, leaf_index: u64) -> Option<MerkleProof> {
        let position = usize::try_from(leaf_index).ok()?;
        let leaf = *self.leaves.get(position)?;

        let levels = self.levels();
        let mut siblings = Vec::with_capacity(self.height as usize);
        let mut index = position;

        for (level, nodes) in levels.iter().take(self.height as usize).enumerate() {
            let sibling_index = index ^ 1;
            siblings.push(nodes.get(sibling_index).copied().unwrap_or(self.zeros[level]));
            index /= 2;
        }

        Some(MerkleProof {
            leaf,
            root: self.root,
            siblings,
            index: leaf_index,
        })
    }

    /// Verify a Merkle proof against this tree's root.
    #[must_use]
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        if proof.root != self.root || proof.siblings.len() != self.height as usize {
            return false;
        }

        crate::accumulator::root_from_path(&self.hasher, proof.leaf, proof.index, &proof.siblings)
            == self.root
    }

    /// Build the witness that revokes the leaf at `leaf_index`.
    ///
    /// The first path proves the leaf against the current root; the second is
    /// the path of the last occupied leaf once the target has been emptied.
    #[must_use]
    pub fn revocation_request(&self, leaf_index: u64) -> Option<RevocationRequest> {
        let target = self.generate_proof(leaf_index)?;
        let last_index = (self.leaves.len() as u64).checked_sub(1)?;
        let last_commitment = self.leaves.last().copied()?;

        let mut revoked = self.clone();
        revoked.set_leaf(leaf_index, self.empty_leaf());
        let last = revoked.generate_proof(last_index)?;

        Some(RevocationRequest {
            commitment: target.leaf,
            leaf_index,
            path: target.siblings,
            last_commitment,
            last_path: last.siblings,
        })
    }
}

impl fmt::Display for MerkleProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MerkleProof:\n  Leaf: {}\n  Root: {}\n  Index: {}\n  Siblings: {}",
            field_to_hex(self.leaf),
            field_to_hex(self.root),
            self.index,
            self.siblings.len()
        )
    }
}
