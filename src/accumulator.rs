//! Append-only Merkle accumulator.
//!
//! Only the left "fencepost" node of each level (`filled_subtrees`) is kept,
//! so insertion costs O(height) hashes and the state is O(height) no matter
//! how many leaves have been inserted.
//!
//! Parity convention, shared by insertion and path replay: an even index is a
//! left child, an odd index a right child, and the index halves per level.

use crate::error::PoolError;
use crate::hasher::{zero_hashes, FieldHasher, PoseidonHasher};
use crate::history::RootHistory;
use crate::utils::FieldElement;
use log::debug;

/// Default tree height.
pub const DEFAULT_TREE_HEIGHT: u32 = 20;

/// Largest supported height; leaf indices must fit a `u64` with room to spare.
pub const MAX_TREE_HEIGHT: u32 = 32;

/// Recomputes a root from a leaf, its index and `siblings` ordered leaf level first.
///
/// # Example
///
/// ```
/// use privacy_pool::accumulator::root_from_path;
/// use privacy_pool::hasher::{FieldHasher, PoseidonHasher};
/// use privacy_pool::utils::FieldElement;
///
/// let h = PoseidonHasher;
/// let (a, b) = (FieldElement::from(1), FieldElement::from(2));
/// assert_eq!(root_from_path(&h, b, 1, &[a]), h.hash_two(a, b));
/// ```
#[must_use]
pub fn root_from_path<H: FieldHasher>(
    hasher: &H,
    leaf: FieldElement,
    index: u64,
    siblings: &[FieldElement],
) -> FieldElement {
    let mut current = leaf;
    let mut index = index;

    for sibling in siblings {
        current = if index % 2 == 0 {
            hasher.hash_two(current, *sibling)
        } else {
            hasher.hash_two(*sibling, current)
        };
        index /= 2;
    }

    current
}

/// Fixed-height incremental Merkle tree with bounded root history.
#[derive(Debug, Clone)]
pub struct IncrementalMerkleTree<H: FieldHasher = PoseidonHasher> {
    pub(crate) hasher: H,
    pub(crate) height: u32,
    pub(crate) next_index: u64,
    pub(crate) zeros: Vec<FieldElement>,
    pub(crate) filled_subtrees: Vec<FieldElement>,
    pub(crate) history: RootHistory,
}

impl<H: FieldHasher> IncrementalMerkleTree<H> {
    /// Creates an empty tree whose only known root is the all-empty root.
    pub fn new(hasher: H, height: u32, root_history_size: usize) -> Result<Self, PoolError> {
        if height == 0 || height > MAX_TREE_HEIGHT {
            return Err(PoolError::InvalidConfig(format!(
                "tree height must be within 1..={MAX_TREE_HEIGHT}, got {height}"
            )));
        }

        let zeros = zero_hashes(&hasher, height as usize);
        let filled_subtrees = zeros[..height as usize].to_vec();
        let history = RootHistory::new(root_history_size, zeros[height as usize])?;

        Ok(Self {
            hasher,
            height,
            next_index: 0,
            zeros,
            filled_subtrees,
            history,
        })
    }

    /// Restores a tree from persisted incremental state.
    pub fn from_parts(
        hasher: H,
        height: u32,
        next_index: u64,
        filled_subtrees: Vec<FieldElement>,
        history: RootHistory,
    ) -> Result<Self, PoolError> {
        let mut tree = Self::new(hasher, height, history.capacity())?;
        if filled_subtrees.len() != height as usize {
            return Err(PoolError::InvalidSnapshot(format!(
                "expected {} filled subtrees, got {}",
                height,
                filled_subtrees.len()
            )));
        }
        if next_index > tree.capacity() {
            return Err(PoolError::InvalidSnapshot(format!(
                "next index {} exceeds capacity {}",
                next_index,
                tree.capacity()
            )));
        }
        tree.next_index = next_index;
        tree.filled_subtrees = filled_subtrees;
        tree.history = history;
        Ok(tree)
    }

    /// Appends a leaf and returns its index.
    pub fn insert(&mut self, leaf: FieldElement) -> Result<u64, PoolError> {
        let capacity = self.capacity();
        if self.next_index >= capacity {
            return Err(PoolError::TreeFull { capacity });
        }

        let leaf_index = self.next_index;
        let mut index = leaf_index;
        let mut current = leaf;

        for level in 0..self.height as usize {
            let (left, right) = if index % 2 == 0 {
                self.filled_subtrees[level] = current;
                (current, self.zeros[level])
            } else {
                (self.filled_subtrees[level], current)
            };
            current = self.hasher.hash_two(left, right);
            index /= 2;
        }

        self.history.push(current);
        self.next_index += 1;
        debug!("Inserted leaf {leaf_index}, next index {}", self.next_index);

        Ok(leaf_index)
    }

    #[must_use]
    pub fn current_root(&self) -> FieldElement {
        self.history.current()
    }

    #[must_use]
    pub fn is_known_root(&self, root: &FieldElement) -> bool {
        self.history.contains(root)
    }

    /// Replays a path with this tree's hasher.
    #[must_use]
    pub fn root_from_path(
        &self,
        leaf: FieldElement,
        index: u64,
        siblings: &[FieldElement],
    ) -> FieldElement {
        root_from_path(&self.hasher, leaf, index, siblings)
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Number of leaf slots, `2^height`.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        1u64 << self.height
    }

    #[must_use]
    pub fn filled_subtrees(&self) -> &[FieldElement] {
        &self.filled_subtrees
    }

    /// Empty-subtree roots, `height + 1` entries.
    #[must_use]
    pub fn zeros(&self) -> &[FieldElement] {
        &self.zeros
    }

    /// Digest occupying an empty or revoked leaf slot.
    #[must_use]
    pub fn empty_leaf(&self) -> FieldElement {
        self.zeros[0]
    }

    #[must_use]
    pub fn history(&self) -> &RootHistory {
        &self.history
    }

    #[must_use]
    pub fn hasher(&self) -> &H {
        &self.hasher
    }
}
