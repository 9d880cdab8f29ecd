//! Hash adapter shared by the tree, the notes and the proof circuit.
//!
//! The tree and any circuit proving membership in it must hash with exactly
//! the same function, input order and encoding, otherwise proofs verify
//! against the wrong root.

use crate::utils::{bytes_to_field, FieldElement};
use halo2_gadgets::poseidon::primitives::{
    self as poseidon, ConstantLength, P128Pow5T3 as PoseidonSpec,
};
use sha3::{Digest, Keccak256};

/// Domain tag whose Keccak-256 digest becomes the empty-leaf value.
pub const EMPTY_LEAF_TAG: &[u8] = b"privacy-pool";

/// One- and two-input hash over the field.
pub trait FieldHasher: Clone {
    /// Hash a single element (nullifier hashes).
    fn hash_one(&self, value: FieldElement) -> FieldElement;

    /// Hash an ordered pair (tree nodes and commitments).
    fn hash_two(&self, left: FieldElement, right: FieldElement) -> FieldElement;
}

/// Poseidon with the `P128Pow5T3` parameters (width 3, rate 2).
///
/// # Example
///
/// ```
/// use privacy_pool::hasher::{FieldHasher, PoseidonHasher};
/// use privacy_pool::utils::FieldElement;
///
/// let hasher = PoseidonHasher;
/// let node = hasher.hash_two(FieldElement::from(1), FieldElement::from(2));
/// assert_ne!(node, hasher.hash_two(FieldElement::from(2), FieldElement::from(1)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoseidonHasher;

impl FieldHasher for PoseidonHasher {
    #[inline]
    fn hash_one(&self, value: FieldElement) -> FieldElement {
        poseidon::Hash::<_, PoseidonSpec, ConstantLength<1>, 3, 2>::init().hash([value])
    }

    #[inline]
    fn hash_two(&self, left: FieldElement, right: FieldElement) -> FieldElement {
        poseidon::Hash::<_, PoseidonSpec, ConstantLength<2>, 3, 2>::init().hash([left, right])
    }
}

/// Canonical digest of an empty leaf.
#[must_use]
pub fn empty_leaf() -> FieldElement {
    let digest: [u8; 32] = Keccak256::digest(EMPTY_LEAF_TAG).into();
    bytes_to_field(&digest)
}

/// Roots of empty subtrees: `zeros[0]` is the empty leaf and
/// `zeros[i + 1] = H(zeros[i], zeros[i])`. Returns `height + 1` entries.
#[must_use]
pub fn zero_hashes<H: FieldHasher>(hasher: &H, height: usize) -> Vec<FieldElement> {
    let mut zeros = Vec::with_capacity(height + 1);
    let mut current = empty_leaf();
    zeros.push(current);
    for _ in 0..height {
        current = hasher.hash_two(current, current);
        zeros.push(current);
    }
    zeros
}
