//! Submitted commitments and spent nullifier hashes.

use crate::error::PoolError;
use crate::utils::{field_to_bytes, FieldElement, FIELD_BYTES};
use std::collections::BTreeSet;

type Key = [u8; FIELD_BYTES];

/// Deduplication set for commitments and double-spend set for nullifier hashes.
///
/// Neither set ever shrinks through a public operation: a revoked commitment
/// stays recorded and can not be deposited again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    commitments: BTreeSet<Key>,
    nullifiers: BTreeSet<Key>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a commitment, failing if it was seen before.
    pub fn record_commitment(&mut self, commitment: FieldElement) -> Result<(), PoolError> {
        if self.commitments.insert(field_to_bytes(commitment)) {
            Ok(())
        } else {
            Err(PoolError::DuplicateCommitment)
        }
    }

    #[must_use]
    pub fn is_recorded(&self, commitment: &FieldElement) -> bool {
        self.commitments.contains(&field_to_bytes(*commitment))
    }

    /// Marks a nullifier hash spent, failing if it already is.
    pub fn mark_spent(&mut self, nullifier_hash: FieldElement) -> Result<(), PoolError> {
        if self.nullifiers.insert(field_to_bytes(nullifier_hash)) {
            Ok(())
        } else {
            Err(PoolError::AlreadySpent)
        }
    }

    #[must_use]
    pub fn is_spent(&self, nullifier_hash: &FieldElement) -> bool {
        self.nullifiers.contains(&field_to_bytes(*nullifier_hash))
    }

    #[must_use]
    pub fn is_spent_batch(&self, nullifier_hashes: &[FieldElement]) -> Vec<bool> {
        nullifier_hashes.iter().map(|n| self.is_spent(n)).collect()
    }

    /// Recorded commitments in canonical encoding order.
    pub fn commitments(&self) -> impl Iterator<Item = &Key> + '_ {
        self.commitments.iter()
    }

    /// Spent nullifier hashes in canonical encoding order.
    pub fn nullifiers(&self) -> impl Iterator<Item = &Key> + '_ {
        self.nullifiers.iter()
    }

    pub(crate) fn from_sets(commitments: BTreeSet<Key>, nullifiers: BTreeSet<Key>) -> Self {
        Self {
            commitments,
            nullifiers,
        }
    }

    /// Rollback of a commitment recorded by an operation that later failed.
    pub(crate) fn release_commitment(&mut self, commitment: &FieldElement) {
        self.commitments.remove(&field_to_bytes(*commitment));
    }

    /// Rollback of a nullifier marked by an operation that later failed.
    pub(crate) fn release_nullifier(&mut self, nullifier_hash: &FieldElement) {
        self.nullifiers.remove(&field_to_bytes(*nullifier_hash));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_commitment_dedup() {
        let mut ledger = Ledger::new();
        let c = FieldElement::from(5);
        assert!(ledger.record_commitment(c).is_ok());
        assert!(ledger.is_recorded(&c));
        assert_eq!(
            ledger.record_commitment(c),
            Err(PoolError::DuplicateCommitment)
        );
        assert_eq!(ledger.commitments().count(), 1);
    }

    #[test]
    fn test_mark_spent_once() {
        let mut ledger = Ledger::new();
        let n = FieldElement::from(8);
        assert!(!ledger.is_spent(&n));
        ledger.mark_spent(n).unwrap();
        assert!(ledger.is_spent(&n));
        assert_eq!(ledger.mark_spent(n), Err(PoolError::AlreadySpent));
    }

    #[test]
    fn test_is_spent_batch() {
        let mut ledger = Ledger::new();
        ledger.mark_spent(FieldElement::from(1)).unwrap();
        ledger.mark_spent(FieldElement::from(3)).unwrap();

        let query: Vec<_> = (1..=4).map(FieldElement::from).collect();
        assert_eq!(ledger.is_spent_batch(&query), vec![true, false, true, false]);
        assert!(ledger.is_spent_batch(&[]).is_empty());
    }

    #[test]
    fn test_release_undoes_marks() {
        let mut ledger = Ledger::new();
        let c = FieldElement::from(2);
        ledger.record_commitment(c).unwrap();
        ledger.mark_spent(c).unwrap();
        ledger.release_commitment(&c);
        ledger.release_nullifier(&c);
        assert_eq!(ledger, Ledger::new());
    }
}
