//! Bounded history of recent tree roots.

use crate::error::PoolError;
use crate::utils::FieldElement;
use pasta_curves::group::ff::Field;

/// Default number of roots a withdrawal may reference.
pub const ROOT_HISTORY_SIZE: usize = 30;

/// Circular buffer of the most recent roots.
///
/// Slots that were never written hold zero, and zero is never a known root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootHistory {
    roots: Vec<FieldElement>,
    cursor: usize,
}

impl RootHistory {
    /// Creates a buffer of `capacity` slots with `initial_root` in slot 0.
    pub fn new(capacity: usize, initial_root: FieldElement) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::InvalidConfig(
                "root history size must be at least 1".to_string(),
            ));
        }
        let mut roots = vec![FieldElement::ZERO; capacity];
        roots[0] = initial_root;
        Ok(Self { roots, cursor: 0 })
    }

    /// Rebuilds a buffer from persisted slots.
    pub fn from_parts(roots: Vec<FieldElement>, cursor: usize) -> Result<Self, PoolError> {
        if roots.is_empty() || cursor >= roots.len() {
            return Err(PoolError::InvalidSnapshot(format!(
                "root history cursor {} out of range for {} slots",
                cursor,
                roots.len()
            )));
        }
        if bool::from(roots[cursor].is_zero()) {
            return Err(PoolError::InvalidSnapshot(
                "current root slot is empty".to_string(),
            ));
        }
        Ok(Self { roots, cursor })
    }

    /// Appends a root, overwriting the oldest slot once the buffer is full.
    pub fn push(&mut self, root: FieldElement) {
        self.cursor = (self.cursor + 1) % self.roots.len();
        self.roots[self.cursor] = root;
    }

    /// Overwrites every slot with `root`, forgetting all earlier roots.
    pub fn reset_to(&mut self, root: FieldElement) {
        self.roots.iter_mut().for_each(|slot| *slot = root);
    }

    #[must_use]
    pub fn current(&self) -> FieldElement {
        self.roots[self.cursor]
    }

    /// Linear scan over the buffer; zero is never known.
    #[must_use]
    pub fn contains(&self, root: &FieldElement) -> bool {
        if bool::from(root.is_zero()) {
            return false;
        }
        self.roots.iter().any(|known| known == root)
    }

    #[must_use]
    pub fn roots(&self) -> &[FieldElement] {
        &self.roots
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.roots.len()
    }
}
