//! Deposit notes: the secret pair behind a commitment.

use crate::hasher::FieldHasher;
use crate::utils::{hex_field, FieldElement};
use pasta_curves::group::ff::Field;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Secret material of one deposit. Only the commitment goes on chain;
/// withdrawing later reveals only the nullifier hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(with = "hex_field")]
    pub nullifier: FieldElement,
    #[serde(with = "hex_field")]
    pub secret: FieldElement,
}

impl Note {
    /// Draws a fresh note from the operating system RNG.
    #[must_use]
    pub fn random() -> Self {
        Self {
            nullifier: FieldElement::random(OsRng),
            secret: FieldElement::random(OsRng),
        }
    }

    /// `H(nullifier, secret)`, the leaf inserted on deposit.
    #[must_use]
    pub fn commitment<H: FieldHasher>(&self, hasher: &H) -> FieldElement {
        hasher.hash_two(self.nullifier, self.secret)
    }

    /// `H(nullifier)`, revealed on withdrawal.
    #[must_use]
    pub fn nullifier_hash<H: FieldHasher>(&self, hasher: &H) -> FieldElement {
        hasher.hash_one(self.nullifier)
    }
}
