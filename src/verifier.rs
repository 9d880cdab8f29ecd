//! Proof verification seam.

use crate::types::PublicInputs;

/// Answers whether `proof` is valid for the given public inputs.
///
/// Implementations return `false` for malformed proofs rather than erroring;
/// the pool maps `false` to [`crate::PoolError::InvalidProof`].
pub trait ProofVerifier {
    fn verify(&self, proof: &[u8], inputs: &PublicInputs) -> bool;
}

impl<F> ProofVerifier for F
where
    F: Fn(&[u8], &PublicInputs) -> bool,
{
    fn verify(&self, proof: &[u8], inputs: &PublicInputs) -> bool {
        self(proof, inputs)
    }
}
