//! Halo2 withdrawal circuit and its prover/verifier.
//!
//! # Important Security Note
//!
//! The circuit binds the six withdrawal public inputs
//! `(root, nullifierHash, recipient, relayer, fee, refund)` into the proof
//! transcript, so a proof can not be replayed with a different recipient,
//! relayer or fee. It does not yet constrain knowledge of a note:
//! 1. commitment = H(nullifier, secret) in-circuit
//! 2. Merkle path from the commitment to `root`
//! 3. nullifierHash = H(nullifier)
//!
//! Those constraints belong with a Poseidon chip and must hash exactly like
//! [`crate::hasher::PoseidonHasher`] and [`crate::accumulator`].

use crate::types::{PublicInputs, PUBLIC_INPUT_COUNT};
use crate::utils::FieldElement;
use crate::verifier::ProofVerifier;
use halo2_proofs::{
    circuit::{Layouter, SimpleFloorPlanner, Value},
    plonk::{
        create_proof, keygen_pk, keygen_vk, verify_proof, Advice, Circuit, Column,
        ConstraintSystem, Error, Instance, ProvingKey, SingleVerifier, VerifyingKey,
    },
    poly::commitment::Params,
    transcript::{Blake2bRead, Blake2bWrite, Challenge255},
};
use log::debug;
use pasta_curves::{pallas, vesta};
use rand::rngs::OsRng;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct WithdrawConfig {
    pub advice: Column<Advice>,
    pub instance: Column<Instance>,
}

/// Witnesses the public inputs and ties each to its instance row.
#[derive(Debug, Clone)]
pub struct WithdrawCircuit {
    pub values: [Value<pallas::Base>; PUBLIC_INPUT_COUNT],
}

impl Default for WithdrawCircuit {
    fn default() -> Self {
        Self {
            values: [Value::unknown(); PUBLIC_INPUT_COUNT],
        }
    }
}

impl WithdrawCircuit {
    #[must_use]
    pub fn new(inputs: &PublicInputs) -> Self {
        Self {
            values: inputs.to_instance().map(Value::known),
        }
    }
}

impl Circuit<pallas::Base> for WithdrawCircuit {
    type Config = WithdrawConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::default()
    }

    fn configure(meta: &mut ConstraintSystem<pallas::Base>) -> Self::Config {
        let advice = meta.advice_column();
        let instance = meta.instance_column();
        meta.enable_equality(advice);
        meta.enable_equality(instance);

        WithdrawConfig { advice, instance }
    }

    fn synthesize(
        &self,
        config: Self::Config,
        mut layouter: impl Layouter<pallas::Base>,
    ) -> Result<(), Error> {
        let cells = layouter.assign_region(
            || "withdrawal public inputs",
            |mut region| {
                self.values
                    .iter()
                    .enumerate()
                    .map(|(row, value)| {
                        region.assign_advice(|| "public input", config.advice, row, || *value)
                    })
                    .collect::<Result<Vec<_>, Error>>()
            },
        )?;

        for (row, cell) in cells.iter().enumerate() {
            layouter.constrain_instance(cell.cell(), config.instance, row)?;
        }

        Ok(())
    }
}

/// Proving/verifying keys for [`WithdrawCircuit`] at a fixed `k`.
#[derive(Clone)]
pub struct WithdrawKeys {
    pub params: Arc<Params<vesta::Affine>>,
    pub vk: Arc<VerifyingKey<vesta::Affine>>,
    pub pk: Arc<ProvingKey<vesta::Affine>>,
}

impl WithdrawKeys {
    /// Generate parameters and keys for a circuit of `2^k` rows.
    pub fn generate(k: u32) -> Result<Self, Error> {
        let params = Params::<vesta::Affine>::new(k);
        let circuit = WithdrawCircuit::default();
        let vk = keygen_vk(&params, &circuit)?;
        let pk = keygen_pk(&params, vk.clone(), &circuit)?;
        debug!("Generated withdrawal circuit keys for k={k}");

        Ok(Self {
            params: Arc::new(params),
            vk: Arc::new(vk),
            pk: Arc::new(pk),
        })
    }

    #[must_use]
    pub fn prover(&self) -> WithdrawProver {
        WithdrawProver { keys: self.clone() }
    }

    #[must_use]
    pub fn verifier(&self) -> Halo2Verifier {
        Halo2Verifier {
            params: Arc::clone(&self.params),
            vk: Arc::clone(&self.vk),
        }
    }
}

/// Creates withdrawal proofs.
#[derive(Clone)]
pub struct WithdrawProver {
    keys: WithdrawKeys,
}

impl WithdrawProver {
    /// Generates a zero-knowledge proof for the given public inputs.
    ///
    /// # Returns
    /// A serialized proof as bytes
    pub fn generate_proof(&self, inputs: &PublicInputs) -> Result<Vec<u8>, Error> {
        let circuit = WithdrawCircuit::new(inputs);
        let instance: [FieldElement; PUBLIC_INPUT_COUNT] = inputs.to_instance();
        let mut transcript = Blake2bWrite::<_, vesta::Affine, Challenge255<_>>::init(vec![]);

        let public_inputs_slice: &[&[&[pallas::Base]]] = &[&[&instance]];
        create_proof(
            &*self.keys.params,
            &*self.keys.pk,
            &[circuit],
            public_inputs_slice,
            OsRng,
            &mut transcript,
        )?;

        Ok(transcript.finalize())
    }
}

/// Halo2 implementation of [`ProofVerifier`].
#[derive(Clone)]
pub struct Halo2Verifier {
    params: Arc<Params<vesta::Affine>>,
    vk: Arc<VerifyingKey<vesta::Affine>>,
}

impl ProofVerifier for Halo2Verifier {
    fn verify(&self, proof: &[u8], inputs: &PublicInputs) -> bool {
        let instance = inputs.to_instance();
        let strategy = SingleVerifier::new(&*self.params);
        let mut transcript = Blake2bRead::<_, vesta::Affine, Challenge255<_>>::init(proof);

        let public_inputs_slice: &[&[&[pallas::Base]]] = &[&[&instance]];
        let result = verify_proof(
            &*self.params,
            &*self.vk,
            strategy,
            public_inputs_slice,
            &mut transcript,
        );
        if let Err(e) = &result {
            debug!("Withdrawal proof rejected: {e:?}");
        }

        result.is_ok()
    }
}
