//! Proving backends
//!
//! The facade only needs three capabilities: compute a witness, prove it,
//! verify the result. `Groth16Backend` is the one that ships; the trait is
//! the seam for another proof system over the same constraint model.

use std::sync::Arc;

use rand::{CryptoRng, RngCore};

use zk_eligibility_circuits::{ConstraintModel, Fr};

use crate::error::Result;
use crate::services::artifacts::SetupArtifacts;
use crate::services::prover::Prover;
use crate::services::verifier::Verifier;
use crate::services::witness::{Witness, WitnessGenerator};
use crate::types::{BundleId, Proof, PublicSignals};

pub trait ProvingBackend: Send + Sync {
    fn model(&self) -> &ConstraintModel<Fr>;

    fn bundle_id(&self) -> BundleId;

    fn generate_witness(&self, balance: f64, gpa: f64) -> Result<Witness>;

    fn prove<R: RngCore + CryptoRng>(
        &self,
        witness: Witness,
        rng: &mut R,
    ) -> Result<(Proof, PublicSignals)>;

    fn verify(&self, proof: &Proof, signals: &PublicSignals) -> Result<bool>;
}

/// Groth16 over BN254 with one loaded setup bundle
#[derive(Clone)]
pub struct Groth16Backend {
    artifacts: Arc<SetupArtifacts>,
    witness: WitnessGenerator,
    prover: Prover,
    verifier: Verifier,
}

impl Groth16Backend {
    pub fn new(artifacts: Arc<SetupArtifacts>) -> Self {
        Self {
            artifacts,
            witness: WitnessGenerator::new(),
            prover: Prover::new(),
            verifier: Verifier::new(),
        }
    }

    pub fn artifacts(&self) -> &Arc<SetupArtifacts> {
        &self.artifacts
    }
}

impl ProvingBackend for Groth16Backend {
    fn model(&self) -> &ConstraintModel<Fr> {
        self.artifacts.model()
    }

    fn bundle_id(&self) -> BundleId {
        self.artifacts.bundle_id()
    }

    fn generate_witness(&self, balance: f64, gpa: f64) -> Result<Witness> {
        self.witness.generate(self.artifacts.model(), balance, gpa)
    }

    fn prove<R: RngCore + CryptoRng>(
        &self,
        witness: Witness,
        rng: &mut R,
    ) -> Result<(Proof, PublicSignals)> {
        self.prover.prove(witness, self.artifacts.proving_key(), rng)
    }

    fn verify(&self, proof: &Proof, signals: &PublicSignals) -> Result<bool> {
        self.verifier.verify(proof, signals, self.artifacts.verification_key())
    }
}
