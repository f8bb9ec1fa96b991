//! Prover
//!
//! Consumes a witness and a proving key, returns the proof envelope and the
//! public signals. The witness is moved in and dropped (zeroized) here on
//! every path, success or error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use ark_bn254::Bn254;
use ark_groth16::Groth16;
use ark_serialize::CanonicalSerialize;
use ark_snark::SNARK;
use rand::rngs::{OsRng, StdRng};
use rand::{CryptoRng, RngCore, SeedableRng};

use crate::error::{ProofError, Result};
use crate::services::artifacts::ProvingKey;
use crate::services::witness::Witness;
use crate::types::{Proof, PublicSignals};

/// Source of proving randomness
///
/// Each call hands out a fresh generator; proofs must never share blinding
/// factors.
pub trait RandomnessSource: Send + Sync {
    type Rng: RngCore + CryptoRng;

    fn rng(&self) -> Self::Rng;
}

/// Operating system randomness
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomness;

impl RandomnessSource for OsRandomness {
    type Rng = OsRng;

    fn rng(&self) -> OsRng {
        OsRng
    }
}

/// Reproducible randomness for tests and benches
///
/// Stream `n` is seeded from `(seed, n)`, so a fixed seed reproduces the same
/// sequence of proofs while consecutive proofs still differ.
#[derive(Debug, Default)]
pub struct SeededRandomness {
    seed: u64,
    counter: AtomicU64,
}

impl SeededRandomness {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            counter: AtomicU64::new(0),
        }
    }
}

impl RandomnessSource for SeededRandomness {
    type Rng = StdRng;

    fn rng(&self) -> StdRng {
        let stream = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut seed = [0u8; 32];
        seed[..8].copy_from_slice(&self.seed.to_le_bytes());
        seed[8..16].copy_from_slice(&stream.to_le_bytes());
        StdRng::from_seed(seed)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Prover;

impl Prover {
    pub fn new() -> Self {
        Self
    }

    /// Prove the witness under `key`
    ///
    /// - `ProvingKeyStale` if the witness was computed for another model
    /// - `WitnessMismatch` if wire counts differ from the key layout; the
    ///   witness is never padded or truncated
    pub fn prove<R: RngCore + CryptoRng>(
        &self,
        witness: Witness,
        key: &ProvingKey,
        rng: &mut R,
    ) -> Result<(Proof, PublicSignals)> {
        let model = key.model();

        if witness.model_id() != model.id() {
            return Err(ProofError::ProvingKeyStale);
        }

        let expected = model.num_public_inputs() + model.num_witness();
        let found = witness.public().len() + witness.num_wires();
        if witness.public().len() != model.num_public_inputs()
            || witness.num_wires() != model.num_witness()
        {
            return Err(ProofError::WitnessMismatch { expected, found });
        }

        let pk = key.inner();
        let key_public = pk.vk.gamma_abc_g1.len().saturating_sub(1);
        let key_wires = pk.a_query.len().saturating_sub(1);
        if key_public != witness.public().len() || key_wires != found {
            return Err(ProofError::WitnessMismatch {
                expected: key_wires,
                found,
            });
        }

        let start = Instant::now();

        let proof = Groth16::<Bn254>::prove(
            pk,
            model.synthesizer(Some((witness.public(), witness.wires()))),
            rng,
        )
        .map_err(|e| ProofError::internal(format!("proof generation failed: {}", e)))?;

        let mut body = Vec::with_capacity(proof.compressed_size());
        proof
            .serialize_compressed(&mut body)
            .map_err(|e| ProofError::internal(format!("proof serialization failed: {}", e)))?;

        let signals = PublicSignals::new(witness.public().to_vec());
        drop(witness);

        tracing::info!(
            bundle_id = %key.bundle_id(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "proof generated"
        );

        Ok((Proof::new(key.bundle_id(), body), signals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::services::artifacts::SetupArtifacts;
    use crate::services::witness::WitnessGenerator;
    use crate::test_utils;
    use crate::types::PROOF_LEN;
    use std::sync::Arc;
    use zk_eligibility_circuits::{ConstraintModel, EligibilityPolicy, Fr};

    #[test]
    fn test_prove_eligible() {
        let artifacts = test_utils::artifacts();
        let witness = WitnessGenerator::new()
            .generate(artifacts.model(), 40000.0, 3.5)
            .unwrap();

        let mut rng = SeededRandomness::new(1).rng();
        let (proof, signals) = Prover::new()
            .prove(witness, artifacts.proving_key(), &mut rng)
            .unwrap();

        assert_eq!(proof.bundle_id(), artifacts.bundle_id());
        assert_eq!(proof.to_bytes().len(), PROOF_LEN);
        assert_eq!(signals.as_slice(), &[Fr::from(1u64)]);
    }

    #[test]
    fn test_stale_key_rejected() {
        let artifacts = test_utils::artifacts();
        let other = ConstraintModel::<Fr>::compile(EligibilityPolicy::new(4_000_000, 300).unwrap())
            .unwrap();
        let witness = WitnessGenerator::new()
            .generate(&other, 1000.0, 3.5)
            .unwrap();

        let mut rng = SeededRandomness::new(2).rng();
        let err = Prover::new()
            .prove(witness, artifacts.proving_key(), &mut rng)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProvingKeyStale);
    }

    #[test]
    fn test_key_for_other_model_is_stale() {
        // Same policy thresholds, wider GPA range: different wire count
        let wide = Arc::new(
            ConstraintModel::<Fr>::compile(
                EligibilityPolicy::with_bits(5_000_000, 300, 48, 12).unwrap(),
            )
            .unwrap(),
        );
        let wide_artifacts =
            SetupArtifacts::generate(wide.clone(), &mut SeededRandomness::new(3).rng()).unwrap();

        let witness = WitnessGenerator::new()
            .generate(&wide, 1000.0, 3.5)
            .unwrap();
        let mut rng = SeededRandomness::new(4).rng();
        assert!(Prover::new()
            .prove(witness, wide_artifacts.proving_key(), &mut rng)
            .is_ok());

        let artifacts = test_utils::artifacts();
        let witness = WitnessGenerator::new()
            .generate(artifacts.model(), 1000.0, 3.5)
            .unwrap();
        let err = Prover::new()
            .prove(witness, wide_artifacts.proving_key(), &mut rng)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProvingKeyStale);
    }

    fn reshaped(extra: isize) -> Witness {
        let artifacts = test_utils::artifacts();
        let witness = WitnessGenerator::new()
            .generate(artifacts.model(), 40000.0, 3.5)
            .unwrap();
        let mut wires = witness.wires().to_vec();
        if extra < 0 {
            wires.pop();
        } else {
            wires.extend((0..extra).map(|_| Fr::from(0u64)));
        }
        Witness::from_parts(witness.model_id(), witness.public().to_vec(), wires)
    }

    #[test]
    fn test_short_witness_is_mismatch() {
        let artifacts = test_utils::artifacts();
        let model = artifacts.model();
        let expected = model.num_public_inputs() + model.num_witness();

        let witness = reshaped(-1);
        assert_eq!(witness.model_id(), model.id());

        let mut rng = SeededRandomness::new(5).rng();
        let err = Prover::new()
            .prove(witness, artifacts.proving_key(), &mut rng)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WitnessMismatch);
        let ProofError::WitnessMismatch { expected: e, found } = err else {
            panic!("expected WitnessMismatch");
        };
        // reported as given, not padded
        assert_eq!((e, found), (expected, expected - 1));
    }

    #[test]
    fn test_long_witness_is_mismatch() {
        let artifacts = test_utils::artifacts();
        let model = artifacts.model();
        let expected = model.num_public_inputs() + model.num_witness();

        let mut rng = SeededRandomness::new(6).rng();
        let err = Prover::new()
            .prove(reshaped(2), artifacts.proving_key(), &mut rng)
            .unwrap_err();
        let ProofError::WitnessMismatch { expected: e, found } = err else {
            panic!("expected WitnessMismatch");
        };
        // reported as given, not truncated
        assert_eq!((e, found), (expected, expected + 2));

        // the untouched layout still proves
        assert!(Prover::new()
            .prove(reshaped(0), artifacts.proving_key(), &mut rng)
            .is_ok());
    }

    #[test]
    fn test_seeded_streams_differ() {
        let source = SeededRandomness::new(9);
        let a = source.rng().next_u64();
        let b = source.rng().next_u64();
        assert_ne!(a, b);

        let replay = SeededRandomness::new(9);
        assert_eq!(replay.rng().next_u64(), a);
    }
}
