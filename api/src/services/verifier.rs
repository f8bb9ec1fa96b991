//! Verifier
//!
//! Pure function of (proof, public signals, verification key).
//!
//! - `Ok(true)`: the proof certifies the signals under this key
//! - `Ok(false)`: well-formed, but does not certify them
//! - `Err`: cannot be interpreted under this key at all

use ark_bn254::Bn254;
use ark_groth16::Groth16;
use ark_serialize::CanonicalDeserialize;
use ark_snark::SNARK;

use crate::error::{ProofError, Result};
use crate::services::artifacts::VerificationKey;
use crate::types::{Proof, PublicSignals};

#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier;

impl Verifier {
    pub fn new() -> Self {
        Self
    }

    pub fn verify(
        &self,
        proof: &Proof,
        signals: &PublicSignals,
        key: &VerificationKey,
    ) -> Result<bool> {
        if proof.bundle_id() != key.bundle_id() {
            return Err(ProofError::KeyVersionMismatch {
                expected: key.bundle_id().to_hex(),
                found: proof.bundle_id().to_hex(),
            });
        }

        if signals.len() != key.num_public_inputs() {
            return Err(ProofError::MalformedProof(format!(
                "expected {} public signals, got {}",
                key.num_public_inputs(),
                signals.len()
            )));
        }

        let mut reader = proof.body();
        let groth16 = ark_groth16::Proof::<Bn254>::deserialize_compressed(&mut reader)
            .map_err(|e| ProofError::MalformedProof(e.to_string()))?;
        if !reader.is_empty() {
            return Err(ProofError::MalformedProof("trailing bytes after proof".into()));
        }

        let verified =
            Groth16::<Bn254>::verify_with_processed_vk(key.prepared(), signals.as_slice(), &groth16)
                .map_err(|e| ProofError::MalformedProof(e.to_string()))?;

        tracing::debug!(bundle_id = %key.bundle_id(), verified, "proof verified");
        Ok(verified)
    }
}
