//! Services Module
//!
//! The proof pipeline, leaves first:
//!
//! - `artifacts`: setup bundle loading, validation and caching
//! - `witness`: decimal inputs → wire assignment
//! - `prover` / `verifier`: Groth16 over BN254
//! - `backend`: the capability seam the facade is generic over
//! - `proof_service`: request lifecycle (facade)
//! - `pool`: bounded async execution on the blocking pool

pub mod artifacts;
pub mod backend;
pub mod pool;
pub mod proof_service;
pub mod prover;
pub mod verifier;
pub mod witness;

pub use artifacts::{ProvingKey, SetupArtifactManager, SetupArtifacts, VerificationKey};
pub use backend::{Groth16Backend, ProvingBackend};
pub use pool::ProverPool;
pub use proof_service::{ProofOutcome, ProofService, ProofSession, ProofState};
pub use prover::{OsRandomness, Prover, RandomnessSource, SeededRandomness};
pub use verifier::Verifier;
pub use witness::{Witness, WitnessGenerator};
