//! Private scholarship eligibility proofs
//!
//! # Overview
//!
//! Proves `balance < BALANCE_THRESHOLD AND gpa >= GPA_THRESHOLD` with
//! Groth16 over BN254, without revealing balance or GPA to the verifier.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ProofService                          │
//! │                                                           │
//! │  ┌───────────┐   ┌──────────┐   ┌──────────┐             │
//! │  │  Witness  │──▶│  Prover  │──▶│ Verifier │             │
//! │  └─────┬─────┘   └────┬─────┘   └────┬─────┘             │
//! │        │              │              │                    │
//! │        └──────────────┴──────────────┘                    │
//! │                       │                                   │
//! └───────────────────────┼───────────────────────────────────┘
//!                         ▼
//!   ┌─────────────────────────────────────────────┐
//!   │ SetupArtifacts (ConstraintModel, pk, vk)    │
//!   └─────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: environment configuration
//! - `error`: error taxonomy and failure records
//! - `services`: the proof pipeline
//! - `types`: ingress/egress records, proof envelope, public signals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zk_eligibility_service::{AppState, Config};
//!
//! let state = AppState::initialize(Config::from_env()?)?;
//! let outcome = state.pool.request_proof(40000.0, 3.5).await?;
//! assert!(outcome.verified);
//! ```

use std::sync::Arc;

use zk_eligibility_circuits::{ConstraintModel, Fr};

pub mod config;
pub mod error;
pub mod services;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenience
pub use config::Config;
pub use error::{ErrorCategory, ErrorKind, FailureResponse, ProofError};
pub use services::{
    Groth16Backend, OsRandomness, ProofService, ProverPool, SetupArtifactManager, SetupArtifacts,
};
pub use types::{EligibilityRequest, ProofReply, ProofResponse};

/// Production service type
pub type EligibilityService = ProofService<Groth16Backend, OsRandomness>;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub artifacts: Arc<SetupArtifacts>,
    pub pool: ProverPool<Groth16Backend, OsRandomness>,
}

impl AppState {
    /// Compile the model, load the bundle, build the pool
    ///
    /// Setup errors are fatal: there is no degraded mode without keys.
    pub fn initialize(config: Config) -> error::Result<Self> {
        let model = Arc::new(ConstraintModel::<Fr>::compile(config.policy()?)?);
        tracing::info!(
            model_id = %model.id(),
            constraints = model.num_constraints(),
            "constraint model compiled"
        );

        let manager = SetupArtifactManager::new(model);
        let artifacts = manager.load(&config.bundle_path)?;

        let service = ProofService::new(Groth16Backend::new(artifacts.clone()), OsRandomness);
        let pool = ProverPool::new(Arc::new(service), config.prover_concurrency);

        Ok(Self {
            config: Arc::new(config),
            artifacts,
            pool,
        })
    }
}
