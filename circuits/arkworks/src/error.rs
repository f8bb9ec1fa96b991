//! Error types for the eligibility constraint model
//!
//! Only two things can go wrong while building the model: the policy asks for
//! a domain the bit widths cannot represent, or arkworks rejects synthesis.

use ark_relations::r1cs::SynthesisError;
use thiserror::Error;

/// Error types for constraint model operations
#[derive(Debug, Error)]
pub enum CircuitError {
    /// Policy thresholds or bit widths cannot represent the declared domain
    #[error("invalid domain: {reason}")]
    InvalidDomain { reason: String },

    /// arkworks failed while synthesizing constraints
    #[error("constraint synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Compiled matrices were not available from the constraint system
    #[error("constraint matrices unavailable")]
    MatricesUnavailable,
}

impl CircuitError {
    pub(crate) fn invalid_domain(reason: impl Into<String>) -> Self {
        CircuitError::InvalidDomain {
            reason: reason.into(),
        }
    }
}

/// Result type for constraint model operations
pub type CircuitResult<T> = Result<T, CircuitError>;
