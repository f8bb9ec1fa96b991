//! arkworks R1CS constraint model for private scholarship eligibility
//!
//! Proves `eligible == (balance < BALANCE_THRESHOLD AND gpa >= GPA_THRESHOLD)`
//! with balance and GPA kept private. The only public signal is the
//! eligibility bit.
//!
//! - R1CS: Rank-1 Constraint System (a·b = c gates only)
//! - Range check: bit decomposition (~49 constraints for a 48-bit balance)
//! - Proving system: Groth16 over BN254 (per-circuit trusted setup)
//!
//! | Type | Purpose |
//! |------|---------|
//! | `EligibilityPolicy` | thresholds and bit widths (circuit constants) |
//! | `EligibilityCircuit` | gadget-level description of the predicate |
//! | `ConstraintModel` | compiled matrices + `ModelId` fingerprint |

pub mod eligibility;
pub mod error;
pub mod gadgets;
pub mod model;
pub mod policy;

pub use eligibility::{EligibilityCircuit, NUM_PUBLIC_INPUTS};
pub use error::{CircuitError, CircuitResult};
pub use model::{ConstraintModel, ModelId, ModelSynthesizer};
pub use policy::{EligibilityPolicy, BALANCE_DECIMALS, GPA_DECIMALS, GPA_MAX};

/// Scalar field of BN254, the curve the service proves over
pub use ark_bn254::Fr;
