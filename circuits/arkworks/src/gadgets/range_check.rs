//! Range Check Gadget using Bit Decomposition
//!
//! Proves value is within [0, 2^BITS) in R1CS:
//! 1. Allocate BITS boolean witnesses (1 booleanity constraint each)
//! 2. Enforce sum(bit_i * 2^i) == value (1 constraint)
//!
//! Total: BITS + 1 constraints. A value at or above 2^BITS has no valid
//! decomposition, so the recomposition constraint cannot be satisfied.
//!
//! # Example
//! ```ignore
//! // Check that gpa is in range [0, 1024)
//! let bits = RangeCheckGadget::new(10).enforce(cs.clone(), &gpa_var)?;
//! ```

use ark_ff::{BigInteger, PrimeField};
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

/// Bit-decomposition range check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeCheckGadget {
    bits: usize,
}

impl RangeCheckGadget {
    /// Create a range check for [0, 2^bits)
    pub fn new(bits: usize) -> Self {
        Self { bits }
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Enforce `value < 2^bits` and return its little-endian bits
    ///
    /// The returned bits are constrained, so callers may read any of them as
    /// a sound boolean (the comparison gadget reads the top one).
    pub fn enforce<F: PrimeField>(
        &self,
        cs: ConstraintSystemRef<F>,
        value: &FpVar<F>,
    ) -> Result<Vec<Boolean<F>>, SynthesisError> {
        // Missing in setup mode; the closures below are only run when proving
        let native = value.value().ok();

        let mut bits = Vec::with_capacity(self.bits);
        for i in 0..self.bits {
            let bit = Boolean::new_witness(cs.clone(), || {
                native
                    .map(|v| v.into_bigint().get_bit(i))
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;
            bits.push(bit);
        }

        let mut recomposed = FpVar::<F>::zero();
        let mut weight = F::one();
        for bit in &bits {
            recomposed += FpVar::from(bit.clone()) * weight;
            weight.double_in_place();
        }
        recomposed.enforce_equal(value)?;

        Ok(bits)
    }
}
