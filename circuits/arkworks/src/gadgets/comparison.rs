//! Comparison Gadget for Greater-Than-Or-Equal
//!
//! Returns a constrained boolean `a >= b` instead of enforcing it, so an
//! ineligible applicant still gets a satisfiable circuit with output 0.
//!
//! # Strategy
//! 1. Compute shifted = a - b + 2^BITS (in finite field)
//! 2. Decompose shifted into BITS + 1 bits
//! 3. If a >= b, shifted is in [2^BITS, 2^(BITS+1)) and the top bit is 1
//! 4. If a < b, shifted is in [1, 2^BITS) and the top bit is 0
//!
//! # Important Constraint
//! Both a and b MUST be in range [0, 2^BITS). Otherwise shifted can wrap
//! around the field modulus and the top bit means nothing. Range-check
//! witnesses with `RangeCheckGadget` before comparing them.

use ark_ff::PrimeField;
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use super::range_check::RangeCheckGadget;

/// Comparison over operands known to be below 2^bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonGadget {
    bits: usize,
}

impl ComparisonGadget {
    pub fn new(bits: usize) -> Self {
        Self { bits }
    }

    /// Boolean `a >= b` (BITS + 2 constraints)
    pub fn is_greater_or_equal<F: PrimeField>(
        &self,
        cs: ConstraintSystemRef<F>,
        a: &FpVar<F>,
        b: &FpVar<F>,
    ) -> Result<Boolean<F>, SynthesisError> {
        let offset = FpVar::constant(F::from(1u64 << self.bits));
        let shifted = a - b + offset;

        let decomposition = RangeCheckGadget::new(self.bits + 1).enforce(cs, &shifted)?;
        Ok(decomposition[self.bits].clone())
    }

    /// Boolean `a < b`
    pub fn is_less_than<F: PrimeField>(
        &self,
        cs: ConstraintSystemRef<F>,
        a: &FpVar<F>,
        b: &FpVar<F>,
    ) -> Result<Boolean<F>, SynthesisError> {
        Ok(self.is_greater_or_equal(cs, a, b)?.not())
    }
}
