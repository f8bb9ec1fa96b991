//! Witness Generator
//!
//! Turns the two decimal inputs into a full wire assignment for the compiled
//! model:
//!
//! 1. Exact decimal → fixed-point conversion (no float rounding)
//! 2. Domain checks against the model policy
//! 3. Prove-mode synthesis of `EligibilityCircuit`
//! 4. Row-by-row check of the assignment against the model
//!
//! Everything that can be rejected is rejected before step 3, so synthesis
//! only ever sees in-domain values.

use std::fmt;
use std::mem;

use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem, OptimizationGoal, SynthesisMode};
use zeroize::Zeroize;

use zk_eligibility_circuits::{
    ConstraintModel, EligibilityCircuit, Fr, ModelId, BALANCE_DECIMALS, GPA_DECIMALS, GPA_MAX,
};

use crate::error::{ProofError, Result};

pub(crate) const BALANCE_FIELD: &str = "bankBalance";
pub(crate) const GPA_FIELD: &str = "gpa";

/// Full assignment for one input instance
///
/// Not `Clone`, never serialized. Zeroized when dropped, whichever path
/// drops it.
pub struct Witness {
    model_id: ModelId,
    public: Vec<Fr>,
    wires: Vec<Fr>,
}

impl Witness {
    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    /// Public part (the eligibility bit)
    pub fn public(&self) -> &[Fr] {
        &self.public
    }

    pub(crate) fn wires(&self) -> &[Fr] {
        &self.wires
    }

    pub fn num_wires(&self) -> usize {
        self.wires.len()
    }

    #[cfg(test)]
    pub(crate) fn from_parts(model_id: ModelId, public: Vec<Fr>, wires: Vec<Fr>) -> Self {
        Self {
            model_id,
            public,
            wires,
        }
    }
}

impl Drop for Witness {
    fn drop(&mut self) {
        self.public.zeroize();
        self.wires.zeroize();
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("model_id", &self.model_id)
            .field("wires", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WitnessGenerator;

impl WitnessGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a witness from decimal inputs
    ///
    /// `balance` is in currency units, `gpa` on a 0.00–5.00 scale. Both must
    /// have at most two fractional digits.
    pub fn generate(&self, model: &ConstraintModel<Fr>, balance: f64, gpa: f64) -> Result<Witness> {
        let balance = to_fixed(balance, BALANCE_DECIMALS, BALANCE_FIELD)?;
        let gpa = to_fixed(gpa, GPA_DECIMALS, GPA_FIELD)?;
        self.generate_scaled(model, balance, gpa)
    }

    /// Generate a witness from already-scaled values (cents, hundredths)
    pub fn generate_scaled(
        &self,
        model: &ConstraintModel<Fr>,
        balance_cents: u64,
        gpa_hundredths: u64,
    ) -> Result<Witness> {
        let policy = *model.policy();

        if balance_cents > policy.max_balance() {
            return Err(ProofError::out_of_domain(
                BALANCE_FIELD,
                format!("exceeds the {}-bit range", policy.balance_bits),
            ));
        }
        if gpa_hundredths > GPA_MAX {
            return Err(ProofError::out_of_domain(GPA_FIELD, "exceeds 5.00"));
        }

        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_optimization_goal(OptimizationGoal::Constraints);
        cs.set_mode(SynthesisMode::Prove {
            construct_matrices: false,
        });

        EligibilityCircuit::<Fr>::new(policy, balance_cents, gpa_hundredths)
            .generate_constraints(cs.clone())
            .map_err(|e| ProofError::internal(format!("witness synthesis failed: {}", e)))?;

        let (public, wires) = {
            let mut inner = cs
                .borrow_mut()
                .ok_or_else(|| ProofError::internal("constraint system unavailable"))?;
            let mut instance = mem::take(&mut inner.instance_assignment);
            // index 0 is the constant one wire
            let public = instance.split_off(1);
            (public, mem::take(&mut inner.witness_assignment))
        };

        let witness = Witness {
            model_id: model.id(),
            public,
            wires,
        };

        if witness.public.len() != model.num_public_inputs()
            || witness.wires.len() != model.num_witness()
        {
            tracing::error!(
                model_id = %model.id(),
                public = witness.public.len(),
                wires = witness.wires.len(),
                "synthesized layout differs from compiled model"
            );
            return Err(ProofError::internal("synthesized layout differs from model"));
        }

        if !model.is_satisfied_by(&witness.public, &witness.wires) {
            tracing::error!(model_id = %model.id(), "witness does not satisfy compiled model");
            return Err(ProofError::internal("witness does not satisfy model"));
        }

        Ok(witness)
    }
}

/// Convert an `f64` to fixed point without rounding
///
/// Uses the shortest decimal that round-trips to `value` (Rust's `Display`),
/// so `40000.1` is exactly 4000010 cents and `0.1 + 0.2` is rejected.
pub fn to_fixed(value: f64, decimals: u32, field: &'static str) -> Result<u64> {
    if !value.is_finite() {
        return Err(ProofError::out_of_domain(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(ProofError::out_of_domain(field, "must not be negative"));
    }
    // -0.0 displays as "-0"
    let value = if value == 0.0 { 0.0 } else { value };

    parse_decimal(&value.to_string(), decimals, field)
}

/// Parse a plain decimal string (`123`, `123.4`, `123.45`) into fixed point
pub fn parse_decimal(text: &str, decimals: u32, field: &'static str) -> Result<u64> {
    let text = text.trim();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (text, ""),
    };

    if text.starts_with('-') {
        return Err(ProofError::out_of_domain(field, "must not be negative"));
    }
    if int_part.is_empty()
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ProofError::out_of_domain(field, "not a plain decimal number"));
    }
    if frac_part.len() > decimals as usize {
        return Err(ProofError::out_of_domain(
            field,
            format!("more than {} fractional digits", decimals),
        ));
    }

    let overflow = || ProofError::ArithmeticOverflow { field };
    let scale = 10u64.checked_pow(decimals).ok_or_else(overflow)?;

    let whole = int_part
        .bytes()
        .try_fold(0u64, |acc, b| acc.checked_mul(10)?.checked_add(u64::from(b - b'0')))
        .ok_or_else(overflow)?;

    let frac = frac_part
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(decimals as usize)
        .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'));

    whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils;
    use proptest::prelude::*;

    #[test]
    fn test_to_fixed_exact() {
        assert_eq!(to_fixed(40000.0, 2, "b").unwrap(), 4_000_000);
        assert_eq!(to_fixed(40000.1, 2, "b").unwrap(), 4_000_010);
        assert_eq!(to_fixed(3.5, 2, "g").unwrap(), 350);
        assert_eq!(to_fixed(2.99, 2, "g").unwrap(), 299);
        assert_eq!(to_fixed(0.0, 2, "g").unwrap(), 0);
        assert_eq!(to_fixed(-0.0, 2, "g").unwrap(), 0);
    }

    #[test]
    fn test_to_fixed_rejections() {
        let kind = |r: Result<u64>| r.unwrap_err().kind();

        assert_eq!(kind(to_fixed(-1.0, 2, "b")), ErrorKind::OutOfDomain);
        assert_eq!(kind(to_fixed(f64::NAN, 2, "b")), ErrorKind::OutOfDomain);
        assert_eq!(kind(to_fixed(f64::INFINITY, 2, "b")), ErrorKind::OutOfDomain);
        assert_eq!(kind(to_fixed(3.555, 2, "g")), ErrorKind::OutOfDomain);
        assert_eq!(kind(to_fixed(0.1 + 0.2, 2, "g")), ErrorKind::OutOfDomain);
        assert_eq!(kind(to_fixed(1e300, 2, "b")), ErrorKind::ArithmeticOverflow);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("50000.00", 2, "t").unwrap(), 5_000_000);
        assert_eq!(parse_decimal("3", 2, "t").unwrap(), 300);
        assert_eq!(parse_decimal(" 3.0 ", 2, "t").unwrap(), 300);
        assert!(parse_decimal("", 2, "t").is_err());
        assert!(parse_decimal(".5", 2, "t").is_err());
        assert!(parse_decimal("1e3", 2, "t").is_err());
        assert!(parse_decimal("-3.00", 2, "t").is_err());
    }

    #[test]
    fn test_error_messages_omit_values() {
        let err = to_fixed(123456.789, 2, BALANCE_FIELD).unwrap_err();
        assert!(!err.to_string().contains("123456"));
    }

    #[test]
    fn test_generate_eligible() {
        let model = test_utils::model();
        let witness = WitnessGenerator::new()
            .generate(&model, 40000.0, 3.5)
            .unwrap();

        assert_eq!(witness.model_id(), model.id());
        assert_eq!(witness.public(), &[Fr::from(1u64)]);
        assert_eq!(witness.num_wires(), model.num_witness());
    }

    #[test]
    fn test_generate_ineligible() {
        let model = test_utils::model();
        let witness = WitnessGenerator::new()
            .generate(&model, 60000.0, 3.5)
            .unwrap();
        assert_eq!(witness.public(), &[Fr::from(0u64)]);
    }

    #[test]
    fn test_generate_boundaries() {
        let model = test_utils::model();
        let generator = WitnessGenerator::new();

        // balance == threshold is not below it
        let w = generator.generate(&model, 50000.0, 4.0).unwrap();
        assert_eq!(w.public(), &[Fr::from(0u64)]);

        // gpa == threshold meets it
        let w = generator.generate(&model, 49999.99, 3.0).unwrap();
        assert_eq!(w.public(), &[Fr::from(1u64)]);

        assert!(generator.generate(&model, 0.0, 5.0).is_ok());
    }

    #[test]
    fn test_generate_domain_errors() {
        let model = test_utils::model();
        let generator = WitnessGenerator::new();

        let err = generator.generate(&model, 1000.0, 5.01).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfDomain);

        let err = generator.generate(&model, 1000.0, -0.5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfDomain);

        // 2^48 cents
        let err = generator
            .generate_scaled(&model, 1 << 48, 300)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfDomain);
    }

    #[test]
    fn test_debug_is_redacted() {
        let model = test_utils::model();
        let witness = WitnessGenerator::new()
            .generate_scaled(&model, 4_000_000, 350)
            .unwrap();
        let debug = format!("{:?}", witness);
        assert!(debug.contains("redacted"));
        assert!(!debug.contains("4000000"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn witness_is_deterministic(balance in 0u64..20_000_000, gpa in 0u64..=500) {
            let model = test_utils::model();
            let generator = WitnessGenerator::new();
            let a = generator.generate_scaled(&model, balance, gpa).unwrap();
            let b = generator.generate_scaled(&model, balance, gpa).unwrap();

            prop_assert_eq!(a.public(), b.public());
            prop_assert_eq!(a.wires(), b.wires());

            let expected = model.policy().is_eligible(balance, gpa);
            prop_assert_eq!(a.public()[0], Fr::from(expected as u64));
        }

        #[test]
        fn two_decimal_inputs_convert_exactly(cents in 0u64..1_000_000_000_000) {
            let value = cents as f64 / 100.0;
            prop_assert_eq!(to_fixed(value, 2, "b").unwrap(), cents);
        }
    }
}
