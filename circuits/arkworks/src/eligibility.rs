//! EligibilityProof Circuit - arkworks R1CS Implementation
//!
//! Proves: eligible == (balance < BALANCE_THRESHOLD AND gpa >= GPA_THRESHOLD)
//! without revealing balance or gpa.
//!
//! Unlike a threshold proof that only exists for passing inputs, this circuit
//! is satisfiable for every in-domain input. The public output carries the
//! result, so an ineligible applicant gets a valid proof of "0".
//!
//! # Circuit Constraints
//! 1. Range check: balance in [0, 2^BALANCE_BITS)
//! 2. Range check: gpa in [0, 2^GPA_BITS)
//! 3. Domain: gpa <= 5.00
//! 4. Comparison: below = balance < BALANCE_THRESHOLD
//! 5. Comparison: meets = gpa >= GPA_THRESHOLD
//! 6. AND gate: eligible_bit = below AND meets
//! 7. Output: eligible (public) == eligible_bit
//!
//! Thresholds are constants, not inputs. They never appear as public
//! signals; the verifier learns the policy through the key it holds.

use ark_ff::PrimeField;
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::gadgets::{ComparisonGadget, RangeCheckGadget};
use crate::policy::{EligibilityPolicy, GPA_MAX};

/// Number of public inputs (excluding the constant one wire)
pub const NUM_PUBLIC_INPUTS: usize = 1;

/// EligibilityProof Circuit for arkworks
#[derive(Clone, Debug)]
pub struct EligibilityCircuit<F: PrimeField> {
    /// Circuit constants
    pub policy: EligibilityPolicy,
    /// Private: balance in cents
    pub balance: Option<F>,
    /// Private: gpa in hundredths
    pub gpa: Option<F>,
    /// Public: eligibility bit (0 or 1)
    pub eligible: Option<F>,
}

impl<F: PrimeField> EligibilityCircuit<F> {
    /// Create a circuit for fixed-point inputs
    ///
    /// The public output is the native evaluation of the policy; the
    /// constraints then force it to agree with the gate-level result.
    pub fn new(policy: EligibilityPolicy, balance: u64, gpa: u64) -> Self {
        let eligible = policy.is_eligible(balance, gpa);
        Self {
            policy,
            balance: Some(F::from(balance)),
            gpa: Some(F::from(gpa)),
            eligible: Some(bool_to_field(eligible)),
        }
    }

    /// Create empty circuit for setup
    pub fn empty(policy: EligibilityPolicy) -> Self {
        Self {
            policy,
            balance: None,
            gpa: None,
            eligible: None,
        }
    }

    /// Override the claimed output (used to show forged claims are unsatisfiable)
    pub fn with_claimed_output(mut self, eligible: bool) -> Self {
        self.eligible = Some(bool_to_field(eligible));
        self
    }
}

fn bool_to_field<F: PrimeField>(value: bool) -> F {
    if value {
        F::one()
    } else {
        F::zero()
    }
}

impl<F: PrimeField> ConstraintSynthesizer<F> for EligibilityCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        let policy = self.policy;

        // ======== Allocate Private Inputs ========

        let balance_var = FpVar::new_witness(cs.clone(), || {
            self.balance.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let gpa_var = FpVar::new_witness(cs.clone(), || {
            self.gpa.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // ======== Allocate Public Output ========

        let eligible_var = FpVar::new_input(cs.clone(), || {
            self.eligible.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // ======== Constraint 1 & 2: Range Checks ========
        // Blocks field wraparound: without these, balance = p - 1 would look
        // "small" to the comparison below.

        RangeCheckGadget::new(policy.balance_bits).enforce(cs.clone(), &balance_var)?;
        RangeCheckGadget::new(policy.gpa_bits).enforce(cs.clone(), &gpa_var)?;

        // ======== Constraint 3: GPA ceiling ========

        let gpa_cmp = ComparisonGadget::new(policy.gpa_bits);
        let gpa_max = FpVar::constant(F::from(GPA_MAX));
        gpa_cmp
            .is_greater_or_equal(cs.clone(), &gpa_max, &gpa_var)?
            .enforce_equal(&Boolean::constant(true))?;

        // ======== Constraint 4 & 5: Threshold Comparisons ========

        let balance_threshold = FpVar::constant(F::from(policy.balance_threshold));
        let below = ComparisonGadget::new(policy.balance_bits).is_less_than(
            cs.clone(),
            &balance_var,
            &balance_threshold,
        )?;

        let gpa_threshold = FpVar::constant(F::from(policy.gpa_threshold));
        let meets = gpa_cmp.is_greater_or_equal(cs.clone(), &gpa_var, &gpa_threshold)?;

        // ======== Constraint 6 & 7: AND gate into the public output ========

        let eligible_bit = below.and(&meets)?;
        eligible_var.enforce_equal(&FpVar::from(eligible_bit))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_relations::r1cs::ConstraintSystem;

    fn run(circuit: EligibilityCircuit<Fr>) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    fn test_circuit(balance: u64, gpa: u64) -> (bool, Fr) {
        let circuit = EligibilityCircuit::<Fr>::new(EligibilityPolicy::default(), balance, gpa);
        let eligible = circuit.eligible.unwrap();
        (run(circuit), eligible)
    }

    #[test]
    fn test_eligible_applicant() {
        // 40,000.00 / 3.50 → eligible
        let (satisfied, eligible) = test_circuit(4_000_000, 350);
        assert!(satisfied);
        assert_eq!(eligible, Fr::from(1u64));
    }

    #[test]
    fn test_ineligible_balance_still_satisfiable() {
        // 60,000.00 / 3.50 → output 0, circuit satisfied
        let (satisfied, eligible) = test_circuit(6_000_000, 350);
        assert!(satisfied);
        assert_eq!(eligible, Fr::from(0u64));
    }

    #[test]
    fn test_ineligible_gpa() {
        let (satisfied, eligible) = test_circuit(1_000, 299);
        assert!(satisfied);
        assert_eq!(eligible, Fr::from(0u64));
    }

    #[test]
    fn test_threshold_boundaries() {
        // balance == threshold is not below it
        assert_eq!(test_circuit(5_000_000, 400).1, Fr::from(0u64));
        // gpa == threshold meets it
        assert_eq!(test_circuit(4_999_999, 300).1, Fr::from(1u64));
        // extremes of the domain
        assert!(test_circuit(0, 500).0);
        assert!(test_circuit((1 << 48) - 1, 0).0);
    }

    #[test]
    fn test_forged_eligibility_rejected() {
        let circuit = EligibilityCircuit::<Fr>::new(EligibilityPolicy::default(), 6_000_000, 350)
            .with_claimed_output(true);
        assert!(!run(circuit));
    }

    #[test]
    fn test_forged_ineligibility_rejected() {
        let circuit = EligibilityCircuit::<Fr>::new(EligibilityPolicy::default(), 4_000_000, 350)
            .with_claimed_output(false);
        assert!(!run(circuit));
    }

    #[test]
    fn test_gpa_above_ceiling_rejected() {
        // 5.01 fits in 10 bits but exceeds the 5.00 ceiling
        let (satisfied, _) = test_circuit(1_000, 501);
        assert!(!satisfied);
    }

    #[test]
    fn test_balance_outside_range_rejected() {
        let (satisfied, _) = test_circuit(1 << 48, 350);
        assert!(!satisfied);
    }

    #[test]
    fn test_non_boolean_output_rejected() {
        let mut circuit =
            EligibilityCircuit::<Fr>::new(EligibilityPolicy::default(), 4_000_000, 350);
        circuit.eligible = Some(Fr::from(2u64));
        assert!(!run(circuit));
    }

    #[test]
    fn test_constraint_count() {
        let circuit = EligibilityCircuit::<Fr>::new(EligibilityPolicy::default(), 4_000_000, 350);
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();

        println!("\n=== Eligibility Circuit R1CS Statistics ===");
        println!("Constraints: {}", cs.num_constraints());
        println!("Witness variables: {}", cs.num_witness_variables());
        println!("Public inputs: {}", cs.num_instance_variables());

        // one wire + eligible
        assert_eq!(cs.num_instance_variables(), 1 + NUM_PUBLIC_INPUTS);
        // ~137: range checks (49 + 11), gpa ceiling (13), comparisons (50 + 12), AND, output
        // Bit decomposition dominates, as in every R1CS range proof
        let constraints = cs.num_constraints();
        assert!(constraints > 120 && constraints < 160, "unexpected count {}", constraints);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn output_matches_native_predicate(balance in 0u64..(1 << 48), gpa in 0u64..=GPA_MAX) {
                let policy = EligibilityPolicy::default();
                let circuit = EligibilityCircuit::<Fr>::new(policy, balance, gpa);
                let expected = bool_to_field::<Fr>(policy.is_eligible(balance, gpa));
                prop_assert_eq!(circuit.eligible, Some(expected));
                prop_assert!(run(circuit));
            }

            #[test]
            fn flipped_output_never_satisfies(balance in 0u64..10_000_000, gpa in 0u64..=GPA_MAX) {
                let policy = EligibilityPolicy::default();
                let circuit = EligibilityCircuit::<Fr>::new(policy, balance, gpa)
                    .with_claimed_output(!policy.is_eligible(balance, gpa));
                prop_assert!(!run(circuit));
            }
        }
    }
}
