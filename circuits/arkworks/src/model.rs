//! Compiled Constraint Model
//!
//! `EligibilityCircuit` describes the predicate with gadgets. `ConstraintModel`
//! is what the rest of the system consumes: the flattened R1CS matrices
//! (A·z ∘ B·z = C·z), the wire layout, and a fingerprint of both.
//!
//! # Wire layout
//!
//! ```text
//! z = [ 1 | eligible | balance, gpa, bits..., intermediates... ]
//!       ^   ^public     ^private witness wires
//!       one wire
//! ```
//!
//! # Model identity
//!
//! `ModelId = Keccak256(tag || policy || counts || A || B || C)`. Any change
//! to a threshold, a bit width, or a gadget changes the id, which is how
//! setup bundles and proofs are tied to one exact relation.

use std::fmt;

use ark_ff::{BigInteger, PrimeField};
use ark_relations::r1cs::{
    ConstraintMatrices, ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef,
    LinearCombination, OptimizationGoal, SynthesisError, SynthesisMode, Variable,
};
use sha3::{Digest, Keccak256};

use crate::eligibility::EligibilityCircuit;
use crate::error::{CircuitError, CircuitResult};
use crate::policy::EligibilityPolicy;

const MODEL_ID_TAG: &[u8] = b"zk-eligibility/model/v1";

/// 32-byte fingerprint of a compiled constraint model
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId([u8; 32]);

impl ModelId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse `0x`-prefixed (or bare) hex
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelId({})", self.to_hex())
    }
}

/// Immutable R1CS description of the eligibility predicate
pub struct ConstraintModel<F: PrimeField> {
    policy: EligibilityPolicy,
    matrices: ConstraintMatrices<F>,
    id: ModelId,
}

impl<F: PrimeField> ConstraintModel<F> {
    /// Synthesize the circuit in setup mode and flatten it into matrices
    ///
    /// Fails with `InvalidDomain` before any synthesis if the policy cannot be
    /// represented by its bit widths.
    pub fn compile(policy: EligibilityPolicy) -> CircuitResult<Self> {
        policy.validate()?;

        let cs = ConstraintSystem::<F>::new_ref();
        cs.set_optimization_goal(OptimizationGoal::Constraints);
        cs.set_mode(SynthesisMode::Setup);

        EligibilityCircuit::<F>::empty(policy).generate_constraints(cs.clone())?;
        cs.finalize();

        let matrices = cs.to_matrices().ok_or(CircuitError::MatricesUnavailable)?;
        let id = fingerprint(&policy, &matrices);

        Ok(Self {
            policy,
            matrices,
            id,
        })
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn matrices(&self) -> &ConstraintMatrices<F> {
        &self.matrices
    }

    /// Instance wires including the constant one wire
    pub fn num_instance(&self) -> usize {
        self.matrices.num_instance_variables
    }

    /// Public signals (instance wires without the one wire)
    pub fn num_public_inputs(&self) -> usize {
        self.matrices.num_instance_variables - 1
    }

    /// Private and intermediate wires
    pub fn num_witness(&self) -> usize {
        self.matrices.num_witness_variables
    }

    pub fn num_constraints(&self) -> usize {
        self.matrices.num_constraints
    }

    /// Check every row of the model against a full assignment
    ///
    /// Returns false on a layout mismatch instead of indexing out of bounds.
    pub fn is_satisfied_by(&self, public: &[F], witness: &[F]) -> bool {
        if public.len() != self.num_public_inputs() || witness.len() != self.num_witness() {
            return false;
        }

        let num_instance = self.num_instance();
        let value = |index: usize| -> F {
            if index == 0 {
                F::one()
            } else if index < num_instance {
                public[index - 1]
            } else {
                witness[index - num_instance]
            }
        };
        let eval = |row: &[(F, usize)]| -> F {
            row.iter()
                .fold(F::zero(), |acc, (coeff, index)| acc + *coeff * value(*index))
        };

        let m = &self.matrices;
        (0..m.num_constraints).all(|i| eval(&m.a[i]) * eval(&m.b[i]) == eval(&m.c[i]))
    }

    /// Replay the compiled matrices as a synthesizer
    ///
    /// `None` is for key generation; `Some((public, witness))` for proving.
    /// Setup and proving both go through this path so the proving key and
    /// the prover always see identical matrices.
    pub fn synthesizer<'a>(
        &'a self,
        assignment: Option<(&'a [F], &'a [F])>,
    ) -> ModelSynthesizer<'a, F> {
        ModelSynthesizer {
            model: self,
            assignment,
        }
    }
}

impl<F: PrimeField> fmt::Debug for ConstraintModel<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintModel")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("constraints", &self.num_constraints())
            .field("instance", &self.num_instance())
            .field("witness", &self.num_witness())
            .finish()
    }
}

/// `ConstraintSynthesizer` over a compiled model
pub struct ModelSynthesizer<'a, F: PrimeField> {
    model: &'a ConstraintModel<F>,
    assignment: Option<(&'a [F], &'a [F])>,
}

impl<'a, F: PrimeField> ConstraintSynthesizer<F> for ModelSynthesizer<'a, F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        let model = self.model;
        let public = self.assignment.map(|(public, _)| public);
        let witness = self.assignment.map(|(_, witness)| witness);

        for i in 0..model.num_public_inputs() {
            cs.new_input_variable(|| {
                public
                    .and_then(|p| p.get(i).copied())
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;
        }

        for i in 0..model.num_witness() {
            cs.new_witness_variable(|| {
                witness
                    .and_then(|w| w.get(i).copied())
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;
        }

        let num_instance = model.num_instance();
        let m = &model.matrices;
        for i in 0..m.num_constraints {
            cs.enforce_constraint(
                to_lc(&m.a[i], num_instance),
                to_lc(&m.b[i], num_instance),
                to_lc(&m.c[i], num_instance),
            )?;
        }

        Ok(())
    }
}

fn to_lc<F: PrimeField>(row: &[(F, usize)], num_instance: usize) -> LinearCombination<F> {
    LinearCombination(
        row.iter()
            .map(|(coeff, index)| {
                let var = if *index == 0 {
                    Variable::One
                } else if *index < num_instance {
                    Variable::Instance(*index)
                } else {
                    Variable::Witness(*index - num_instance)
                };
                (*coeff, var)
            })
            .collect(),
    )
}

fn fingerprint<F: PrimeField>(policy: &EligibilityPolicy, m: &ConstraintMatrices<F>) -> ModelId {
    let mut hasher = Keccak256::new();
    hasher.update(MODEL_ID_TAG);

    hasher.update(policy.balance_threshold.to_le_bytes());
    hasher.update(policy.gpa_threshold.to_le_bytes());
    hasher.update((policy.balance_bits as u64).to_le_bytes());
    hasher.update((policy.gpa_bits as u64).to_le_bytes());

    for count in [m.num_instance_variables, m.num_witness_variables, m.num_constraints] {
        hasher.update((count as u64).to_le_bytes());
    }

    for matrix in [&m.a, &m.b, &m.c] {
        for row in matrix.iter() {
            hasher.update((row.len() as u64).to_le_bytes());
            for (coeff, index) in row {
                hasher.update(coeff.into_bigint().to_bytes_le());
                hasher.update((*index as u64).to_le_bytes());
            }
        }
    }

    ModelId(hasher.finalize().into())
}
