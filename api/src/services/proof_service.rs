//! Proof Service Facade
//!
//! # Request lifecycle
//!
//! ```text
//!  Idle ──witness──▶ WitnessComputed ──prove──▶ Proved ──verify──▶ Verified
//!   │                     │                       │
//!   └─────────────────────┴───────────────────────┴──▶ Failed(kind)
//! ```
//!
//! Every request gets its own `ProofSession`. A failure ends the session;
//! nothing is retried. Callers decide whether to submit again.

use std::fmt;

use crate::error::{ErrorKind, FailureResponse, ProofError, Result};
use crate::services::backend::ProvingBackend;
use crate::services::prover::RandomnessSource;
use crate::types::{EligibilityRequest, Proof, ProofReply, ProofResponse, PublicSignals};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofState {
    Idle,
    WitnessComputed,
    Proved,
    Verified,
    Failed(ErrorKind),
}

impl ProofState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProofState::Verified | ProofState::Failed(_))
    }

    fn can_advance_to(self, next: ProofState) -> bool {
        matches!(
            (self, next),
            (ProofState::Idle, ProofState::WitnessComputed)
                | (ProofState::WitnessComputed, ProofState::Proved)
                | (ProofState::Proved, ProofState::Verified)
        ) || (!self.is_terminal() && matches!(next, ProofState::Failed(_)))
    }
}

/// State trail of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofSession {
    trail: Vec<ProofState>,
}

impl Default for ProofSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofSession {
    pub fn new() -> Self {
        Self {
            trail: vec![ProofState::Idle],
        }
    }

    pub fn state(&self) -> ProofState {
        self.trail.last().copied().unwrap_or(ProofState::Idle)
    }

    pub fn trail(&self) -> &[ProofState] {
        &self.trail
    }

    pub fn advance(&mut self, next: ProofState) -> Result<()> {
        let current = self.state();
        if !current.can_advance_to(next) {
            return Err(ProofError::internal(format!(
                "illegal transition {:?} -> {:?}",
                current, next
            )));
        }
        self.trail.push(next);
        Ok(())
    }

    fn fail(&mut self, err: &ProofError) {
        if !self.state().is_terminal() {
            self.trail.push(ProofState::Failed(err.kind()));
        }
    }
}

/// Result of one successful request
#[derive(Clone)]
pub struct ProofOutcome {
    pub proof: Proof,
    pub public_signals: PublicSignals,
    pub verified: bool,
}

impl ProofOutcome {
    pub fn eligible(&self) -> Option<bool> {
        self.public_signals.eligible()
    }

    pub fn to_response(&self) -> ProofResponse {
        ProofResponse {
            proof: self.proof.to_hex(),
            public_signals: self.public_signals.to_hex(),
            verified: self.verified,
        }
    }
}

impl fmt::Debug for ProofOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofOutcome")
            .field("proof", &self.proof)
            .field("eligible", &self.eligible())
            .field("verified", &self.verified)
            .finish()
    }
}

/// Facade over witness generation, proving and verification
pub struct ProofService<B, R> {
    backend: B,
    randomness: R,
}

impl<B: ProvingBackend, R: RandomnessSource> ProofService<B, R> {
    pub fn new(backend: B, randomness: R) -> Self {
        Self { backend, randomness }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one request end to end
    pub fn request_proof(&self, balance: f64, gpa: f64) -> Result<ProofOutcome> {
        let mut session = ProofSession::new();
        self.execute(balance, gpa, &mut session)
    }

    /// Same as `request_proof`, recording transitions into `session`
    pub fn execute(
        &self,
        balance: f64,
        gpa: f64,
        session: &mut ProofSession,
    ) -> Result<ProofOutcome> {
        let result = self.run(balance, gpa, session);
        if let Err(err) = &result {
            session.fail(err);
            tracing::warn!(
                bundle_id = %self.backend.bundle_id(),
                error_kind = ?err.kind(),
                "proof request failed"
            );
        }
        result
    }

    /// Egress wrapper: success record or failure record, never both
    pub fn handle(&self, request: &EligibilityRequest) -> ProofReply {
        match self.request_proof(request.bank_balance, request.gpa) {
            Ok(outcome) => ProofReply::Success(outcome.to_response()),
            Err(err) => ProofReply::Failure(FailureResponse::from(&err)),
        }
    }

    fn run(&self, balance: f64, gpa: f64, session: &mut ProofSession) -> Result<ProofOutcome> {
        if session.state() != ProofState::Idle {
            return Err(ProofError::internal("session already used"));
        }

        let witness = self.backend.generate_witness(balance, gpa)?;
        session.advance(ProofState::WitnessComputed)?;

        let mut rng = self.randomness.rng();
        let (proof, public_signals) = self.backend.prove(witness, &mut rng)?;
        session.advance(ProofState::Proved)?;

        let verified = self.backend.verify(&proof, &public_signals)?;
        session.advance(ProofState::Verified)?;

        if !verified {
            tracing::error!(
                bundle_id = %proof.bundle_id(),
                "freshly generated proof failed verification"
            );
        }

        Ok(ProofOutcome {
            proof,
            public_signals,
            verified,
        })
    }
}
