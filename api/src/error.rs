//! Error Handling Module
//!
//! One error type for the whole proof pipeline. Each variant maps to an
//! `ErrorKind` (stable, serialized into failure records) and an
//! `ErrorCategory` (how the caller should react).
//!
//! # Design Decision
//!
//! 에러 메시지에 비공개 입력값(잔액, GPA)을 절대 포함하지 않는다.
//!    - 필드 이름과 위반된 규칙만 기록
//!    - `Internal` 상세 내용은 로그에만 남고 응답에는 나가지 않음

use serde::{Deserialize, Serialize};
use thiserror::Error;

use zk_eligibility_circuits::CircuitError;

/// Proof pipeline error
#[derive(Debug, Error)]
pub enum ProofError {
    // ============ Input ============
    #[error("{field} is out of domain: {reason}")]
    OutOfDomain { field: &'static str, reason: String },

    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    #[error("{field} overflows the fixed-point representation")]
    ArithmeticOverflow { field: &'static str },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // ============ Setup ============
    #[error("setup artifacts missing at {path}")]
    SetupMissing { path: String },

    #[error("setup artifacts corrupt: {0}")]
    SetupCorrupt(String),

    #[error("setup version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: String, found: String },

    // ============ Cryptographic ============
    #[error("witness layout mismatch: expected {expected} wires, found {found}")]
    WitnessMismatch { expected: usize, found: usize },

    #[error("proving key was built for a different constraint model")]
    ProvingKeyStale,

    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("proof bundle {found} does not match verification key bundle {expected}")]
    KeyVersionMismatch { expected: String, found: String },

    // ============ Internal ============
    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable identifier of a failure, used in egress records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    OutOfDomain,
    InvalidDomain,
    ArithmeticOverflow,
    InvalidRequest,
    SetupMissing,
    SetupCorrupt,
    VersionMismatch,
    WitnessMismatch,
    ProvingKeyStale,
    MalformedProof,
    KeyVersionMismatch,
    Internal,
}

/// Coarse grouping of error kinds
///
/// - `Input`: caller supplied values the model cannot represent
/// - `Setup`: the process cannot serve; fatal at startup
/// - `Cryptographic`: artifacts do not fit together
/// - `Internal`: invariant violation, always a bug
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Input,
    Setup,
    Cryptographic,
    Internal,
}

impl ProofError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProofError::OutOfDomain { .. } => ErrorKind::OutOfDomain,
            ProofError::InvalidDomain(_) => ErrorKind::InvalidDomain,
            ProofError::ArithmeticOverflow { .. } => ErrorKind::ArithmeticOverflow,
            ProofError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ProofError::SetupMissing { .. } => ErrorKind::SetupMissing,
            ProofError::SetupCorrupt(_) => ErrorKind::SetupCorrupt,
            ProofError::VersionMismatch { .. } => ErrorKind::VersionMismatch,
            ProofError::WitnessMismatch { .. } => ErrorKind::WitnessMismatch,
            ProofError::ProvingKeyStale => ErrorKind::ProvingKeyStale,
            ProofError::MalformedProof(_) => ErrorKind::MalformedProof,
            ProofError::KeyVersionMismatch { .. } => ErrorKind::KeyVersionMismatch,
            ProofError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind().category()
    }

    pub(crate) fn out_of_domain(field: &'static str, reason: impl Into<String>) -> Self {
        ProofError::OutOfDomain {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn internal(reason: impl Into<String>) -> Self {
        ProofError::Internal(reason.into())
    }
}

impl ErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorKind::OutOfDomain
            | ErrorKind::InvalidDomain
            | ErrorKind::ArithmeticOverflow
            | ErrorKind::InvalidRequest => ErrorCategory::Input,
            ErrorKind::SetupMissing | ErrorKind::SetupCorrupt | ErrorKind::VersionMismatch => {
                ErrorCategory::Setup
            }
            ErrorKind::WitnessMismatch
            | ErrorKind::ProvingKeyStale
            | ErrorKind::MalformedProof
            | ErrorKind::KeyVersionMismatch => ErrorCategory::Cryptographic,
            ErrorKind::Internal => ErrorCategory::Internal,
        }
    }
}

/// Egress failure record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    pub error_kind: ErrorKind,
    pub message: String,
}

impl From<&ProofError> for FailureResponse {
    fn from(err: &ProofError) -> Self {
        let message = match err {
            // Internal details stay in the logs
            ProofError::Internal(_) => {
                tracing::error!(error = %err, "internal error");
                "An internal error occurred".to_string()
            }
            _ => err.to_string(),
        };

        Self {
            error_kind: err.kind(),
            message,
        }
    }
}

impl From<CircuitError> for ProofError {
    fn from(err: CircuitError) -> Self {
        match err {
            CircuitError::InvalidDomain { reason } => ProofError::InvalidDomain(reason),
            other => ProofError::Internal(other.to_string()),
        }
    }
}

/// Position and class only; serde messages can quote the offending input
pub fn describe_json_error(err: &serde_json::Error) -> String {
    format!(
        "{:?} error at line {} column {}",
        err.classify(),
        err.line(),
        err.column()
    )
}

/// Result type for the proof pipeline
pub type Result<T> = std::result::Result<T, ProofError>;
