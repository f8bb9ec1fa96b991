//! Common Types Module
//!
//! Ingress/egress records and the opaque artifacts that leave the prover.

use std::fmt;

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};

use zk_eligibility_circuits::Fr;

use crate::error::{FailureResponse, ProofError, Result};

/// 요청: 두 개의 비공개 입력값
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityRequest {
    pub bank_balance: f64,
    pub gpa: f64,
}

/// 응답: 증명, 공개 신호, 검증 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    /// `0x`-prefixed proof envelope
    pub proof: String,
    /// `0x`-prefixed field elements, eligibility bit first
    pub public_signals: Vec<String>,
    pub verified: bool,
}

impl ProofResponse {
    pub fn decode(&self) -> Result<(Proof, PublicSignals)> {
        let proof = Proof::from_hex(&self.proof)?;
        let signals = PublicSignals::from_hex(&self.public_signals)?;
        Ok((proof, signals))
    }
}

/// Egress record: exactly one of success or failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProofReply {
    Success(ProofResponse),
    Failure(FailureResponse),
}

impl ProofReply {
    pub fn is_success(&self) -> bool {
        matches!(self, ProofReply::Success(_))
    }
}

/// Keccak-256 identifier of one setup bundle
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BundleId([u8; 32]);

impl BundleId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()?;
        Some(Self(bytes.try_into().ok()?))
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BundleId({})", self.to_hex())
    }
}

/// Proof envelope
///
/// # Encoding
///
/// ```text
/// "ZKEP" | version (1) | bundle id (32) | compressed Groth16 proof (128)
/// ```
///
/// The envelope only checks framing. Whether the body is a valid Groth16
/// proof is decided by the verifier.
#[derive(Clone, PartialEq, Eq)]
pub struct Proof {
    bundle_id: BundleId,
    body: Vec<u8>,
}

/// Envelope magic
pub const PROOF_MAGIC: &[u8; 4] = b"ZKEP";

/// Envelope version
pub const PROOF_VERSION: u8 = 1;

const HEADER_LEN: usize = PROOF_MAGIC.len() + 1 + 32;

/// Encoded length of every proof: header + compressed (A, B, C) on BN254
pub const PROOF_LEN: usize = HEADER_LEN + 128;

impl Proof {
    pub(crate) fn new(bundle_id: BundleId, body: Vec<u8>) -> Self {
        Self { bundle_id, body }
    }

    pub fn bundle_id(&self) -> BundleId {
        self.bundle_id
    }

    pub(crate) fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.body.len());
        out.extend_from_slice(PROOF_MAGIC);
        out.push(PROOF_VERSION);
        out.extend_from_slice(self.bundle_id.as_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(ProofError::MalformedProof("truncated envelope".into()));
        }
        if &bytes[..4] != PROOF_MAGIC {
            return Err(ProofError::MalformedProof("bad magic".into()));
        }
        if bytes[4] != PROOF_VERSION {
            return Err(ProofError::MalformedProof(format!(
                "unsupported envelope version {}",
                bytes[4]
            )));
        }

        let mut id = [0u8; 32];
        id.copy_from_slice(&bytes[5..HEADER_LEN]);

        Ok(Self {
            bundle_id: BundleId(id),
            body: bytes[HEADER_LEN..].to_vec(),
        })
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| ProofError::MalformedProof(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proof")
            .field("bundle_id", &self.bundle_id)
            .field("len", &self.body.len())
            .finish()
    }
}

/// Public signals of one proof, in model order
///
/// Only the eligibility bit is public; thresholds are model constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicSignals(Vec<Fr>);

impl PublicSignals {
    pub fn new(values: Vec<Fr>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[Fr] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Some(true|false)` when the first signal is a bit, `None` otherwise
    pub fn eligible(&self) -> Option<bool> {
        let first = self.0.first()?;
        if *first == Fr::from(1u64) {
            Some(true)
        } else if *first == Fr::from(0u64) {
            Some(false)
        } else {
            None
        }
    }

    /// 32-byte little-endian hex per element
    pub fn to_hex(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|value| {
                let mut bytes = Vec::with_capacity(32);
                // Writing into a Vec cannot fail
                let _ = value.serialize_compressed(&mut bytes);
                format!("0x{}", hex::encode(bytes))
            })
            .collect()
    }

    /// Parse signals, rejecting non-canonical field encodings
    pub fn from_hex(values: &[String]) -> Result<Self> {
        values
            .iter()
            .map(|s| {
                let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
                    .map_err(|e| ProofError::MalformedProof(format!("invalid signal hex: {}", e)))?;
                if bytes.len() != 32 {
                    return Err(ProofError::MalformedProof(
                        "public signal must be 32 bytes".into(),
                    ));
                }
                Fr::deserialize_compressed(bytes.as_slice())
                    .map_err(|e| ProofError::MalformedProof(format!("invalid signal: {}", e)))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}
