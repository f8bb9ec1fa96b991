//! Setup Artifact Manager
//!
//! A setup bundle is a directory:
//!
//! ```text
//! <bundle>/
//!   manifest.json          format version, policy, model id, bundle id, digests
//!   proving_key.bin        compressed Groth16 proving key
//!   verification_key.bin   compressed Groth16 verifying key
//! ```
//!
//! `load` validates the whole bundle before handing out anything. The first
//! failing check decides the error:
//!
//! 1. files present                                   → `SetupMissing`
//! 2. manifest parses                                 → `SetupCorrupt`
//! 3. format version and model id match this process  → `VersionMismatch`
//! 4. manifest policy recompiles to the same model id → `SetupCorrupt`
//! 5. artifact sizes and Keccak-256 digests           → `SetupCorrupt`
//! 6. keys deserialize (curve + subgroup checks)      → `SetupCorrupt`
//! 7. key layouts, embedded vk, bundle id             → `SetupCorrupt`

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use ark_bn254::Bn254;
use ark_groth16::{Groth16, PreparedVerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use zk_eligibility_circuits::{ConstraintModel, EligibilityPolicy, Fr, ModelId};

use crate::error::{ProofError, Result};
use crate::types::BundleId;

/// Bundle layout version written into every manifest
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const PROVING_KEY_FILE: &str = "proving_key.bin";
pub const VERIFICATION_KEY_FILE: &str = "verification_key.bin";

const BUNDLE_ID_TAG: &[u8] = b"zk-eligibility/bundle/v1";

/// Groth16 proving key bound to one model and one bundle
pub struct ProvingKey {
    bundle_id: BundleId,
    model: Arc<ConstraintModel<Fr>>,
    key: ark_groth16::ProvingKey<Bn254>,
}

impl ProvingKey {
    pub fn bundle_id(&self) -> BundleId {
        self.bundle_id
    }

    pub fn model(&self) -> &ConstraintModel<Fr> {
        &self.model
    }

    pub(crate) fn inner(&self) -> &ark_groth16::ProvingKey<Bn254> {
        &self.key
    }
}

/// Groth16 verifying key with its prepared (pairing-ready) form
pub struct VerificationKey {
    bundle_id: BundleId,
    model_id: ModelId,
    num_public_inputs: usize,
    key: ark_groth16::VerifyingKey<Bn254>,
    prepared: PreparedVerifyingKey<Bn254>,
}

impl VerificationKey {
    fn new(
        bundle_id: BundleId,
        model: &ConstraintModel<Fr>,
        key: ark_groth16::VerifyingKey<Bn254>,
    ) -> Result<Self> {
        let prepared = Groth16::<Bn254>::process_vk(&key)
            .map_err(|e| {
                ProofError::internal(format!("verification key preparation failed: {}", e))
            })?;
        Ok(Self {
            bundle_id,
            model_id: model.id(),
            num_public_inputs: model.num_public_inputs(),
            key,
            prepared,
        })
    }

    pub fn bundle_id(&self) -> BundleId {
        self.bundle_id
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn num_public_inputs(&self) -> usize {
        self.num_public_inputs
    }

    pub(crate) fn prepared(&self) -> &PreparedVerifyingKey<Bn254> {
        &self.prepared
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serialize(&self.key)
    }
}

/// Validated keys for one model
///
/// Shared read-only behind `Arc`; nothing in here is mutated after load.
pub struct SetupArtifacts {
    model: Arc<ConstraintModel<Fr>>,
    proving_key: ProvingKey,
    verification_key: VerificationKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    model_id: String,
    bundle_id: String,
    policy: EligibilityPolicy,
    num_public_inputs: usize,
    num_witness: usize,
    num_constraints: usize,
    proving_key: ArtifactEntry,
    verification_key: ArtifactEntry,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEntry {
    file: String,
    size: u64,
    keccak256: String,
}

impl ArtifactEntry {
    fn describe(file: &str, bytes: &[u8]) -> Self {
        Self {
            file: file.to_string(),
            size: bytes.len() as u64,
            keccak256: format!("0x{}", hex::encode(Keccak256::digest(bytes))),
        }
    }

    fn check(&self, expected_file: &str, bytes: &[u8]) -> Result<()> {
        if self.file != expected_file {
            return Err(ProofError::SetupCorrupt(format!(
                "manifest names {} instead of {}",
                self.file, expected_file
            )));
        }
        if self.size != bytes.len() as u64 {
            return Err(ProofError::SetupCorrupt(format!("{} has the wrong size", expected_file)));
        }
        let digest = format!("0x{}", hex::encode(Keccak256::digest(bytes)));
        if self.keccak256 != digest {
            return Err(ProofError::SetupCorrupt(format!("{} digest mismatch", expected_file)));
        }
        Ok(())
    }
}

impl SetupArtifacts {
    /// Single-party development setup
    ///
    /// Whoever holds `rng` can forge proofs for this bundle. Use a ceremony
    /// output in production.
    pub fn generate<R: RngCore + CryptoRng>(
        model: Arc<ConstraintModel<Fr>>,
        rng: &mut R,
    ) -> Result<Self> {
        tracing::warn!(model_id = %model.id(), "running single-party development setup");

        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(model.synthesizer(None), rng)
            .map_err(|e| ProofError::internal(format!("key generation failed: {}", e)))?;

        let bundle_id = bundle_id(model.id(), &serialize(&vk));
        tracing::info!(model_id = %model.id(), bundle_id = %bundle_id, "setup artifacts generated");

        Self::assemble(model, bundle_id, pk, vk)
    }

    /// Load and validate a bundle directory for `model`
    pub fn load(dir: &Path, model: Arc<ConstraintModel<Fr>>) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let pk_path = dir.join(PROVING_KEY_FILE);
        let vk_path = dir.join(VERIFICATION_KEY_FILE);

        for path in [&manifest_path, &pk_path, &vk_path] {
            if !path.is_file() {
                return Err(ProofError::SetupMissing {
                    path: path.display().to_string(),
                });
            }
        }

        let manifest: Manifest = serde_json::from_slice(&read(&manifest_path)?)
            .map_err(|e| ProofError::SetupCorrupt(format!("manifest: {}", e)))?;

        if manifest.format_version != BUNDLE_FORMAT_VERSION {
            return Err(ProofError::VersionMismatch {
                expected: format!("format v{}", BUNDLE_FORMAT_VERSION),
                found: format!("format v{}", manifest.format_version),
            });
        }
        if manifest.model_id != model.id().to_hex() {
            return Err(ProofError::VersionMismatch {
                expected: model.id().to_hex(),
                found: manifest.model_id,
            });
        }

        let recompiled = ConstraintModel::<Fr>::compile(manifest.policy)
            .map_err(|e| ProofError::SetupCorrupt(format!("manifest policy: {}", e)))?;
        if recompiled.id() != model.id()
            || manifest.num_public_inputs != model.num_public_inputs()
            || manifest.num_witness != model.num_witness()
            || manifest.num_constraints != model.num_constraints()
        {
            return Err(ProofError::SetupCorrupt(
                "manifest policy does not produce the declared model".into(),
            ));
        }

        let pk_bytes = read(&pk_path)?;
        let vk_bytes = read(&vk_path)?;
        manifest.proving_key.check(PROVING_KEY_FILE, &pk_bytes)?;
        manifest.verification_key.check(VERIFICATION_KEY_FILE, &vk_bytes)?;

        let pk = ark_groth16::ProvingKey::<Bn254>::deserialize_compressed(pk_bytes.as_slice())
            .map_err(|e| ProofError::SetupCorrupt(format!("proving key: {}", e)))?;
        let vk = ark_groth16::VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes.as_slice())
            .map_err(|e| ProofError::SetupCorrupt(format!("verification key: {}", e)))?;

        if pk.vk != vk {
            return Err(ProofError::SetupCorrupt(
                "proving key embeds a different verification key".into(),
            ));
        }
        check_layout(&model, &pk)?;

        let bundle_id = bundle_id(model.id(), &vk_bytes);
        if manifest.bundle_id != bundle_id.to_hex() {
            return Err(ProofError::SetupCorrupt("bundle id mismatch".into()));
        }

        tracing::info!(
            path = %dir.display(),
            model_id = %model.id(),
            bundle_id = %bundle_id,
            "setup artifacts loaded"
        );

        Self::assemble(model, bundle_id, pk, vk)
    }

    /// Write the bundle into `dir` (created if needed)
    pub fn write(&self, dir: &Path) -> anyhow::Result<()> {
        let model = &self.model;
        let pk_bytes = serialize(&self.proving_key.key);
        let vk_bytes = serialize(&self.verification_key.key);

        let manifest = Manifest {
            format_version: BUNDLE_FORMAT_VERSION,
            model_id: model.id().to_hex(),
            bundle_id: self.bundle_id().to_hex(),
            policy: *model.policy(),
            num_public_inputs: model.num_public_inputs(),
            num_witness: model.num_witness(),
            num_constraints: model.num_constraints(),
            proving_key: ArtifactEntry::describe(PROVING_KEY_FILE, &pk_bytes),
            verification_key: ArtifactEntry::describe(VERIFICATION_KEY_FILE, &vk_bytes),
        };

        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        fs::write(dir.join(PROVING_KEY_FILE), &pk_bytes).context("Failed to write proving key")?;
        fs::write(dir.join(VERIFICATION_KEY_FILE), &vk_bytes)
            .context("Failed to write verification key")?;
        // manifest last: a bundle without one reads as missing, not corrupt
        fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)
            .context("Failed to write manifest")?;

        tracing::info!(
            path = %dir.display(),
            bundle_id = %self.bundle_id(),
            "setup bundle written"
        );
        Ok(())
    }

    pub fn model(&self) -> &Arc<ConstraintModel<Fr>> {
        &self.model
    }

    pub fn bundle_id(&self) -> BundleId {
        self.verification_key.bundle_id
    }

    pub fn proving_key(&self) -> &ProvingKey {
        &self.proving_key
    }

    pub fn verification_key(&self) -> &VerificationKey {
        &self.verification_key
    }

    fn assemble(
        model: Arc<ConstraintModel<Fr>>,
        bundle_id: BundleId,
        pk: ark_groth16::ProvingKey<Bn254>,
        vk: ark_groth16::VerifyingKey<Bn254>,
    ) -> Result<Self> {
        let verification_key = VerificationKey::new(bundle_id, &model, vk)?;
        Ok(Self {
            proving_key: ProvingKey {
                bundle_id,
                model: model.clone(),
                key: pk,
            },
            verification_key,
            model,
        })
    }
}

/// Check a Groth16 key was built for the model's wire layout
fn check_layout(model: &ConstraintModel<Fr>, pk: &ark_groth16::ProvingKey<Bn254>) -> Result<()> {
    if pk.vk.gamma_abc_g1.len() != model.num_instance() {
        return Err(ProofError::SetupCorrupt(format!(
            "verification key expects {} public inputs, model has {}",
            pk.vk.gamma_abc_g1.len().saturating_sub(1),
            model.num_public_inputs()
        )));
    }
    if pk.a_query.len() != model.num_instance() + model.num_witness() {
        return Err(ProofError::SetupCorrupt(
            "proving key wire count does not match model".into(),
        ));
    }
    Ok(())
}

fn bundle_id(model_id: ModelId, vk_bytes: &[u8]) -> BundleId {
    let mut hasher = Keccak256::new();
    hasher.update(BUNDLE_ID_TAG);
    hasher.update(model_id.as_bytes());
    hasher.update(vk_bytes);
    BundleId::from_bytes(hasher.finalize().into())
}

fn serialize<T: CanonicalSerialize>(value: &T) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    // Writing into a Vec cannot fail
    let _ = value.serialize_compressed(&mut bytes);
    bytes
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| ProofError::SetupCorrupt(format!("{}: {}", path.display(), e)))
}

/// Loads bundles for one model and caches them per path
///
/// # Design Decision
///
/// Double-checked locking, same shape as lazy key generation: readers share
/// the cached `Arc`, only a cache miss takes the write lock.
pub struct SetupArtifactManager {
    model: Arc<ConstraintModel<Fr>>,
    cache: RwLock<HashMap<PathBuf, Arc<SetupArtifacts>>>,
}

impl SetupArtifactManager {
    pub fn new(model: Arc<ConstraintModel<Fr>>) -> Self {
        Self {
            model,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn model(&self) -> &Arc<ConstraintModel<Fr>> {
        &self.model
    }

    pub fn load(&self, bundle: &Path) -> Result<Arc<SetupArtifacts>> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|_| ProofError::internal("artifact cache poisoned"))?;
            if let Some(artifacts) = cache.get(bundle) {
                return Ok(artifacts.clone());
            }
        }

        let mut cache = self
            .cache
            .write()
            .map_err(|_| ProofError::internal("artifact cache poisoned"))?;

        // Double-check after acquiring write lock
        if let Some(artifacts) = cache.get(bundle) {
            return Ok(artifacts.clone());
        }

        let artifacts = Arc::new(SetupArtifacts::load(bundle, self.model.clone())?);
        cache.insert(bundle.to_path_buf(), artifacts.clone());
        Ok(artifacts)
    }

    /// Drop a cached bundle so the next `load` reads it from disk again
    pub fn evict(&self, bundle: &Path) {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(bundle);
        }
    }
}
