//! Shared fixtures for unit tests
//!
//! Groth16 setup runs once per test binary.

use std::sync::{Arc, OnceLock};

use rand::{rngs::StdRng, SeedableRng};
use zk_eligibility_circuits::{ConstraintModel, EligibilityPolicy, Fr};

use crate::services::SetupArtifacts;

pub(crate) fn model() -> Arc<ConstraintModel<Fr>> {
    static MODEL: OnceLock<Arc<ConstraintModel<Fr>>> = OnceLock::new();
    MODEL
        .get_or_init(|| Arc::new(ConstraintModel::compile(EligibilityPolicy::default()).unwrap()))
        .clone()
}

pub(crate) fn artifacts() -> Arc<SetupArtifacts> {
    static ARTIFACTS: OnceLock<Arc<SetupArtifacts>> = OnceLock::new();
    ARTIFACTS
        .get_or_init(|| {
            let mut rng = StdRng::seed_from_u64(0x5eed);
            Arc::new(SetupArtifacts::generate(model(), &mut rng).unwrap())
        })
        .clone()
}
