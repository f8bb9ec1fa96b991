//! Configuration Module
//!
//! Environment variables only, loaded once at startup. `.env` is read by the
//! binary through dotenvy before `from_env` runs.
//!
//! # Design Decision
//!
//! 임계값은 설정으로 받지만 회로 상수로 컴파일된다.
//!    - 임계값이 바뀌면 `ModelId`가 바뀐다
//!    - 기존 `BUNDLE_PATH` 번들은 `VersionMismatch`로 로드 실패
//!    - 잘못된 값은 `from_env()`에서 즉시 실패 (fail-fast)

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use zk_eligibility_circuits::{
    policy::{DEFAULT_BALANCE_BITS, DEFAULT_GPA_BITS},
    EligibilityPolicy, BALANCE_DECIMALS, GPA_DECIMALS,
};

use crate::services::witness::parse_decimal;

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// Setup bundle directory (default: ./setup/eligibility)
    pub bundle_path: PathBuf,

    /// Balance threshold in cents (default: 50000.00)
    pub balance_threshold: u64,

    /// GPA threshold in hundredths (default: 3.00)
    pub gpa_threshold: u64,

    /// Balance range proof width (default: 48)
    pub balance_bits: usize,

    /// GPA range proof width (default: 10)
    pub gpa_bits: usize,

    /// Proofs allowed to run at once (default: 4)
    pub prover_concurrency: usize,

    /// Environment (development, staging, production)
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Optional Environment Variables
    ///
    /// - `BUNDLE_PATH`: setup bundle directory
    /// - `BALANCE_THRESHOLD`: decimal, at most 2 fractional digits
    /// - `GPA_THRESHOLD`: decimal, at most 2 fractional digits
    /// - `BALANCE_BITS`, `GPA_BITS`: range proof widths
    /// - `PROVER_CONCURRENCY`: concurrent proofs
    /// - `ENVIRONMENT`: development | staging | production
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an explicit variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let environment = match var("ENVIRONMENT", "development").to_lowercase().as_str() {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        };

        Ok(Config {
            bundle_path: PathBuf::from(var("BUNDLE_PATH", "./setup/eligibility")),

            balance_threshold: parse_decimal(
                &var("BALANCE_THRESHOLD", "50000.00"),
                BALANCE_DECIMALS,
                "BALANCE_THRESHOLD",
            )
            .context("BALANCE_THRESHOLD must be a non-negative decimal")?,

            gpa_threshold: parse_decimal(
                &var("GPA_THRESHOLD", "3.00"),
                GPA_DECIMALS,
                "GPA_THRESHOLD",
            )
            .context("GPA_THRESHOLD must be a non-negative decimal")?,

            balance_bits: var("BALANCE_BITS", &DEFAULT_BALANCE_BITS.to_string())
                .parse()
                .context("BALANCE_BITS must be a valid number")?,

            gpa_bits: var("GPA_BITS", &DEFAULT_GPA_BITS.to_string())
                .parse()
                .context("GPA_BITS must be a valid number")?,

            prover_concurrency: var("PROVER_CONCURRENCY", "4")
                .parse()
                .context("PROVER_CONCURRENCY must be a valid number")?,

            environment,
        })
    }

    /// Circuit constants for this process
    pub fn policy(&self) -> crate::error::Result<EligibilityPolicy> {
        Ok(EligibilityPolicy::with_bits(
            self.balance_threshold,
            self.gpa_threshold,
            self.balance_bits,
            self.gpa_bits,
        )?)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bundle_path, PathBuf::from("./setup/eligibility"));
        assert_eq!(config.balance_threshold, 5_000_000);
        assert_eq!(config.gpa_threshold, 300);
        assert_eq!(config.prover_concurrency, 4);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.policy().unwrap(), EligibilityPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("BALANCE_THRESHOLD", "42000.5"),
            ("GPA_THRESHOLD", "3.25"),
            ("ENVIRONMENT", "Production"),
        ])
        .unwrap();
        assert_eq!(config.balance_threshold, 4_200_050);
        assert_eq!(config.gpa_threshold, 325);
        assert!(config.is_production());
    }

    #[test]
    fn test_bad_values_fail_fast() {
        assert!(config(&[("BALANCE_THRESHOLD", "lots")]).is_err());
        assert!(config(&[("GPA_THRESHOLD", "3.333")]).is_err());
        assert!(config(&[("PROVER_CONCURRENCY", "-1")]).is_err());
    }

    #[test]
    fn test_policy_out_of_domain() {
        let config = config(&[("GPA_THRESHOLD", "5.50")]).unwrap();
        assert_eq!(config.policy().unwrap_err().kind(), ErrorKind::InvalidDomain);
    }
}
