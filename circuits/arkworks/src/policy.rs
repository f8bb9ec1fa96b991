//! Eligibility Policy
//!
//! Thresholds and bit widths are circuit constants. They are baked into the
//! constraint matrices, so every change produces a new `ModelId` and needs a
//! fresh setup bundle.
//!
//! # Fixed-point representation
//!
//! | Value | Unit | Scale | Domain |
//! |-------|------|-------|--------|
//! | bank balance | cents | 100 | `[0, 2^balance_bits)` |
//! | GPA | hundredths | 100 | `[0, 500]` |

use serde::{Deserialize, Serialize};

use crate::error::{CircuitError, CircuitResult};

/// Fractional digits kept for the bank balance
pub const BALANCE_DECIMALS: u32 = 2;

/// Fractional digits kept for the GPA
pub const GPA_DECIMALS: u32 = 2;

/// Highest representable GPA (5.00) in fixed point
pub const GPA_MAX: u64 = 500;

/// Default balance width: 2^48 cents is roughly 2.8 trillion
pub const DEFAULT_BALANCE_BITS: usize = 48;

/// Default GPA width: 2^10 = 1024 > 500
pub const DEFAULT_GPA_BITS: usize = 10;

/// Widest supported comparison operand. `a - b + 2^bits` must stay below 2^64.
pub const MAX_VALUE_BITS: usize = 63;

/// Default balance threshold: 50,000.00
pub const DEFAULT_BALANCE_THRESHOLD: u64 = 5_000_000;

/// Default GPA threshold: 3.00
pub const DEFAULT_GPA_THRESHOLD: u64 = 300;

/// Circuit constants for the eligibility predicate
///
/// `eligible = balance < balance_threshold AND gpa >= gpa_threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    /// Balance ceiling in cents (exclusive)
    pub balance_threshold: u64,
    /// GPA floor in hundredths (inclusive)
    pub gpa_threshold: u64,
    /// Bit width of the balance range proof
    pub balance_bits: usize,
    /// Bit width of the GPA range proof
    pub gpa_bits: usize,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            balance_threshold: DEFAULT_BALANCE_THRESHOLD,
            gpa_threshold: DEFAULT_GPA_THRESHOLD,
            balance_bits: DEFAULT_BALANCE_BITS,
            gpa_bits: DEFAULT_GPA_BITS,
        }
    }
}

impl EligibilityPolicy {
    /// Create a validated policy with the default bit widths
    pub fn new(balance_threshold: u64, gpa_threshold: u64) -> CircuitResult<Self> {
        Self::with_bits(
            balance_threshold,
            gpa_threshold,
            DEFAULT_BALANCE_BITS,
            DEFAULT_GPA_BITS,
        )
    }

    /// Create a validated policy with explicit bit widths
    pub fn with_bits(
        balance_threshold: u64,
        gpa_threshold: u64,
        balance_bits: usize,
        gpa_bits: usize,
    ) -> CircuitResult<Self> {
        let policy = Self {
            balance_threshold,
            gpa_threshold,
            balance_bits,
            gpa_bits,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check that the bit widths represent every value the predicate touches
    ///
    /// The comparison gadget decomposes `a - b + 2^bits` into `bits + 1` bits,
    /// which is only collision-free when both operands are below `2^bits`.
    pub fn validate(&self) -> CircuitResult<()> {
        for (name, bits) in [("balance", self.balance_bits), ("gpa", self.gpa_bits)] {
            if bits == 0 || bits > MAX_VALUE_BITS {
                return Err(CircuitError::invalid_domain(format!(
                    "{} bit width must be in [1, {}], got {}",
                    name, MAX_VALUE_BITS, bits
                )));
            }
        }

        if self.balance_threshold > self.max_balance() {
            return Err(CircuitError::invalid_domain(format!(
                "balance threshold does not fit in {} bits",
                self.balance_bits
            )));
        }

        if GPA_MAX > max_for_bits(self.gpa_bits) {
            return Err(CircuitError::invalid_domain(format!(
                "gpa ceiling {} does not fit in {} bits",
                GPA_MAX, self.gpa_bits
            )));
        }

        if self.gpa_threshold > GPA_MAX {
            return Err(CircuitError::invalid_domain(format!(
                "gpa threshold {} exceeds ceiling {}",
                self.gpa_threshold, GPA_MAX
            )));
        }

        Ok(())
    }

    /// Largest balance (cents) the range proof accepts
    pub fn max_balance(&self) -> u64 {
        max_for_bits(self.balance_bits)
    }

    /// Evaluate the predicate outside the circuit
    pub fn is_eligible(&self, balance: u64, gpa: u64) -> bool {
        balance < self.balance_threshold && gpa >= self.gpa_threshold
    }
}

fn max_for_bits(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = EligibilityPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.max_balance(), (1u64 << 48) - 1);
    }

    #[test]
    fn test_predicate_boundaries() {
        let policy = EligibilityPolicy::default();

        // 40,000.00 / 3.50
        assert!(policy.is_eligible(4_000_000, 350));
        // 60,000.00 / 3.50
        assert!(!policy.is_eligible(6_000_000, 350));
        // balance equal to threshold is not below it
        assert!(!policy.is_eligible(5_000_000, 350));
        // gpa equal to threshold passes
        assert!(policy.is_eligible(4_999_999, 300));
        assert!(!policy.is_eligible(0, 299));
    }

    #[test]
    fn test_threshold_outside_bit_width() {
        let result = EligibilityPolicy::with_bits(1 << 20, 300, 20, DEFAULT_GPA_BITS);
        assert!(matches!(result, Err(CircuitError::InvalidDomain { .. })));

        assert!(EligibilityPolicy::with_bits((1 << 20) - 1, 300, 20, DEFAULT_GPA_BITS).is_ok());
    }

    #[test]
    fn test_gpa_width_too_small() {
        // 2^8 - 1 = 255 < 500
        let result = EligibilityPolicy::with_bits(DEFAULT_BALANCE_THRESHOLD, 300, 48, 8);
        assert!(matches!(result, Err(CircuitError::InvalidDomain { .. })));
    }

    #[test]
    fn test_gpa_threshold_above_ceiling() {
        let result = EligibilityPolicy::new(DEFAULT_BALANCE_THRESHOLD, 501);
        assert!(matches!(result, Err(CircuitError::InvalidDomain { .. })));
    }

    #[test]
    fn test_bit_width_limits() {
        assert!(EligibilityPolicy::with_bits(0, 300, 0, 10).is_err());
        assert!(EligibilityPolicy::with_bits(0, 300, 64, 10).is_err());
        assert!(EligibilityPolicy::with_bits(0, 300, 63, 10).is_ok());
    }
}
