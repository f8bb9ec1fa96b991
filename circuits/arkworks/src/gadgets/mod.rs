//! Reusable R1CS gadgets
//!
//! - `RangeCheckGadget`: bit decomposition proving value in [0, 2^BITS)
//! - `ComparisonGadget`: boolean `a >= b` / `a < b` over range-checked operands

pub mod comparison;
pub mod range_check;

pub use comparison::ComparisonGadget;
pub use range_check::RangeCheckGadget;
