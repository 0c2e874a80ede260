//! Pure technical computation and stage-1 eligibility rules.
//!
//! Everything here is deterministic and synchronous: identical candle
//! sequences produce identical outputs. No I/O happens in this crate.

pub mod math;
pub mod rules;
pub mod snapshot;
pub mod swings;

pub use rules::{evaluate_eligibility, EligibilityInputs, EligibilityTrace, RuleCheck};
pub use snapshot::{compute_snapshot, IndicatorSnapshot};
