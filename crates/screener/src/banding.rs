//! Confidence banding and sizing suggestions.
//!
//! The band is a cascade, not a weighted score: the first condition that
//! matches decides. Data completeness and regime can only lower the band,
//! never raise it.

use serde::{Deserialize, Serialize};

use wheel_scan_core::{Regime, Verdict};

/// Confidence in acting on a result. Drives the suggested position size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceBand {
    A,
    B,
    C,
}

impl ConfidenceBand {
    /// Suggested fraction of the account per position.
    #[must_use]
    pub fn suggested_capital_pct(self) -> f64 {
        match self {
            Self::A => 0.05,
            Self::B => 0.03,
            Self::C => 0.02,
        }
    }
}

/// Everything the banding cascade looks at.
#[derive(Debug, Clone)]
pub struct BandInputs {
    pub verdict: Verdict,
    pub final_score: f64,
    pub regime: Regime,
    /// Fraction of required fields that came back valid, 0.0-1.0.
    pub completeness: f64,
    /// Selected contract graded A or B.
    pub liquidity_ok: bool,
    /// A position is already open on this symbol.
    pub position_open: bool,
}

/// A hold scoring at or below this stays in the lowest band; above it the
/// hold is treated like an eligible result and walks the downgrade steps.
pub const HOLD_SCORE_CEILING: f64 = 65.0;

/// Runs the banding cascade top to bottom.
#[must_use]
pub fn compute_band(inputs: &BandInputs) -> ConfidenceBand {
    let eligible_like = match inputs.verdict {
        Verdict::Eligible => true,
        Verdict::Hold => inputs.final_score > HOLD_SCORE_CEILING,
        _ => false,
    };
    if !eligible_like {
        return ConfidenceBand::C;
    }
    if inputs.completeness < 0.75 {
        return ConfidenceBand::C;
    }
    if inputs.regime != Regime::RiskOn {
        return ConfidenceBand::B;
    }
    if !inputs.liquidity_ok {
        return ConfidenceBand::B;
    }
    if inputs.position_open {
        return ConfidenceBand::B;
    }
    if inputs.completeness < 0.90 {
        return ConfidenceBand::B;
    }
    ConfidenceBand::A
}
