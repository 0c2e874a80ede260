//! Stage-1 rule evaluation producing an eligibility trace.
//!
//! Rules run in a fixed, documented order; the primary reason code is the
//! first failing rule in that order, not the first one discovered by the
//! caller. Order: history, earnings window, regime, ATR ceiling, then the
//! CSP rule block, then the CC rule block.

use serde::{Deserialize, Serialize};
use wheel_scan_core::config::RulesConfig;
use wheel_scan_core::{ModeDecision, ReasonCode, Regime};

use crate::snapshot::IndicatorSnapshot;

/// Outcome of a single rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCheck {
    pub name: String,
    pub passed: bool,
    pub value: Option<f64>,
    pub threshold: Option<f64>,
    pub reason_code: ReasonCode,
}

/// Per-symbol context the rules need beyond the indicator snapshot.
#[derive(Debug, Clone)]
pub struct EligibilityInputs {
    pub symbol: String,
    pub regime: Regime,
    pub candle_count: usize,
    /// Earnings land inside the DTE window (calendar collaborator).
    pub earnings_within_window: bool,
}

/// Full stage-1 trace: every rule outcome plus the mode decision.
///
/// Invariant: when `mode_decision` is `None`, `primary_reason_code` is the
/// code of the first failing check and appears in `rejection_reason_codes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityTrace {
    pub symbol: String,
    pub mode_decision: ModeDecision,
    pub regime: Regime,
    pub checks: Vec<RuleCheck>,
    pub rejection_reason_codes: Vec<ReasonCode>,
    pub primary_reason_code: Option<ReasonCode>,
    pub snapshot: IndicatorSnapshot,
}

/// Evaluates all stage-1 rules against a snapshot.
#[must_use]
pub fn evaluate_eligibility(
    inputs: &EligibilityInputs,
    snapshot: IndicatorSnapshot,
    rules: &RulesConfig,
) -> EligibilityTrace {
    let mut checks = Vec::new();

    // Shared hard rules, in evaluation order.
    checks.push(RuleCheck {
        name: "history".to_string(),
        passed: inputs.candle_count >= rules.min_history,
        value: Some(inputs.candle_count as f64),
        threshold: Some(rules.min_history as f64),
        reason_code: ReasonCode::InsufficientHistory,
    });
    checks.push(RuleCheck {
        name: "earnings_window".to_string(),
        passed: !inputs.earnings_within_window,
        value: None,
        threshold: Some(rules.earnings_guard_days as f64),
        reason_code: ReasonCode::EarningsWindow,
    });
    checks.push(RuleCheck {
        name: "regime".to_string(),
        passed: inputs.regime != Regime::RiskOff,
        value: None,
        threshold: None,
        reason_code: ReasonCode::RegimeRiskOff,
    });
    checks.push(RuleCheck {
        name: "atr_ceiling".to_string(),
        passed: snapshot.atr_pct.is_some_and(|v| v <= rules.max_atr_pct),
        value: snapshot.atr_pct,
        threshold: Some(rules.max_atr_pct),
        reason_code: ReasonCode::AtrTooHigh,
    });
    let shared_end = checks.len();

    // CSP block: RSI window, support present, price close enough to support.
    checks.push(rsi_window_check(
        "csp_rsi_window",
        snapshot.rsi14,
        rules.csp_rsi_min,
        rules.csp_rsi_max,
    ));
    checks.push(RuleCheck {
        name: "csp_support_exists".to_string(),
        passed: snapshot.support.is_some(),
        value: snapshot.support,
        threshold: None,
        reason_code: ReasonCode::NoSupportLevel,
    });
    let support_distance = snapshot
        .support
        .filter(|_| snapshot.last_close > 0.0)
        .map(|s| (snapshot.last_close - s) / snapshot.last_close);
    checks.push(RuleCheck {
        name: "csp_support_proximity".to_string(),
        passed: support_distance.is_some_and(|d| d <= rules.max_support_distance_pct),
        value: support_distance,
        threshold: Some(rules.max_support_distance_pct),
        reason_code: ReasonCode::TooFarFromSupport,
    });
    let csp_end = checks.len();

    // CC block: RSI window, resistance present, enough headroom below it.
    checks.push(rsi_window_check(
        "cc_rsi_window",
        snapshot.rsi14,
        rules.cc_rsi_min,
        rules.cc_rsi_max,
    ));
    checks.push(RuleCheck {
        name: "cc_resistance_exists".to_string(),
        passed: snapshot.resistance.is_some(),
        value: snapshot.resistance,
        threshold: None,
        reason_code: ReasonCode::NoResistanceLevel,
    });
    let resistance_distance = snapshot
        .resistance
        .filter(|_| snapshot.last_close > 0.0)
        .map(|r| (r - snapshot.last_close) / snapshot.last_close);
    checks.push(RuleCheck {
        name: "cc_resistance_headroom".to_string(),
        passed: resistance_distance.is_some_and(|d| d >= rules.min_resistance_distance_pct),
        value: resistance_distance,
        threshold: Some(rules.min_resistance_distance_pct),
        reason_code: ReasonCode::TooCloseToResistance,
    });

    let shared_ok = checks[..shared_end].iter().all(|c| c.passed);
    let csp_ok = checks[shared_end..csp_end].iter().all(|c| c.passed);
    let cc_ok = checks[csp_end..].iter().all(|c| c.passed);

    let mode_decision = if shared_ok && csp_ok {
        ModeDecision::Csp
    } else if shared_ok && cc_ok {
        ModeDecision::Cc
    } else {
        ModeDecision::None
    };

    let (rejection_reason_codes, primary_reason_code) = if mode_decision == ModeDecision::None {
        let mut codes: Vec<ReasonCode> = Vec::new();
        for check in checks.iter().filter(|c| !c.passed) {
            if !codes.contains(&check.reason_code) {
                codes.push(check.reason_code);
            }
        }
        let primary = codes.first().copied();
        (codes, primary)
    } else {
        (Vec::new(), None)
    };

    EligibilityTrace {
        symbol: inputs.symbol.clone(),
        mode_decision,
        regime: inputs.regime,
        checks,
        rejection_reason_codes,
        primary_reason_code,
        snapshot,
    }
}

fn rsi_window_check(name: &str, rsi: Option<f64>, min: f64, max: f64) -> RuleCheck {
    RuleCheck {
        name: name.to_string(),
        passed: rsi.is_some_and(|v| v >= min && v <= max),
        value: rsi,
        threshold: Some(max),
        reason_code: ReasonCode::RsiOutOfWindow,
    }
}
