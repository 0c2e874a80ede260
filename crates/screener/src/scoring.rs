//! Composite scoring, tiering, and candidate ranking.
//!
//! Each component is normalized to 0-100 before weighting. A missing
//! component (liquidity before stage 2) contributes zero and stays
//! visible as `None` in the breakdown rather than reading as a scored
//! zero.

use serde::{Deserialize, Serialize};

use wheel_scan_core::config::RulesConfig;
use wheel_scan_core::{ModeDecision, ReasonCode, Regime};
use wheel_scan_indicators::IndicatorSnapshot;

/// Component weights. They sum to 1.0.
pub const WEIGHT_REGIME: f64 = 0.20;
pub const WEIGHT_RSI: f64 = 0.15;
pub const WEIGHT_SR_PROXIMITY: f64 = 0.20;
pub const WEIGHT_VOLATILITY: f64 = 0.15;
pub const WEIGHT_LIQUIDITY: f64 = 0.15;
pub const WEIGHT_AFFORDABILITY: f64 = 0.15;

/// Score ceiling applied in a neutral regime.
pub const NEUTRAL_REGIME_CAP: f64 = 65.0;

/// Normalized 0-100 component scores feeding the composite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub regime: f64,
    pub rsi: f64,
    pub sr_proximity: f64,
    pub volatility: f64,
    /// `None` until a contract has been selected.
    pub liquidity: Option<f64>,
    pub affordability: f64,
}

/// A cap applied on top of the raw composite, recorded explicitly so the
/// raw value stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedCap {
    pub reason: ReasonCode,
    pub raw: f64,
    pub capped: f64,
}

/// Full scoring record for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub components: ScoreComponents,
    pub raw_composite: f64,
    pub applied_caps: Vec<AppliedCap>,
    pub final_score: f64,
}

/// Letter tier assigned to scored candidates. Symbols without a mode
/// decision get no tier regardless of score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    A,
    B,
    C,
    None,
}

impl Tier {
    fn ordinal(self) -> u8 {
        match self {
            Self::A => 3,
            Self::B => 2,
            Self::C => 1,
            Self::None => 0,
        }
    }
}

/// Weighted composite from the components. Missing liquidity contributes
/// zero weight-adjusted points.
#[must_use]
pub fn compute_score(components: ScoreComponents) -> ScoreBreakdown {
    let raw = components.regime * WEIGHT_REGIME
        + components.rsi * WEIGHT_RSI
        + components.sr_proximity * WEIGHT_SR_PROXIMITY
        + components.volatility * WEIGHT_VOLATILITY
        + components.liquidity.unwrap_or(0.0) * WEIGHT_LIQUIDITY
        + components.affordability * WEIGHT_AFFORDABILITY;
    let raw = raw.clamp(0.0, 100.0);

    ScoreBreakdown {
        components,
        raw_composite: raw,
        applied_caps: Vec::new(),
        final_score: raw,
    }
}

/// Applies the neutral-regime ceiling, recording the cap when it bites.
pub fn apply_regime_cap(breakdown: &mut ScoreBreakdown, regime: Regime) {
    if regime == Regime::Neutral && breakdown.final_score > NEUTRAL_REGIME_CAP {
        breakdown.applied_caps.push(AppliedCap {
            reason: ReasonCode::RegimeNeutralCap,
            raw: breakdown.final_score,
            capped: NEUTRAL_REGIME_CAP,
        });
        breakdown.final_score = NEUTRAL_REGIME_CAP;
    }
}

/// Tier from the final score; no mode decision means no tier.
#[must_use]
pub fn assign_tier(mode: ModeDecision, final_score: f64) -> Tier {
    if mode == ModeDecision::None {
        return Tier::None;
    }
    if final_score >= 80.0 {
        Tier::A
    } else if final_score >= 60.0 {
        Tier::B
    } else if final_score >= 40.0 {
        Tier::C
    } else {
        Tier::None
    }
}

/// 0-100 score for the market regime.
#[must_use]
pub fn regime_score(regime: Regime) -> f64 {
    match regime {
        Regime::RiskOn => 100.0,
        Regime::Neutral => 60.0,
        Regime::RiskOff => 20.0,
    }
}

/// RSI score: full at the strategy window's midpoint, decaying linearly
/// with distance; zero one full half-width outside the window.
#[must_use]
pub fn rsi_score(rsi: Option<f64>, mode: ModeDecision, rules: &RulesConfig) -> f64 {
    let Some(rsi) = rsi else { return 0.0 };
    let (min, max) = match mode {
        ModeDecision::Cc => (rules.cc_rsi_min, rules.cc_rsi_max),
        _ => (rules.csp_rsi_min, rules.csp_rsi_max),
    };
    let mid = (min + max) / 2.0;
    let half_width = (max - min) / 2.0;
    if half_width <= 0.0 {
        return 0.0;
    }
    (100.0 * (1.0 - (rsi - mid).abs() / (2.0 * half_width))).clamp(0.0, 100.0)
}

/// Support/resistance proximity score from the snapshot for the decided
/// mode. Missing levels score zero.
#[must_use]
pub fn sr_proximity_score(
    snapshot: &IndicatorSnapshot,
    mode: ModeDecision,
    rules: &RulesConfig,
) -> f64 {
    if snapshot.last_close <= 0.0 {
        return 0.0;
    }
    match mode {
        ModeDecision::Cc => {
            // More headroom below resistance is better, saturating at
            // twice the minimum.
            let Some(resistance) = snapshot.resistance else {
                return 0.0;
            };
            let headroom = (resistance - snapshot.last_close) / snapshot.last_close;
            if rules.min_resistance_distance_pct <= 0.0 {
                return 0.0;
            }
            (100.0 * (headroom / (2.0 * rules.min_resistance_distance_pct))).clamp(0.0, 100.0)
        }
        _ => {
            // Closer to support is better for a CSP.
            let Some(support) = snapshot.support else {
                return 0.0;
            };
            let distance = (snapshot.last_close - support) / snapshot.last_close;
            if distance < 0.0 || rules.max_support_distance_pct <= 0.0 {
                return 0.0;
            }
            (100.0 * (1.0 - distance / rules.max_support_distance_pct)).clamp(0.0, 100.0)
        }
    }
}

/// Volatility score: full at zero ATR, zero at the configured ceiling.
#[must_use]
pub fn volatility_score(atr_pct: Option<f64>, rules: &RulesConfig) -> f64 {
    let Some(atr_pct) = atr_pct else { return 0.0 };
    if rules.max_atr_pct <= 0.0 {
        return 0.0;
    }
    (100.0 * (1.0 - atr_pct / rules.max_atr_pct)).clamp(0.0, 100.0)
}

/// Affordability: full score when the position would consume at most a
/// tenth of the account, decaying as it takes more.
#[must_use]
pub fn affordability_score(account_size: f64, capital_required: f64) -> f64 {
    if capital_required <= 0.0 || account_size <= 0.0 {
        return 0.0;
    }
    let ratio = account_size / (capital_required * 10.0);
    (100.0 * ratio).clamp(0.0, 100.0)
}

/// One scored candidate entering the ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub symbol: String,
    pub tier: Tier,
    pub final_score: f64,
    pub affordability: f64,
    pub liquidity: Option<f64>,
}

/// A candidate with its assigned priority rank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub symbol: String,
    pub tier: Tier,
    pub final_score: f64,
    /// 1 is the highest priority.
    pub priority_rank: usize,
}

/// Ranks candidates: tier, then final score, then affordability, then
/// liquidity with missing values last. The sort is stable, so equal
/// candidates keep their input order.
#[must_use]
pub fn rank_candidates(candidates: &[ScoredCandidate]) -> Vec<RankedCandidate> {
    let mut ordered: Vec<&ScoredCandidate> = candidates.iter().collect();
    ordered.sort_by(|a, b| {
        b.tier
            .ordinal()
            .cmp(&a.tier.ordinal())
            .then(
                b.final_score
                    .partial_cmp(&a.final_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                b.affordability
                    .partial_cmp(&a.affordability)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then_with(|| match (a.liquidity, b.liquidity) {
                (Some(la), Some(lb)) => {
                    lb.partial_cmp(&la).unwrap_or(std::cmp::Ordering::Equal)
                }
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
    });

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, c)| RankedCandidate {
            symbol: c.symbol.clone(),
            tier: c.tier,
            final_score: c.final_score,
            priority_rank: i + 1,
        })
        .collect()
}
