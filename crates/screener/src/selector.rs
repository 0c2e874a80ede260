//! Stage-2 contract selection and the options-data health gate.
//!
//! Selection only ever considers contracts whose liquidity fields are all
//! tagged valid. Missing or errored fields exclude a contract from
//! selection; they never pass as zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wheel_scan_core::config::CriteriaConfig;
use wheel_scan_core::ReasonCode;
use wheel_scan_provider::EnrichedContract;

/// Filter window applied to enriched contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionCriteria {
    /// Window on |delta|.
    pub delta_min: f64,
    pub delta_max: f64,
    pub dte_min: i64,
    pub dte_max: i64,
    pub min_open_interest: u64,
    pub max_spread_pct: f64,
    pub min_volume: u64,
}

impl From<&CriteriaConfig> for SelectionCriteria {
    fn from(config: &CriteriaConfig) -> Self {
        Self {
            delta_min: config.delta_min,
            delta_max: config.delta_max,
            dte_min: config.dte_min,
            dte_max: config.dte_max,
            min_open_interest: config.min_open_interest,
            max_spread_pct: config.max_spread_pct,
            min_volume: config.min_volume,
        }
    }
}

/// Bid/ask spread as a percentage of the mid. `None` when the quote is
/// crossed or the mid is non-positive.
#[must_use]
pub fn spread_pct(bid: Decimal, ask: Decimal) -> Option<f64> {
    if ask < bid {
        return None;
    }
    let mid = (bid + ask) / Decimal::from(2);
    if mid <= Decimal::ZERO {
        return None;
    }
    ((ask - bid) / mid * Decimal::from(100)).to_f64()
}

/// Spread/OI/volume quality bucket for a selected contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityGrade {
    A,
    B,
    C,
    F,
}

impl LiquidityGrade {
    /// 0-100 score contribution for the composite.
    #[must_use]
    pub fn score(self) -> f64 {
        match self {
            Self::A => 100.0,
            Self::B => 75.0,
            Self::C => 50.0,
            Self::F => 25.0,
        }
    }
}

/// Grades a contract's liquidity. All three dimensions must clear a
/// bucket's bar for the contract to earn that bucket.
#[must_use]
pub fn grade_liquidity(spread_pct: f64, open_interest: u64, volume: u64) -> LiquidityGrade {
    if spread_pct <= 2.0 && open_interest >= 1000 && volume >= 100 {
        LiquidityGrade::A
    } else if spread_pct <= 5.0 && open_interest >= 500 && volume >= 50 {
        LiquidityGrade::B
    } else if spread_pct <= 10.0 && open_interest >= 100 && volume >= 10 {
        LiquidityGrade::C
    } else {
        LiquidityGrade::F
    }
}

/// The contract chosen for a symbol, with the derived metrics that drove
/// the choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedContract {
    pub contract: EnrichedContract,
    /// The criteria the contract was selected under.
    pub criteria: SelectionCriteria,
    pub delta: f64,
    pub spread_pct: f64,
    pub open_interest: u64,
    pub volume: u64,
    pub liquidity_grade: LiquidityGrade,
}

/// Picks the best contract meeting the criteria, or `None` when nothing
/// qualifies.
///
/// Ties break on |delta| distance to the window midpoint, then open
/// interest descending, then spread ascending.
#[must_use]
pub fn pick_best(
    contracts: &[EnrichedContract],
    criteria: &SelectionCriteria,
) -> Option<SelectedContract> {
    let target_delta = (criteria.delta_min + criteria.delta_max) / 2.0;

    let mut candidates: Vec<SelectedContract> = contracts
        .iter()
        .filter_map(|c| candidate(c, criteria))
        .collect();

    candidates.sort_by(|a, b| {
        let da = (a.delta.abs() - target_delta).abs();
        let db = (b.delta.abs() - target_delta).abs();
        da.partial_cmp(&db)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.open_interest.cmp(&a.open_interest))
            .then(
                a.spread_pct
                    .partial_cmp(&b.spread_pct)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    candidates.into_iter().next()
}

/// Builds a candidate when every filter passes; requires all liquidity
/// fields valid.
fn candidate(
    contract: &EnrichedContract,
    criteria: &SelectionCriteria,
) -> Option<SelectedContract> {
    let bid = *contract.bid.valid()?;
    let ask = *contract.ask.valid()?;
    let open_interest = *contract.open_interest.valid()?;
    let volume = *contract.volume.valid()?;
    let delta = *contract.delta.valid()?;

    if contract.dte < criteria.dte_min || contract.dte > criteria.dte_max {
        return None;
    }
    let abs_delta = delta.abs();
    if abs_delta < criteria.delta_min || abs_delta > criteria.delta_max {
        return None;
    }
    if open_interest < criteria.min_open_interest || volume < criteria.min_volume {
        return None;
    }
    let spread = spread_pct(bid, ask)?;
    if spread > criteria.max_spread_pct {
        return None;
    }

    Some(SelectedContract {
        contract: contract.clone(),
        criteria: criteria.clone(),
        delta,
        spread_pct: spread,
        open_interest,
        volume,
        liquidity_grade: grade_liquidity(spread, open_interest, volume),
    })
}

/// Run-level options-data health. Fail-closed: a run where no symbol
/// produced a usable contract is not allowed to act.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsDataHealth {
    pub allowed: bool,
    pub valid_symbols: usize,
    pub excluded_symbols: usize,
    /// Exclusion reasons by frequency, most common first.
    pub top_reasons: Vec<(ReasonCode, usize)>,
}

/// Assesses chain health across a run from the per-symbol exclusion
/// reasons.
#[must_use]
pub fn assess_options_health(
    valid_symbols: usize,
    exclusion_reasons: &[ReasonCode],
) -> OptionsDataHealth {
    let mut counts: Vec<(ReasonCode, usize)> = Vec::new();
    for &reason in exclusion_reasons {
        match counts.iter_mut().find(|(code, _)| *code == reason) {
            Some((_, n)) => *n += 1,
            None => counts.push((reason, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(3);

    let allowed = valid_symbols > 0;
    let mut top_reasons = counts;
    if !allowed && top_reasons.is_empty() {
        top_reasons.push((ReasonCode::NoSymbolsWithOptions, 0));
    }

    OptionsDataHealth {
        allowed,
        valid_symbols,
        excluded_symbols: exclusion_reasons.len(),
        top_reasons,
    }
}
