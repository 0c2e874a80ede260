//! Staged evaluation engine for the wheel-strategy screener.
//!
//! Ties the other crates together: plans the universe into batches,
//! runs the cheap technical stage first, pays for the options chain only
//! when a symbol qualifies, then scores, tiers, and bands the outcomes
//! under a per-run budget.

pub mod banding;
pub mod evaluator;
pub mod planner;
pub mod results;
pub mod scoring;
pub mod selector;

pub use banding::{compute_band, BandInputs, ConfidenceBand, HOLD_SCORE_CEILING};
pub use evaluator::{RunContext, StagedEvaluator};
pub use planner::{plan_batches, trim_symbols, EvaluationBudget};
pub use results::{
    RunCounters, StageReached, SymbolEvaluationResult, UniverseEvaluationResult,
};
pub use scoring::{
    apply_regime_cap, assign_tier, compute_score, rank_candidates, AppliedCap, RankedCandidate,
    ScoreBreakdown, ScoreComponents, ScoredCandidate, Tier,
};
pub use selector::{
    assess_options_health, grade_liquidity, pick_best, spread_pct, LiquidityGrade,
    OptionsDataHealth, SelectedContract, SelectionCriteria,
};
