//! Result records emitted by the staged evaluator.

use serde::{Deserialize, Serialize};

use wheel_scan_core::{ModeDecision, ReasonCode, Verdict};

use crate::banding::ConfidenceBand;
use crate::scoring::{RankedCandidate, ScoreBreakdown, Tier};
use crate::selector::{OptionsDataHealth, SelectedContract};

/// How far the pipeline got for a symbol before producing a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageReached {
    /// Stopped at the technical/data gate.
    Stage1Only,
    /// Reached chain discovery but selected nothing.
    Stage2Chain,
    /// Selected a contract.
    Full,
}

/// Everything the run records for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolEvaluationResult {
    pub symbol: String,
    pub stage_reached: StageReached,
    pub verdict: Verdict,
    pub mode_decision: ModeDecision,
    pub tier: Tier,
    pub score: Option<ScoreBreakdown>,
    pub band: Option<ConfidenceBand>,
    pub suggested_capital_pct: Option<f64>,
    pub reason_codes: Vec<ReasonCode>,
    pub primary_reason_code: Option<ReasonCode>,
    pub selected: Option<SelectedContract>,
    /// Message from a contained per-symbol failure, if any.
    pub error: Option<String>,
}

impl SymbolEvaluationResult {
    /// A result for a symbol the pipeline never got to evaluate.
    #[must_use]
    pub fn skipped(symbol: &str, reason: ReasonCode) -> Self {
        Self {
            symbol: symbol.to_string(),
            stage_reached: StageReached::Stage1Only,
            verdict: Verdict::Unknown,
            mode_decision: ModeDecision::None,
            tier: Tier::None,
            score: None,
            band: None,
            suggested_capital_pct: None,
            reason_codes: vec![reason],
            primary_reason_code: Some(reason),
            selected: None,
            error: None,
        }
    }
}

/// Run-level counters surfaced alongside the per-symbol results.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunCounters {
    pub symbols_planned: usize,
    pub symbols_processed: usize,
    pub batches_processed: usize,
    pub requests_estimated: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// The wall-time ceiling cut the run short.
    pub budget_stopped: bool,
}

/// Aggregate outcome of one evaluation run. Results stay in planned
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseEvaluationResult {
    pub results: Vec<SymbolEvaluationResult>,
    /// Eligible symbols ordered by priority.
    pub ranked: Vec<RankedCandidate>,
    pub counters: RunCounters,
    pub health: OptionsDataHealth,
}

impl UniverseEvaluationResult {
    /// Symbols that ended with a selected contract, in planned order.
    #[must_use]
    pub fn eligible(&self) -> Vec<&SymbolEvaluationResult> {
        self.results
            .iter()
            .filter(|r| r.verdict == Verdict::Eligible)
            .collect()
    }

    /// Fail-closed gate for consumers that act on the run.
    ///
    /// # Errors
    ///
    /// `NoUsableChain` with the top exclusion reasons when no symbol in
    /// the run produced a usable contract.
    pub fn ensure_actionable(&self) -> Result<(), wheel_scan_core::ScanError> {
        if self.health.allowed {
            return Ok(());
        }
        let summary = self
            .health
            .top_reasons
            .iter()
            .map(|(code, count)| format!("{code} x{count}"))
            .collect::<Vec<_>>()
            .join(", ");
        Err(wheel_scan_core::ScanError::NoUsableChain(format!(
            "0 of {} symbols usable: {summary}",
            self.health.excluded_symbols
        )))
    }
}
