//! Deterministic batch planning and the per-run evaluation budget.
//!
//! Planning is pure: the same universe and batch size always yield the
//! same batches, in input order. The budget tracks wall time against a
//! hard ceiling and keeps an advisory request estimate; the estimate is
//! logged when exceeded but never stops a run on its own.

use chrono::{DateTime, Utc};
use tracing::warn;

use wheel_scan_core::config::BudgetConfig;

/// Splits the universe into ordered batches. Symbol order inside and
/// across batches matches the input exactly.
#[must_use]
pub fn plan_batches(symbols: &[String], batch_size: usize) -> Vec<Vec<String>> {
    if symbols.is_empty() || batch_size == 0 {
        return Vec::new();
    }
    symbols
        .chunks(batch_size)
        .map(<[String]>::to_vec)
        .collect()
}

/// Caps the universe at the symbol budget, keeping the input prefix.
#[must_use]
pub fn trim_symbols(symbols: &[String], max_symbols: usize) -> Vec<String> {
    symbols[..symbols.len().min(max_symbols)].to_vec()
}

/// Wall-time and request accounting for one evaluation run.
///
/// Wall time is a hard stop checked between batches; the request estimate
/// is additive and advisory only.
#[derive(Debug)]
pub struct EvaluationBudget {
    started_at: DateTime<Utc>,
    max_wall_time_secs: u64,
    max_requests_estimate: u64,
    pub symbols_processed: usize,
    pub batches_processed: usize,
    pub requests_estimated: u64,
    estimate_warned: bool,
}

impl EvaluationBudget {
    #[must_use]
    pub fn new(config: &BudgetConfig) -> Self {
        Self::starting_at(config, Utc::now())
    }

    /// Budget with an explicit start instant, so elapsed time can be
    /// controlled in tests.
    #[must_use]
    pub fn starting_at(config: &BudgetConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            max_wall_time_secs: config.max_wall_time_secs,
            max_requests_estimate: config.max_requests_estimate,
            symbols_processed: 0,
            batches_processed: 0,
            requests_estimated: 0,
            estimate_warned: false,
        }
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// True once the wall-time ceiling has been reached.
    #[must_use]
    pub fn should_stop_for_time(&self) -> bool {
        self.elapsed_secs() >= self.max_wall_time_secs as i64
    }

    pub fn record_symbol(&mut self) {
        self.symbols_processed += 1;
    }

    pub fn record_batch(&mut self) {
        self.batches_processed += 1;
    }

    /// Adds to the additive request estimate; warns once when the
    /// configured ceiling is crossed.
    pub fn add_request_estimate(&mut self, requests: u64) {
        self.requests_estimated += requests;
        if self.requests_estimated > self.max_requests_estimate && !self.estimate_warned {
            self.estimate_warned = true;
            warn!(
                estimated = self.requests_estimated,
                ceiling = self.max_requests_estimate,
                "request estimate exceeded configured ceiling"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn plan_splits_in_input_order() {
        let universe = symbols(&["A", "B", "C", "D", "E", "F", "G"]);
        let batches = plan_batches(&universe, 3);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], symbols(&["A", "B", "C"]));
        assert_eq!(batches[1], symbols(&["D", "E", "F"]));
        assert_eq!(batches[2], symbols(&["G"]));
    }

    #[test]
    fn plan_is_deterministic() {
        let universe = symbols(&["MSFT", "AAPL", "NVDA", "AMD"]);
        assert_eq!(plan_batches(&universe, 2), plan_batches(&universe, 2));
    }

    #[test]
    fn empty_universe_or_zero_batch_size_plans_nothing() {
        assert!(plan_batches(&[], 10).is_empty());
        assert!(plan_batches(&symbols(&["A"]), 0).is_empty());
    }

    #[test]
    fn trim_keeps_input_prefix() {
        let universe = symbols(&["A", "B", "C", "D"]);
        assert_eq!(trim_symbols(&universe, 2), symbols(&["A", "B"]));
        assert_eq!(trim_symbols(&universe, 10), universe);
    }

    #[test]
    fn fresh_budget_does_not_stop() {
        let budget = EvaluationBudget::new(&BudgetConfig::default());
        assert!(!budget.should_stop_for_time());
    }

    #[test]
    fn backdated_budget_stops_for_time() {
        let config = BudgetConfig::default();
        let started = Utc::now() - Duration::seconds(config.max_wall_time_secs as i64 + 5);
        let budget = EvaluationBudget::starting_at(&config, started);
        assert!(budget.should_stop_for_time());
    }

    #[test]
    fn request_estimate_is_additive() {
        let mut budget = EvaluationBudget::new(&BudgetConfig::default());
        budget.add_request_estimate(4);
        budget.add_request_estimate(3);
        assert_eq!(budget.requests_estimated, 7);
    }

    #[test]
    fn exceeding_estimate_ceiling_never_stops_the_run() {
        let mut budget = EvaluationBudget::new(&BudgetConfig::default());
        budget.add_request_estimate(10_000);
        assert!(!budget.should_stop_for_time());
    }
}
