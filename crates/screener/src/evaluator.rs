//! Staged evaluation orchestrator.
//!
//! Stage 1 is the cheap pass: candles, quote gate, indicator snapshot,
//! technical rules. Only symbols that qualify pay for stage 2 (chain
//! discovery, enrichment, contract selection). Batches run in planned
//! order; symbols inside a batch fetch concurrently up to the configured
//! ceiling. Per-symbol data failures are contained to that symbol;
//! protocol violations abort the run.

use futures::stream::{self, StreamExt};
use rust_decimal::prelude::ToPrimitive;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use chrono::NaiveDate;
use wheel_scan_core::{ModeDecision, ReasonCode, Regime, ScanConfig, ScanError, Verdict};
use wheel_scan_indicators::{compute_snapshot, evaluate_eligibility, EligibilityInputs, EligibilityTrace};
use wheel_scan_provider::{
    CacheStore, ChainPipeline, EnrichedContract, EquityQuote, MarketDataClient, ProviderTransport,
};

use crate::banding::{compute_band, BandInputs};
use crate::planner::{plan_batches, trim_symbols, EvaluationBudget};
use crate::results::{RunCounters, StageReached, SymbolEvaluationResult, UniverseEvaluationResult};
use crate::scoring::{
    affordability_score, apply_regime_cap, assign_tier, compute_score, rank_candidates,
    regime_score, rsi_score, sr_proximity_score, volatility_score, ScoreBreakdown,
    ScoreComponents, ScoredCandidate,
};
use crate::selector::{
    assess_options_health, pick_best, OptionsDataHealth, SelectedContract, SelectionCriteria,
};

/// Extra candles fetched beyond the minimum history so slow indicators
/// have room to seed.
const HISTORY_MARGIN_DAYS: usize = 60;

/// Coarse advisory request cost per stage reached.
const STAGE1_REQUEST_COST: u64 = 4;
const STAGE2_REQUEST_COST: u64 = 5;
const FULL_REQUEST_COST: u64 = 7;

/// Run-level inputs resolved before evaluation starts.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub today: NaiveDate,
    pub regime: Regime,
    pub account_size: f64,
    /// Symbols with a position already open, uppercase.
    pub open_positions: HashSet<String>,
}

/// The two-stage evaluation engine.
pub struct StagedEvaluator {
    config: ScanConfig,
    criteria: SelectionCriteria,
    market: MarketDataClient,
    chains: ChainPipeline,
    cache: Arc<CacheStore>,
}

/// Stage-1 output for a symbol that made it past the data gate.
struct Stage1 {
    trace: EligibilityTrace,
    quote: EquityQuote,
}

impl StagedEvaluator {
    #[must_use]
    pub fn new(config: ScanConfig, transport: Arc<dyn ProviderTransport>) -> Self {
        let cache = Arc::new(CacheStore::new(config.cache.clone()));
        let market = MarketDataClient::new(Arc::clone(&transport), Arc::clone(&cache));
        let chains = ChainPipeline::new(transport, Arc::clone(&cache));
        let criteria = SelectionCriteria::from(&config.criteria);
        Self {
            config,
            criteria,
            market,
            chains,
            cache,
        }
    }

    /// Evaluates the universe under a fresh budget.
    ///
    /// # Errors
    ///
    /// `Validation` on a caller-contract violation; per-symbol data
    /// failures are recorded on the symbol, never raised here.
    pub async fn run(
        &self,
        universe: &[String],
        ctx: &RunContext,
    ) -> Result<UniverseEvaluationResult, ScanError> {
        let budget = EvaluationBudget::new(&self.config.budget);
        self.run_with_budget(universe, ctx, budget).await
    }

    /// Evaluates the universe under a caller-supplied budget.
    ///
    /// # Errors
    ///
    /// Same contract as [`run`](Self::run).
    pub async fn run_with_budget(
        &self,
        universe: &[String],
        ctx: &RunContext,
        mut budget: EvaluationBudget,
    ) -> Result<UniverseEvaluationResult, ScanError> {
        // Duplicates would collapse during per-batch re-association and
        // shift every downstream count; keep the first occurrence only.
        let mut seen = HashSet::new();
        let deduped: Vec<String> = universe
            .iter()
            .filter(|symbol| seen.insert(symbol.to_uppercase()))
            .cloned()
            .collect();
        if deduped.len() < universe.len() {
            info!(
                dropped = universe.len() - deduped.len(),
                "dropped duplicate symbols from universe"
            );
        }

        let planned = trim_symbols(&deduped, self.config.budget.max_symbols);
        if planned.len() < deduped.len() {
            info!(
                planned = planned.len(),
                dropped = deduped.len() - planned.len(),
                "universe trimmed to symbol budget"
            );
        }

        let batches = plan_batches(&planned, self.config.budget.batch_size);
        let mut results: Vec<SymbolEvaluationResult> = Vec::with_capacity(planned.len());
        let mut budget_stopped = false;

        for batch in &batches {
            if budget.should_stop_for_time() {
                budget_stopped = true;
                warn!(
                    elapsed_secs = budget.elapsed_secs(),
                    remaining = planned.len() - results.len(),
                    "wall-time budget exhausted, stopping before next batch"
                );
                for symbol in &planned[results.len()..] {
                    results.push(SymbolEvaluationResult::skipped(
                        symbol,
                        ReasonCode::TimeBudgetExhausted,
                    ));
                }
                break;
            }

            let batch_results = self.evaluate_batch(batch, ctx).await?;
            for result in &batch_results {
                budget.record_symbol();
                budget.add_request_estimate(match result.stage_reached {
                    StageReached::Stage1Only => STAGE1_REQUEST_COST,
                    StageReached::Stage2Chain => STAGE2_REQUEST_COST,
                    StageReached::Full => FULL_REQUEST_COST,
                });
            }
            budget.record_batch();
            results.extend(batch_results);
        }

        let health = self.assess_health(&results);
        if !health.allowed {
            warn!(
                excluded = health.excluded_symbols,
                "no symbol produced a usable contract, run is not actionable"
            );
        }

        let ranked = rank_candidates(
            &results
                .iter()
                .filter(|r| r.verdict == Verdict::Eligible)
                .map(|r| ScoredCandidate {
                    symbol: r.symbol.clone(),
                    tier: r.tier,
                    final_score: r.score.as_ref().map_or(0.0, |s| s.final_score),
                    affordability: r
                        .score
                        .as_ref()
                        .map_or(0.0, |s| s.components.affordability),
                    liquidity: r.score.as_ref().and_then(|s| s.components.liquidity),
                })
                .collect::<Vec<_>>(),
        );

        let cache_stats = self.cache.stats();
        Ok(UniverseEvaluationResult {
            results,
            ranked,
            counters: RunCounters {
                symbols_planned: planned.len(),
                symbols_processed: budget.symbols_processed,
                batches_processed: budget.batches_processed,
                requests_estimated: budget.requests_estimated,
                cache_hits: cache_stats.hits,
                cache_misses: cache_stats.misses,
                budget_stopped,
            },
            health,
        })
    }

    /// Runs one batch with bounded concurrency, re-emitting results in
    /// the batch's planned order.
    async fn evaluate_batch(
        &self,
        batch: &[String],
        ctx: &RunContext,
    ) -> Result<Vec<SymbolEvaluationResult>, ScanError> {
        let concurrency = self.config.budget.concurrency.max(1);
        let outcomes: Vec<(String, Result<SymbolEvaluationResult, ScanError>)> =
            stream::iter(batch.iter().map(|symbol| {
                let symbol = symbol.clone();
                async move {
                    let result = self.evaluate_symbol(&symbol, ctx).await;
                    (symbol, result)
                }
            }))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut by_symbol: HashMap<String, SymbolEvaluationResult> = HashMap::new();
        for (symbol, outcome) in outcomes {
            by_symbol.insert(symbol, outcome?);
        }

        let mut ordered = Vec::with_capacity(batch.len());
        for symbol in batch {
            if let Some(result) = by_symbol.remove(symbol) {
                ordered.push(result);
            }
        }
        Ok(ordered)
    }

    /// Full pipeline for one symbol. Per-symbol data failures become a
    /// recorded verdict; anything else propagates.
    async fn evaluate_symbol(
        &self,
        symbol: &str,
        ctx: &RunContext,
    ) -> Result<SymbolEvaluationResult, ScanError> {
        let stage1 = match self.stage1(symbol, ctx).await {
            Ok(stage1) => stage1,
            Err(err) if err.is_per_symbol() => {
                warn!(symbol, %err, "symbol failed the data gate");
                return Ok(data_failure_result(symbol, &err));
            }
            Err(err) => return Err(err),
        };

        if stage1.trace.mode_decision == ModeDecision::None {
            return Ok(self.rejected_result(symbol, ctx, &stage1));
        }

        match self.stage2(symbol, ctx, &stage1).await {
            Ok(result) => Ok(result),
            Err(err) if err.is_per_symbol() => {
                warn!(symbol, %err, "chain fetch failed");
                let mut result = data_failure_result(symbol, &err);
                result.stage_reached = StageReached::Stage2Chain;
                Ok(result)
            }
            Err(err) => Err(err),
        }
    }

    async fn stage1(&self, symbol: &str, ctx: &RunContext) -> Result<Stage1, ScanError> {
        let lookback = (self.config.rules.min_history + HISTORY_MARGIN_DAYS) as u32;
        let candles = self.market.candles(symbol, lookback).await?;
        let quote = self.market.equity_quote(symbol, ctx.today).await?;
        let earnings = self.market.next_earnings(symbol).await?;

        let earnings_within_window = earnings.is_some_and(|date| {
            date >= ctx.today
                && (date - ctx.today).num_days() <= self.config.rules.earnings_guard_days
        });

        let snapshot = compute_snapshot(&candles, &self.config.rules);
        let inputs = EligibilityInputs {
            symbol: symbol.to_uppercase(),
            regime: ctx.regime,
            candle_count: candles.len(),
            earnings_within_window,
        };
        let trace = evaluate_eligibility(&inputs, snapshot, &self.config.rules);
        Ok(Stage1 { trace, quote })
    }

    fn rejected_result(
        &self,
        symbol: &str,
        ctx: &RunContext,
        stage1: &Stage1,
    ) -> SymbolEvaluationResult {
        let price = stage1.quote.price.to_f64().unwrap_or(0.0);
        let score = self.score(&stage1.trace, ctx, None, price * 100.0);
        let tier = assign_tier(ModeDecision::None, score.final_score);

        SymbolEvaluationResult {
            symbol: symbol.to_uppercase(),
            stage_reached: StageReached::Stage1Only,
            verdict: Verdict::Rejected,
            mode_decision: ModeDecision::None,
            tier,
            score: Some(score),
            band: None,
            suggested_capital_pct: None,
            reason_codes: stage1.trace.rejection_reason_codes.clone(),
            primary_reason_code: stage1.trace.primary_reason_code,
            selected: None,
            error: None,
        }
    }

    async fn stage2(
        &self,
        symbol: &str,
        ctx: &RunContext,
        stage1: &Stage1,
    ) -> Result<SymbolEvaluationResult, ScanError> {
        let mode = stage1.trace.mode_decision;
        let Some(right) = mode.right() else {
            return Err(ScanError::Validation(format!(
                "{symbol}: stage 2 entered without a mode decision"
            )));
        };

        let discovered = self.chains.discover(symbol, ctx.today).await?;
        if discovered.is_empty() {
            return Ok(self.hold_result(symbol, ctx, stage1, &[], ReasonCode::NoContractsDiscovered));
        }

        let shortlist: Vec<_> = discovered
            .into_iter()
            .filter(|c| {
                c.right == right && c.dte >= self.criteria.dte_min && c.dte <= self.criteria.dte_max
            })
            .collect();
        if shortlist.is_empty() {
            return Ok(self.hold_result(
                symbol,
                ctx,
                stage1,
                &[],
                ReasonCode::NoContractPassedFilters,
            ));
        }

        let enriched = self.chains.enrich(&shortlist).await?;
        let Some(selected) = pick_best(&enriched, &self.criteria) else {
            return Ok(self.hold_result(
                symbol,
                ctx,
                stage1,
                &enriched,
                ReasonCode::NoContractPassedFilters,
            ));
        };

        Ok(self.eligible_result(symbol, ctx, stage1, &enriched, selected))
    }

    fn hold_result(
        &self,
        symbol: &str,
        ctx: &RunContext,
        stage1: &Stage1,
        enriched: &[EnrichedContract],
        reason: ReasonCode,
    ) -> SymbolEvaluationResult {
        let price = stage1.quote.price.to_f64().unwrap_or(0.0);
        let score = self.score(&stage1.trace, ctx, None, price * 100.0);
        let tier = assign_tier(stage1.trace.mode_decision, score.final_score);

        let band = compute_band(&BandInputs {
            verdict: Verdict::Hold,
            final_score: score.final_score,
            regime: ctx.regime,
            completeness: chain_completeness(enriched),
            liquidity_ok: false,
            position_open: ctx.open_positions.contains(&symbol.to_uppercase()),
        });

        SymbolEvaluationResult {
            symbol: symbol.to_uppercase(),
            stage_reached: StageReached::Stage2Chain,
            verdict: Verdict::Hold,
            mode_decision: stage1.trace.mode_decision,
            tier,
            score: Some(score),
            band: Some(band),
            suggested_capital_pct: Some(band.suggested_capital_pct()),
            reason_codes: vec![reason],
            primary_reason_code: Some(reason),
            selected: None,
            error: None,
        }
    }

    fn eligible_result(
        &self,
        symbol: &str,
        ctx: &RunContext,
        stage1: &Stage1,
        enriched: &[EnrichedContract],
        selected: SelectedContract,
    ) -> SymbolEvaluationResult {
        let mode = stage1.trace.mode_decision;
        let price = stage1.quote.price.to_f64().unwrap_or(0.0);
        // A CSP reserves cash for the strike; a CC is sized by the shares.
        let capital_required = match mode {
            ModeDecision::Csp => selected.contract.strike.to_f64().unwrap_or(0.0) * 100.0,
            _ => price * 100.0,
        };

        let liquidity = selected.liquidity_grade.score();
        let score = self.score(&stage1.trace, ctx, Some(liquidity), capital_required);
        let tier = assign_tier(mode, score.final_score);

        let liquidity_ok = matches!(
            selected.liquidity_grade,
            crate::selector::LiquidityGrade::A | crate::selector::LiquidityGrade::B
        );
        let band = compute_band(&BandInputs {
            verdict: Verdict::Eligible,
            final_score: score.final_score,
            regime: ctx.regime,
            completeness: chain_completeness(enriched),
            liquidity_ok,
            position_open: ctx.open_positions.contains(&symbol.to_uppercase()),
        });

        SymbolEvaluationResult {
            symbol: symbol.to_uppercase(),
            stage_reached: StageReached::Full,
            verdict: Verdict::Eligible,
            mode_decision: mode,
            tier,
            score: Some(score),
            band: Some(band),
            suggested_capital_pct: Some(band.suggested_capital_pct()),
            reason_codes: Vec::new(),
            primary_reason_code: None,
            selected: Some(selected),
            error: None,
        }
    }

    /// Component scores from the stage-1 trace; liquidity arrives only
    /// once a contract has been selected.
    fn score(
        &self,
        trace: &EligibilityTrace,
        ctx: &RunContext,
        liquidity: Option<f64>,
        capital_required: f64,
    ) -> ScoreBreakdown {
        let rules = &self.config.rules;
        let mode = trace.mode_decision;
        let mut breakdown = compute_score(ScoreComponents {
            regime: regime_score(ctx.regime),
            rsi: rsi_score(trace.snapshot.rsi14, mode, rules),
            sr_proximity: sr_proximity_score(&trace.snapshot, mode, rules),
            volatility: volatility_score(trace.snapshot.atr_pct, rules),
            liquidity,
            affordability: affordability_score(ctx.account_size, capital_required),
        });
        apply_regime_cap(&mut breakdown, ctx.regime);
        breakdown
    }

    /// Options-data health over the symbols that reached stage 2. A run
    /// that never consulted the chain has nothing to gate on.
    fn assess_health(&self, results: &[SymbolEvaluationResult]) -> OptionsDataHealth {
        let reached_stage2: Vec<_> = results
            .iter()
            .filter(|r| r.stage_reached != StageReached::Stage1Only)
            .collect();
        if reached_stage2.is_empty() {
            return OptionsDataHealth {
                allowed: true,
                valid_symbols: 0,
                excluded_symbols: 0,
                top_reasons: Vec::new(),
            };
        }

        let valid = reached_stage2.iter().filter(|r| r.selected.is_some()).count();
        let exclusions: Vec<ReasonCode> = reached_stage2
            .iter()
            .filter(|r| r.selected.is_none())
            .filter_map(|r| r.primary_reason_code)
            .collect();
        assess_options_health(valid, &exclusions)
    }
}

/// Result recorded when a per-symbol fetch fails: missing or stale data
/// blocks the symbol, a provider fault leaves it unknown.
fn data_failure_result(symbol: &str, err: &ScanError) -> SymbolEvaluationResult {
    let (verdict, reason) = match err {
        ScanError::DataMissing(_) => (Verdict::Blocked, ReasonCode::MissingQuoteField),
        ScanError::DataStale(_) => (Verdict::Blocked, ReasonCode::StaleQuote),
        _ => (Verdict::Unknown, ReasonCode::ProviderError),
    };
    let mut result = SymbolEvaluationResult::skipped(symbol, reason);
    result.symbol = symbol.to_uppercase();
    result.verdict = verdict;
    result.error = Some(err.to_string());
    result
}

/// Fraction of valid provider fields behind a result: the six gated quote
/// fields plus five liquidity fields per enriched contract.
fn chain_completeness(enriched: &[EnrichedContract]) -> f64 {
    const QUOTE_FIELDS: f64 = 6.0;
    const CONTRACT_FIELDS: usize = 5;

    let total = QUOTE_FIELDS + (enriched.len() * CONTRACT_FIELDS) as f64;
    let valid: usize = enriched
        .iter()
        .map(|c| {
            [
                c.bid.is_valid(),
                c.ask.is_valid(),
                c.open_interest.is_valid(),
                c.volume.is_valid(),
                c.delta.is_valid(),
            ]
            .into_iter()
            .filter(|v| *v)
            .count()
        })
        .sum();
    (QUOTE_FIELDS + valid as f64) / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;
    use std::sync::Mutex;
    use wheel_scan_core::config::BudgetConfig;

    // ==================== test transport ====================

    /// Transport keyed by (endpoint, symbol), recording every request.
    struct ScriptedTransport {
        responses: Mutex<HashMap<(String, String), serde_json::Value>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn script(&self, endpoint: &str, symbol: &str, body: serde_json::Value) {
            self.responses
                .lock()
                .unwrap()
                .insert((endpoint.to_string(), symbol.to_string()), body);
        }

        fn endpoints_called(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProviderTransport for ScriptedTransport {
        async fn get_json(
            &self,
            endpoint: &str,
            params: &[(String, String)],
        ) -> Result<serde_json::Value, ScanError> {
            self.requests.lock().unwrap().push(endpoint.to_string());
            // options/quotes carries a symbols list; key on the root.
            let symbol = params
                .iter()
                .find(|(k, _)| k == "symbol")
                .map(|(_, v)| v.clone())
                .or_else(|| {
                    params.iter().find(|(k, _)| k == "symbols").map(|(_, v)| {
                        v.chars().take_while(char::is_ascii_alphabetic).collect()
                    })
                })
                .unwrap_or_default();
            self.responses
                .lock()
                .unwrap()
                .get(&(endpoint.to_string(), symbol))
                .cloned()
                .ok_or_else(|| ScanError::ProviderUnavailable(endpoint.to_string()))
        }
    }

    // ==================== fixtures ====================

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 13).unwrap()
    }

    fn ctx(regime: Regime) -> RunContext {
        RunContext {
            today: today(),
            regime,
            account_size: 100_000.0,
            open_positions: HashSet::new(),
        }
    }

    /// Permissive rules so synthetic candles qualify; the rule math has
    /// its own unit tests.
    fn config() -> ScanConfig {
        let mut config = ScanConfig::default();
        config.rules.csp_rsi_min = 0.0;
        config.rules.csp_rsi_max = 100.0;
        config.rules.max_atr_pct = 1.0;
        config.rules.max_support_distance_pct = 10.0;
        config.rules.min_history = 100;
        config
    }

    fn candle_body(n: usize) -> serde_json::Value {
        let bars: Vec<serde_json::Value> = (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.35).sin() * 8.0;
                json!({
                    "t": 1_600_000_000 + (i as i64) * 86_400,
                    "o": base, "h": base + 1.5, "l": base - 1.5,
                    "c": base + 0.5, "v": 1_000_000.0
                })
            })
            .collect();
        json!({ "candles": bars })
    }

    fn quote_body(price: f64) -> serde_json::Value {
        json!({
            "price": price, "bid": price - 0.05, "ask": price + 0.05,
            "volume": 5_000_000u64, "quote_date": "2025-06-13"
        })
    }

    fn chain_body() -> serde_json::Value {
        // Expirations 30 days out, inside the default 21-45 DTE window.
        json!({"contracts": [
            {"expiration": "2025-07-13", "strike": 90.0, "type": "put"},
            {"expiration": "2025-07-13", "strike": 95.0, "type": "put"},
            {"expiration": "2025-07-13", "strike": 100.0, "type": "call"}
        ]})
    }

    fn option_quotes_body() -> serde_json::Value {
        json!({"quotes": [
            {"symbol": "AAPL250713P00090000", "bid": 1.00, "ask": 1.04,
             "open_interest": 1500, "volume": 200, "delta": -0.27},
            {"symbol": "AAPL250713P00095000", "bid": 2.00, "ask": 2.40,
             "open_interest": 80, "volume": 5, "delta": -0.40}
        ]})
    }

    fn script_healthy_symbol(transport: &ScriptedTransport, symbol: &str) {
        transport.script("stocks/candles", symbol, candle_body(250));
        transport.script("stocks/quotes", symbol, quote_body(94.0));
        transport.script("stocks/iv_rank", symbol, json!({"iv_rank": 0.35}));
        transport.script("calendar/earnings", symbol, json!({}));
        transport.script("options/chain", symbol, chain_body());
        transport.script("options/quotes", symbol, option_quotes_body());
    }

    fn evaluator(transport: Arc<ScriptedTransport>) -> StagedEvaluator {
        StagedEvaluator::new(config(), transport)
    }

    // ==================== full pipeline ====================

    #[tokio::test]
    async fn healthy_symbol_runs_the_full_pipeline() {
        let transport = Arc::new(ScriptedTransport::new());
        script_healthy_symbol(&transport, "AAPL");

        let outcome = evaluator(transport)
            .run(&["AAPL".to_string()], &ctx(Regime::RiskOn))
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        let result = &outcome.results[0];
        assert_eq!(result.verdict, Verdict::Eligible);
        assert_eq!(result.stage_reached, StageReached::Full);
        assert_eq!(result.mode_decision, ModeDecision::Csp);
        let selected = result.selected.as_ref().unwrap();
        // The 90 strike is the only contract clearing the filters.
        assert_eq!(selected.contract.occ_symbol, "AAPL250713P00090000");
        assert!(outcome.health.allowed);
        assert_eq!(outcome.ranked.len(), 1);
        assert_eq!(outcome.ranked[0].priority_rank, 1);
    }

    #[tokio::test]
    async fn empty_chain_holds_the_symbol() {
        let transport = Arc::new(ScriptedTransport::new());
        script_healthy_symbol(&transport, "AAPL");
        transport.script("options/chain", "AAPL", json!({"contracts": []}));

        let outcome = evaluator(transport)
            .run(&["AAPL".to_string()], &ctx(Regime::RiskOn))
            .await
            .unwrap();

        let result = &outcome.results[0];
        assert_eq!(result.verdict, Verdict::Hold);
        assert_eq!(result.stage_reached, StageReached::Stage2Chain);
        assert_eq!(
            result.primary_reason_code,
            Some(ReasonCode::NoContractsDiscovered)
        );
        assert!(result.selected.is_none());
        // Zero usable contracts across the run blocks action.
        assert!(!outcome.health.allowed);
    }

    #[tokio::test]
    async fn illiquid_chain_holds_with_filter_reason() {
        let transport = Arc::new(ScriptedTransport::new());
        script_healthy_symbol(&transport, "AAPL");
        transport.script(
            "options/quotes",
            "AAPL",
            json!({"quotes": [
                {"symbol": "AAPL250713P00090000", "bid": 1.00, "ask": 1.04,
                 "open_interest": 5, "volume": 1, "delta": -0.27}
            ]}),
        );

        let outcome = evaluator(transport)
            .run(&["AAPL".to_string()], &ctx(Regime::RiskOn))
            .await
            .unwrap();

        let result = &outcome.results[0];
        assert_eq!(result.verdict, Verdict::Hold);
        assert_eq!(
            result.primary_reason_code,
            Some(ReasonCode::NoContractPassedFilters)
        );
    }

    // ==================== containment ====================

    #[tokio::test]
    async fn missing_quote_fields_block_only_that_symbol() {
        let transport = Arc::new(ScriptedTransport::new());
        script_healthy_symbol(&transport, "AAPL");
        script_healthy_symbol(&transport, "MSFT");
        transport.script("stocks/quotes", "MSFT", json!({"price": 410.0}));

        let outcome = evaluator(transport)
            .run(
                &["AAPL".to_string(), "MSFT".to_string()],
                &ctx(Regime::RiskOn),
            )
            .await
            .unwrap();

        assert_eq!(outcome.results[0].verdict, Verdict::Eligible);
        let blocked = &outcome.results[1];
        assert_eq!(blocked.symbol, "MSFT");
        assert_eq!(blocked.verdict, Verdict::Blocked);
        assert_eq!(
            blocked.primary_reason_code,
            Some(ReasonCode::MissingQuoteField)
        );
        assert!(blocked.error.is_some());
    }

    #[tokio::test]
    async fn provider_outage_leaves_symbol_unknown() {
        let transport = Arc::new(ScriptedTransport::new());
        // Nothing scripted: every fetch fails.
        let outcome = evaluator(transport)
            .run(&["AAPL".to_string()], &ctx(Regime::RiskOn))
            .await
            .unwrap();

        let result = &outcome.results[0];
        assert_eq!(result.verdict, Verdict::Unknown);
        assert_eq!(result.primary_reason_code, Some(ReasonCode::ProviderError));
    }

    // ==================== stage gating ====================

    #[tokio::test]
    async fn risk_off_regime_never_touches_the_chain() {
        let transport = Arc::new(ScriptedTransport::new());
        script_healthy_symbol(&transport, "AAPL");

        let outcome = evaluator(transport.clone())
            .run(&["AAPL".to_string()], &ctx(Regime::RiskOff))
            .await
            .unwrap();

        let result = &outcome.results[0];
        assert_eq!(result.verdict, Verdict::Rejected);
        assert_eq!(result.stage_reached, StageReached::Stage1Only);
        assert_eq!(result.primary_reason_code, Some(ReasonCode::RegimeRiskOff));
        assert!(!transport
            .endpoints_called()
            .iter()
            .any(|e| e.starts_with("options/")));
        // No symbol consulted the chain, so the health gate has nothing
        // to block on.
        assert!(outcome.health.allowed);
    }

    #[tokio::test]
    async fn short_history_rejects_at_stage_one() {
        let transport = Arc::new(ScriptedTransport::new());
        script_healthy_symbol(&transport, "AAPL");
        transport.script("stocks/candles", "AAPL", candle_body(20));

        let outcome = evaluator(transport)
            .run(&["AAPL".to_string()], &ctx(Regime::RiskOn))
            .await
            .unwrap();

        let result = &outcome.results[0];
        assert_eq!(result.verdict, Verdict::Rejected);
        assert_eq!(
            result.primary_reason_code,
            Some(ReasonCode::InsufficientHistory)
        );
    }

    #[tokio::test]
    async fn neutral_regime_caps_the_final_score() {
        let transport = Arc::new(ScriptedTransport::new());
        script_healthy_symbol(&transport, "AAPL");

        let outcome = evaluator(transport)
            .run(&["AAPL".to_string()], &ctx(Regime::Neutral))
            .await
            .unwrap();

        let score = outcome.results[0].score.as_ref().unwrap();
        assert!(score.final_score <= crate::scoring::NEUTRAL_REGIME_CAP + f64::EPSILON);
    }

    // ==================== budget ====================

    #[tokio::test]
    async fn exhausted_budget_skips_remaining_symbols() {
        let transport = Arc::new(ScriptedTransport::new());
        script_healthy_symbol(&transport, "AAPL");

        let config = config();
        let started =
            chrono::Utc::now() - Duration::seconds(config.budget.max_wall_time_secs as i64 + 1);
        let budget = EvaluationBudget::starting_at(&config.budget, started);

        let outcome = StagedEvaluator::new(config, transport)
            .run_with_budget(&["AAPL".to_string()], &ctx(Regime::RiskOn), budget)
            .await
            .unwrap();

        assert!(outcome.counters.budget_stopped);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(
            outcome.results[0].primary_reason_code,
            Some(ReasonCode::TimeBudgetExhausted)
        );
        assert_eq!(outcome.counters.symbols_processed, 0);
    }

    #[tokio::test]
    async fn universe_is_trimmed_to_symbol_budget() {
        let transport = Arc::new(ScriptedTransport::new());
        for symbol in ["A", "B", "C"] {
            script_healthy_symbol(&transport, symbol);
        }

        let mut config = config();
        config.budget = BudgetConfig {
            max_symbols: 2,
            ..BudgetConfig::default()
        };

        let universe: Vec<String> =
            ["A", "B", "C"].iter().map(ToString::to_string).collect();
        let outcome = StagedEvaluator::new(config, transport)
            .run(&universe, &ctx(Regime::RiskOn))
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.counters.symbols_planned, 2);
        assert_eq!(outcome.results[0].symbol, "A");
        assert_eq!(outcome.results[1].symbol, "B");
    }

    #[tokio::test]
    async fn duplicate_symbols_evaluate_once() {
        let transport = Arc::new(ScriptedTransport::new());
        script_healthy_symbol(&transport, "AAPL");
        script_healthy_symbol(&transport, "MSFT");

        let universe: Vec<String> = ["AAPL", "aapl", "MSFT", "AAPL"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let outcome = evaluator(transport)
            .run(&universe, &ctx(Regime::RiskOn))
            .await
            .unwrap();

        let ordered: Vec<&str> = outcome.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(ordered, vec!["AAPL", "MSFT"]);
        assert_eq!(outcome.counters.symbols_planned, 2);
        assert_eq!(outcome.counters.symbols_processed, 2);
    }

    #[tokio::test]
    async fn results_keep_planned_order_across_batches() {
        let transport = Arc::new(ScriptedTransport::new());
        let names = ["N1", "N2", "N3", "N4", "N5"];
        for symbol in names {
            script_healthy_symbol(&transport, symbol);
        }

        let mut config = config();
        config.budget.batch_size = 2;

        let universe: Vec<String> = names.iter().map(ToString::to_string).collect();
        let outcome = StagedEvaluator::new(config, transport)
            .run(&universe, &ctx(Regime::RiskOn))
            .await
            .unwrap();

        let ordered: Vec<&str> = outcome.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(ordered, names.to_vec());
        assert_eq!(outcome.counters.batches_processed, 3);
    }
}
