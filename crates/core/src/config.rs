//! Screener configuration structs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub budget: BudgetConfig,
    pub criteria: CriteriaConfig,
    pub rules: RulesConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            cache: CacheConfig::default(),
            budget: BudgetConfig::default(),
            criteria: CriteriaConfig::default(),
            rules: RulesConfig::default(),
        }
    }
}

/// Quote-provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub live_base_url: String,
    pub delayed_base_url: String,
    pub api_token: String,
    /// Soft provider-wide request ceiling per second.
    pub requests_per_second: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            live_base_url: "https://api.marketdata.example/v1".to_string(),
            delayed_base_url: "https://delayed.marketdata.example/v1".to_string(),
            api_token: String::new(),
            requests_per_second: 10,
        }
    }
}

/// Per-endpoint cache TTLs in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub quote_ttl_secs: u64,
    pub iv_rank_ttl_secs: u64,
    pub calendar_ttl_secs: u64,
    pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            quote_ttl_secs: 60,
            iv_rank_ttl_secs: 6 * 60 * 60,
            calendar_ttl_secs: 24 * 60 * 60,
            default_ttl_secs: 60,
        }
    }
}

/// Ceilings for a single evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub max_wall_time_secs: u64,
    pub max_symbols: usize,
    pub max_requests_estimate: u64,
    pub batch_size: usize,
    /// Stage-2 fetch concurrency ceiling.
    pub concurrency: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_wall_time_secs: 300,
            max_symbols: 50,
            max_requests_estimate: 500,
            batch_size: 10,
            concurrency: 5,
        }
    }
}

/// Contract selection criteria.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriteriaConfig {
    /// Target |delta| window, e.g. 0.20-0.35.
    pub delta_min: f64,
    pub delta_max: f64,
    pub dte_min: i64,
    pub dte_max: i64,
    pub min_open_interest: u64,
    /// Maximum bid/ask spread as a percentage of the mid, e.g. 10.0.
    pub max_spread_pct: f64,
    pub min_volume: u64,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            delta_min: 0.20,
            delta_max: 0.35,
            dte_min: 21,
            dte_max: 45,
            min_open_interest: 100,
            max_spread_pct: 10.0,
            min_volume: 10,
        }
    }
}

/// Technical-rule thresholds for stage-1 eligibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    pub csp_rsi_min: f64,
    pub csp_rsi_max: f64,
    pub cc_rsi_min: f64,
    pub cc_rsi_max: f64,
    /// ATR as a fraction of price, e.g. 0.05 = 5%.
    pub max_atr_pct: f64,
    /// Maximum distance above support for a CSP, as a fraction of price.
    pub max_support_distance_pct: f64,
    /// Minimum distance below resistance for a CC, as a fraction of price.
    pub min_resistance_distance_pct: f64,
    /// Fractal lookback window for swing detection.
    pub swing_window: usize,
    /// S/R cluster tolerance as an ATR multiple.
    pub cluster_atr_mult: f64,
    /// Hard cap on cluster tolerance as a fraction of price.
    pub cluster_max_pct: f64,
    /// Minimum candle history required for the indicator snapshot.
    pub min_history: usize,
    /// Block eligibility when earnings land within this many days.
    pub earnings_guard_days: i64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            csp_rsi_min: 40.0,
            csp_rsi_max: 60.0,
            cc_rsi_min: 50.0,
            cc_rsi_max: 65.0,
            max_atr_pct: 0.05,
            max_support_distance_pct: 0.06,
            min_resistance_distance_pct: 0.03,
            swing_window: 3,
            cluster_atr_mult: 0.5,
            cluster_max_pct: 0.03,
            min_history: 210,
            earnings_guard_days: 45,
        }
    }
}
