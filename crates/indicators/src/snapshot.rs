//! Indicator snapshot computed once per evaluation.

use serde::{Deserialize, Serialize};
use wheel_scan_core::config::RulesConfig;
use wheel_scan_core::Candle;

use crate::math::{atr, atr_pct, ema, rsi_wilder};
use crate::swings::{cluster_tolerance, support_resistance, swing_highs, swing_lows};

/// Deterministic indicator values for one symbol. Created per evaluation,
/// never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub last_close: f64,
    pub rsi14: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub atr14: Option<f64>,
    pub atr_pct: Option<f64>,
    pub swing_highs: Vec<f64>,
    pub swing_lows: Vec<f64>,
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    /// Clustering tolerance that produced the S/R levels.
    pub sr_tolerance: f64,
}

/// Computes the full snapshot from an ascending candle sequence.
#[must_use]
pub fn compute_snapshot(candles: &[Candle], rules: &RulesConfig) -> IndicatorSnapshot {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let last_close = closes.last().copied().unwrap_or(0.0);

    let atr14 = atr(&highs, &lows, &closes, 14);
    let tolerance = cluster_tolerance(last_close, atr14, rules.cluster_atr_mult, rules.cluster_max_pct);

    let highs_sw = swing_highs(candles, rules.swing_window);
    let lows_sw = swing_lows(candles, rules.swing_window);
    let (support, resistance) = support_resistance(&lows_sw, &highs_sw, last_close, tolerance);

    IndicatorSnapshot {
        last_close,
        rsi14: rsi_wilder(&closes, 14),
        ema20: ema(&closes, 20),
        ema50: ema(&closes, 50),
        ema200: ema(&closes, 200),
        atr14,
        atr_pct: atr_pct(&highs, &lows, &closes, 14),
        swing_highs: highs_sw,
        swing_lows: lows_sw,
        support,
        resistance,
        sr_tolerance: tolerance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_candles(n: usize) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.35).sin() * 8.0;
                Candle {
                    ts: start + Duration::days(i as i64),
                    open: base,
                    high: base + 1.5,
                    low: base - 1.5,
                    close: base + 0.5,
                    volume: 1_000_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn snapshot_is_deterministic() {
        let candles = make_candles(250);
        let rules = RulesConfig::default();
        let a = compute_snapshot(&candles, &rules);
        let b = compute_snapshot(&candles, &rules);
        assert_eq!(a.rsi14, b.rsi14);
        assert_eq!(a.ema200, b.ema200);
        assert_eq!(a.atr_pct, b.atr_pct);
        assert_eq!(a.support, b.support);
        assert_eq!(a.resistance, b.resistance);
    }

    #[test]
    fn long_history_populates_all_indicators() {
        let candles = make_candles(250);
        let snap = compute_snapshot(&candles, &RulesConfig::default());
        assert!(snap.rsi14.is_some());
        assert!(snap.ema20.is_some());
        assert!(snap.ema50.is_some());
        assert!(snap.ema200.is_some());
        assert!(snap.atr14.is_some());
        assert!(snap.atr_pct.is_some());
        assert!(!snap.swing_highs.is_empty());
        assert!(!snap.swing_lows.is_empty());
    }

    #[test]
    fn short_history_leaves_slow_indicators_empty() {
        let candles = make_candles(30);
        let snap = compute_snapshot(&candles, &RulesConfig::default());
        assert!(snap.rsi14.is_some());
        assert!(snap.ema200.is_none());
    }

    #[test]
    fn support_sits_below_price_and_resistance_above() {
        let candles = make_candles(250);
        let snap = compute_snapshot(&candles, &RulesConfig::default());
        if let Some(support) = snap.support {
            assert!(support < snap.last_close);
        }
        if let Some(resistance) = snap.resistance {
            assert!(resistance > snap.last_close);
        }
    }
}
