//! Swing-cluster support/resistance detection.
//!
//! Local fractal extrema are detected with a symmetric lookback window,
//! clustered within a tolerance band, and the nearest cluster below/above
//! the current price becomes support/resistance.

use wheel_scan_core::Candle;

/// Local swing highs: bars whose high exceeds every high within `k` bars on
/// both sides.
#[must_use]
pub fn swing_highs(candles: &[Candle], k: usize) -> Vec<f64> {
    fractal_extrema(candles, k, |c| c.high, |center, other| center > other)
}

/// Local swing lows: bars whose low undercuts every low within `k` bars on
/// both sides.
#[must_use]
pub fn swing_lows(candles: &[Candle], k: usize) -> Vec<f64> {
    fractal_extrema(candles, k, |c| c.low, |center, other| center < other)
}

fn fractal_extrema(
    candles: &[Candle],
    k: usize,
    value: impl Fn(&Candle) -> f64,
    beats: impl Fn(f64, f64) -> bool,
) -> Vec<f64> {
    if k == 0 || candles.len() < 2 * k + 1 {
        return Vec::new();
    }

    let mut extrema = Vec::new();
    for i in k..candles.len() - k {
        let center = value(&candles[i]);
        let is_extremum = (i - k..=i + k)
            .filter(|&j| j != i)
            .all(|j| beats(center, value(&candles[j])));
        if is_extremum {
            extrema.push(center);
        }
    }
    extrema
}

/// Groups levels lying within `tolerance` of each other and returns the
/// mean of each group. Input order does not matter.
#[must_use]
pub fn cluster_levels(levels: &[f64], tolerance: f64) -> Vec<f64> {
    if levels.is_empty() {
        return Vec::new();
    }

    let mut sorted = levels.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut clusters = Vec::new();
    let mut group = vec![sorted[0]];
    for &level in &sorted[1..] {
        let anchor = group[0];
        if (level - anchor).abs() <= tolerance {
            group.push(level);
        } else {
            clusters.push(group.iter().sum::<f64>() / group.len() as f64);
            group = vec![level];
        }
    }
    clusters.push(group.iter().sum::<f64>() / group.len() as f64);
    clusters
}

/// Cluster tolerance: an ATR multiple when ATR is available, otherwise a
/// percentage of price, hard-capped at `max_pct` of price.
#[must_use]
pub fn cluster_tolerance(price: f64, atr: Option<f64>, atr_mult: f64, max_pct: f64) -> f64 {
    let cap = price * max_pct;
    match atr {
        Some(a) if a > 0.0 => (a * atr_mult).min(cap),
        _ => cap,
    }
}

/// Nearest clustered support (below price) and resistance (above price).
#[must_use]
pub fn support_resistance(
    swing_lows: &[f64],
    swing_highs: &[f64],
    price: f64,
    tolerance: f64,
) -> (Option<f64>, Option<f64>) {
    let support = cluster_levels(swing_lows, tolerance)
        .into_iter()
        .filter(|&l| l < price)
        .fold(None, |best: Option<f64>, l| match best {
            Some(b) if b >= l => Some(b),
            _ => Some(l),
        });

    let resistance = cluster_levels(swing_highs, tolerance)
        .into_iter()
        .filter(|&l| l > price)
        .fold(None, |best: Option<f64>, l| match best {
            Some(b) if b <= l => Some(b),
            _ => Some(l),
        });

    (support, resistance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(high: f64, low: f64) -> Candle {
        Candle {
            ts: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1_000.0,
        }
    }

    #[test]
    fn swing_high_requires_strict_dominance_over_window() {
        let candles = vec![
            candle(10.0, 9.0),
            candle(12.0, 10.0),
            candle(15.0, 13.0), // swing high
            candle(12.0, 10.0),
            candle(11.0, 9.0),
        ];
        assert_eq!(swing_highs(&candles, 2), vec![15.0]);
    }

    #[test]
    fn swing_low_mirror_case() {
        let candles = vec![
            candle(12.0, 10.0),
            candle(11.0, 9.0),
            candle(10.0, 7.0), // swing low
            candle(11.0, 9.5),
            candle(12.0, 10.5),
        ];
        assert_eq!(swing_lows(&candles, 2), vec![7.0]);
    }

    #[test]
    fn no_extrema_when_window_exceeds_series() {
        let candles = vec![candle(10.0, 9.0), candle(11.0, 10.0)];
        assert!(swing_highs(&candles, 2).is_empty());
        assert!(swing_lows(&candles, 2).is_empty());
    }

    #[test]
    fn cluster_groups_within_tolerance() {
        let levels = [100.0, 100.5, 101.0, 110.0];
        let clusters = cluster_levels(&levels, 1.5);
        assert_eq!(clusters.len(), 2);
        assert!((clusters[0] - 100.5).abs() < 1e-12);
        assert!((clusters[1] - 110.0).abs() < 1e-12);
    }

    #[test]
    fn cluster_is_order_insensitive() {
        let a = cluster_levels(&[101.0, 100.0, 110.0], 1.5);
        let b = cluster_levels(&[110.0, 100.0, 101.0], 1.5);
        assert_eq!(a, b);
    }

    #[test]
    fn tolerance_uses_atr_multiple_when_available() {
        let tol = cluster_tolerance(100.0, Some(2.0), 0.5, 0.03);
        assert!((tol - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tolerance_is_hard_capped_at_price_fraction() {
        // ATR mult would give 5.0 but the cap is 3% of 100 = 3.0.
        let tol = cluster_tolerance(100.0, Some(10.0), 0.5, 0.03);
        assert!((tol - 3.0).abs() < 1e-12);
    }

    #[test]
    fn tolerance_falls_back_to_percentage_without_atr() {
        let tol = cluster_tolerance(200.0, None, 0.5, 0.02);
        assert!((tol - 4.0).abs() < 1e-12);
    }

    #[test]
    fn support_is_nearest_cluster_below_price() {
        let (support, resistance) =
            support_resistance(&[90.0, 95.0, 80.0], &[105.0, 120.0], 100.0, 1.0);
        assert_eq!(support, Some(95.0));
        assert_eq!(resistance, Some(105.0));
    }

    #[test]
    fn no_support_when_all_levels_above_price() {
        let (support, resistance) = support_resistance(&[105.0, 110.0], &[], 100.0, 1.0);
        assert_eq!(support, None);
        assert_eq!(resistance, None);
    }
}
