//! RSI, EMA, and ATR primitives.
//!
//! RSI and ATR use Wilder smoothing: the running average is seeded from the
//! first `period` observations, then updated with
//! `avg = (avg * (period - 1) + new) / period`.

/// Wilder RSI over a close series.
///
/// Returns `None` when fewer than `period + 1` closes are available. When
/// the average loss over the window is zero, RSI is exactly 100.
#[must_use]
pub fn rsi_wilder(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for w in closes.windows(2).take(period) {
        let delta = w[1] - w[0];
        if delta > 0.0 {
            gain_sum += delta;
        } else {
            loss_sum -= delta;
        }
    }

    let p = period as f64;
    let mut avg_gain = gain_sum / p;
    let mut avg_loss = loss_sum / p;

    for w in closes.windows(2).skip(period) {
        let delta = w[1] - w[0];
        let (gain, loss) = if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// EMA series seeded with the simple average of the first `period` closes,
/// then smoothed with k = 2 / (period + 1). The first element corresponds
/// to index `period - 1` of the input.
#[must_use]
pub fn ema_series(closes: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let seed: f64 = closes[..period].iter().sum::<f64>() / period as f64;
    let k = 2.0 / (period as f64 + 1.0);

    let mut series = Vec::with_capacity(closes.len() - period + 1);
    series.push(seed);
    let mut prev = seed;
    for &close in &closes[period..] {
        prev = (close - prev) * k + prev;
        series.push(prev);
    }
    Some(series)
}

/// Latest EMA value, or `None` when the series is shorter than `period`.
#[must_use]
pub fn ema(closes: &[f64], period: usize) -> Option<f64> {
    ema_series(closes, period).and_then(|s| s.last().copied())
}

/// Average EMA change per bar over the trailing `bars` bars.
#[must_use]
pub fn ema_slope(closes: &[f64], period: usize, bars: usize) -> Option<f64> {
    if bars == 0 {
        return None;
    }
    let series = ema_series(closes, period)?;
    if series.len() <= bars {
        return None;
    }
    let last = series[series.len() - 1];
    let back = series[series.len() - 1 - bars];
    Some((last - back) / bars as f64)
}

/// Wilder-smoothed average true range.
///
/// True range per bar is `max(high - low, |high - prev_close|,
/// |low - prev_close|)`. Needs `period + 1` bars so the first true range
/// has a previous close.
#[must_use]
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    let n = highs.len();
    if period == 0 || n != lows.len() || n != closes.len() || n < period + 1 {
        return None;
    }

    let true_range = |i: usize| -> f64 {
        let hl = highs[i] - lows[i];
        let hc = (highs[i] - closes[i - 1]).abs();
        let lc = (lows[i] - closes[i - 1]).abs();
        hl.max(hc).max(lc)
    };

    let p = period as f64;
    let mut avg: f64 = (1..=period).map(true_range).sum::<f64>() / p;
    for i in (period + 1)..n {
        avg = (avg * (p - 1.0) + true_range(i)) / p;
    }
    Some(avg)
}

/// ATR as a fraction of the last close.
#[must_use]
pub fn atr_pct(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    let atr = atr(highs, lows, closes, period)?;
    let last = *closes.last()?;
    if last <= 0.0 {
        return None;
    }
    Some(atr / last)
}
