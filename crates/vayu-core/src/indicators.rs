//! # Technical Indicator Kit
//!
//! Pure functions over price/volume slices shared by the regime classifier
//! and the specialized agents. Smoothing conventions follow the recursive
//! (non-adjusted) exponential form throughout: `y[0] = x[0]`,
//! `y[i] = alpha * x[i] + (1 - alpha) * y[i-1]`.
//!
//! Rolling statistics tolerate partial leading windows so callers never have
//! to special-case warmup; sample standard deviation (n-1 denominator) is
//! used everywhere a dispersion estimate feeds a trading rule.

/// Exponential moving average series with `alpha = 2 / (span + 1)`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    ema_alpha(values, 2.0 / (span as f64 + 1.0))
}

/// Exponential moving average series with an explicit smoothing factor.
/// Used directly for Wilder-style RSI smoothing (`alpha = 1/period`).
pub fn ema_alpha(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(&v) => v,
        None => return out,
    };
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Last value of the EMA series, or `None` on empty input.
pub fn ema_last(values: &[f64], span: usize) -> Option<f64> {
    ema(values, span).last().copied()
}

/// Rolling mean with partial leading windows (window shrinks at the start).
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let n = (i + 1).min(window);
        out.push(sum / n as f64);
    }
    out
}

/// Simple moving average over the trailing `window` bars (partial allowed).
pub fn sma_last(values: &[f64], window: usize) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let start = values.len().saturating_sub(window);
    let slice = &values[start..];
    Some(slice.iter().sum::<f64>() / slice.len() as f64)
}

/// Sample standard deviation (n-1 denominator); 0.0 below two points.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Rolling max with partial leading windows.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            values[start..=i].iter().cloned().fold(f64::MIN, f64::max)
        })
        .collect()
}

/// Rolling min with partial leading windows.
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            values[start..=i].iter().cloned().fold(f64::MAX, f64::min)
        })
        .collect()
}

/// Wilder RSI over `period`; returns the latest value in `[0, 100]`.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() < 2 {
        return 50.0;
    }
    let mut ups = Vec::with_capacity(closes.len());
    let mut downs = Vec::with_capacity(closes.len());
    // First delta is zero by convention (no prior close to diff against).
    ups.push(0.0);
    downs.push(0.0);
    for w in closes.windows(2) {
        let delta = w[1] - w[0];
        ups.push(delta.max(0.0));
        downs.push((-delta).max(0.0));
    }
    let alpha = 1.0 / period as f64;
    let avg_up = *ema_alpha(&ups, alpha).last().unwrap_or(&0.0);
    let avg_down = *ema_alpha(&downs, alpha).last().unwrap_or(&0.0);
    let rs = avg_up / (avg_down + 1e-9);
    100.0 - (100.0 / (1.0 + rs))
}

/// True-range series; the first bar uses its own close as the prior close.
pub fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let n = highs.len().min(lows.len()).min(closes.len());
    (0..n)
        .map(|i| {
            let prev_close = if i == 0 { closes[0] } else { closes[i - 1] };
            let hl = highs[i] - lows[i];
            let hc = (highs[i] - prev_close).abs();
            let lc = (lows[i] - prev_close).abs();
            hl.max(hc).max(lc)
        })
        .collect()
}

/// ATR series: rolling mean of true range over `period`.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    rolling_mean(&true_range(highs, lows, closes), period)
}

/// Bollinger bands (upper, middle, lower) at the latest bar.
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> Option<(f64, f64, f64)> {
    if closes.is_empty() {
        return None;
    }
    let start = closes.len().saturating_sub(period);
    let slice = &closes[start..];
    let mid = slice.iter().sum::<f64>() / slice.len() as f64;
    let std = sample_std(slice);
    Some((mid + k * std, mid, mid - k * std))
}

/// Bollinger band width series as a percentage of the middle band
/// (`4 * std / sma * 100`, the full ±2σ envelope).
pub fn bollinger_width_pct(closes: &[f64], period: usize) -> Vec<f64> {
    let window = period.max(1);
    (0..closes.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &closes[start..=i];
            let mid = slice.iter().sum::<f64>() / slice.len() as f64;
            if mid.abs() < 1e-12 {
                0.0
            } else {
                sample_std(slice) * 4.0 / mid * 100.0
            }
        })
        .collect()
}

/// Stochastic %K at the latest bar.
pub fn stochastic_k(highs: &[f64], lows: &[f64], close: f64, period: usize) -> f64 {
    if highs.is_empty() || lows.is_empty() {
        return 50.0;
    }
    let start_h = highs.len().saturating_sub(period);
    let start_l = lows.len().saturating_sub(period);
    let hh = highs[start_h..].iter().cloned().fold(f64::MIN, f64::max);
    let ll = lows[start_l..].iter().cloned().fold(f64::MAX, f64::min);
    (close - ll) / (hh - ll + 1e-9) * 100.0
}

/// Annualized close-to-close realized volatility, in percent.
pub fn realized_vol_annualized(closes: &[f64]) -> f64 {
    if closes.len() < 3 {
        return 0.0;
    }
    let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    sample_std(&returns) * (252.0_f64).sqrt() * 100.0
}

/// Percent change over the last `n` bars: `(c[-1] - c[-n]) / c[-n] * 100`.
/// Zero when the window is too short.
pub fn momentum_pct(closes: &[f64], n: usize) -> f64 {
    let len = closes.len();
    if len < n || n == 0 {
        return 0.0;
    }
    let base = closes[len - n];
    if base.abs() < 1e-12 {
        return 0.0;
    }
    (closes[len - 1] - base) / base * 100.0
}

/// Latest MACD histogram value: (EMA12 - EMA26) minus its EMA9 signal line.
pub fn macd_histogram(closes: &[f64]) -> f64 {
    if closes.is_empty() {
        return 0.0;
    }
    let fast = ema(closes, 12);
    let slow = ema(closes, 26);
    let macd_line: Vec<f64> = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect();
    let signal = ema(&macd_line, 9);
    match (macd_line.last(), signal.last()) {
        (Some(m), Some(s)) => m - s,
        _ => 0.0,
    }
}

/// Normalized EMA(9)-EMA(20) gap, the trend-strength measure shared by the
/// classifier and the macro agent. Positive = bullish.
pub fn trend_strength(closes: &[f64]) -> f64 {
    let e9 = match ema_last(closes, 9) {
        Some(v) => v,
        None => return 0.0,
    };
    let e20 = match ema_last(closes, 20) {
        Some(v) => v,
        None => return 0.0,
    };
    if e20.abs() < 1e-12 {
        return 0.0;
    }
    (e9 - e20) / e20
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 * 1.01f64.powi(i as i32)).collect()
    }

    #[test]
    fn ema_seeds_at_first_value() {
        let series = ema(&[10.0, 10.0, 10.0], 9);
        assert_eq!(series, vec![10.0, 10.0, 10.0]);
    }

    #[test]
    fn ema_tracks_rising_series_from_below() {
        let closes = rising(40);
        let e = ema_last(&closes, 9).unwrap();
        let last = *closes.last().unwrap();
        assert!(e < last && e > last * 0.9);
    }

    #[test]
    fn rsi_saturates_on_monotonic_series() {
        let up = rsi(&rising(40), 14);
        assert!(up > 90.0, "monotonic rally should pin RSI high: {}", up);

        let falling: Vec<f64> = rising(40).into_iter().rev().collect();
        let down = rsi(&falling, 14);
        assert!(down < 10.0, "monotonic selloff should pin RSI low: {}", down);
    }

    #[test]
    fn rsi_neutral_on_flat_series() {
        let flat = vec![100.0; 30];
        let v = rsi(&flat, 14);
        // up and down averages are both ~0; the epsilon guard keeps this near 0/0 -> ~0 RS.
        assert!(v <= 50.0, "flat tape RSI should not read overbought: {}", v);
    }

    #[test]
    fn rolling_mean_partial_windows() {
        let m = rolling_mean(&[2.0, 4.0, 6.0, 8.0], 2);
        assert_eq!(m, vec![2.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn true_range_covers_gaps() {
        // Gap down: yesterday close 110, today range 100-102.
        let tr = true_range(&[105.0, 102.0], &[95.0, 100.0], &[110.0, 101.0]);
        assert_eq!(tr[1], 10.0); // |low - prev_close| dominates
    }

    #[test]
    fn bollinger_bands_bracket_mean() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 5) as f64).collect();
        let (upper, mid, lower) = bollinger(&closes, 20, 2.0).unwrap();
        assert!(lower < mid && mid < upper);
        assert!((upper - mid - (mid - lower)).abs() < 1e-9, "bands symmetric about mid");
    }

    #[test]
    fn realized_vol_zero_for_constant_prices() {
        assert_eq!(realized_vol_annualized(&vec![50.0; 25]), 0.0);
    }

    #[test]
    fn momentum_sign_follows_direction() {
        assert!(momentum_pct(&rising(10), 5) > 0.0);
        let falling: Vec<f64> = rising(10).into_iter().rev().collect();
        assert!(momentum_pct(&falling, 5) < 0.0);
    }

    #[test]
    fn trend_strength_positive_in_rally() {
        let ts = trend_strength(&rising(60));
        assert!(ts > 0.02, "steady 1%/bar rally should exceed trending threshold: {}", ts);
    }

    #[test]
    fn stochastic_extremes() {
        let highs = vec![110.0; 14];
        let lows = vec![90.0; 14];
        assert!(stochastic_k(&highs, &lows, 110.0, 14) > 99.0);
        assert!(stochastic_k(&highs, &lows, 90.0, 14) < 1.0);
    }
}
