//! Indicator primitives over ascending price series.
//!
//! Every function is a single pass. Output vectors are aligned to the end of
//! the input: the last element always describes the most recent bar.

use std::collections::VecDeque;

use analysis_core::Bar;

/// Simple Moving Average over a rolling sum.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    let mut sum: f64 = data[..period].iter().sum();
    result.push(sum / period as f64);
    for i in period..data.len() {
        sum += data[i] - data[i - period];
        result.push(sum / period as f64);
    }
    result
}

/// Exponential Moving Average seeded with the SMA of the first `period`
/// points. Element `j` describes `data[j + period - 1]`.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len() - period + 1);
    let mut prev = data[..period].iter().sum::<f64>() / period as f64;
    result.push(prev);
    for &value in &data[period..] {
        prev = (value - prev) * multiplier + prev;
        result.push(prev);
    }
    result
}

/// Relative Strength Index with Wilder's smoothing.
///
/// A window with neither gains nor losses has no defined RSI and yields
/// `None`; a window with gains only yields 100.
pub fn rsi(data: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let change = |i: usize| data[i] - data[i - 1];
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let c = change(i);
        if c > 0.0 {
            avg_gain += c;
        } else {
            avg_loss -= c;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    let to_rsi = |gain: f64, loss: f64| -> Option<f64> {
        if gain == 0.0 && loss == 0.0 {
            None
        } else if loss == 0.0 {
            Some(100.0)
        } else {
            Some(100.0 - 100.0 / (1.0 + gain / loss))
        }
    };

    let mut values = Vec::with_capacity(data.len() - period);
    values.push(to_rsi(avg_gain, avg_loss));
    for i in period + 1..data.len() {
        let c = change(i);
        let (gain, loss) = if c > 0.0 { (c, 0.0) } else { (0.0, -c) };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        values.push(to_rsi(avg_gain, avg_loss));
    }
    values
}

/// MACD (Moving Average Convergence Divergence)
pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl MacdResult {
    fn empty() -> Self {
        Self { macd_line: vec![], signal_line: vec![], histogram: vec![] }
    }
}

pub fn macd(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdResult {
    if fast_period == 0 || signal_period == 0 || slow_period <= fast_period {
        return MacdResult::empty();
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);
    if ema_slow.is_empty() {
        return MacdResult::empty();
    }

    // ema_fast starts (slow - fast) bars earlier than ema_slow
    let offset = slow_period - fast_period;
    let macd_line: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(i, slow)| ema_fast[i + offset] - slow)
        .collect();

    let signal_line = ema(&macd_line, signal_period);
    let hist_offset = macd_line.len() - signal_line.len();
    let histogram = signal_line
        .iter()
        .enumerate()
        .map(|(i, signal)| macd_line[i + hist_offset] - signal)
        .collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Bands
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Bands at `width` population standard deviations, from rolling sums.
pub fn bollinger_bands(data: &[f64], period: usize, width: f64) -> BollingerBands {
    if period == 0 || data.len() < period {
        return BollingerBands { upper: vec![], middle: vec![], lower: vec![] };
    }

    let n = period as f64;
    let capacity = data.len() - period + 1;
    let mut upper = Vec::with_capacity(capacity);
    let mut middle = Vec::with_capacity(capacity);
    let mut lower = Vec::with_capacity(capacity);

    let mut sum: f64 = data[..period].iter().sum();
    let mut sum_sq: f64 = data[..period].iter().map(|x| x * x).sum();
    for i in period - 1..data.len() {
        if i >= period {
            let (added, dropped) = (data[i], data[i - period]);
            sum += added - dropped;
            sum_sq += added * added - dropped * dropped;
        }
        let mean = sum / n;
        let std = (sum_sq / n - mean * mean).max(0.0).sqrt();
        middle.push(mean);
        upper.push(mean + width * std);
        lower.push(mean - width * std);
    }

    BollingerBands { upper, middle, lower }
}

fn high(bar: &Bar) -> f64 {
    bar.high.unwrap_or(bar.close)
}

fn low(bar: &Bar) -> f64 {
    bar.low.unwrap_or(bar.close)
}

/// Average True Range with Wilder's smoothing. Bars without a high/low
/// contribute their close.
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period + 1 {
        return vec![];
    }

    let true_range = |i: usize| {
        let prev_close = bars[i - 1].close;
        let (h, l) = (high(&bars[i]), low(&bars[i]));
        (h - l).max((h - prev_close).abs()).max((l - prev_close).abs())
    };

    let mut atr = (1..=period).map(&true_range).sum::<f64>() / period as f64;
    let mut values = Vec::with_capacity(bars.len() - period);
    values.push(atr);
    for i in period + 1..bars.len() {
        atr = (atr * (period - 1) as f64 + true_range(i)) / period as f64;
        values.push(atr);
    }
    values
}

/// Rolling extreme over a sliding window using a monotonic deque.
fn rolling_extreme(data: &[f64], period: usize, keep: impl Fn(f64, f64) -> bool) -> Vec<f64> {
    let mut window: VecDeque<usize> = VecDeque::with_capacity(period);
    let mut out = Vec::with_capacity(data.len().saturating_sub(period - 1));
    for (i, &value) in data.iter().enumerate() {
        while let Some(&back) = window.back() {
            if keep(value, data[back]) {
                window.pop_back();
            } else {
                break;
            }
        }
        window.push_back(i);
        if let Some(&front) = window.front() {
            if front + period <= i {
                window.pop_front();
            }
        }
        if i + 1 >= period {
            if let Some(&front) = window.front() {
                out.push(data[front]);
            }
        }
    }
    out
}

pub fn rolling_max(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }
    rolling_extreme(data, period, |new, old| new >= old)
}

pub fn rolling_min(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }
    rolling_extreme(data, period, |new, old| new <= old)
}

/// Stochastic Oscillator
pub struct StochasticResult {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

/// %K over `k_period` bars, %D as its `d_period` SMA. A window with no range
/// sits at the midpoint (50).
pub fn stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> StochasticResult {
    if k_period == 0 || bars.len() < k_period {
        return StochasticResult { k: vec![], d: vec![] };
    }

    let highs: Vec<f64> = bars.iter().map(high).collect();
    let lows: Vec<f64> = bars.iter().map(low).collect();
    let highest = rolling_max(&highs, k_period);
    let lowest = rolling_min(&lows, k_period);

    let k: Vec<f64> = bars[k_period - 1..]
        .iter()
        .zip(highest.iter().zip(&lowest))
        .map(|(bar, (&hi, &lo))| {
            if hi == lo {
                50.0
            } else {
                100.0 * (bar.close - lo) / (hi - lo)
            }
        })
        .collect();
    let d = sma(&k, d_period);

    StochasticResult { k, d }
}

/// Change over the last `sessions` closes.
pub fn momentum(data: &[f64], sessions: usize) -> Option<f64> {
    if sessions == 0 || data.len() <= sessions {
        return None;
    }
    let now = data[data.len() - 1];
    let then = data[data.len() - 1 - sessions];
    if then == 0.0 {
        return None;
    }
    let change = now / then - 1.0;
    change.is_finite().then_some(change)
}
