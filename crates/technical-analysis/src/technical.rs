use analysis_core::numeric::{finite, safe_div};
use analysis_core::{Assumptions, Bar, CanonicalModel, MetricCalculator, RoundMetrics, TechnicalMetrics};

use crate::indicators::*;

/// Sessions per momentum horizon.
const ONE_MONTH: usize = 21;
const THREE_MONTHS: usize = 63;
const SIX_MONTHS: usize = 126;
const TWELVE_MONTHS: usize = 252;

pub struct TechnicalCalculator;

impl TechnicalCalculator {
    fn last_sma(&self, closes: &[f64], period: usize) -> Option<f64> {
        sma(closes, period).last().copied()
    }

    /// Highest high / lowest low over the trailing year of bars.
    fn trailing_range(&self, bars: &[Bar]) -> (Option<f64>, Option<f64>) {
        let start = bars.len().saturating_sub(TWELVE_MONTHS);
        let window = &bars[start..];
        let high = window
            .iter()
            .map(|b| b.high.unwrap_or(b.close))
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
        let low = window
            .iter()
            .map(|b| b.low.unwrap_or(b.close))
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));
        (high, low)
    }

    /// Mean volume over the last 20 bars; `None` unless all 20 report volume.
    fn average_volume(&self, bars: &[Bar]) -> Option<f64> {
        if bars.len() < 20 {
            return None;
        }
        let volumes: Option<Vec<f64>> = bars[bars.len() - 20..].iter().map(|b| b.volume).collect();
        let volumes = volumes?;
        finite(volumes.iter().sum::<f64>() / 20.0)
    }
}

impl MetricCalculator for TechnicalCalculator {
    type Output = TechnicalMetrics;

    fn name(&self) -> &'static str {
        "technical"
    }

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> TechnicalMetrics {
        let bars = &model.prices;
        let closes = &model.derived.closes;
        let price = model.quote.price;
        let last_close = closes.last().copied();

        let fifty_day_ma = self.last_sma(closes, 50);
        let two_hundred_day_ma = self.last_sma(closes, 200);

        let macd_result = macd(closes, 12, 26, 9);
        let bands = bollinger_bands(closes, 20, 2.0);
        let bollinger_upper = bands.upper.last().copied();
        let bollinger_lower = bands.lower.last().copied();
        let bollinger_percent_b = match (last_close, bollinger_upper, bollinger_lower) {
            (Some(c), Some(u), Some(l)) => safe_div(Some(c - l), Some(u - l)),
            _ => None,
        };

        let stochastic_k = stochastic(bars, 14, 3).k.last().copied();

        let (range_high, range_low) = self.trailing_range(bars);
        let fifty_two_week_high = model.quote.fifty_two_week_high.or(range_high);
        let fifty_two_week_low = model.quote.fifty_two_week_low.or(range_low);

        let average_volume_20d = self.average_volume(bars);
        let latest_volume = model.quote.volume.or_else(|| bars.last().and_then(|b| b.volume));

        TechnicalMetrics {
            twenty_day_ma: self.last_sma(closes, 20),
            fifty_day_ma,
            two_hundred_day_ma,
            ema_12: ema(closes, 12).last().copied(),
            ema_26: ema(closes, 26).last().copied(),
            macd: macd_result.macd_line.last().copied(),
            macd_signal: macd_result.signal_line.last().copied(),
            macd_histogram: macd_result.histogram.last().copied(),
            rsi_14: rsi(closes, 14).last().copied().flatten(),
            stochastic_k,
            williams_r: stochastic_k.map(|k| k - 100.0),
            bollinger_upper,
            bollinger_lower,
            bollinger_percent_b,
            average_true_range: atr(bars, 14).last().copied(),
            price_to_fifty_day_ma: safe_div(price, fifty_day_ma),
            price_to_two_hundred_day_ma: safe_div(price, two_hundred_day_ma),
            golden_cross: match (fifty_day_ma, two_hundred_day_ma) {
                (Some(fast), Some(slow)) => Some(fast > slow),
                _ => None,
            },
            fifty_two_week_high,
            fifty_two_week_low,
            distance_from_52_week_high: safe_div(price, fifty_two_week_high).map(|r| r - 1.0),
            average_volume_20d,
            relative_volume: safe_div(latest_volume, average_volume_20d),
            momentum_1m: momentum(closes, ONE_MONTH),
            momentum_3m: momentum(closes, THREE_MONTHS),
            momentum_6m: momentum(closes, SIX_MONTHS),
            momentum_12m: momentum(closes, TWELVE_MONTHS),
        }
        .rounded(assumptions.output_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{IndustryData, MacroData, MarketData, RawFinancialData};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn model_with_closes(closes: &[f64]) -> CanonicalModel {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let price_history = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + Duration::days(i as i64),
                open: Some(close),
                high: Some(close * 1.01),
                low: Some(close * 0.99),
                close,
                volume: Some(1_000.0 + i as f64),
            })
            .collect();
        CanonicalModel::build(&RawFinancialData {
            market_data: MarketData {
                symbol: "TEST".to_string(),
                price_history,
                ..Default::default()
            },
            macro_data: MacroData::default(),
            industry_data: IndustryData::default(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_long_average_needs_full_window() {
        let closes: Vec<f64> = (0..199).map(|i| 100.0 + i as f64 * 0.1).collect();
        let m = TechnicalCalculator.calculate(&model_with_closes(&closes), &Assumptions::default());
        assert_eq!(m.two_hundred_day_ma, None);
        assert_eq!(m.golden_cross, None);
        assert_eq!(m.price_to_two_hundred_day_ma, None);
        assert!(m.fifty_day_ma.is_some());
        assert!(m.twenty_day_ma.is_some());
    }

    #[test]
    fn test_uptrend_golden_cross() {
        let closes: Vec<f64> = (0..260).map(|i| 50.0 + i as f64 * 0.5).collect();
        let m = TechnicalCalculator.calculate(&model_with_closes(&closes), &Assumptions::default());

        assert_eq!(m.golden_cross, Some(true));
        assert_eq!(m.rsi_14, Some(100.0));
        assert!(m.macd.unwrap() > 0.0);
        assert!(m.price_to_fifty_day_ma.unwrap() > 1.0);
        let last = *closes.last().unwrap();
        let expected = last / closes[closes.len() - 1 - 21] - 1.0;
        assert!((m.momentum_1m.unwrap() - expected).abs() < 1e-6);
        assert!(m.momentum_12m.is_some());
    }

    #[test]
    fn test_range_and_volume() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let m = TechnicalCalculator.calculate(&model_with_closes(&closes), &Assumptions::default());

        assert!((m.fifty_two_week_high.unwrap() - 129.0 * 1.01).abs() < 1e-6);
        assert!((m.fifty_two_week_low.unwrap() - 99.0).abs() < 1e-6);
        assert!(m.distance_from_52_week_high.unwrap() < 0.0);
        // volumes 1010..=1029
        assert!((m.average_volume_20d.unwrap() - 1019.5).abs() < 1e-9);
        assert!((m.relative_volume.unwrap() - 1029.0 / 1019.5).abs() < 1e-6);
        assert_eq!(m.momentum_1m, None);
    }

    #[test]
    fn test_bounded_oscillators() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 * 0.4).sin() * 8.0).collect();
        let m = TechnicalCalculator.calculate(&model_with_closes(&closes), &Assumptions::default());

        let rsi = m.rsi_14.unwrap();
        assert!((0.0..=100.0).contains(&rsi));
        let k = m.stochastic_k.unwrap();
        assert!((0.0..=100.0).contains(&k));
        assert!((m.williams_r.unwrap() - (k - 100.0)).abs() < 1e-5);
        assert!(m.bollinger_upper.unwrap() > m.bollinger_lower.unwrap());
        assert!(m.average_true_range.unwrap() > 0.0);
    }

    #[test]
    fn test_no_history_is_all_null() {
        let m = TechnicalCalculator.calculate(&model_with_closes(&[]), &Assumptions::default());
        assert_eq!(m, TechnicalMetrics::default());
    }
}
