use analysis_core::numeric::{finite, mean, percentile, safe_div, sample_std_dev};
use analysis_core::{Assumptions, CanonicalModel, MetricCalculator, RiskMetrics, RoundMetrics};

pub struct RiskCalculator;

impl RiskCalculator {
    /// Daily log returns. Pairs with a non-positive price are skipped.
    pub fn calculate_returns(&self, prices: &[f64]) -> Vec<f64> {
        prices
            .windows(2)
            .filter(|w| w[0] > 0.0 && w[1] > 0.0)
            .map(|w| (w[1] / w[0]).ln())
            .collect()
    }

    /// Deepest peak-to-trough decline as a non-positive fraction.
    pub fn calculate_max_drawdown(&self, prices: &[f64]) -> Option<f64> {
        if prices.len() < 2 {
            return None;
        }

        let mut peak = f64::MIN;
        let mut max_dd: f64 = 0.0;
        for &price in prices {
            if price > peak {
                peak = price;
            }
            if peak > 0.0 {
                max_dd = max_dd.min((price - peak) / peak);
            }
        }
        finite(max_dd)
    }

    /// Root mean square of the negative daily returns, annualised.
    fn calculate_downside_deviation(&self, returns: &[f64], periods: f64) -> Option<f64> {
        if returns.len() < 2 {
            return None;
        }
        let sum_sq: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
        finite((sum_sq / returns.len() as f64).sqrt() * periods.sqrt())
    }

    /// Historical one-day VaR and expected shortfall at 95%.
    fn calculate_tail_risk(&self, returns: &[f64]) -> (Option<f64>, Option<f64>) {
        if returns.len() < 2 {
            return (None, None);
        }
        let Some(var) = percentile(returns, 5.0) else {
            return (None, None);
        };
        let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= var).collect();
        (Some(var), mean(&tail).or_else(|| tail.first().copied()))
    }

    /// Moment-based skewness and excess kurtosis.
    fn calculate_moments(&self, returns: &[f64]) -> (Option<f64>, Option<f64>) {
        let n = returns.len();
        let Some(mu) = mean(returns) else {
            return (None, None);
        };
        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for r in returns {
            let d = r - mu;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
        }
        let n = n as f64;
        let (m2, m3, m4) = (m2 / n, m3 / n, m4 / n);
        if m2 <= 0.0 {
            return (None, None);
        }

        let skewness = if n >= 3.0 { finite(m3 / m2.powf(1.5)) } else { None };
        let kurtosis = if n >= 4.0 { finite(m4 / (m2 * m2) - 3.0) } else { None };
        (skewness, kurtosis)
    }
}

impl MetricCalculator for RiskCalculator {
    type Output = RiskMetrics;

    fn name(&self) -> &'static str {
        "risk"
    }

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> RiskMetrics {
        let closes = &model.derived.closes;
        let returns = self.calculate_returns(closes);
        let periods = assumptions.trading_days_per_year as f64;
        let rf = model.risk_free_rate();

        let volatility = sample_std_dev(&returns).map(|sd| sd * periods.sqrt());
        let annualized_return = mean(&returns).map(|m| m * periods);
        let excess = match (annualized_return, rf) {
            (Some(r), Some(rf)) => Some(r - rf),
            _ => None,
        };
        let downside_deviation = self.calculate_downside_deviation(&returns, periods);
        let max_drawdown = self.calculate_max_drawdown(closes);
        let (value_at_risk_95, conditional_var_95) = self.calculate_tail_risk(&returns);
        let (skewness, excess_kurtosis) = self.calculate_moments(&returns);

        let positive_days_ratio = if returns.is_empty() {
            None
        } else {
            Some(returns.iter().filter(|r| **r > 0.0).count() as f64 / returns.len() as f64)
        };

        RiskMetrics {
            beta: model.quote.beta,
            annualized_volatility: volatility,
            annualized_return,
            sharpe_ratio: safe_div(excess, volatility),
            sortino_ratio: safe_div(excess, downside_deviation),
            downside_deviation,
            max_drawdown,
            calmar_ratio: safe_div(annualized_return, max_drawdown.map(f64::abs)),
            value_at_risk_95,
            conditional_var_95,
            skewness,
            excess_kurtosis,
            positive_days_ratio,
        }
        .rounded(assumptions.output_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::model_with_closes;

    #[test]
    fn test_max_drawdown_is_non_positive() {
        let calc = RiskCalculator;
        let dd = calc.calculate_max_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]).unwrap();
        assert!((dd - (-0.25)).abs() < 1e-12);
        assert_eq!(calc.calculate_max_drawdown(&[1.0, 2.0, 3.0]), Some(0.0));
        assert_eq!(calc.calculate_max_drawdown(&[1.0]), None);
    }

    #[test]
    fn test_log_returns() {
        let returns = RiskCalculator.calculate_returns(&[100.0, 110.0, 0.0, 121.0]);
        assert_eq!(returns.len(), 1);
        assert!((returns[0] - 1.1f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_sharpe_needs_risk_free_rate() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0 + i as f64 * 0.1).collect();
        let m = RiskCalculator.calculate(&model_with_closes(&closes, None), &Assumptions::default());
        assert!(m.annualized_volatility.unwrap() > 0.0);
        assert_eq!(m.sharpe_ratio, None);
        assert_eq!(m.sortino_ratio, None);

        let m = RiskCalculator.calculate(&model_with_closes(&closes, Some(0.04)), &Assumptions::default());
        let expected = (m.annualized_return.unwrap() - 0.04) / m.annualized_volatility.unwrap();
        assert!((m.sharpe_ratio.unwrap() - expected).abs() < 1e-4);
        assert!(m.max_drawdown.unwrap() <= 0.0);
    }

    #[test]
    fn test_flat_prices_have_zero_volatility() {
        let m = RiskCalculator.calculate(&model_with_closes(&[50.0; 30], Some(0.04)), &Assumptions::default());
        assert_eq!(m.annualized_volatility, Some(0.0));
        assert_eq!(m.sharpe_ratio, None);
        assert_eq!(m.skewness, None);
        assert_eq!(m.max_drawdown, Some(0.0));
        assert_eq!(m.calmar_ratio, None);
        assert_eq!(m.positive_days_ratio, Some(0.0));
    }

    #[test]
    fn test_tail_risk() {
        let closes: Vec<f64> = (0..200).map(|i| 100.0 + ((i * 7) % 11) as f64 - 5.0 + i as f64 * 0.01).collect();
        let m = RiskCalculator.calculate(&model_with_closes(&closes, None), &Assumptions::default());
        let var = m.value_at_risk_95.unwrap();
        let cvar = m.conditional_var_95.unwrap();
        assert!(var < 0.0);
        assert!(cvar <= var);
    }

    #[test]
    fn test_empty_history_is_all_null() {
        let m = RiskCalculator.calculate(&model_with_closes(&[], Some(0.04)), &Assumptions::default());
        assert_eq!(m.annualized_volatility, None);
        assert_eq!(m.max_drawdown, None);
        assert_eq!(m.value_at_risk_95, None);
        assert_eq!(m.positive_days_ratio, None);
    }
}
