use analysis_core::numeric::{last_change, series_cagr};
use analysis_core::{Assumptions, CanonicalModel, GrowthMetrics, MetricCalculator, RoundMetrics};

pub struct GrowthCalculator;

/// Year-over-year and compound growth over an ascending annual series.
pub fn yoy(series: &[f64]) -> Option<f64> {
    last_change(series)
}

pub fn cagr_years(series: &[f64], years: usize) -> Option<f64> {
    series_cagr(series, years)
}

impl MetricCalculator for GrowthCalculator {
    type Output = GrowthMetrics;

    fn name(&self) -> &'static str {
        "growth"
    }

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> GrowthMetrics {
        let h = &model.history;

        GrowthMetrics {
            revenue_growth_yoy: yoy(&h.revenue),
            net_income_growth_yoy: yoy(&h.net_income),
            eps_growth_yoy: yoy(&h.eps),
            dividend_growth_yoy: yoy(&h.dividends),
            fcf_growth_yoy: yoy(&h.free_cash_flow),
            revenue_3_year_cagr: cagr_years(&h.revenue, 3),
            revenue_5_year_cagr: cagr_years(&h.revenue, 5),
            net_income_3_year_cagr: cagr_years(&h.net_income, 3),
            net_income_5_year_cagr: cagr_years(&h.net_income, 5),
            eps_3_year_cagr: cagr_years(&h.eps, 3),
            eps_5_year_cagr: cagr_years(&h.eps, 5),
            fcf_3_year_cagr: cagr_years(&h.free_cash_flow, 3),
            fcf_5_year_cagr: cagr_years(&h.free_cash_flow, 5),
            dividend_5_year_cagr: cagr_years(&h.dividends, 5),
        }
        .rounded(assumptions.output_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::model_from;
    use analysis_core::MarketData;

    #[test]
    fn test_flat_revenue_has_zero_cagr() {
        let model = model_from(MarketData {
            historical_revenue: vec![100.0; 6],
            ..Default::default()
        });
        let m = GrowthCalculator.calculate(&model, &Assumptions::default());
        assert_eq!(m.revenue_5_year_cagr, Some(0.0));
        assert_eq!(m.revenue_3_year_cagr, Some(0.0));
        assert_eq!(m.revenue_growth_yoy, Some(0.0));
    }

    #[test]
    fn test_short_history_nulls_long_windows() {
        let model = model_from(MarketData {
            historical_revenue: vec![100.0, 110.0, 121.0, 133.1],
            historical_eps: vec![5.0],
            ..Default::default()
        });
        let m = GrowthCalculator.calculate(&model, &Assumptions::default());
        assert!((m.revenue_3_year_cagr.unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(m.revenue_5_year_cagr, None);
        assert_eq!(m.eps_growth_yoy, None);
        assert_eq!(m.eps_3_year_cagr, None);
    }

    #[test]
    fn test_negative_prior_uses_absolute_base() {
        let model = model_from(MarketData {
            historical_net_income: vec![-50.0, 25.0],
            ..Default::default()
        });
        let m = GrowthCalculator.calculate(&model, &Assumptions::default());
        assert_eq!(m.net_income_growth_yoy, Some(1.5));
        assert_eq!(m.net_income_3_year_cagr, None);
    }

    #[test]
    fn test_non_positive_beginning_nulls_cagr() {
        let model = model_from(MarketData {
            historical_fcf: vec![0.0, 10.0, 20.0, 30.0],
            ..Default::default()
        });
        let m = GrowthCalculator.calculate(&model, &Assumptions::default());
        assert_eq!(m.fcf_3_year_cagr, None);
        assert_eq!(m.fcf_growth_yoy, Some(0.5));
    }
}
