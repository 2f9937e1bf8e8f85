use analysis_core::numeric::{safe_div, sum_present};
use analysis_core::{Assumptions, CanonicalModel, LiquidityMetrics, MetricCalculator, RoundMetrics};

const DAYS_PER_YEAR: f64 = 365.0;

pub struct LiquidityCalculator;

impl LiquidityCalculator {
    /// `balance / (flow / 365)`; `None` when the annual flow is zero or missing.
    fn days_outstanding(&self, balance: Option<f64>, annual_flow: Option<f64>) -> Option<f64> {
        let daily = safe_div(annual_flow, Some(DAYS_PER_YEAR))?;
        safe_div(balance, Some(daily))
    }

    fn cash_conversion_cycle(&self, dio: Option<f64>, dso: Option<f64>, dpo: Option<f64>) -> Option<f64> {
        Some(dio? + dso? - dpo?)
    }
}

impl MetricCalculator for LiquidityCalculator {
    type Output = LiquidityMetrics;

    fn name(&self) -> &'static str {
        "liquidity"
    }

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> LiquidityMetrics {
        let bs = &model.balance;
        let income = &model.income;

        let quick_assets = match (bs.current_assets, bs.inventory) {
            (Some(ca), inv) => Some(ca - inv.unwrap_or(0.0)),
            _ => None,
        };
        let cash_like = sum_present(bs.cash, bs.short_term_investments);

        let dio = self.days_outstanding(bs.inventory, income.cost_of_revenue);
        let dso = self.days_outstanding(bs.accounts_receivable, income.revenue);
        let dpo = self.days_outstanding(bs.accounts_payable, income.cost_of_revenue);

        // Cash operating expenses: everything above operating income except D&A.
        let cash_opex = match (income.revenue, income.operating_income) {
            (Some(rev), Some(op)) => Some(rev - op - income.depreciation_and_amortization.unwrap_or(0.0)),
            _ => None,
        };
        let defensive_assets = match (cash_like, bs.accounts_receivable) {
            (None, None) => None,
            (c, r) => Some(c.unwrap_or(0.0) + r.unwrap_or(0.0)),
        };

        LiquidityMetrics {
            current_ratio: safe_div(bs.current_assets, bs.current_liabilities),
            quick_ratio: safe_div(quick_assets, bs.current_liabilities),
            cash_ratio: safe_div(cash_like, bs.current_liabilities),
            operating_cash_flow_ratio: safe_div(model.cash_flow.operating_cash_flow, bs.current_liabilities),
            working_capital: model.derived.working_capital,
            days_inventory_outstanding: dio,
            days_sales_outstanding: dso,
            days_payables_outstanding: dpo,
            cash_conversion_cycle: self.cash_conversion_cycle(dio, dso, dpo),
            defensive_interval_days: self.days_outstanding(defensive_assets, cash_opex),
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
    fn test_ratios() {
        let model = model_from(MarketData {
            current_assets: Some(135.0),
            current_liabilities: Some(125.0),
            inventory: Some(5.0),
            cash: Some(20.0),
            short_term_investments: Some(10.0),
            ..Default::default()
        });
        let m = LiquidityCalculator.calculate(&model, &Assumptions::default());
        assert!((m.current_ratio.unwrap() - 1.08).abs() < 1e-9);
        assert!((m.quick_ratio.unwrap() - 1.04).abs() < 1e-9);
        assert!((m.cash_ratio.unwrap() - 0.24).abs() < 1e-9);
        assert_eq!(m.working_capital, Some(10.0));
    }

    #[test]
    fn test_zero_current_liabilities_is_null() {
        let model = model_from(MarketData {
            current_assets: Some(135.0),
            current_liabilities: Some(0.0),
            ..Default::default()
        });
        let m = LiquidityCalculator.calculate(&model, &Assumptions::default());
        assert_eq!(m.current_ratio, None);
        assert_eq!(m.quick_ratio, None);
        assert_eq!(m.cash_ratio, None);
    }

    #[test]
    fn test_cash_conversion_cycle() {
        let model = model_from(MarketData {
            revenue: Some(365.0),
            cost_of_revenue: Some(730.0),
            inventory: Some(20.0),
            accounts_receivable: Some(30.0),
            accounts_payable: Some(40.0),
            ..Default::default()
        });
        let m = LiquidityCalculator.calculate(&model, &Assumptions::default());
        assert_eq!(m.days_inventory_outstanding, Some(10.0));
        assert_eq!(m.days_sales_outstanding, Some(30.0));
        assert_eq!(m.days_payables_outstanding, Some(20.0));
        assert_eq!(m.cash_conversion_cycle, Some(20.0));
    }

    #[test]
    fn test_zero_flow_nulls_cycle() {
        let model = model_from(MarketData {
            revenue: Some(0.0),
            cost_of_revenue: Some(730.0),
            inventory: Some(20.0),
            accounts_receivable: Some(30.0),
            accounts_payable: Some(40.0),
            ..Default::default()
        });
        let m = LiquidityCalculator.calculate(&model, &Assumptions::default());
        assert_eq!(m.days_sales_outstanding, None);
        assert_eq!(m.cash_conversion_cycle, None);
        assert_eq!(m.days_inventory_outstanding, Some(10.0));
    }
}
