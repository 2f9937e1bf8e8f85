use analysis_core::numeric::{positive_div, safe_div};
use analysis_core::{Assumptions, CanonicalModel, LeverageMetrics, MetricCalculator, RoundMetrics};

pub struct LeverageCalculator;

impl LeverageCalculator {
    /// Debt/equity is undefined for zero or negative equity.
    fn calculate_debt_to_equity(&self, debt: Option<f64>, equity: Option<f64>) -> Option<f64> {
        positive_div(debt, equity)
    }

    /// EBIT / interest; a non-positive interest expense makes coverage meaningless.
    fn calculate_interest_coverage(&self, ebit: Option<f64>, interest: Option<f64>) -> Option<f64> {
        positive_div(ebit, interest)
    }

    fn capital_share(&self, part: Option<f64>, equity: Option<f64>) -> Option<f64> {
        let p = part?;
        safe_div(Some(p), Some(p + equity?))
    }
}

impl MetricCalculator for LeverageCalculator {
    type Output = LeverageMetrics;

    fn name(&self) -> &'static str {
        "leverage"
    }

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> LeverageMetrics {
        let bs = &model.balance;
        let ebitda = model.income.ebitda;
        let net_debt = model.derived.net_debt;

        LeverageMetrics {
            debt_to_assets: safe_div(bs.total_debt, bs.total_assets),
            debt_to_equity: self.calculate_debt_to_equity(bs.total_debt, bs.total_equity),
            debt_to_capital: self.capital_share(bs.total_debt, bs.total_equity),
            long_term_debt_to_capital: self.capital_share(bs.long_term_debt, bs.total_equity),
            interest_coverage: self.calculate_interest_coverage(model.income.ebit, model.income.interest_expense),
            debt_to_ebitda: positive_div(bs.total_debt, ebitda),
            net_debt,
            net_debt_to_ebitda: positive_div(net_debt, ebitda),
            equity_multiplier: positive_div(bs.total_assets, bs.total_equity),
            liabilities_to_assets: safe_div(bs.total_liabilities, bs.total_assets),
            cash_flow_to_debt: safe_div(model.cash_flow.operating_cash_flow, bs.total_debt),
        }
        .rounded(assumptions.output_decimals)
    }
}
