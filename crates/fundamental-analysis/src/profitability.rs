use analysis_core::numeric::safe_div;
use analysis_core::{Assumptions, CanonicalModel, MetricCalculator, ProfitabilityMetrics, RoundMetrics};

pub struct ProfitabilityCalculator;

impl ProfitabilityCalculator {
    fn margin(&self, line_item: Option<f64>, revenue: Option<f64>) -> Option<f64> {
        safe_div(line_item, revenue)
    }

    /// Tax expense over pre-tax income, falling back to the assumed statutory
    /// rate when pre-tax income is missing or non-positive. Clamped to [0, 1].
    pub fn effective_tax_rate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> f64 {
        match (model.income.income_tax_expense, model.income.income_before_tax) {
            (Some(tax), Some(pretax)) if pretax > 0.0 => (tax / pretax).clamp(0.0, 1.0),
            _ => assumptions.default_tax_rate,
        }
    }

    /// NOPAT = EBIT x (1 - effective tax rate).
    fn calculate_nopat(&self, ebit: Option<f64>, tax_rate: f64) -> Option<f64> {
        ebit.map(|e| e * (1.0 - tax_rate))
    }
}

impl MetricCalculator for ProfitabilityCalculator {
    type Output = ProfitabilityMetrics;

    fn name(&self) -> &'static str {
        "profitability"
    }

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> ProfitabilityMetrics {
        let income = &model.income;
        let revenue = income.revenue;
        let tax_rate = self.effective_tax_rate(model, assumptions);
        let nopat = self.calculate_nopat(income.ebit, tax_rate);
        let net_income = income.net_income;

        ProfitabilityMetrics {
            gross_profit_margin: self.margin(income.gross_profit, revenue),
            operating_margin: self.margin(income.operating_income.or(income.ebit), revenue),
            net_profit_margin: self.margin(net_income, revenue),
            ebitda_margin: self.margin(income.ebitda, revenue),
            pretax_margin: self.margin(income.income_before_tax, revenue),
            free_cash_flow_margin: self.margin(model.cash_flow.free_cash_flow, revenue),
            operating_cash_flow_margin: self.margin(model.cash_flow.operating_cash_flow, revenue),
            return_on_assets: safe_div(net_income, model.balance.total_assets),
            return_on_average_assets: safe_div(net_income, model.derived.average_total_assets),
            return_on_equity: safe_div(net_income, model.balance.total_equity),
            return_on_invested_capital: safe_div(nopat, model.derived.invested_capital),
            effective_tax_rate: Some(tax_rate),
            nopat,
            asset_turnover: safe_div(revenue, model.derived.average_total_assets),
            rd_to_revenue: self.margin(income.research_and_development, revenue),
            sga_to_revenue: self.margin(income.selling_general_administrative, revenue),
            cash_flow_to_net_income: safe_div(model.cash_flow.operating_cash_flow, net_income),
        }
        .rounded(assumptions.output_decimals)
    }
}
