//! Discounted cash flow valuation.
//!
//! Free cash flow is projected over `Assumptions::projection_years` at a
//! clamped growth rate, discounted at WACC, and capped with a Gordon growth
//! terminal value. Every step that cannot be computed leaves its field (and
//! everything downstream of it) as `None`.

use analysis_core::numeric::{finite, last_change, safe_div, series_cagr};
use analysis_core::{Assumptions, CanonicalModel, DcfMetrics, MetricCalculator, RoundMetrics};

use crate::profitability::ProfitabilityCalculator;

pub struct DcfCalculator;

/// Capital structure inputs resolved into a discount rate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct DiscountRate {
    cost_of_equity: Option<f64>,
    cost_of_debt: Option<f64>,
    after_tax_cost_of_debt: Option<f64>,
    equity_weight: Option<f64>,
    debt_weight: Option<f64>,
    wacc: Option<f64>,
}

impl DcfCalculator {
    /// CAPM: rf + beta x ERP.
    fn calculate_cost_of_equity(&self, model: &CanonicalModel, assumptions: &Assumptions) -> Option<f64> {
        let rf = model.risk_free_rate()?;
        let beta = model.quote.beta?;
        finite(rf + beta * assumptions.equity_risk_premium)
    }

    fn discount_rate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> DiscountRate {
        let cost_of_equity = self.calculate_cost_of_equity(model, assumptions);
        let debt = model.balance.total_debt.filter(|d| *d > 0.0);

        let Some(debt) = debt else {
            // No debt on the books: all-equity financing.
            return DiscountRate {
                cost_of_equity,
                equity_weight: Some(1.0),
                debt_weight: Some(0.0),
                wacc: cost_of_equity,
                ..Default::default()
            };
        };

        let tax_rate = ProfitabilityCalculator.effective_tax_rate(model, assumptions);
        let cost_of_debt = safe_div(model.income.interest_expense, Some(debt)).or_else(|| {
            tracing::debug!("{}: interest expense missing, cost of debt falls back to risk-free rate", model.symbol);
            model.risk_free_rate()
        });
        let after_tax_cost_of_debt = cost_of_debt.map(|k| k * (1.0 - tax_rate));

        let equity = model.quote.market_cap.filter(|e| *e > 0.0);
        let (equity_weight, debt_weight) = match equity {
            Some(e) => (Some(e / (e + debt)), Some(debt / (e + debt))),
            None => (None, None),
        };

        let wacc = match (cost_of_equity, after_tax_cost_of_debt, equity_weight, debt_weight) {
            (Some(ke), Some(kd), Some(we), Some(wd)) => finite(we * ke + wd * kd),
            _ => None,
        };

        DiscountRate {
            cost_of_equity,
            cost_of_debt,
            after_tax_cost_of_debt,
            equity_weight,
            debt_weight,
            wacc,
        }
    }

    /// Explicit override, else FCF 3-year CAGR, else revenue YoY, else the
    /// fallback rate; always clamped into the configured band.
    pub fn growth_rate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> f64 {
        let raw = assumptions
            .growth_rate_override
            .or_else(|| series_cagr(&model.history.free_cash_flow, 3))
            .or_else(|| last_change(&model.history.revenue))
            .unwrap_or(assumptions.fallback_growth_rate);
        raw.clamp(assumptions.min_growth_rate, assumptions.max_growth_rate)
    }

    fn project(&self, base: f64, growth: f64, years: u32) -> Vec<f64> {
        (1..=years as i32).map(|i| base * (1.0 + growth).powi(i)).collect()
    }

    fn present_value(&self, flows: &[f64], rate: f64) -> Option<f64> {
        let pv: f64 = flows
            .iter()
            .enumerate()
            .map(|(i, cf)| cf / (1.0 + rate).powi(i as i32 + 1))
            .sum();
        finite(pv)
    }
}

impl MetricCalculator for DcfCalculator {
    type Output = DcfMetrics;

    fn name(&self) -> &'static str {
        "dcf"
    }

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> DcfMetrics {
        let rate = self.discount_rate(model, assumptions);
        let growth = self.growth_rate(model, assumptions);
        let terminal_growth = assumptions.terminal_growth_rate;
        let years = assumptions.projection_years;
        let base = model.cash_flow.free_cash_flow;

        let mut metrics = DcfMetrics {
            risk_free_rate: model.risk_free_rate(),
            cost_of_equity: rate.cost_of_equity,
            cost_of_debt: rate.cost_of_debt,
            after_tax_cost_of_debt: rate.after_tax_cost_of_debt,
            equity_weight: rate.equity_weight,
            debt_weight: rate.debt_weight,
            wacc: rate.wacc,
            growth_rate: Some(growth),
            terminal_growth_rate: Some(terminal_growth),
            base_free_cash_flow: base,
            ..Default::default()
        };

        let Some(base) = base.filter(|b| *b > 0.0) else {
            return metrics.rounded(assumptions.output_decimals);
        };
        let projected = self.project(base, growth, years);

        let Some(wacc) = rate.wacc.filter(|w| *w > -1.0) else {
            metrics.projected_free_cash_flows = projected;
            return metrics.rounded(assumptions.output_decimals);
        };

        let pv_flows = self.present_value(&projected, wacc);
        metrics.present_value_of_cash_flows = pv_flows;

        if terminal_growth >= wacc {
            tracing::debug!(
                "{}: terminal growth {} >= WACC {}, terminal value undefined",
                model.symbol,
                terminal_growth,
                wacc
            );
            metrics.projected_free_cash_flows = projected;
            return metrics.rounded(assumptions.output_decimals);
        }

        let last = projected.last().copied().unwrap_or(base);
        let terminal_value = finite(last * (1.0 + terminal_growth) / (wacc - terminal_growth));
        let pv_terminal = terminal_value.and_then(|tv| finite(tv / (1.0 + wacc).powi(years as i32)));
        let enterprise_value = match (pv_flows, pv_terminal) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        };

        let debt = model.balance.total_debt.unwrap_or(0.0);
        let cash = model.balance.cash.unwrap_or(0.0);
        let equity_value = enterprise_value.map(|ev| ev - (debt - cash));
        let intrinsic_value = safe_div(equity_value, model.quote.shares_outstanding.filter(|s| *s > 0.0));
        let price = model.quote.price;

        metrics.projected_free_cash_flows = projected;
        metrics.terminal_value = terminal_value;
        metrics.present_value_of_terminal = pv_terminal;
        metrics.enterprise_value = enterprise_value;
        metrics.equity_value = equity_value;
        metrics.intrinsic_value = intrinsic_value;
        metrics.upside = match (intrinsic_value, price) {
            (Some(iv), Some(p)) => safe_div(Some(iv - p), Some(p)),
            _ => None,
        };
        metrics.margin_of_safety = match (intrinsic_value, price) {
            (Some(iv), Some(p)) => safe_div(Some(iv - p), Some(iv)),
            _ => None,
        };

        metrics.rounded(assumptions.output_decimals)
    }
}
