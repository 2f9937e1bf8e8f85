use analysis_core::numeric::{finite, last_change, safe_div};
use analysis_core::{Assumptions, CanonicalModel, MetricCalculator, RoundMetrics, ValuationMetrics};

pub struct ValuationCalculator;

impl ValuationCalculator {
    /// Reported EPS, else net income per share.
    pub fn earnings_per_share(&self, model: &CanonicalModel) -> Option<f64> {
        model
            .quote
            .eps
            .or_else(|| safe_div(model.income.net_income, model.quote.shares_outstanding))
    }

    /// P/E over EPS growth expressed in percent. Shrinking or flat earnings
    /// leave the ratio undefined.
    fn calculate_peg(&self, pe: Option<f64>, eps_growth: Option<f64>) -> Option<f64> {
        match eps_growth {
            Some(g) if g > 0.0 => safe_div(pe, Some(g * 100.0)),
            _ => None,
        }
    }

    /// Graham number: sqrt(22.5 x EPS x BVPS).
    fn calculate_graham_number(&self, eps: Option<f64>, bvps: Option<f64>) -> Option<f64> {
        match (eps, bvps) {
            (Some(e), Some(b)) if e > 0.0 && b > 0.0 => finite((22.5 * e * b).sqrt()),
            _ => None,
        }
    }
}

impl MetricCalculator for ValuationCalculator {
    type Output = ValuationMetrics;

    fn name(&self) -> &'static str {
        "valuation"
    }

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> ValuationMetrics {
        let q = &model.quote;
        let income = &model.income;
        let price = q.price;
        let market_cap = q.market_cap;
        let ev = model.derived.enterprise_value;
        let eps = self.earnings_per_share(model);

        let pe_ratio = q.pe_ratio.or_else(|| safe_div(price, eps));
        let forward_pe = q.forward_pe.or_else(|| safe_div(price, q.forward_eps));
        let eps_growth = last_change(&model.history.eps);
        let graham_number = self.calculate_graham_number(eps, q.book_value_per_share);

        let dividend_yield = safe_div(q.dividend_rate, price).or(q.dividend_yield);
        let payout_ratio = q.payout_ratio.or_else(|| safe_div(q.dividend_rate, eps));

        ValuationMetrics {
            pe_ratio,
            forward_pe,
            peg_ratio: self.calculate_peg(pe_ratio, eps_growth),
            price_to_book: safe_div(price, q.book_value_per_share),
            price_to_sales: safe_div(market_cap, income.revenue),
            price_to_free_cash_flow: safe_div(market_cap, model.cash_flow.free_cash_flow),
            ev_to_ebitda: safe_div(ev, income.ebitda),
            ev_to_revenue: safe_div(ev, income.revenue),
            ev_to_ebit: safe_div(ev, income.ebit),
            earnings_yield: safe_div(eps, price),
            free_cash_flow_yield: safe_div(model.cash_flow.free_cash_flow, market_cap),
            dividend_yield,
            payout_ratio,
            graham_number,
            price_to_graham: safe_div(price, graham_number),
            market_cap,
            enterprise_value: ev,
        }
        .rounded(assumptions.output_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::model_from;
    use analysis_core::MarketData;

    fn company() -> MarketData {
        MarketData {
            price: Some(150.0),
            shares_outstanding: Some(16.0),
            eps: Some(6.0),
            book_value_per_share: Some(4.0),
            revenue: Some(394.0),
            ebitda: Some(130.0),
            total_debt: Some(110.0),
            cash: Some(30.0),
            free_cash_flow: Some(100.0),
            dividend_rate: Some(0.96),
            historical_eps: vec![5.0, 6.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_pe_derived_when_not_reported() {
        let m = ValuationCalculator.calculate(&model_from(company()), &Assumptions::default());
        assert_eq!(m.pe_ratio, Some(25.0));
        assert_eq!(m.market_cap, Some(2400.0));
        assert_eq!(m.enterprise_value, Some(2480.0));
        assert!((m.ev_to_ebitda.unwrap() - 2480.0 / 130.0).abs() < 1e-5);
        assert!((m.dividend_yield.unwrap() - 0.0064).abs() < 1e-9);
        assert!((m.payout_ratio.unwrap() - 0.16).abs() < 1e-9);
    }

    #[test]
    fn test_reported_pe_passes_through() {
        let mut data = company();
        data.pe_ratio = Some(25.5);
        let m = ValuationCalculator.calculate(&model_from(data), &Assumptions::default());
        assert_eq!(m.pe_ratio, Some(25.5));
    }

    #[test]
    fn test_peg_requires_positive_growth() {
        let m = ValuationCalculator.calculate(&model_from(company()), &Assumptions::default());
        // 20% EPS growth
        assert!((m.peg_ratio.unwrap() - 1.25).abs() < 1e-9);

        let mut data = company();
        data.historical_eps = vec![6.0, 5.0];
        let m = ValuationCalculator.calculate(&model_from(data), &Assumptions::default());
        assert_eq!(m.peg_ratio, None);
    }

    #[test]
    fn test_graham_number() {
        let m = ValuationCalculator.calculate(&model_from(company()), &Assumptions::default());
        let graham = (22.5f64 * 6.0 * 4.0).sqrt();
        assert!((m.graham_number.unwrap() - graham).abs() < 1e-6);
        assert!((m.price_to_graham.unwrap() - 150.0 / graham).abs() < 1e-5);

        let mut data = company();
        data.eps = Some(-1.0);
        let m = ValuationCalculator.calculate(&model_from(data), &Assumptions::default());
        assert_eq!(m.graham_number, None);
        assert_eq!(m.price_to_graham, None);
    }

    #[test]
    fn test_zero_eps_nulls_pe() {
        let mut data = company();
        data.eps = Some(0.0);
        let m = ValuationCalculator.calculate(&model_from(data), &Assumptions::default());
        assert_eq!(m.pe_ratio, None);
        assert_eq!(m.peg_ratio, None);
        assert_eq!(m.earnings_yield, Some(0.0));
    }
}
