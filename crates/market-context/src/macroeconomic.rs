use analysis_core::numeric::finite;
use analysis_core::{Assumptions, CanonicalModel, MacroMetrics, MetricCalculator, RoundMetrics};

pub struct MacroCalculator;

/// `nominal - inflation`, when both are known.
fn real_rate(nominal: Option<f64>, inflation: Option<f64>) -> Option<f64> {
    finite(nominal? - inflation?)
}

impl MetricCalculator for MacroCalculator {
    type Output = MacroMetrics;

    fn name(&self) -> &'static str {
        "macro"
    }

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> MacroMetrics {
        let m = &model.macro_data;
        let clean = |v: Option<f64>| v.and_then(finite);

        let inflation = clean(m.inflation_rate);
        let policy_rate = clean(m.policy_rate);
        let ten_year_yield = clean(m.ten_year_yield);
        let unemployment_rate = clean(m.unemployment_rate);
        let wage_growth = clean(m.wage_growth);

        MacroMetrics {
            gdp_growth: clean(m.gdp_growth),
            inflation_rate: inflation,
            core_inflation: clean(m.core_inflation),
            policy_rate,
            ten_year_yield,
            unemployment_rate,
            wage_growth,
            productivity_growth: clean(m.productivity_growth),
            consumer_confidence: clean(m.consumer_confidence),
            business_confidence: clean(m.business_confidence),
            real_policy_rate: real_rate(policy_rate, inflation),
            real_ten_year_yield: real_rate(ten_year_yield, inflation),
            term_spread: real_rate(ten_year_yield, policy_rate),
            real_wage_growth: real_rate(wage_growth, inflation),
            misery_index: match (inflation, unemployment_rate) {
                (Some(i), Some(u)) => finite(i + u),
                _ => None,
            },
        }
        .rounded(assumptions.output_decimals)
    }
}
