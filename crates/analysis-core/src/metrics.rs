//! Output records. Every numeric metric is `Option<f64>`; `None` (serialised
//! as `null`) means "could not be computed from the given input".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::numeric::round_opt;

/// Rounding applied once, when a calculator hands its group back.
pub trait RoundMetrics {
    fn rounded(self, decimals: u32) -> Self;
}

macro_rules! impl_rounding {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl RoundMetrics for $ty {
            fn rounded(mut self, decimals: u32) -> Self {
                $( self.$field = round_opt(self.$field, decimals); )*
                self
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroMetrics {
    pub gdp_growth: Option<f64>,
    pub inflation_rate: Option<f64>,
    pub core_inflation: Option<f64>,
    pub policy_rate: Option<f64>,
    pub ten_year_yield: Option<f64>,
    pub unemployment_rate: Option<f64>,
    pub wage_growth: Option<f64>,
    pub productivity_growth: Option<f64>,
    pub consumer_confidence: Option<f64>,
    pub business_confidence: Option<f64>,
    pub real_policy_rate: Option<f64>,
    pub real_ten_year_yield: Option<f64>,
    /// Ten-year yield minus policy rate.
    pub term_spread: Option<f64>,
    pub real_wage_growth: Option<f64>,
    /// Inflation plus unemployment.
    pub misery_index: Option<f64>,
}

impl_rounding!(MacroMetrics {
    gdp_growth, inflation_rate, core_inflation, policy_rate, ten_year_yield,
    unemployment_rate, wage_growth, productivity_growth, consumer_confidence,
    business_confidence, real_policy_rate, real_ten_year_yield, term_spread,
    real_wage_growth, misery_index,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryMetrics {
    pub industry_revenue: Option<f64>,
    pub total_addressable_market: Option<f64>,
    pub market_share: Option<f64>,
    pub tam_penetration: Option<f64>,
    pub industry_growth_rate: Option<f64>,
    pub revenue_growth_vs_industry: Option<f64>,
    /// Peers reporting a positive revenue, the set HHI and CR4 are measured over.
    pub peer_count: Option<u32>,
    /// Herfindahl-Hirschman index over peer revenue shares (0..=10000).
    pub hhi_index: Option<f64>,
    /// Four largest peer shares, in percent.
    pub cr4: Option<f64>,
    /// Company revenue share among peers plus the company itself.
    pub peer_group_share: Option<f64>,
    /// 1-based rank by revenue among peers plus the company.
    pub revenue_rank: Option<u32>,
    pub relative_size_to_peer_median: Option<f64>,
}

impl_rounding!(IndustryMetrics {
    industry_revenue, total_addressable_market, market_share, tam_penetration,
    industry_growth_rate, revenue_growth_vs_industry, hhi_index, cr4,
    peer_group_share, relative_size_to_peer_median,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityMetrics {
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub cash_ratio: Option<f64>,
    pub operating_cash_flow_ratio: Option<f64>,
    pub working_capital: Option<f64>,
    pub days_inventory_outstanding: Option<f64>,
    pub days_sales_outstanding: Option<f64>,
    pub days_payables_outstanding: Option<f64>,
    pub cash_conversion_cycle: Option<f64>,
    pub defensive_interval_days: Option<f64>,
}

impl_rounding!(LiquidityMetrics {
    current_ratio, quick_ratio, cash_ratio, operating_cash_flow_ratio, working_capital,
    days_inventory_outstanding, days_sales_outstanding, days_payables_outstanding,
    cash_conversion_cycle, defensive_interval_days,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverageMetrics {
    pub debt_to_assets: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub debt_to_capital: Option<f64>,
    pub long_term_debt_to_capital: Option<f64>,
    pub interest_coverage: Option<f64>,
    pub debt_to_ebitda: Option<f64>,
    pub net_debt: Option<f64>,
    pub net_debt_to_ebitda: Option<f64>,
    pub equity_multiplier: Option<f64>,
    pub liabilities_to_assets: Option<f64>,
    pub cash_flow_to_debt: Option<f64>,
}

impl_rounding!(LeverageMetrics {
    debt_to_assets, debt_to_equity, debt_to_capital, long_term_debt_to_capital,
    interest_coverage, debt_to_ebitda, net_debt, net_debt_to_ebitda, equity_multiplier,
    liabilities_to_assets, cash_flow_to_debt,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitabilityMetrics {
    pub gross_profit_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_profit_margin: Option<f64>,
    pub ebitda_margin: Option<f64>,
    pub pretax_margin: Option<f64>,
    pub free_cash_flow_margin: Option<f64>,
    pub operating_cash_flow_margin: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub return_on_average_assets: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_invested_capital: Option<f64>,
    pub effective_tax_rate: Option<f64>,
    pub nopat: Option<f64>,
    pub asset_turnover: Option<f64>,
    pub rd_to_revenue: Option<f64>,
    pub sga_to_revenue: Option<f64>,
    /// Operating cash flow over net income.
    pub cash_flow_to_net_income: Option<f64>,
}

impl_rounding!(ProfitabilityMetrics {
    gross_profit_margin, operating_margin, net_profit_margin, ebitda_margin, pretax_margin,
    free_cash_flow_margin, operating_cash_flow_margin, return_on_assets,
    return_on_average_assets, return_on_equity, return_on_invested_capital,
    effective_tax_rate, nopat, asset_turnover, rd_to_revenue, sga_to_revenue,
    cash_flow_to_net_income,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthMetrics {
    pub revenue_growth_yoy: Option<f64>,
    pub net_income_growth_yoy: Option<f64>,
    pub eps_growth_yoy: Option<f64>,
    pub dividend_growth_yoy: Option<f64>,
    pub fcf_growth_yoy: Option<f64>,
    #[serde(rename = "revenue3YearCAGR")]
    pub revenue_3_year_cagr: Option<f64>,
    #[serde(rename = "revenue5YearCAGR")]
    pub revenue_5_year_cagr: Option<f64>,
    #[serde(rename = "netIncome3YearCAGR")]
    pub net_income_3_year_cagr: Option<f64>,
    #[serde(rename = "netIncome5YearCAGR")]
    pub net_income_5_year_cagr: Option<f64>,
    #[serde(rename = "eps3YearCAGR")]
    pub eps_3_year_cagr: Option<f64>,
    #[serde(rename = "eps5YearCAGR")]
    pub eps_5_year_cagr: Option<f64>,
    #[serde(rename = "fcf3YearCAGR")]
    pub fcf_3_year_cagr: Option<f64>,
    #[serde(rename = "fcf5YearCAGR")]
    pub fcf_5_year_cagr: Option<f64>,
    #[serde(rename = "dividend5YearCAGR")]
    pub dividend_5_year_cagr: Option<f64>,
}

impl_rounding!(GrowthMetrics {
    revenue_growth_yoy, net_income_growth_yoy, eps_growth_yoy, dividend_growth_yoy,
    fcf_growth_yoy, revenue_3_year_cagr, revenue_5_year_cagr, net_income_3_year_cagr,
    net_income_5_year_cagr, eps_3_year_cagr, eps_5_year_cagr, fcf_3_year_cagr,
    fcf_5_year_cagr, dividend_5_year_cagr,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationMetrics {
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub price_to_free_cash_flow: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub ev_to_revenue: Option<f64>,
    pub ev_to_ebit: Option<f64>,
    pub earnings_yield: Option<f64>,
    pub free_cash_flow_yield: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub graham_number: Option<f64>,
    pub price_to_graham: Option<f64>,
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
}

impl_rounding!(ValuationMetrics {
    pe_ratio, forward_pe, peg_ratio, price_to_book, price_to_sales, price_to_free_cash_flow,
    ev_to_ebitda, ev_to_revenue, ev_to_ebit, earnings_yield, free_cash_flow_yield,
    dividend_yield, payout_ratio, graham_number, price_to_graham, market_cap,
    enterprise_value,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcfMetrics {
    pub risk_free_rate: Option<f64>,
    pub cost_of_equity: Option<f64>,
    pub cost_of_debt: Option<f64>,
    pub after_tax_cost_of_debt: Option<f64>,
    pub equity_weight: Option<f64>,
    pub debt_weight: Option<f64>,
    pub wacc: Option<f64>,
    pub growth_rate: Option<f64>,
    pub terminal_growth_rate: Option<f64>,
    pub base_free_cash_flow: Option<f64>,
    /// Undiscounted projections, year 1 first. Empty when no projection was possible.
    pub projected_free_cash_flows: Vec<f64>,
    pub present_value_of_cash_flows: Option<f64>,
    pub terminal_value: Option<f64>,
    pub present_value_of_terminal: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub equity_value: Option<f64>,
    /// Per-share intrinsic value.
    pub intrinsic_value: Option<f64>,
    pub upside: Option<f64>,
    pub margin_of_safety: Option<f64>,
}

impl RoundMetrics for DcfMetrics {
    fn rounded(mut self, decimals: u32) -> Self {
        for v in self.projected_free_cash_flows.iter_mut() {
            *v = crate::numeric::round_to(*v, decimals);
        }
        for field in [
            &mut self.risk_free_rate,
            &mut self.cost_of_equity,
            &mut self.cost_of_debt,
            &mut self.after_tax_cost_of_debt,
            &mut self.equity_weight,
            &mut self.debt_weight,
            &mut self.wacc,
            &mut self.growth_rate,
            &mut self.terminal_growth_rate,
            &mut self.base_free_cash_flow,
            &mut self.present_value_of_cash_flows,
            &mut self.terminal_value,
            &mut self.present_value_of_terminal,
            &mut self.enterprise_value,
            &mut self.equity_value,
            &mut self.intrinsic_value,
            &mut self.upside,
            &mut self.margin_of_safety,
        ] {
            *field = round_opt(*field, decimals);
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub beta: Option<f64>,
    pub annualized_volatility: Option<f64>,
    pub annualized_return: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub downside_deviation: Option<f64>,
    /// Worst peak-to-trough decline, as a fraction `<= 0`.
    pub max_drawdown: Option<f64>,
    pub calmar_ratio: Option<f64>,
    #[serde(rename = "valueAtRisk95")]
    pub value_at_risk_95: Option<f64>,
    #[serde(rename = "conditionalVaR95")]
    pub conditional_var_95: Option<f64>,
    pub skewness: Option<f64>,
    pub excess_kurtosis: Option<f64>,
    pub positive_days_ratio: Option<f64>,
}

impl_rounding!(RiskMetrics {
    beta, annualized_volatility, annualized_return, sharpe_ratio, sortino_ratio,
    downside_deviation, max_drawdown, calmar_ratio, value_at_risk_95, conditional_var_95,
    skewness, excess_kurtosis, positive_days_ratio,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalMetrics {
    #[serde(rename = "twentyDayMA")]
    pub twenty_day_ma: Option<f64>,
    #[serde(rename = "fiftyDayMA")]
    pub fifty_day_ma: Option<f64>,
    #[serde(rename = "twoHundredDayMA")]
    pub two_hundred_day_ma: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub rsi_14: Option<f64>,
    pub stochastic_k: Option<f64>,
    pub williams_r: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub bollinger_percent_b: Option<f64>,
    pub average_true_range: Option<f64>,
    #[serde(rename = "priceToFiftyDayMA")]
    pub price_to_fifty_day_ma: Option<f64>,
    #[serde(rename = "priceToTwoHundredDayMA")]
    pub price_to_two_hundred_day_ma: Option<f64>,
    pub golden_cross: Option<bool>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    #[serde(rename = "distanceFrom52WeekHigh")]
    pub distance_from_52_week_high: Option<f64>,
    #[serde(rename = "averageVolume20d")]
    pub average_volume_20d: Option<f64>,
    pub relative_volume: Option<f64>,
    #[serde(rename = "momentum1m")]
    pub momentum_1m: Option<f64>,
    #[serde(rename = "momentum3m")]
    pub momentum_3m: Option<f64>,
    #[serde(rename = "momentum6m")]
    pub momentum_6m: Option<f64>,
    #[serde(rename = "momentum12m")]
    pub momentum_12m: Option<f64>,
}

impl_rounding!(TechnicalMetrics {
    twenty_day_ma, fifty_day_ma, two_hundred_day_ma, ema_12, ema_26, macd, macd_signal,
    macd_histogram, rsi_14, stochastic_k, williams_r, bollinger_upper, bollinger_lower,
    bollinger_percent_b, average_true_range, price_to_fifty_day_ma,
    price_to_two_hundred_day_ma, fifty_two_week_high, fifty_two_week_low,
    distance_from_52_week_high, average_volume_20d, relative_volume, momentum_1m,
    momentum_3m, momentum_6m, momentum_12m,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AltmanZone {
    Safe,
    Grey,
    Distress,
}

impl AltmanZone {
    pub fn from_score(z: f64) -> Self {
        if z > 2.99 {
            AltmanZone::Safe
        } else if z >= 1.81 {
            AltmanZone::Grey
        } else {
            AltmanZone::Distress
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreMetrics {
    pub profitability_score: Option<f64>,
    pub growth_score: Option<f64>,
    pub valuation_score: Option<f64>,
    pub risk_score: Option<f64>,
    pub health_score: Option<f64>,
    pub total_score: Option<f64>,
    pub altman_z_score: Option<f64>,
    /// Letter grade derived from the total score.
    pub rating: Option<String>,
}

impl_rounding!(ScoreMetrics {
    profitability_score, growth_score, valuation_score, risk_score, health_score,
    total_score, altman_z_score,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherMetrics {
    pub piotroski_f_score: Option<u8>,
    pub altman_zone: Option<AltmanZone>,
    pub price: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub earnings_per_share: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub revenue_per_share: Option<f64>,
    pub free_cash_flow_per_share: Option<f64>,
    pub cash_per_share: Option<f64>,
    pub dividend_per_share: Option<f64>,
}

impl_rounding!(OtherMetrics {
    price, shares_outstanding, earnings_per_share, book_value_per_share, revenue_per_share,
    free_cash_flow_per_share, cash_per_share, dividend_per_share,
});

/// Everything the engine derives for one company, plus identifying metadata.
///
/// The identity field for the industry name is `industryName` on the wire so
/// it does not collide with the `industry` metric group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedMetrics {
    pub symbol: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "macro")]
    pub macro_indicators: MacroMetrics,
    pub industry: IndustryMetrics,
    pub liquidity: LiquidityMetrics,
    pub leverage: LeverageMetrics,
    pub profitability: ProfitabilityMetrics,
    pub growth: GrowthMetrics,
    pub valuation: ValuationMetrics,
    pub dcf: DcfMetrics,
    pub risk: RiskMetrics,
    pub technical: TechnicalMetrics,
    pub scores: ScoreMetrics,
    pub other: OtherMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_touches_every_listed_field() {
        let m = LiquidityMetrics {
            current_ratio: Some(1.0800001),
            cash_conversion_cycle: Some(-12.3456789),
            ..Default::default()
        }
        .rounded(4);
        assert_eq!(m.current_ratio, Some(1.08));
        assert_eq!(m.cash_conversion_cycle, Some(-12.3457));
        assert_eq!(m.quick_ratio, None);
    }

    #[test]
    fn test_dcf_rounding_includes_projections() {
        let m = DcfMetrics {
            wacc: Some(0.0912345),
            projected_free_cash_flows: vec![1.23456, 2.34567],
            ..Default::default()
        }
        .rounded(2);
        assert_eq!(m.wacc, Some(0.09));
        assert_eq!(m.projected_free_cash_flows, vec![1.23, 2.35]);
    }

    #[test]
    fn test_growth_cagr_wire_names() {
        let value = serde_json::to_value(GrowthMetrics {
            revenue_5_year_cagr: Some(0.0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["revenue5YearCAGR"], serde_json::json!(0.0));
        assert!(value["revenueGrowthYoy"].is_null());
    }

    #[test]
    fn test_altman_zone_thresholds() {
        assert_eq!(AltmanZone::from_score(3.5), AltmanZone::Safe);
        assert_eq!(AltmanZone::from_score(2.5), AltmanZone::Grey);
        assert_eq!(AltmanZone::from_score(1.2), AltmanZone::Distress);
    }
}
