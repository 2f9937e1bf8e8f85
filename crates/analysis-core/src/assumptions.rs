use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// Business assumptions fed into the DCF model and the composite scores.
///
/// Every field has a documented default so a plain `Assumptions::default()`
/// reproduces the reference numbers; callers override individual fields by
/// deserialising a partial JSON document (`#[serde(default)]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Assumptions {
    /// Equity risk premium used in CAPM.
    pub equity_risk_premium: f64,
    /// Tax rate used when the effective rate cannot be derived.
    pub default_tax_rate: f64,
    /// Years of explicit free-cash-flow projection.
    pub projection_years: u32,
    /// Perpetuity growth rate for the terminal value.
    pub terminal_growth_rate: f64,
    /// Explicit FCF growth rate; when `None` it is derived from history.
    pub growth_rate_override: Option<f64>,
    /// Growth rate used when history cannot provide one.
    pub fallback_growth_rate: f64,
    pub min_growth_rate: f64,
    pub max_growth_rate: f64,
    /// Sessions per year for annualising daily statistics.
    pub trading_days_per_year: u32,
    /// Decimal places applied to every metric at the calculator boundary.
    pub output_decimals: u32,
    pub scoring: ScoringConfig,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            equity_risk_premium: 0.055,
            default_tax_rate: 0.21,
            projection_years: 5,
            terminal_growth_rate: 0.025,
            growth_rate_override: None,
            fallback_growth_rate: 0.03,
            min_growth_rate: -0.05,
            max_growth_rate: 0.25,
            trading_days_per_year: 252,
            output_decimals: 6,
            scoring: ScoringConfig::default(),
        }
    }
}

impl Assumptions {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let finite = [
            ("equityRiskPremium", self.equity_risk_premium),
            ("defaultTaxRate", self.default_tax_rate),
            ("terminalGrowthRate", self.terminal_growth_rate),
            ("fallbackGrowthRate", self.fallback_growth_rate),
            ("minGrowthRate", self.min_growth_rate),
            ("maxGrowthRate", self.max_growth_rate),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(AnalysisError::InvalidAssumptions(format!("{name} must be finite")));
            }
        }
        if let Some(g) = self.growth_rate_override {
            if !g.is_finite() {
                return Err(AnalysisError::InvalidAssumptions(
                    "growthRateOverride must be finite".to_string(),
                ));
            }
        }
        if !(0.0..1.0).contains(&self.default_tax_rate) {
            return Err(AnalysisError::InvalidAssumptions(
                "defaultTaxRate must be in [0, 1)".to_string(),
            ));
        }
        if self.projection_years == 0 {
            return Err(AnalysisError::InvalidAssumptions(
                "projectionYears must be at least 1".to_string(),
            ));
        }
        if self.min_growth_rate > self.max_growth_rate {
            return Err(AnalysisError::InvalidAssumptions(
                "minGrowthRate exceeds maxGrowthRate".to_string(),
            ));
        }
        if self.trading_days_per_year == 0 {
            return Err(AnalysisError::InvalidAssumptions(
                "tradingDaysPerYear must be positive".to_string(),
            ));
        }
        self.scoring.validate()
    }
}

/// Linear mapping of one metric onto 0..=100: `worst` scores 0, `best` scores 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBand {
    pub worst: f64,
    pub best: f64,
    pub weight: f64,
    /// Non-positive readings score 0 (loss-making multiples).
    #[serde(default)]
    pub require_positive: bool,
}

impl ScoreBand {
    pub const fn new(worst: f64, best: f64, weight: f64) -> Self {
        Self { worst, best, weight, require_positive: false }
    }

    pub const fn positive(worst: f64, best: f64, weight: f64) -> Self {
        Self { worst, best, weight, require_positive: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfitabilityBands {
    pub return_on_equity: ScoreBand,
    pub net_profit_margin: ScoreBand,
    pub operating_margin: ScoreBand,
    pub return_on_invested_capital: ScoreBand,
}

impl Default for ProfitabilityBands {
    fn default() -> Self {
        Self {
            return_on_equity: ScoreBand::new(0.0, 0.20, 0.30),
            net_profit_margin: ScoreBand::new(0.0, 0.20, 0.25),
            operating_margin: ScoreBand::new(0.0, 0.25, 0.20),
            return_on_invested_capital: ScoreBand::new(0.0, 0.15, 0.25),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrowthBands {
    pub revenue_growth: ScoreBand,
    pub revenue_cagr_3y: ScoreBand,
    pub eps_growth: ScoreBand,
    pub fcf_growth: ScoreBand,
}

impl Default for GrowthBands {
    fn default() -> Self {
        Self {
            revenue_growth: ScoreBand::new(-0.05, 0.20, 0.30),
            revenue_cagr_3y: ScoreBand::new(-0.05, 0.20, 0.25),
            eps_growth: ScoreBand::new(-0.10, 0.25, 0.25),
            fcf_growth: ScoreBand::new(-0.10, 0.25, 0.20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValuationBands {
    pub pe_ratio: ScoreBand,
    pub price_to_book: ScoreBand,
    pub price_to_sales: ScoreBand,
    pub ev_to_ebitda: ScoreBand,
    pub free_cash_flow_yield: ScoreBand,
}

impl Default for ValuationBands {
    fn default() -> Self {
        Self {
            pe_ratio: ScoreBand::positive(40.0, 10.0, 0.30),
            price_to_book: ScoreBand::positive(8.0, 1.0, 0.15),
            price_to_sales: ScoreBand::positive(10.0, 1.0, 0.15),
            ev_to_ebitda: ScoreBand::positive(25.0, 6.0, 0.25),
            free_cash_flow_yield: ScoreBand::new(0.0, 0.08, 0.15),
        }
    }
}

/// Higher risk score means *lower* risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskBands {
    pub annualized_volatility: ScoreBand,
    pub max_drawdown: ScoreBand,
    pub beta: ScoreBand,
    pub sharpe_ratio: ScoreBand,
}

impl Default for RiskBands {
    fn default() -> Self {
        Self {
            annualized_volatility: ScoreBand::new(0.60, 0.15, 0.30),
            max_drawdown: ScoreBand::new(-0.50, -0.05, 0.25),
            beta: ScoreBand::new(2.0, 0.5, 0.20),
            sharpe_ratio: ScoreBand::new(-0.5, 1.5, 0.25),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthBands {
    pub current_ratio: ScoreBand,
    pub debt_to_equity: ScoreBand,
    pub interest_coverage: ScoreBand,
    pub altman_z_score: ScoreBand,
    pub piotroski_f_score: ScoreBand,
}

impl Default for HealthBands {
    fn default() -> Self {
        Self {
            current_ratio: ScoreBand::new(0.5, 2.0, 0.20),
            debt_to_equity: ScoreBand::new(3.0, 0.0, 0.20),
            interest_coverage: ScoreBand::new(1.0, 10.0, 0.20),
            altman_z_score: ScoreBand::new(1.81, 2.99, 0.25),
            piotroski_f_score: ScoreBand::new(0.0, 9.0, 0.15),
        }
    }
}

/// Weights of the five composites inside the total score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TotalWeights {
    pub profitability: f64,
    pub growth: f64,
    pub valuation: f64,
    pub risk: f64,
    pub health: f64,
}

impl Default for TotalWeights {
    fn default() -> Self {
        Self { profitability: 0.25, growth: 0.20, valuation: 0.20, risk: 0.15, health: 0.20 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    pub profitability: ProfitabilityBands,
    pub growth: GrowthBands,
    pub valuation: ValuationBands,
    pub risk: RiskBands,
    pub health: HealthBands,
    pub total_weights: TotalWeights,
}

impl ScoringConfig {
    fn bands(&self) -> Vec<(&'static str, ScoreBand)> {
        vec![
            ("profitability.returnOnEquity", self.profitability.return_on_equity),
            ("profitability.netProfitMargin", self.profitability.net_profit_margin),
            ("profitability.operatingMargin", self.profitability.operating_margin),
            ("profitability.returnOnInvestedCapital", self.profitability.return_on_invested_capital),
            ("growth.revenueGrowth", self.growth.revenue_growth),
            ("growth.revenueCagr3y", self.growth.revenue_cagr_3y),
            ("growth.epsGrowth", self.growth.eps_growth),
            ("growth.fcfGrowth", self.growth.fcf_growth),
            ("valuation.peRatio", self.valuation.pe_ratio),
            ("valuation.priceToBook", self.valuation.price_to_book),
            ("valuation.priceToSales", self.valuation.price_to_sales),
            ("valuation.evToEbitda", self.valuation.ev_to_ebitda),
            ("valuation.freeCashFlowYield", self.valuation.free_cash_flow_yield),
            ("risk.annualizedVolatility", self.risk.annualized_volatility),
            ("risk.maxDrawdown", self.risk.max_drawdown),
            ("risk.beta", self.risk.beta),
            ("risk.sharpeRatio", self.risk.sharpe_ratio),
            ("health.currentRatio", self.health.current_ratio),
            ("health.debtToEquity", self.health.debt_to_equity),
            ("health.interestCoverage", self.health.interest_coverage),
            ("health.altmanZScore", self.health.altman_z_score),
            ("health.piotroskiFScore", self.health.piotroski_f_score),
        ]
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        for (name, band) in self.bands() {
            if !band.worst.is_finite() || !band.best.is_finite() || band.worst == band.best {
                return Err(AnalysisError::InvalidAssumptions(format!(
                    "score band {name} needs distinct finite worst/best"
                )));
            }
            if !band.weight.is_finite() || band.weight < 0.0 {
                return Err(AnalysisError::InvalidAssumptions(format!(
                    "score band {name} has a negative weight"
                )));
            }
        }
        let w = &self.total_weights;
        for weight in [w.profitability, w.growth, w.valuation, w.risk, w.health] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(AnalysisError::InvalidAssumptions(
                    "total score weights must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Assumptions::default().validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let a = Assumptions::default();
        assert_eq!(a.equity_risk_premium, 0.055);
        assert_eq!(a.default_tax_rate, 0.21);
        assert_eq!(a.projection_years, 5);
        assert_eq!(a.terminal_growth_rate, 0.025);
        assert_eq!((a.min_growth_rate, a.max_growth_rate), (-0.05, 0.25));
        assert_eq!(a.trading_days_per_year, 252);
        assert_eq!(a.output_decimals, 6);

        let w = &a.scoring.total_weights;
        let sum = w.profitability + w.growth + w.valuation + w.risk + w.health;
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(a.scoring.profitability.return_on_equity, ScoreBand::new(0.0, 0.20, 0.30));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let a: Assumptions =
            serde_json::from_str(r#"{ "terminalGrowthRate": 0.02, "projectionYears": 10 }"#).unwrap();
        assert_eq!(a.terminal_growth_rate, 0.02);
        assert_eq!(a.projection_years, 10);
        assert_eq!(a.equity_risk_premium, 0.055);
        assert_eq!(a.scoring, ScoringConfig::default());
    }

    #[test]
    fn test_rejects_zero_projection_years() {
        let a = Assumptions { projection_years: 0, ..Assumptions::default() };
        assert!(matches!(a.validate(), Err(AnalysisError::InvalidAssumptions(_))));
    }

    #[test]
    fn test_rejects_degenerate_band() {
        let mut a = Assumptions::default();
        a.scoring.risk.beta = ScoreBand::new(1.0, 1.0, 0.2);
        assert!(a.validate().is_err());
    }
}
