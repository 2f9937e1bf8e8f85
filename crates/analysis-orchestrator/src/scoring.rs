//! Composite scoring: Altman Z, Piotroski F and the five 0..=100 composites.
//!
//! Each composite blends metric bands from `Assumptions::scoring`. Missing
//! constituents drop out and the remaining weights are renormalised; a
//! composite with nothing to blend is `None`, and so is the total when all
//! five composites are missing.

use analysis_core::numeric::{linear_score, safe_div, weighted_average};
use analysis_core::{
    AltmanZone, Assumptions, CanonicalModel, GrowthMetrics, LeverageMetrics, LiquidityMetrics,
    PeriodFinancials, ProfitabilityMetrics, RiskMetrics, RoundMetrics, ScoreBand, ScoreMetrics,
    ValuationMetrics,
};

/// Metric groups the composites are built from.
pub struct ScoreInputs<'a> {
    pub liquidity: &'a LiquidityMetrics,
    pub leverage: &'a LeverageMetrics,
    pub profitability: &'a ProfitabilityMetrics,
    pub growth: &'a GrowthMetrics,
    pub valuation: &'a ValuationMetrics,
    pub risk: &'a RiskMetrics,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scorecard {
    pub scores: ScoreMetrics,
    pub piotroski_f_score: Option<u8>,
    pub altman_zone: Option<AltmanZone>,
}

pub struct ScoringEngine;

impl ScoringEngine {
    /// Altman Z = 1.2 WC/TA + 1.4 RE/TA + 3.3 EBIT/TA + 0.6 MVE/TL + 1.0 Sales/TA.
    pub fn altman_z_score(&self, model: &CanonicalModel) -> Option<f64> {
        let ta = model.balance.total_assets.filter(|v| *v != 0.0)?;
        let tl = model.balance.total_liabilities.filter(|v| *v != 0.0)?;

        let working_capital = safe_div(model.derived.working_capital, Some(ta))?;
        let retained = safe_div(model.balance.retained_earnings, Some(ta))?;
        let ebit = safe_div(model.income.ebit, Some(ta))?;
        let market_value = safe_div(model.quote.market_cap, Some(tl))?;
        let sales = safe_div(model.income.revenue, Some(ta))?;

        Some(1.2 * working_capital + 1.4 * retained + 3.3 * ebit + 0.6 * market_value + sales)
    }

    /// Nine binary tests over the two latest annual snapshots. A test whose
    /// inputs are missing scores 0; with no evaluable test the score is `None`.
    pub fn piotroski_f_score(&self, model: &CanonicalModel) -> Option<u8> {
        let (prior, current) = model.last_two_periods()?;

        let roa = |p: &PeriodFinancials| safe_div(p.net_income, p.total_assets);
        let leverage = |p: &PeriodFinancials| safe_div(p.long_term_debt, p.total_assets);
        let current_ratio = |p: &PeriodFinancials| safe_div(p.current_assets, p.current_liabilities);
        let gross_margin = |p: &PeriodFinancials| safe_div(p.gross_profit, p.revenue);
        let turnover = |p: &PeriodFinancials| safe_div(p.revenue, p.total_assets);

        let gt = |a: Option<f64>, b: Option<f64>| Some(a? > b?);
        let le = |a: Option<f64>, b: Option<f64>| Some(a? <= b?);

        let tests = [
            gt(roa(current), Some(0.0)),
            gt(current.operating_cash_flow, Some(0.0)),
            gt(roa(current), roa(prior)),
            gt(current.operating_cash_flow, current.net_income),
            le(leverage(current), leverage(prior)),
            gt(current_ratio(current), current_ratio(prior)),
            le(current.shares_outstanding, prior.shares_outstanding),
            gt(gross_margin(current), gross_margin(prior)),
            gt(turnover(current), turnover(prior)),
        ];

        if tests.iter().all(Option::is_none) {
            tracing::debug!("{}: no evaluable Piotroski test", model.symbol);
            return None;
        }
        Some(tests.iter().filter(|t| **t == Some(true)).count() as u8)
    }

    /// Band score of one metric; loss-making multiples score 0 where the band asks for it.
    fn band_score(&self, value: Option<f64>, band: &ScoreBand) -> (Option<f64>, f64) {
        let score = value.and_then(|v| {
            if band.require_positive && v <= 0.0 {
                Some(0.0)
            } else {
                linear_score(v, band.worst, band.best)
            }
        });
        (score, band.weight)
    }

    fn blend(&self, parts: &[(Option<f64>, &ScoreBand)]) -> Option<f64> {
        let scored: Vec<(Option<f64>, f64)> = parts.iter().map(|(v, band)| self.band_score(*v, band)).collect();
        weighted_average(&scored)
    }

    pub fn score(&self, model: &CanonicalModel, inputs: &ScoreInputs<'_>, assumptions: &Assumptions) -> Scorecard {
        let cfg = &assumptions.scoring;
        let altman_z_score = self.altman_z_score(model);
        let piotroski_f_score = self.piotroski_f_score(model);

        let p = &cfg.profitability;
        let profitability_score = self.blend(&[
            (inputs.profitability.return_on_equity, &p.return_on_equity),
            (inputs.profitability.net_profit_margin, &p.net_profit_margin),
            (inputs.profitability.operating_margin, &p.operating_margin),
            (inputs.profitability.return_on_invested_capital, &p.return_on_invested_capital),
        ]);

        let g = &cfg.growth;
        let growth_score = self.blend(&[
            (inputs.growth.revenue_growth_yoy, &g.revenue_growth),
            (inputs.growth.revenue_3_year_cagr, &g.revenue_cagr_3y),
            (inputs.growth.eps_growth_yoy, &g.eps_growth),
            (inputs.growth.fcf_growth_yoy, &g.fcf_growth),
        ]);

        let v = &cfg.valuation;
        let valuation_score = self.blend(&[
            (inputs.valuation.pe_ratio, &v.pe_ratio),
            (inputs.valuation.price_to_book, &v.price_to_book),
            (inputs.valuation.price_to_sales, &v.price_to_sales),
            (inputs.valuation.ev_to_ebitda, &v.ev_to_ebitda),
            (inputs.valuation.free_cash_flow_yield, &v.free_cash_flow_yield),
        ]);

        let r = &cfg.risk;
        let risk_score = self.blend(&[
            (inputs.risk.annualized_volatility, &r.annualized_volatility),
            (inputs.risk.max_drawdown, &r.max_drawdown),
            (inputs.risk.beta, &r.beta),
            (inputs.risk.sharpe_ratio, &r.sharpe_ratio),
        ]);

        let h = &cfg.health;
        let health_score = self.blend(&[
            (inputs.liquidity.current_ratio, &h.current_ratio),
            (inputs.leverage.debt_to_equity, &h.debt_to_equity),
            (inputs.leverage.interest_coverage, &h.interest_coverage),
            (altman_z_score, &h.altman_z_score),
            (piotroski_f_score.map(f64::from), &h.piotroski_f_score),
        ]);

        let w = &cfg.total_weights;
        let total_score = weighted_average(&[
            (profitability_score, w.profitability),
            (growth_score, w.growth),
            (valuation_score, w.valuation),
            (risk_score, w.risk),
            (health_score, w.health),
        ]);

        let scores = ScoreMetrics {
            profitability_score,
            growth_score,
            valuation_score,
            risk_score,
            health_score,
            total_score,
            altman_z_score,
            rating: total_score.map(|s| rating(s).to_string()),
        }
        .rounded(assumptions.output_decimals);

        Scorecard {
            scores,
            piotroski_f_score,
            altman_zone: altman_z_score.map(AltmanZone::from_score),
        }
    }
}

/// Letter grade for a 0..=100 total score.
pub fn rating(total: f64) -> &'static str {
    match total {
        t if t >= 80.0 => "A",
        t if t >= 65.0 => "B",
        t if t >= 50.0 => "C",
        t if t >= 35.0 => "D",
        _ => "F",
    }
}
