use std::time::Instant;

use analysis_core::numeric::safe_div;
use analysis_core::{
    AnalysisError, Assumptions, CalculatedMetrics, CanonicalModel, DcfMetrics, GrowthMetrics, IndustryMetrics,
    LeverageMetrics, LiquidityMetrics, MacroMetrics, MetricCalculator, OtherMetrics, ProfitabilityMetrics,
    RawFinancialData, RiskMetrics, RoundMetrics, TechnicalMetrics, ValuationMetrics,
};
use fundamental_analysis::{
    DcfCalculator, GrowthCalculator, LeverageCalculator, LiquidityCalculator, ProfitabilityCalculator,
    ValuationCalculator,
};
use market_context::{IndustryCalculator, MacroCalculator};
use quant_analysis::RiskCalculator;
use technical_analysis::TechnicalCalculator;

pub mod scoring;
pub use scoring::{rating, ScoreInputs, Scorecard, ScoringEngine};


/// Output of the ten category calculators, before scoring.
struct CategoryResults {
    macro_indicators: MacroMetrics,
    industry: IndustryMetrics,
    liquidity: LiquidityMetrics,
    leverage: LeverageMetrics,
    profitability: ProfitabilityMetrics,
    growth: GrowthMetrics,
    valuation: ValuationMetrics,
    dcf: DcfMetrics,
    risk: RiskMetrics,
    technical: TechnicalMetrics,
}

/// Entry point of the calculation engine.
///
/// The engine is stateless apart from its assumptions: the same bundle and
/// the same assumptions always produce the same `CalculatedMetrics`.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    assumptions: Assumptions,
}

impl MetricsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assumptions(assumptions: Assumptions) -> Self {
        Self { assumptions }
    }

    pub fn assumptions(&self) -> &Assumptions {
        &self.assumptions
    }

    /// Validate, normalise once, run every calculator and score the result.
    pub fn calculate_all(&self, raw: &RawFinancialData) -> Result<CalculatedMetrics, AnalysisError> {
        self.run(raw, false)
    }

    /// Same result as [`calculate_all`](Self::calculate_all), with the
    /// calculators fanned out over the rayon pool.
    pub fn calculate_all_parallel(&self, raw: &RawFinancialData) -> Result<CalculatedMetrics, AnalysisError> {
        self.run(raw, true)
    }

    /// Structural validation of a loosely typed bundle followed by `calculate_all`.
    pub fn calculate_all_json(&self, value: &serde_json::Value) -> Result<CalculatedMetrics, AnalysisError> {
        let raw = RawFinancialData::from_json_value(value)?;
        self.calculate_all(&raw)
    }

    fn run(&self, raw: &RawFinancialData, parallel: bool) -> Result<CalculatedMetrics, AnalysisError> {
        if let Err(e) = self.assumptions.validate() {
            tracing::warn!("Rejected assumptions: {}", e);
            return Err(e);
        }

        let span = tracing::info_span!("calculate_all", symbol = %raw.market_data.symbol, parallel);
        let _guard = span.enter();
        let start = Instant::now();

        let model = CanonicalModel::build(raw);
        let results = if parallel {
            self.run_parallel(&model)
        } else {
            self.run_sequential(&model)
        };
        let metrics = self.assemble(&model, results);

        tracing::debug!(
            "Calculated metrics for {} in {:.2}ms",
            model.symbol,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(metrics)
    }

    fn run_sequential(&self, model: &CanonicalModel) -> CategoryResults {
        let a = &self.assumptions;
        CategoryResults {
            macro_indicators: timed(&MacroCalculator, model, a),
            industry: timed(&IndustryCalculator, model, a),
            liquidity: timed(&LiquidityCalculator, model, a),
            leverage: timed(&LeverageCalculator, model, a),
            profitability: timed(&ProfitabilityCalculator, model, a),
            growth: timed(&GrowthCalculator, model, a),
            valuation: timed(&ValuationCalculator, model, a),
            dcf: timed(&DcfCalculator, model, a),
            risk: timed(&RiskCalculator, model, a),
            technical: timed(&TechnicalCalculator, model, a),
        }
    }

    fn run_parallel(&self, model: &CanonicalModel) -> CategoryResults {
        let a = &self.assumptions;

        // price-history work is the heaviest; give it its own branch
        let ((risk, technical), (statements, context)) = rayon::join(
            || {
                rayon::join(
                    || timed(&RiskCalculator, model, a),
                    || timed(&TechnicalCalculator, model, a),
                )
            },
            || {
                rayon::join(
                    || {
                        (
                            timed(&LiquidityCalculator, model, a),
                            timed(&LeverageCalculator, model, a),
                            timed(&ProfitabilityCalculator, model, a),
                            timed(&GrowthCalculator, model, a),
                            timed(&ValuationCalculator, model, a),
                            timed(&DcfCalculator, model, a),
                        )
                    },
                    || (timed(&MacroCalculator, model, a), timed(&IndustryCalculator, model, a)),
                )
            },
        );
        let (liquidity, leverage, profitability, growth, valuation, dcf) = statements;
        let (macro_indicators, industry) = context;

        CategoryResults {
            macro_indicators,
            industry,
            liquidity,
            leverage,
            profitability,
            growth,
            valuation,
            dcf,
            risk,
            technical,
        }
    }

    fn assemble(&self, model: &CanonicalModel, results: CategoryResults) -> CalculatedMetrics {
        let card = ScoringEngine.score(
            model,
            &ScoreInputs {
                liquidity: &results.liquidity,
                leverage: &results.leverage,
                profitability: &results.profitability,
                growth: &results.growth,
                valuation: &results.valuation,
                risk: &results.risk,
            },
            &self.assumptions,
        );
        let other = self.per_share(model, &card);

        CalculatedMetrics {
            symbol: model.symbol.clone(),
            company_name: model.company_name.clone(),
            sector: model.sector.clone(),
            industry_name: model.industry_name.clone(),
            timestamp: model.timestamp,
            macro_indicators: results.macro_indicators,
            industry: results.industry,
            liquidity: results.liquidity,
            leverage: results.leverage,
            profitability: results.profitability,
            growth: results.growth,
            valuation: results.valuation,
            dcf: results.dcf,
            risk: results.risk,
            technical: results.technical,
            scores: card.scores,
            other,
        }
    }

    fn per_share(&self, model: &CanonicalModel, card: &Scorecard) -> OtherMetrics {
        let shares = model.quote.shares_outstanding.filter(|s| *s > 0.0);
        let dividend_per_share = model
            .quote
            .dividend_rate
            .or_else(|| safe_div(model.cash_flow.dividends_paid, shares));

        OtherMetrics {
            piotroski_f_score: card.piotroski_f_score,
            altman_zone: card.altman_zone,
            price: model.quote.price,
            shares_outstanding: model.quote.shares_outstanding,
            earnings_per_share: ValuationCalculator.earnings_per_share(model),
            book_value_per_share: model.quote.book_value_per_share,
            revenue_per_share: safe_div(model.income.revenue, shares),
            free_cash_flow_per_share: safe_div(model.cash_flow.free_cash_flow, shares),
            cash_per_share: safe_div(model.balance.cash, shares),
            dividend_per_share,
        }
        .rounded(self.assumptions.output_decimals)
    }
}

fn timed<C: MetricCalculator>(calculator: &C, model: &CanonicalModel, assumptions: &Assumptions) -> C::Output {
    let start = Instant::now();
    let output = calculator.calculate(model, assumptions);
    tracing::trace!("{} calculator took {:?}", calculator.name(), start.elapsed());
    output
}

/// Compute every metric for one bundle with the default assumptions.
pub fn calculate_all(raw: &RawFinancialData) -> Result<CalculatedMetrics, AnalysisError> {
    MetricsEngine::new().calculate_all(raw)
}
