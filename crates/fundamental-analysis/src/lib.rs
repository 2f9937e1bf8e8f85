//! Statement-driven calculators: liquidity, leverage, profitability, growth,
//! valuation multiples and the DCF model.

pub mod dcf;
pub mod growth;
pub mod leverage;
pub mod liquidity;
pub mod profitability;
pub mod valuation;

pub use dcf::DcfCalculator;
pub use growth::GrowthCalculator;
pub use leverage::LeverageCalculator;
pub use liquidity::LiquidityCalculator;
pub use profitability::ProfitabilityCalculator;
pub use valuation::ValuationCalculator;
