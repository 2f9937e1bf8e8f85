//! Macro-economic and industry context for a single company.

pub mod industry;
pub mod macroeconomic;

pub use industry::IndustryCalculator;
pub use macroeconomic::MacroCalculator;
