pub mod indicators;
pub mod technical;


pub use indicators::*;
pub use technical::TechnicalCalculator;
