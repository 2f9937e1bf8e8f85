//! Price-history risk statistics.

pub mod risk;

pub use risk::RiskCalculator;

#[cfg(test)]
pub(crate) mod test_support {
    use analysis_core::{Bar, CanonicalModel, IndustryData, MacroData, MarketData, RawFinancialData};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    pub fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + Duration::days(i as i64),
                open: None,
                high: None,
                low: None,
                close,
                volume: None,
            })
            .collect()
    }

    pub fn model_with_closes(closes: &[f64], ten_year_yield: Option<f64>) -> CanonicalModel {
        CanonicalModel::build(&RawFinancialData {
            market_data: MarketData {
                symbol: "TEST".to_string(),
                price_history: bars(closes),
                ..Default::default()
            },
            macro_data: MacroData {
                ten_year_yield,
                ..Default::default()
            },
            industry_data: IndustryData::default(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        })
    }
}
