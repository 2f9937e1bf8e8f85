use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// One daily OHLCV bar of price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// Annual statement snapshot used for period-over-period quality tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeriodFinancials {
    pub fiscal_year: Option<i32>,
    pub revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub net_income: Option<f64>,
    #[serde(alias = "cashFlowFromOps")]
    pub operating_cash_flow: Option<f64>,
    pub total_assets: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

/// Company record as delivered by the market-data provider: quote, source
/// multiples, trailing statements, multi-year history and price history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketData {
    pub symbol: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,

    // Quote
    #[serde(alias = "currentPrice")]
    pub price: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub previous_close: Option<f64>,
    pub volume: Option<f64>,
    pub average_volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,

    // Multiples already known to the source
    #[serde(rename = "peRatio", alias = "trailingPE")]
    pub pe_ratio: Option<f64>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<f64>,
    pub eps: Option<f64>,
    pub forward_eps: Option<f64>,
    pub beta: Option<f64>,
    pub dividend_rate: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub book_value_per_share: Option<f64>,

    // Income statement
    #[serde(alias = "totalRevenue")]
    pub revenue: Option<f64>,
    pub cost_of_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub research_and_development: Option<f64>,
    pub selling_general_administrative: Option<f64>,
    pub operating_income: Option<f64>,
    pub ebit: Option<f64>,
    pub ebitda: Option<f64>,
    pub interest_expense: Option<f64>,
    pub income_before_tax: Option<f64>,
    pub income_tax_expense: Option<f64>,
    pub net_income: Option<f64>,
    pub depreciation_and_amortization: Option<f64>,

    // Balance sheet
    pub total_assets: Option<f64>,
    pub current_assets: Option<f64>,
    #[serde(alias = "cashAndEquivalents")]
    pub cash: Option<f64>,
    pub short_term_investments: Option<f64>,
    pub accounts_receivable: Option<f64>,
    pub inventory: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub accounts_payable: Option<f64>,
    pub short_term_debt: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub total_debt: Option<f64>,
    #[serde(alias = "shareholdersEquity")]
    pub total_equity: Option<f64>,
    pub retained_earnings: Option<f64>,

    // Cash flow statement
    #[serde(alias = "cashFlowFromOps")]
    pub operating_cash_flow: Option<f64>,
    #[serde(alias = "capex")]
    pub capital_expenditure: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub dividends_paid: Option<f64>,
    pub share_repurchases: Option<f64>,

    // Multi-year history, oldest first
    pub historical_revenue: Vec<f64>,
    pub historical_net_income: Vec<f64>,
    pub historical_eps: Vec<f64>,
    pub historical_dividends: Vec<f64>,
    pub historical_fcf: Vec<f64>,
    pub historical_financials: Vec<PeriodFinancials>,

    pub price_history: Vec<Bar>,
}

/// National macro indicators, each a single "now" value expressed as a fraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MacroData {
    pub gdp_growth: Option<f64>,
    #[serde(alias = "cpi")]
    pub inflation_rate: Option<f64>,
    pub core_inflation: Option<f64>,
    #[serde(alias = "fedFundsRate")]
    pub policy_rate: Option<f64>,
    pub ten_year_yield: Option<f64>,
    pub unemployment_rate: Option<f64>,
    pub wage_growth: Option<f64>,
    pub productivity_growth: Option<f64>,
    pub consumer_confidence: Option<f64>,
    pub business_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeerCompany {
    pub symbol: String,
    pub revenue: Option<f64>,
    pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndustryData {
    #[serde(alias = "industry")]
    pub industry_name: Option<String>,
    pub sector: Option<String>,
    pub industry_revenue: Option<f64>,
    pub industry_growth_rate: Option<f64>,
    pub total_addressable_market: Option<f64>,
    pub peers: Vec<PeerCompany>,
}

/// The immutable input bundle handed over by the data-aggregation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFinancialData {
    pub market_data: MarketData,
    pub macro_data: MacroData,
    pub industry_data: IndustryData,
    pub timestamp: DateTime<Utc>,
}

const SECTIONS: [(&str, &str); 3] = [
    ("marketData", "an object"),
    ("macroData", "an object"),
    ("industryData", "an object"),
];

impl RawFinancialData {
    /// Validate the top-level shape of a loosely typed bundle, then decode it.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self, AnalysisError> {
        let obj = value.as_object().ok_or(AnalysisError::NotAnObject)?;

        for (section, expected) in SECTIONS {
            match obj.get(section) {
                None | Some(serde_json::Value::Null) => {
                    return Err(AnalysisError::MissingSection(section))
                }
                Some(v) if !v.is_object() => {
                    return Err(AnalysisError::WrongSectionType { section, expected })
                }
                Some(_) => {}
            }
        }

        match obj.get("timestamp") {
            None | Some(serde_json::Value::Null) => {
                return Err(AnalysisError::MissingSection("timestamp"))
            }
            Some(v) if !v.is_string() => {
                return Err(AnalysisError::WrongSectionType {
                    section: "timestamp",
                    expected: "an RFC3339 string",
                })
            }
            Some(_) => {}
        }

        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn from_json_str(input: &str) -> Result<Self, AnalysisError> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        Self::from_json_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        json!({
            "marketData": { "symbol": "TEST", "currentPrice": 10.0, "cashFlowFromOps": 5.0 },
            "macroData": { "cpi": 0.03 },
            "industryData": { "industry": "Widgets", "peers": [] },
            "timestamp": "2024-01-15T12:00:00Z"
        })
    }

    #[test]
    fn test_aliases_resolve() {
        let raw = RawFinancialData::from_json_value(&minimal()).unwrap();
        assert_eq!(raw.market_data.price, Some(10.0));
        assert_eq!(raw.market_data.operating_cash_flow, Some(5.0));
        assert_eq!(raw.macro_data.inflation_rate, Some(0.03));
        assert_eq!(raw.industry_data.industry_name.as_deref(), Some("Widgets"));
        assert!(raw.market_data.price_history.is_empty());
    }

    #[test]
    fn test_rejects_non_object() {
        let err = RawFinancialData::from_json_value(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err, AnalysisError::NotAnObject);
    }

    #[test]
    fn test_rejects_missing_section() {
        let mut value = minimal();
        value.as_object_mut().unwrap().remove("macroData");
        let err = RawFinancialData::from_json_value(&value).unwrap_err();
        assert_eq!(err, AnalysisError::MissingSection("macroData"));
    }

    #[test]
    fn test_rejects_wrong_section_kind() {
        let mut value = minimal();
        value["industryData"] = json!("technology");
        let err = RawFinancialData::from_json_value(&value).unwrap_err();
        assert!(matches!(err, AnalysisError::WrongSectionType { section: "industryData", .. }));
    }

    #[test]
    fn test_rejects_missing_timestamp() {
        let mut value = minimal();
        value.as_object_mut().unwrap().remove("timestamp");
        let err = RawFinancialData::from_json_value(&value).unwrap_err();
        assert_eq!(err, AnalysisError::MissingSection("timestamp"));
    }

    #[test]
    fn test_field_type_mismatch_is_malformed() {
        let mut value = minimal();
        value["marketData"]["volume"] = json!("plenty");
        let err = RawFinancialData::from_json_value(&value).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedInput(_)));
    }
}
