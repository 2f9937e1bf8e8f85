//! Canonical financial model.
//!
//! The raw bundle arrives with provider-specific shapes (aliases, signed
//! expense lines, totals that are sometimes pre-computed and sometimes not).
//! `CanonicalModel::build` resolves all of that once, so calculators read a
//! single strict record and never branch on where the data came from.

use chrono::{DateTime, Utc};

use crate::numeric::{finite, sum_present};
use crate::types::{Bar, IndustryData, MacroData, PeriodFinancials, RawFinancialData};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quote {
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
    pub volume: Option<f64>,
    pub average_volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub eps: Option<f64>,
    pub forward_eps: Option<f64>,
    pub beta: Option<f64>,
    pub dividend_rate: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub book_value_per_share: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomeStatement {
    pub revenue: Option<f64>,
    pub cost_of_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub research_and_development: Option<f64>,
    pub selling_general_administrative: Option<f64>,
    pub operating_income: Option<f64>,
    pub ebit: Option<f64>,
    pub ebitda: Option<f64>,
    /// Always carried as a positive expense.
    pub interest_expense: Option<f64>,
    pub income_before_tax: Option<f64>,
    pub income_tax_expense: Option<f64>,
    pub net_income: Option<f64>,
    pub depreciation_and_amortization: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceSheet {
    pub total_assets: Option<f64>,
    pub current_assets: Option<f64>,
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
    pub total_equity: Option<f64>,
    pub retained_earnings: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CashFlowStatement {
    pub operating_cash_flow: Option<f64>,
    /// Always carried as a positive outflow.
    pub capital_expenditure: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub dividends_paid: Option<f64>,
    pub share_repurchases: Option<f64>,
}

/// Multi-year annual series, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub revenue: Vec<f64>,
    pub net_income: Vec<f64>,
    pub eps: Vec<f64>,
    pub dividends: Vec<f64>,
    pub free_cash_flow: Vec<f64>,
    pub periods: Vec<PeriodFinancials>,
}

/// Intermediates that several calculators need, derived once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedValues {
    pub average_total_assets: Option<f64>,
    pub invested_capital: Option<f64>,
    pub net_debt: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub working_capital: Option<f64>,
    /// Close prices extracted from the price history.
    pub closes: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalModel {
    pub symbol: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub quote: Quote,
    pub income: IncomeStatement,
    pub balance: BalanceSheet,
    pub cash_flow: CashFlowStatement,
    pub history: History,
    pub prices: Vec<Bar>,
    pub macro_data: MacroData,
    pub industry: IndustryData,
    pub derived: DerivedValues,
}

fn clean(value: Option<f64>) -> Option<f64> {
    value.and_then(finite)
}

/// Keeps the contiguous run of finite points after the last non-finite one,
/// so a trailing N-year window never spans a gap.
fn clean_series(series: &[f64]) -> Vec<f64> {
    let start = series.iter().rposition(|v| !v.is_finite()).map_or(0, |i| i + 1);
    series[start..].to_vec()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl CanonicalModel {
    pub fn build(raw: &RawFinancialData) -> Self {
        let m = &raw.market_data;
        let symbol = m.symbol.trim().to_uppercase();

        let prices: Vec<Bar> = m
            .price_history
            .iter()
            .filter(|b| b.close.is_finite())
            .cloned()
            .collect();
        let closes: Vec<f64> = prices.iter().map(|b| b.close).collect();

        // Quote
        let mut price = clean(m.price);
        if price.is_none() {
            if let Some(last) = closes.last() {
                tracing::debug!("{}: price missing, using last close {}", symbol, last);
                price = Some(*last);
            }
        }
        let shares_outstanding = clean(m.shares_outstanding);
        let mut market_cap = clean(m.market_cap);
        if market_cap.is_none() {
            if let (Some(p), Some(s)) = (price, shares_outstanding) {
                tracing::debug!("{}: market cap derived from price x shares", symbol);
                market_cap = Some(p * s);
            }
        }
        let total_equity = clean(m.total_equity);
        let book_value_per_share = clean(m.book_value_per_share).or_else(|| match (total_equity, shares_outstanding) {
            (Some(e), Some(s)) if s != 0.0 => finite(e / s),
            _ => None,
        });

        let quote = Quote {
            price,
            previous_close: clean(m.previous_close),
            volume: clean(m.volume),
            average_volume: clean(m.average_volume),
            market_cap,
            shares_outstanding,
            fifty_two_week_high: clean(m.fifty_two_week_high),
            fifty_two_week_low: clean(m.fifty_two_week_low),
            pe_ratio: clean(m.pe_ratio),
            forward_pe: clean(m.forward_pe),
            eps: clean(m.eps),
            forward_eps: clean(m.forward_eps),
            beta: clean(m.beta),
            dividend_rate: clean(m.dividend_rate),
            dividend_yield: clean(m.dividend_yield),
            payout_ratio: clean(m.payout_ratio),
            book_value_per_share,
        };

        // Income statement
        let revenue = clean(m.revenue);
        let cost_of_revenue = clean(m.cost_of_revenue).map(f64::abs);
        let gross_profit = clean(m.gross_profit).or_else(|| match (revenue, cost_of_revenue) {
            (Some(r), Some(c)) => {
                tracing::debug!("{}: gross profit derived from revenue - cost of revenue", symbol);
                Some(r - c)
            }
            _ => None,
        });
        let operating_income = clean(m.operating_income);
        let ebit = clean(m.ebit).or(operating_income);
        let depreciation = clean(m.depreciation_and_amortization).map(f64::abs);
        let ebitda = clean(m.ebitda).or_else(|| match (ebit, depreciation) {
            (Some(e), Some(d)) => {
                tracing::debug!("{}: EBITDA derived from EBIT + D&A", symbol);
                Some(e + d)
            }
            _ => None,
        });

        let income = IncomeStatement {
            revenue,
            cost_of_revenue,
            gross_profit,
            research_and_development: clean(m.research_and_development),
            selling_general_administrative: clean(m.selling_general_administrative),
            operating_income,
            ebit,
            ebitda,
            interest_expense: clean(m.interest_expense).map(f64::abs),
            income_before_tax: clean(m.income_before_tax),
            income_tax_expense: clean(m.income_tax_expense),
            net_income: clean(m.net_income),
            depreciation_and_amortization: depreciation,
        };

        // Balance sheet
        let short_term_debt = clean(m.short_term_debt);
        let long_term_debt = clean(m.long_term_debt);
        let total_debt = clean(m.total_debt).or_else(|| sum_present(short_term_debt, long_term_debt));
        let balance = BalanceSheet {
            total_assets: clean(m.total_assets),
            current_assets: clean(m.current_assets),
            cash: clean(m.cash),
            short_term_investments: clean(m.short_term_investments),
            accounts_receivable: clean(m.accounts_receivable),
            inventory: clean(m.inventory),
            total_liabilities: clean(m.total_liabilities),
            current_liabilities: clean(m.current_liabilities),
            accounts_payable: clean(m.accounts_payable),
            short_term_debt,
            long_term_debt,
            total_debt,
            total_equity,
            retained_earnings: clean(m.retained_earnings),
        };

        // Cash flow
        let operating_cash_flow = clean(m.operating_cash_flow);
        let capital_expenditure = clean(m.capital_expenditure).map(f64::abs);
        let free_cash_flow = clean(m.free_cash_flow).or_else(|| match (operating_cash_flow, capital_expenditure) {
            (Some(ocf), Some(capex)) => {
                tracing::debug!("{}: free cash flow derived from OCF - capex", symbol);
                Some(ocf - capex)
            }
            _ => None,
        });
        let cash_flow = CashFlowStatement {
            operating_cash_flow,
            capital_expenditure,
            free_cash_flow,
            dividends_paid: clean(m.dividends_paid).map(f64::abs),
            share_repurchases: clean(m.share_repurchases).map(f64::abs),
        };

        let history = History {
            revenue: clean_series(&m.historical_revenue),
            net_income: clean_series(&m.historical_net_income),
            eps: clean_series(&m.historical_eps),
            dividends: clean_series(&m.historical_dividends),
            free_cash_flow: clean_series(&m.historical_fcf),
            periods: m.historical_financials.clone(),
        };

        let derived = derive(&balance, &quote, &history, closes);

        let industry_name = non_empty(&m.industry).or_else(|| non_empty(&raw.industry_data.industry_name));
        let sector = non_empty(&m.sector).or_else(|| non_empty(&raw.industry_data.sector));

        Self {
            symbol,
            company_name: non_empty(&m.company_name),
            sector,
            industry_name,
            timestamp: raw.timestamp,
            quote,
            income,
            balance,
            cash_flow,
            history,
            prices,
            macro_data: raw.macro_data.clone(),
            industry: raw.industry_data.clone(),
            derived,
        }
    }

    /// Ten-year yield from the macro record, used as the risk-free rate.
    pub fn risk_free_rate(&self) -> Option<f64> {
        clean(self.macro_data.ten_year_yield)
    }

    /// The two most recent annual snapshots as `(prior, current)`.
    pub fn last_two_periods(&self) -> Option<(&PeriodFinancials, &PeriodFinancials)> {
        let n = self.history.periods.len();
        if n < 2 {
            return None;
        }
        Some((&self.history.periods[n - 2], &self.history.periods[n - 1]))
    }
}

fn derive(balance: &BalanceSheet, quote: &Quote, history: &History, closes: Vec<f64>) -> DerivedValues {
    let prior_assets = history
        .periods
        .len()
        .checked_sub(2)
        .and_then(|i| clean(history.periods[i].total_assets));
    let average_total_assets = match (balance.total_assets, prior_assets) {
        (Some(current), Some(prior)) => Some((current + prior) / 2.0),
        (current, _) => current,
    };

    let cash = balance.cash.unwrap_or(0.0);
    let net_debt = balance.total_debt.map(|d| d - cash);
    let invested_capital = match (balance.total_debt, balance.total_equity) {
        (Some(d), Some(e)) => Some(d + e - cash),
        (None, Some(e)) => Some(e - cash),
        _ => None,
    };
    let enterprise_value = quote
        .market_cap
        .map(|mc| mc + balance.total_debt.unwrap_or(0.0) - cash);
    let working_capital = match (balance.current_assets, balance.current_liabilities) {
        (Some(a), Some(l)) => Some(a - l),
        _ => None,
    };

    DerivedValues {
        average_total_assets,
        invested_capital,
        net_debt,
        enterprise_value,
        working_capital,
        closes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketData, RawFinancialData};
    use chrono::TimeZone;

    fn raw_with(market: MarketData) -> RawFinancialData {
        RawFinancialData {
            market_data: market,
            macro_data: MacroData::default(),
            industry_data: IndustryData {
                industry_name: Some("Consumer Electronics".to_string()),
                sector: Some("Technology".to_string()),
                ..Default::default()
            },
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_fallbacks_are_resolved_once() {
        let model = CanonicalModel::build(&raw_with(MarketData {
            symbol: " aapl ".to_string(),
            price: Some(150.0),
            shares_outstanding: Some(10.0),
            revenue: Some(100.0),
            cost_of_revenue: Some(-60.0),
            operating_income: Some(30.0),
            depreciation_and_amortization: Some(5.0),
            interest_expense: Some(-2.0),
            short_term_debt: Some(10.0),
            long_term_debt: Some(40.0),
            cash: Some(20.0),
            total_equity: Some(80.0),
            operating_cash_flow: Some(35.0),
            capital_expenditure: Some(-10.0),
            ..Default::default()
        }));

        assert_eq!(model.symbol, "AAPL");
        assert_eq!(model.quote.market_cap, Some(1500.0));
        assert_eq!(model.quote.book_value_per_share, Some(8.0));
        assert_eq!(model.income.gross_profit, Some(40.0));
        assert_eq!(model.income.ebit, Some(30.0));
        assert_eq!(model.income.ebitda, Some(35.0));
        assert_eq!(model.income.interest_expense, Some(2.0));
        assert_eq!(model.balance.total_debt, Some(50.0));
        assert_eq!(model.cash_flow.free_cash_flow, Some(25.0));
        assert_eq!(model.derived.net_debt, Some(30.0));
        assert_eq!(model.derived.invested_capital, Some(110.0));
        assert_eq!(model.derived.enterprise_value, Some(1530.0));
        assert_eq!(model.sector.as_deref(), Some("Technology"));
        assert_eq!(model.industry_name.as_deref(), Some("Consumer Electronics"));
    }

    #[test]
    fn test_average_assets_uses_prior_snapshot() {
        let model = CanonicalModel::build(&raw_with(MarketData {
            total_assets: Some(120.0),
            historical_financials: vec![
                PeriodFinancials { total_assets: Some(80.0), ..Default::default() },
                PeriodFinancials { total_assets: Some(120.0), ..Default::default() },
            ],
            ..Default::default()
        }));
        assert_eq!(model.derived.average_total_assets, Some(100.0));
    }

    #[test]
    fn test_price_falls_back_to_last_close() {
        let bars = (1..=3)
            .map(|d| Bar {
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                open: None,
                high: None,
                low: None,
                close: 10.0 * d as f64,
                volume: None,
            })
            .collect();
        let model = CanonicalModel::build(&raw_with(MarketData {
            price_history: bars,
            ..Default::default()
        }));
        assert_eq!(model.quote.price, Some(30.0));
        assert_eq!(model.derived.closes, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_missing_fields_stay_missing() {
        let model = CanonicalModel::build(&raw_with(MarketData::default()));
        assert_eq!(model.quote.price, None);
        assert_eq!(model.balance.total_debt, None);
        assert_eq!(model.derived.enterprise_value, None);
        assert!(model.last_two_periods().is_none());
    }

    #[test]
    fn test_non_finite_history_point_cuts_the_window() {
        let model = CanonicalModel::build(&raw_with(MarketData {
            historical_revenue: vec![100.0, 110.0, f64::NAN, 130.0, 140.0, 150.0],
            historical_eps: vec![1.0, 2.0, 3.0],
            ..Default::default()
        }));
        assert_eq!(model.history.revenue, vec![130.0, 140.0, 150.0]);
        assert_eq!(model.history.eps, vec![1.0, 2.0, 3.0]);
    }
}
