//! Company position inside its industry and peer group.
//!
//! Peer concentration (HHI, CR4) is measured over the supplied peer list,
//! restricted to peers that report a positive revenue, with shares taken
//! against the total of those revenues, so the index always lands in
//! `[0, 10000]`. Rank and peer-group share add the company itself to the peer
//! list, skipping a peer entry that carries the company's own symbol.

use analysis_core::numeric::{last_change, percentile, safe_div};
use analysis_core::{Assumptions, CanonicalModel, IndustryMetrics, MetricCalculator, RoundMetrics};

pub struct IndustryCalculator;

impl IndustryCalculator {
    /// Positive peer revenues; `exclude_self` drops the entry carrying the company's symbol.
    fn peer_revenues(&self, model: &CanonicalModel, exclude_self: bool) -> Vec<f64> {
        model
            .industry
            .peers
            .iter()
            .filter(|p| !exclude_self || !p.symbol.trim().eq_ignore_ascii_case(&model.symbol))
            .filter_map(|p| p.revenue)
            .filter(|r| r.is_finite() && *r > 0.0)
            .collect()
    }

    /// Percent shares of each peer, largest first.
    fn peer_shares(&self, revenues: &[f64]) -> Vec<f64> {
        let total: f64 = revenues.iter().sum();
        if total <= 0.0 {
            return vec![];
        }
        let mut shares: Vec<f64> = revenues.iter().map(|r| r / total * 100.0).collect();
        shares.sort_by(|a, b| b.total_cmp(a));
        shares
    }

    fn calculate_hhi(&self, shares: &[f64]) -> Option<f64> {
        if shares.is_empty() {
            return None;
        }
        Some(shares.iter().map(|s| s * s).sum())
    }

    fn calculate_cr4(&self, shares: &[f64]) -> Option<f64> {
        if shares.is_empty() {
            return None;
        }
        Some(shares.iter().take(4).sum())
    }

    fn revenue_rank(&self, revenue: Option<f64>, peers: &[f64]) -> Option<u32> {
        let revenue = revenue?;
        let above = peers.iter().filter(|p| **p > revenue).count();
        u32::try_from(above + 1).ok()
    }
}

impl MetricCalculator for IndustryCalculator {
    type Output = IndustryMetrics;

    fn name(&self) -> &'static str {
        "industry"
    }

    fn calculate(&self, model: &CanonicalModel, assumptions: &Assumptions) -> IndustryMetrics {
        let industry = &model.industry;
        let revenue = model.income.revenue;
        let industry_revenue = industry.industry_revenue.filter(|v| v.is_finite());
        let tam = industry.total_addressable_market.filter(|v| v.is_finite());
        let industry_growth = industry.industry_growth_rate.filter(|v| v.is_finite());

        let revenue_growth_vs_industry = match (last_change(&model.history.revenue), industry_growth) {
            (Some(company), Some(sector)) => Some(company - sector),
            _ => None,
        };

        let market = self.peer_revenues(model, false);
        let shares = self.peer_shares(&market);
        let peers = self.peer_revenues(model, true);
        let peer_total: f64 = peers.iter().sum();
        let peer_group_share = match revenue {
            Some(r) if r > 0.0 && !peers.is_empty() => safe_div(Some(r), Some(r + peer_total)),
            _ => None,
        };
        let peer_median = percentile(&peers, 50.0);

        // same set the concentration measures use
        let peer_count = if market.is_empty() {
            None
        } else {
            u32::try_from(market.len()).ok()
        };

        tracing::debug!("{}: {} peers with positive revenue", model.symbol, market.len());

        IndustryMetrics {
            industry_revenue,
            total_addressable_market: tam,
            market_share: safe_div(revenue, industry_revenue),
            tam_penetration: safe_div(revenue, tam),
            industry_growth_rate: industry_growth,
            revenue_growth_vs_industry,
            peer_count,
            hhi_index: self.calculate_hhi(&shares),
            cr4: self.calculate_cr4(&shares),
            peer_group_share,
            revenue_rank: if peers.is_empty() { None } else { self.revenue_rank(revenue, &peers) },
            relative_size_to_peer_median: safe_div(revenue, peer_median),
        }
        .rounded(assumptions.output_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::model;
    use analysis_core::{IndustryData, MacroData, MarketData, PeerCompany};

    fn peer(symbol: &str, revenue: Option<f64>) -> PeerCompany {
        PeerCompany {
            symbol: symbol.to_string(),
            revenue,
            market_cap: None,
        }
    }

    fn company() -> MarketData {
        MarketData {
            symbol: "AAPL".to_string(),
            revenue: Some(400.0),
            historical_revenue: vec![360.0, 400.0],
            ..Default::default()
        }
    }

    fn industry() -> IndustryData {
        IndustryData {
            industry_revenue: Some(1600.0),
            total_addressable_market: Some(4000.0),
            industry_growth_rate: Some(0.05),
            peers: vec![
                peer("AAPL", Some(400.0)),
                peer("SSNL", Some(500.0)),
                peer("XIAO", Some(300.0)),
                peer("SONY", Some(100.0)),
                peer("HPQ", Some(100.0)),
                peer("NOREV", None),
                peer("LOSS", Some(-20.0)),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_share_and_growth_gap() {
        let m = IndustryCalculator.calculate(&model(company(), MacroData::default(), industry()), &Assumptions::default());
        assert_eq!(m.market_share, Some(0.25));
        assert_eq!(m.tam_penetration, Some(0.1));
        // 11.1% company growth vs 5% industry
        assert!((m.revenue_growth_vs_industry.unwrap() - (40.0 / 360.0 - 0.05)).abs() < 1e-6);
        // NOREV and LOSS do not count
        assert_eq!(m.peer_count, Some(5));
    }

    #[test]
    fn test_concentration_stays_in_range() {
        let m = IndustryCalculator.calculate(&model(company(), MacroData::default(), industry()), &Assumptions::default());
        // the full peer list: 400, 500, 300, 100, 100 of 1400
        let hhi = (400.0f64.powi(2) + 500.0f64.powi(2) + 300.0f64.powi(2) + 2.0 * 100.0f64.powi(2))
            / 1400.0f64.powi(2)
            * 10_000.0;
        assert!((m.hhi_index.unwrap() - hhi).abs() < 1e-3);
        assert!((0.0..=10_000.0).contains(&m.hhi_index.unwrap()));
        assert!((m.cr4.unwrap() - 1300.0 / 1400.0 * 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_dominant_company_counts_toward_concentration() {
        let data = IndustryData {
            peers: vec![peer("AAPL", Some(900.0)), peer("S1", Some(50.0)), peer("S2", Some(50.0))],
            ..Default::default()
        };
        let company = MarketData { revenue: Some(900.0), ..company() };
        let m = IndustryCalculator.calculate(&model(company, MacroData::default(), data), &Assumptions::default());

        assert!((m.hhi_index.unwrap() - 8150.0).abs() < 1e-6);
        assert!((m.cr4.unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(m.revenue_rank, Some(1));
        assert!((m.peer_group_share.unwrap() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_rank_and_relative_size() {
        let m = IndustryCalculator.calculate(&model(company(), MacroData::default(), industry()), &Assumptions::default());
        assert_eq!(m.revenue_rank, Some(2));
        assert!((m.peer_group_share.unwrap() - 400.0 / 1400.0).abs() < 1e-6);
        // median of 100, 100, 300, 500 is 200
        assert_eq!(m.relative_size_to_peer_median, Some(2.0));
    }

    #[test]
    fn test_no_peers() {
        let data = IndustryData {
            industry_revenue: Some(0.0),
            ..Default::default()
        };
        let m = IndustryCalculator.calculate(&model(company(), MacroData::default(), data), &Assumptions::default());
        assert_eq!(m.market_share, None);
        assert_eq!(m.peer_count, None);
        assert_eq!(m.hhi_index, None);
        assert_eq!(m.cr4, None);
        assert_eq!(m.revenue_rank, None);
        assert_eq!(m.relative_size_to_peer_median, None);
    }
}
