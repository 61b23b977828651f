//! Competitive intelligence from a curated catalog of known sellers
//! and trending niches. Everything here is in-process reference data;
//! the provider exists so market analysis has demand signals and the
//! post-publish phase gets a benchmark report without scraping anyone.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use tracing::info;

use hk_core::types::{CompetitionLevel, IntelReport, MarketSignal, PriceBenchmark};

use crate::traits::{CapabilityError, IntelProvider};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

struct CompetitorRow {
    name: &'static str,
    products: u32,
    avg_price_usd: f64,
    niches: &'static [&'static str],
}

const COMPETITORS: [CompetitorRow; 3] = [
    CompetitorRow {
        name: "Thomas Frank",
        products: 20,
        avg_price_usd: 79.0,
        niches: &["productivity", "notion", "student"],
    },
    CompetitorRow {
        name: "Easlo",
        products: 30,
        avg_price_usd: 99.0,
        niches: &["notion", "productivity"],
    },
    CompetitorRow {
        name: "Notion4Management",
        products: 50,
        avg_price_usd: 49.0,
        niches: &["business", "management"],
    },
];

struct TrendRow {
    niche: &'static str,
    trend_score: f64,
    competition: CompetitionLevel,
}

const TRENDING: [TrendRow; 5] = [
    TrendRow {
        niche: "AI Productivity",
        trend_score: 0.95,
        competition: CompetitionLevel::Low,
    },
    TrendRow {
        niche: "Second Brain",
        trend_score: 0.88,
        competition: CompetitionLevel::Medium,
    },
    TrendRow {
        niche: "Finance Tracker",
        trend_score: 0.82,
        competition: CompetitionLevel::High,
    },
    TrendRow {
        niche: "Digital Planner 2025",
        trend_score: 0.78,
        competition: CompetitionLevel::Medium,
    },
    TrendRow {
        niche: "Creator Economy Tools",
        trend_score: 0.75,
        competition: CompetitionLevel::Low,
    },
];

const THREATS: [&str; 4] = [
    "A major platform could enter the market",
    "AI could generate cheaper alternatives",
    "Platform fees could rise",
    "Price pressure from growing competition",
];

const GENERIC_OPPORTUNITIES: [&str; 2] = [
    "Competitors ship template updates slowly",
    "Competitor SEO is weak",
];

// ---------------------------------------------------------------------------
// Catalog queries
// ---------------------------------------------------------------------------

/// Competitors whose niche keywords appear in the given niche name.
fn relevant_competitors(niche: &str) -> Vec<&'static CompetitorRow> {
    let lowered = niche.to_lowercase();
    COMPETITORS
        .iter()
        .filter(|c| c.niches.iter().any(|n| lowered.contains(n)))
        .collect()
}

/// Price benchmark for a niche: spread of matching competitors' average
/// prices, widened 20% in each direction. Defaults when nobody matches.
pub fn benchmark_for(niche: &str) -> PriceBenchmark {
    let competitors = relevant_competitors(niche);
    if competitors.is_empty() {
        return PriceBenchmark::default();
    }
    let prices: Vec<f64> = competitors.iter().map(|c| c.avg_price_usd).collect();
    let min = prices.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean = prices.iter().sum::<f64>() / prices.len() as f64;
    PriceBenchmark {
        low: (min * 0.8).floor(),
        mid: mean.floor(),
        high: (max * 1.2).floor(),
    }
}

fn opportunities_for(niche: &str) -> Vec<String> {
    let lowered = niche.to_lowercase();
    let niche_specific: &[&str] = if lowered.contains("productivity") {
        &[
            "AI-integrated templates",
            "Stronger collaboration features",
            "Mobile-first layouts",
        ]
    } else if lowered.contains("notion") {
        &[
            "Notion AI integration",
            "Advanced database patterns",
            "Template bundles",
        ]
    } else if lowered.contains("finance") {
        &[
            "Automated dashboards",
            "Investment tracking",
            "Budget management",
        ]
    } else {
        &[]
    };

    let mut opportunities: Vec<String> = niche_specific.iter().map(|s| s.to_string()).collect();
    opportunities.extend(GENERIC_OPPORTUNITIES.iter().map(|s| s.to_string()));
    opportunities.truncate(5);
    opportunities
}

/// Month's seasonal focus keywords and whether it is a discount season.
pub fn seasonal_focus(month: u32) -> (&'static [&'static str], bool) {
    match month {
        1 => (&["goal_setting", "planner"], true),
        2 => (&["productivity", "business"], false),
        3 => (&["student", "education"], false),
        4 => (&["finance", "tax"], false),
        5 => (&["planner", "productivity"], false),
        6 => (&["vacation", "travel"], true),
        7 => (&["business", "freelance"], false),
        8 => (&["back_to_school"], true),
        9 => (&["student", "productivity"], false),
        10 => (&["productivity", "business"], false),
        11 => (&["holiday_planning", "gift_guides"], true),
        12 => (&["year_review", "new_year_planning"], true),
        _ => (&["goal_setting", "planner"], true),
    }
}

fn recommendations_for(niche: &str, month: u32) -> Vec<String> {
    let mut recommendations = vec![
        format!("Differentiate within the {niche} market"),
        "Ship updates faster than competitors".to_string(),
        "Target global buyers with multi-language support".to_string(),
        "Add value through AI integration".to_string(),
        "Raise revenue per buyer with bundles".to_string(),
    ];
    let (focus, discount_season) = seasonal_focus(month);
    recommendations.push(format!("Seasonal focus: {}", focus.join(", ")));
    if discount_season {
        recommendations.push("Run a launch promotion during the discount season".to_string());
    }
    recommendations
}

// ---------------------------------------------------------------------------
// CatalogIntelProvider
// ---------------------------------------------------------------------------

/// Intel provider backed by the built-in catalog.
pub struct CatalogIntelProvider;

impl CatalogIntelProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CatalogIntelProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntelProvider for CatalogIntelProvider {
    fn signals(&self) -> Vec<MarketSignal> {
        TRENDING
            .iter()
            .map(|row| {
                MarketSignal::new(
                    "trend_watch",
                    row.niche,
                    row.trend_score,
                    benchmark_for(row.niche).mid,
                )
            })
            .collect()
    }

    async fn analyze(&self, niche: &str) -> Result<IntelReport, CapabilityError> {
        let competitors = relevant_competitors(niche);
        let competitor_count = competitors.len() as u32;
        let top_players = competitors
            .iter()
            .take(3)
            .map(|c| format!("{} ({} products, avg ${:.0})", c.name, c.products, c.avg_price_usd))
            .collect();
        let report = IntelReport {
            niche: niche.to_string(),
            competitor_count,
            top_players,
            price_benchmark: benchmark_for(niche),
            opportunities: opportunities_for(niche),
            threats: THREATS.iter().map(|s| s.to_string()).collect(),
            recommendations: recommendations_for(niche, Utc::now().month()),
            analyzed_at: Utc::now(),
        };
        info!(
            niche,
            competitors = competitor_count,
            benchmark_mid = report.price_benchmark.mid,
            "competitive analysis complete"
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::IntelProvider;

    #[test]
    fn signals_list_trending_niches_in_order() {
        let provider = CatalogIntelProvider::new();
        let signals = provider.signals();
        assert_eq!(signals.len(), 5);
        assert_eq!(signals[0].niche, "AI Productivity");
        assert_eq!(signals[0].trend_score, 0.95);
        assert_eq!(signals[4].niche, "Creator Economy Tools");
        assert!(signals.iter().all(|s| s.source == "trend_watch"));
    }

    #[test]
    fn matched_niche_benchmark_spreads_competitor_prices() {
        // Thomas Frank (79) and Easlo (99) both sell productivity.
        let benchmark = benchmark_for("AI Productivity");
        assert_eq!(benchmark.low, 63.0);
        assert_eq!(benchmark.mid, 89.0);
        assert_eq!(benchmark.high, 118.0);
    }

    #[test]
    fn unmatched_niche_gets_default_benchmark() {
        let benchmark = benchmark_for("Quantum Gardening");
        assert_eq!(benchmark.low, 29.0);
        assert_eq!(benchmark.mid, 49.0);
        assert_eq!(benchmark.high, 99.0);
    }

    #[test]
    fn signal_prices_come_from_the_benchmark() {
        let provider = CatalogIntelProvider::new();
        let signals = provider.signals();
        assert_eq!(signals[0].avg_price_usd, 89.0);
        assert_eq!(signals[1].avg_price_usd, 49.0);
    }

    #[test]
    fn opportunities_cap_at_five() {
        let opportunities = opportunities_for("Notion Productivity Hub");
        assert_eq!(opportunities.len(), 5);
        assert_eq!(opportunities[0], "AI-integrated templates");
        assert_eq!(opportunities[3], "Competitors ship template updates slowly");
    }

    #[test]
    fn unknown_niche_keeps_generic_opportunities() {
        let opportunities = opportunities_for("Quantum Gardening");
        assert_eq!(opportunities.len(), 2);
    }

    #[test]
    fn seasonal_table_marks_discount_months() {
        let (january, discount) = seasonal_focus(1);
        assert_eq!(january, &["goal_setting", "planner"]);
        assert!(discount);

        let (september, discount) = seasonal_focus(9);
        assert_eq!(september, &["student", "productivity"]);
        assert!(!discount);

        let (_, discount) = seasonal_focus(11);
        assert!(discount);
    }

    #[test]
    fn recommendations_interpolate_niche_and_season() {
        let recommendations = recommendations_for("Finance Tracker", 4);
        assert_eq!(
            recommendations[0],
            "Differentiate within the Finance Tracker market"
        );
        assert_eq!(recommendations.len(), 6);
        assert!(recommendations[5].starts_with("Seasonal focus: finance"));

        let with_discount = recommendations_for("Finance Tracker", 12);
        assert_eq!(with_discount.len(), 7);
    }

    #[tokio::test]
    async fn analyze_counts_matching_competitors() {
        let provider = CatalogIntelProvider::new();
        let report = provider.analyze("AI Productivity").await.unwrap();
        assert_eq!(report.competitor_count, 2);
        assert!(report.top_players[0].contains("Thomas Frank"));
        assert_eq!(report.threats.len(), 4);
        assert_eq!(report.price_benchmark.mid, 89.0);
        assert!(report.recommendations.len() >= 6);
    }

    #[tokio::test]
    async fn analyze_unknown_niche_reports_zero_competitors() {
        let provider = CatalogIntelProvider::new();
        let report = provider.analyze("Quantum Gardening").await.unwrap();
        assert_eq!(report.competitor_count, 0);
        assert_eq!(report.price_benchmark.mid, 49.0);
        assert_eq!(report.opportunities.len(), 2);
    }
}
