//! List-price selection.
//!
//! Pricing starts from the tier anchor, nudges it when the observed market
//! diverges hard from the anchor, then clamps the result twice: once into
//! the tier band, once into the corridor the market assessment reported.

use hk_core::types::{MarketAssessment, PricingTier};

/// Market averages further than this factor above the anchor count as a
/// hot market; the mirror factor below counts as a soft one.
const DIVERGENCE_HIGH: f64 = 1.3;
const DIVERGENCE_LOW: f64 = 0.7;

/// Nudge applied when the market diverges. Deliberately small so the tier
/// band, not the market, dominates the final number.
const NUDGE_UP: f64 = 1.1;
const NUDGE_DOWN: f64 = 0.9;

/// Pick a list price for a listing of the given tier.
///
/// `market_avg` is the mean listed price across the demand rows the cycle
/// captured; `None` means no market evidence was available and the anchor
/// is used untouched.
pub fn decide_price(
    tier: PricingTier,
    assessment: &MarketAssessment,
    market_avg: Option<f64>,
) -> f64 {
    let anchor = tier.anchor_price();

    let adjusted = match market_avg {
        Some(avg) if avg > anchor * DIVERGENCE_HIGH => anchor * NUDGE_UP,
        Some(avg) if avg < anchor * DIVERGENCE_LOW => anchor * NUDGE_DOWN,
        _ => anchor,
    };

    let banded = tier.clamp(adjusted);

    // An inverted corridor means the assessment data is unusable; fall
    // back to the band alone rather than panic in f64::clamp.
    let corridored = if assessment.price_floor_usd <= assessment.price_ceiling_usd {
        banded.clamp(assessment.price_floor_usd, assessment.price_ceiling_usd)
    } else {
        banded
    };

    round2(corridored)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(floor: f64, ceiling: f64) -> MarketAssessment {
        let mut a = MarketAssessment::fallback();
        a.price_floor_usd = floor;
        a.price_ceiling_usd = ceiling;
        a
    }

    #[test]
    fn neutral_market_keeps_the_anchor() {
        let price = decide_price(PricingTier::Mid, &assessment(29.0, 79.0), Some(55.0));
        assert_eq!(price, 60.0);
    }

    #[test]
    fn no_market_evidence_keeps_the_anchor() {
        let price = decide_price(PricingTier::Mid, &assessment(29.0, 79.0), None);
        assert_eq!(price, 60.0);
    }

    #[test]
    fn hot_market_lifts_the_anchor() {
        // 120 > 60 * 1.3, so the anchor moves up ten percent.
        let price = decide_price(PricingTier::Mid, &assessment(29.0, 79.0), Some(120.0));
        assert_eq!(price, 66.0);
    }

    #[test]
    fn soft_market_discounts_the_anchor() {
        // 30 < 60 * 0.7, so the anchor moves down ten percent.
        let price = decide_price(PricingTier::Mid, &assessment(29.0, 79.0), Some(30.0));
        assert_eq!(price, 54.0);
    }

    #[test]
    fn assessment_corridor_caps_the_band() {
        let price = decide_price(PricingTier::Mid, &assessment(29.0, 49.0), Some(55.0));
        assert_eq!(price, 49.0);
    }

    #[test]
    fn low_tier_prices_inside_its_band() {
        let price = decide_price(PricingTier::Low, &assessment(5.0, 20.0), None);
        assert_eq!(price, 14.0);
    }

    #[test]
    fn inverted_corridor_falls_back_to_the_band() {
        let price = decide_price(PricingTier::Mid, &assessment(90.0, 20.0), Some(55.0));
        assert_eq!(price, 60.0);
    }
}
