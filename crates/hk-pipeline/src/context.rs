//! Mutable cycle state threaded through the phase sequence.

use hk_core::types::{
    AssetPlan, CampaignOutcome, ContentSpec, DeploymentRecord, IntelReport, ListingDraft,
    LocalizedBundle, MarketAssessment, MarketSignal, PricingDecision, ValidationReport,
};

// ---------------------------------------------------------------------------
// CycleContext: last known good artifact per phase
// ---------------------------------------------------------------------------

/// Everything produced so far in the running cycle. Each field starts out
/// seeded with a usable default and is overwritten by the phase that owns
/// it; a failed phase leaves the previous value in place so later phases
/// always have a coherent input to work from.
#[derive(Debug, Clone)]
pub struct CycleContext {
    /// Demand rows the cycle was planned against.
    pub signals: Vec<MarketSignal>,
    pub assessment: MarketAssessment,
    pub spec: ContentSpec,
    pub bundle: LocalizedBundle,
    pub asset_plans: Vec<AssetPlan>,
    pub validation: ValidationReport,
    pub pricing: PricingDecision,
    /// The listing as it will be sent to publish targets. Assembled during
    /// the validation phase, repriced by the pricing phase.
    pub draft: ListingDraft,
    pub deployments: Vec<DeploymentRecord>,
    pub campaigns: Vec<CampaignOutcome>,
    pub intel: Option<IntelReport>,
}

impl CycleContext {
    pub fn new(default_locale: &str, base_price_usd: f64) -> Self {
        let assessment = MarketAssessment::fallback();
        let spec = ContentSpec::placeholder(&assessment.niche);
        let bundle = LocalizedBundle::single_locale(&spec, default_locale, base_price_usd);
        let draft = ListingDraft::from_spec(&spec, base_price_usd, vec![default_locale.to_string()]);
        let validation = ValidationReport::pass(draft.id);
        let pricing = PricingDecision::flat(base_price_usd, spec.tier);
        Self {
            signals: Vec::new(),
            assessment,
            spec,
            bundle,
            asset_plans: Vec::new(),
            validation,
            pricing,
            draft,
            deployments: Vec::new(),
            campaigns: Vec::new(),
            intel: None,
        }
    }

    /// Mean listed price across the captured demand rows, if any were
    /// captured. Pricing treats `None` as "no market evidence".
    pub fn market_avg_price(&self) -> Option<f64> {
        if self.signals.is_empty() {
            return None;
        }
        let total: f64 = self.signals.iter().map(|s| s.avg_price_usd).sum();
        Some(total / self.signals.len() as f64)
    }

    /// Locale codes the bundle currently carries, in bundle order.
    pub fn locales(&self) -> Vec<String> {
        self.bundle.entries.iter().map(|e| e.locale.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hk_core::types::MarketSignal;

    #[test]
    fn seeded_context_is_internally_consistent() {
        let ctx = CycleContext::new("en", 49.0);
        assert_eq!(ctx.spec.name, format!("{} Template", ctx.assessment.niche));
        assert_eq!(ctx.draft.id, ctx.spec.id);
        assert_eq!(ctx.bundle.source_id, ctx.spec.id);
        assert_eq!(ctx.locales(), vec!["en".to_string()]);
        assert_eq!(ctx.draft.price_usd, 49.0);
        assert!(ctx.validation.passed);
        assert!(ctx.deployments.is_empty());
    }

    #[test]
    fn market_avg_price_means_captured_rows() {
        let mut ctx = CycleContext::new("en", 49.0);
        assert_eq!(ctx.market_avg_price(), None);

        ctx.signals = vec![
            MarketSignal::new("t", "a", 0.9, 40.0),
            MarketSignal::new("t", "b", 0.8, 80.0),
        ];
        assert_eq!(ctx.market_avg_price(), Some(60.0));
    }
}
