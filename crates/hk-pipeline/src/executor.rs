//! The cycle executor: ten fixed phases, run in order, every cycle.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use hk_capabilities::content::plan_assets;
use hk_capabilities::CapabilitySet;
use hk_core::config::Config;
use hk_core::types::{
    CampaignStatus, ContentSpec, CycleError, CycleResult, DeploymentRecord, IntelReport,
    ListingDraft, LocalizedBundle, MarketSignal, Phase, PhaseOutcome, PricingDecision,
    ValidationReport,
};

use crate::context::CycleContext;
use crate::pricing::decide_price;

// ---------------------------------------------------------------------------
// ExecutorSettings
// ---------------------------------------------------------------------------

/// The pipeline knobs the executor reads, lifted out of the full config.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub base_price_usd: f64,
    pub default_locale: String,
    pub fanout_concurrency: usize,
    /// Validation reports scoring above this are called out at warn level.
    pub max_risk_score: f64,
}

impl ExecutorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_price_usd: config.pipeline.base_price_usd,
            default_locale: config.pipeline.default_locale.clone(),
            fanout_concurrency: config.pipeline.fanout_concurrency,
            max_risk_score: config.quality.max_risk_score,
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ---------------------------------------------------------------------------
// PipelineExecutor
// ---------------------------------------------------------------------------

/// Runs the phase sequence over whatever capabilities were registered.
///
/// `run_cycle` itself never fails. A phase whose capability is absent
/// applies its built-in default and is marked degraded; a phase whose
/// capability errors is recorded and the cycle moves on with the previous
/// context value. The supervisor decides afterwards whether the cycle as
/// a whole counts as a failure.
pub struct PipelineExecutor {
    capabilities: CapabilitySet,
    settings: ExecutorSettings,
}

/// What one phase did, before it is folded into a [`PhaseOutcome`].
enum PhaseRun {
    /// The capability ran and produced a fresh artifact.
    Completed(Option<String>),
    /// No capability registered; the built-in default was applied.
    Degraded(String),
    /// The capability errored; context keeps the previous artifact.
    Failed(String),
}

impl PipelineExecutor {
    pub fn new(capabilities: CapabilitySet, settings: ExecutorSettings) -> Self {
        Self {
            capabilities,
            settings,
        }
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Run all ten phases once and report everything that happened.
    pub async fn run_cycle(&self) -> CycleResult {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut ctx =
            CycleContext::new(&self.settings.default_locale, self.settings.base_price_usd);
        let mut phases: Vec<PhaseOutcome> = Vec::with_capacity(Phase::ALL.len());
        let mut errors: Vec<CycleError> = Vec::new();

        info!(
            %cycle_id,
            available = ?self.capabilities.available(),
            "cycle started"
        );

        for phase in Phase::ALL {
            let phase_start = Instant::now();
            let run = match phase {
                Phase::MarketAnalysis => self.market_analysis(&mut ctx).await,
                Phase::ContentGeneration => self.content_generation(&mut ctx).await,
                Phase::Localization => self.localization(&mut ctx).await,
                Phase::AssetGeneration => self.asset_generation(&mut ctx).await,
                Phase::Validation => self.validation(&mut ctx).await,
                Phase::Pricing => self.pricing(&mut ctx),
                Phase::MultiTargetPublish => self.multi_target_publish(&mut ctx).await,
                Phase::Promotion => self.promotion(&mut ctx).await,
                Phase::CompetitiveIntelligence => self.competitive_intelligence(&mut ctx).await,
                Phase::MetricsFlush => {
                    self.metrics_flush(&ctx, cycle_id, started_at, &phases, &errors)
                }
            };
            let duration_ms = phase_start.elapsed().as_millis() as u64;

            let outcome = match run {
                PhaseRun::Completed(detail) => {
                    debug!(%phase, duration_ms, "phase complete");
                    PhaseOutcome {
                        phase,
                        success: true,
                        degraded: false,
                        detail,
                        duration_ms,
                    }
                }
                PhaseRun::Degraded(detail) => {
                    info!(%phase, %detail, "phase degraded to built-in default");
                    PhaseOutcome {
                        phase,
                        success: true,
                        degraded: true,
                        detail: Some(detail),
                        duration_ms,
                    }
                }
                PhaseRun::Failed(message) => {
                    warn!(%phase, error = %message, "phase failed, cycle continues");
                    errors.push(CycleError {
                        phase,
                        message: message.clone(),
                    });
                    PhaseOutcome {
                        phase,
                        success: false,
                        degraded: false,
                        detail: Some(message),
                        duration_ms,
                    }
                }
            };
            phases.push(outcome);
        }

        let result = assemble(&ctx, cycle_id, started_at, &phases, &errors);
        info!(
            %cycle_id,
            errors = result.errors.len(),
            deployments = result.deployments_succeeded(),
            price = result.list_price_usd,
            "cycle finished"
        );
        result
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    async fn market_analysis(&self, ctx: &mut CycleContext) -> PhaseRun {
        // Demand rows come from the intel provider when one is registered,
        // otherwise from the built-in seed rows. Captured either way so
        // pricing can read the market average later.
        ctx.signals = match &self.capabilities.intel {
            Some(intel) => intel.signals(),
            None => MarketSignal::seed_rows(),
        };

        let Some(engine) = &self.capabilities.content else {
            return PhaseRun::Degraded("no content engine, using fallback assessment".into());
        };
        match engine.assess_market(&ctx.signals).await {
            Ok(assessment) => {
                let detail = format!(
                    "niche '{}' trend {:.2}",
                    assessment.niche, assessment.trend_score
                );
                ctx.assessment = assessment;
                PhaseRun::Completed(Some(detail))
            }
            Err(e) => PhaseRun::Failed(e.to_string()),
        }
    }

    async fn content_generation(&self, ctx: &mut CycleContext) -> PhaseRun {
        let Some(engine) = &self.capabilities.content else {
            ctx.spec = ContentSpec::placeholder(&ctx.assessment.niche);
            return PhaseRun::Degraded("no content engine, using placeholder spec".into());
        };
        match engine.generate(&ctx.assessment).await {
            Ok(spec) => {
                let detail = format!("'{}' ({} features)", spec.name, spec.features.len());
                ctx.spec = spec;
                PhaseRun::Completed(Some(detail))
            }
            Err(e) => PhaseRun::Failed(e.to_string()),
        }
    }

    async fn localization(&self, ctx: &mut CycleContext) -> PhaseRun {
        let Some(localizer) = &self.capabilities.localizer else {
            ctx.bundle = LocalizedBundle::single_locale(
                &ctx.spec,
                self.settings.default_locale.as_str(),
                self.settings.base_price_usd,
            );
            return PhaseRun::Degraded("no localizer, source locale only".into());
        };
        match localizer
            .localize(&ctx.spec, self.settings.base_price_usd)
            .await
        {
            Ok(bundle) => {
                let detail = format!("{} locales", bundle.entries.len());
                ctx.bundle = bundle;
                PhaseRun::Completed(Some(detail))
            }
            Err(e) => PhaseRun::Failed(e.to_string()),
        }
    }

    async fn asset_generation(&self, ctx: &mut CycleContext) -> PhaseRun {
        let Some(engine) = &self.capabilities.content else {
            ctx.asset_plans = plan_assets(&ctx.spec);
            return PhaseRun::Degraded("no content engine, using stock asset plans".into());
        };
        match engine.design_assets(&ctx.spec).await {
            Ok(plans) => {
                let detail = format!("{} asset plans", plans.len());
                ctx.asset_plans = plans;
                PhaseRun::Completed(Some(detail))
            }
            Err(e) => PhaseRun::Failed(e.to_string()),
        }
    }

    async fn validation(&self, ctx: &mut CycleContext) -> PhaseRun {
        // The draft is assembled here whether or not a validator is
        // registered; publish and promotion need it either way.
        ctx.draft =
            ListingDraft::from_spec(&ctx.spec, self.settings.base_price_usd, ctx.locales());

        let Some(validator) = &self.capabilities.validator else {
            ctx.validation = ValidationReport::pass(ctx.draft.id);
            return PhaseRun::Degraded("no validator, listing accepted unchecked".into());
        };
        match validator.validate(&ctx.draft).await {
            Ok(report) => {
                if !report.passed || report.risk_score > self.settings.max_risk_score {
                    warn!(
                        listing = %ctx.draft.name,
                        risk = report.risk_score,
                        issues = report.issues.len(),
                        "listing flagged by validation, publishing anyway"
                    );
                }
                let detail = format!("passed={} risk={:.2}", report.passed, report.risk_score);
                ctx.validation = report;
                PhaseRun::Completed(Some(detail))
            }
            Err(e) => PhaseRun::Failed(e.to_string()),
        }
    }

    fn pricing(&self, ctx: &mut CycleContext) -> PhaseRun {
        let Some(payments) = &self.capabilities.payments else {
            ctx.pricing = PricingDecision::flat(self.settings.base_price_usd, ctx.spec.tier);
            ctx.draft.price_usd = self.settings.base_price_usd;
            return PhaseRun::Degraded("no payment processor, flat base price".into());
        };

        let price = decide_price(ctx.spec.tier, &ctx.assessment, ctx.market_avg_price());
        let rails = payments.rails(price);
        let detail = format!("${:.2} across {} rails", price, rails.len());
        ctx.pricing = PricingDecision {
            list_price_usd: price,
            tier: ctx.spec.tier,
            rails,
        };
        ctx.draft.price_usd = price;
        PhaseRun::Completed(Some(detail))
    }

    async fn multi_target_publish(&self, ctx: &mut CycleContext) -> PhaseRun {
        if self.capabilities.publishers.is_empty() {
            ctx.deployments = DeploymentRecord::demo_fallback();
            return PhaseRun::Degraded("no publish targets, demo deployments recorded".into());
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.fanout_concurrency.max(1)));
        let mut targets = Vec::with_capacity(self.capabilities.publishers.len());
        let mut handles = Vec::with_capacity(self.capabilities.publishers.len());
        for publisher in &self.capabilities.publishers {
            targets.push(publisher.target().to_string());
            let publisher = Arc::clone(publisher);
            let draft = ctx.draft.clone();
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire_owned().await;
                let target = publisher.target().to_string();
                match publisher.publish(&draft).await {
                    Ok(record) => record,
                    Err(e) => DeploymentRecord::failure(target, e.to_string()),
                }
            }));
        }

        let mut deployments = Vec::with_capacity(handles.len());
        for (handle, target) in handles.into_iter().zip(targets) {
            match handle.await {
                Ok(record) => deployments.push(record),
                Err(e) => deployments.push(DeploymentRecord::failure(
                    target,
                    format!("publish task panicked: {e}"),
                )),
            }
        }

        let succeeded = deployments.iter().filter(|d| d.success).count();
        let total = deployments.len();
        ctx.deployments = deployments;
        if succeeded == 0 {
            PhaseRun::Failed(format!("all {total} publish targets failed"))
        } else {
            PhaseRun::Completed(Some(format!("{succeeded}/{total} targets succeeded")))
        }
    }

    async fn promotion(&self, ctx: &mut CycleContext) -> PhaseRun {
        let Some(marketing) = &self.capabilities.marketing else {
            return PhaseRun::Degraded("no marketing dispatcher, launch skipped".into());
        };
        match marketing.launch(&ctx.draft).await {
            Ok(outcomes) => {
                let sent = outcomes
                    .iter()
                    .filter(|o| matches!(o.status, CampaignStatus::Sent))
                    .count();
                let detail = format!("{} campaigns ({} sent)", outcomes.len(), sent);
                ctx.campaigns = outcomes;
                PhaseRun::Completed(Some(detail))
            }
            Err(e) => PhaseRun::Failed(e.to_string()),
        }
    }

    async fn competitive_intelligence(&self, ctx: &mut CycleContext) -> PhaseRun {
        let Some(intel) = &self.capabilities.intel else {
            ctx.intel = Some(IntelReport::analyzed_only(&ctx.assessment.niche));
            return PhaseRun::Degraded("no intel provider, niche noted without analysis".into());
        };
        match intel.analyze(&ctx.assessment.niche).await {
            Ok(report) => {
                let detail = format!(
                    "{} competitors, benchmark mid ${:.0}",
                    report.competitor_count, report.price_benchmark.mid
                );
                ctx.intel = Some(report);
                PhaseRun::Completed(Some(detail))
            }
            Err(e) => PhaseRun::Failed(e.to_string()),
        }
    }

    /// Observes an interim cycle record covering the nine phases already
    /// run, then drains the sink.
    fn metrics_flush(
        &self,
        ctx: &CycleContext,
        cycle_id: Uuid,
        started_at: DateTime<Utc>,
        phases: &[PhaseOutcome],
        errors: &[CycleError],
    ) -> PhaseRun {
        let Some(metrics) = &self.capabilities.metrics else {
            return PhaseRun::Degraded("no metrics sink".into());
        };
        let interim = assemble(ctx, cycle_id, started_at, phases, errors);
        metrics.observe_cycle(&interim);
        let snapshot = metrics.flush();
        PhaseRun::Completed(Some(format!(
            "{} counters, {} gauges flushed",
            snapshot.counters.len(),
            snapshot.gauges.len()
        )))
    }
}

/// Build the cycle record from the context and everything recorded so far.
fn assemble(
    ctx: &CycleContext,
    cycle_id: Uuid,
    started_at: DateTime<Utc>,
    phases: &[PhaseOutcome],
    errors: &[CycleError],
) -> CycleResult {
    CycleResult {
        cycle_id,
        started_at,
        finished_at: Utc::now(),
        phases: phases.to_vec(),
        errors: errors.to_vec(),
        niche: ctx.assessment.niche.clone(),
        listing_name: ctx.draft.name.clone(),
        list_price_usd: ctx.draft.price_usd,
        locales_produced: ctx.locales(),
        deployments: ctx.deployments.clone(),
        campaigns: ctx.campaigns.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use hk_capabilities::intel::CatalogIntelProvider;
    use hk_capabilities::marketing::ChannelDispatcher;
    use hk_capabilities::metrics::CycleMetrics;
    use hk_capabilities::mock::{MockContentEngine, MockPaymentProcessor, MockPublisher};
    use hk_capabilities::qa::ListingValidator;
    use hk_capabilities::{CapabilityError, MetricsSink};
    use hk_core::types::{Channel, MarketAssessment};

    fn executor(caps: CapabilitySet) -> PipelineExecutor {
        PipelineExecutor::new(caps, ExecutorSettings::default())
    }

    #[tokio::test]
    async fn empty_capability_set_degrades_every_phase() {
        let result = executor(CapabilitySet::default()).run_cycle().await;

        let order: Vec<Phase> = result.phases.iter().map(|p| p.phase).collect();
        assert_eq!(order, Phase::ALL.to_vec());
        assert!(result.phases.iter().all(|p| p.success && p.degraded));
        assert!(result.errors.is_empty());
        assert_eq!(result.locales_produced, vec!["en".to_string()]);
        assert_eq!(result.list_price_usd, 49.0);
        // Demo deployments stand in for real targets.
        assert_eq!(result.deployments.len(), 2);
        assert!(result.deployments.iter().all(|d| d.success));
        assert!(result.campaigns.is_empty());
    }

    #[tokio::test]
    async fn failed_phase_is_recorded_and_the_cycle_continues() {
        let engine = MockContentEngine::new().with_assessment_error(CapabilityError::Timeout);
        let caps = CapabilitySet {
            content: Some(Arc::new(engine)),
            ..CapabilitySet::default()
        };
        let result = executor(caps).run_cycle().await;

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].phase, Phase::MarketAnalysis);
        assert!(!result.phases[0].success);
        // Content generation still ran, against the fallback assessment.
        assert!(result.phases[1].success && !result.phases[1].degraded);
        assert_eq!(result.niche, MarketAssessment::fallback().niche);
    }

    #[tokio::test]
    async fn publish_fans_out_and_partial_failure_is_absorbed() {
        let mut caps = CapabilitySet::default();
        for i in 0..5 {
            let publisher = if i < 2 {
                MockPublisher::new(format!("target{i}")).with_error(CapabilityError::Timeout)
            } else {
                MockPublisher::new(format!("target{i}"))
            };
            caps.publishers.push(Arc::new(publisher));
        }
        let result = executor(caps).run_cycle().await;

        assert_eq!(result.deployments.len(), 5);
        assert_eq!(result.deployments.iter().filter(|d| d.success).count(), 3);
        assert!(!result.deployments[0].success);
        let publish = result
            .phases
            .iter()
            .find(|p| p.phase == Phase::MultiTargetPublish)
            .unwrap();
        assert!(publish.success && !publish.degraded);
        // Per-target failures live in the deployment list, not the error log.
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn publish_phase_fails_only_when_every_target_fails() {
        let mut caps = CapabilitySet::default();
        for name in ["gumroad", "etsy"] {
            caps.publishers.push(Arc::new(MockPublisher::new(name).with_error(
                CapabilityError::ApiError {
                    status: 500,
                    message: "upstream down".into(),
                },
            )));
        }
        let result = executor(caps).run_cycle().await;

        assert_eq!(result.deployments.len(), 2);
        assert!(result.deployments.iter().all(|d| !d.success));
        let publish = result
            .phases
            .iter()
            .find(|p| p.phase == Phase::MultiTargetPublish)
            .unwrap();
        assert!(!publish.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].phase, Phase::MultiTargetPublish);
    }

    #[tokio::test]
    async fn flagged_validation_does_not_block_publish() {
        let publisher = MockPublisher::new("gumroad");
        let caps = CapabilitySet {
            validator: Some(Arc::new(ListingValidator::new())),
            publishers: vec![Arc::new(publisher.clone())],
            ..CapabilitySet::default()
        };
        let result = executor(caps).run_cycle().await;

        // The placeholder listing's description is too short for the
        // strictest storefront policy, so the report does not pass.
        let validation = result
            .phases
            .iter()
            .find(|p| p.phase == Phase::Validation)
            .unwrap();
        assert!(validation.success && !validation.degraded);
        assert!(validation
            .detail
            .as_deref()
            .unwrap_or_default()
            .contains("passed=false"));
        assert_eq!(publisher.published_count(), 1);
        assert_eq!(result.deployments.len(), 1);
        assert!(result.deployments[0].success);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn pricing_respects_tier_and_assessment_corridor() {
        let mut assessment = MarketAssessment::fallback();
        assessment.price_ceiling_usd = 49.0;
        let caps = CapabilitySet {
            content: Some(Arc::new(
                MockContentEngine::new().with_assessment(assessment),
            )),
            payments: Some(Arc::new(MockPaymentProcessor::default())),
            ..CapabilitySet::default()
        };
        let result = executor(caps).run_cycle().await;

        // Mid anchor 60 pulled down to the assessed ceiling.
        assert_eq!(result.list_price_usd, 49.0);
        let pricing = result
            .phases
            .iter()
            .find(|p| p.phase == Phase::Pricing)
            .unwrap();
        assert!(pricing.success && !pricing.degraded);
    }

    #[tokio::test]
    async fn absent_payments_keeps_the_flat_base_price() {
        let caps = CapabilitySet {
            content: Some(Arc::new(MockContentEngine::new())),
            ..CapabilitySet::default()
        };
        let result = executor(caps).run_cycle().await;

        assert_eq!(result.list_price_usd, 49.0);
        let pricing = result
            .phases
            .iter()
            .find(|p| p.phase == Phase::Pricing)
            .unwrap();
        assert!(pricing.degraded);
    }

    #[tokio::test]
    async fn intel_signals_feed_market_analysis() {
        let engine = MockContentEngine::new();
        let caps = CapabilitySet {
            content: Some(Arc::new(engine.clone())),
            intel: Some(Arc::new(CatalogIntelProvider::new())),
            ..CapabilitySet::default()
        };
        let result = executor(caps).run_cycle().await;

        let batches = engine.captured_signal_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 5);
        assert_eq!(batches[0][0].niche, "AI Productivity");

        let intel = result
            .phases
            .iter()
            .find(|p| p.phase == Phase::CompetitiveIntelligence)
            .unwrap();
        assert!(intel.success && !intel.degraded);
    }

    #[tokio::test]
    async fn promotion_prepares_campaigns_without_credentials() {
        let dispatcher = ChannelDispatcher::new(
            vec![
                Channel::Tiktok,
                Channel::Youtube,
                Channel::Telegram,
                Channel::Discord,
                Channel::Email,
            ],
            Duration::from_secs(5),
        );
        let caps = CapabilitySet {
            marketing: Some(Arc::new(dispatcher)),
            ..CapabilitySet::default()
        };
        let result = executor(caps).run_cycle().await;

        assert_eq!(result.campaigns.len(), 5);
        assert!(result
            .campaigns
            .iter()
            .all(|c| matches!(c.status, CampaignStatus::Prepared)));
    }

    #[tokio::test]
    async fn metrics_phase_observes_and_drains_the_sink() {
        let sink = Arc::new(CycleMetrics::new());
        let caps = CapabilitySet {
            metrics: Some(sink.clone() as Arc<dyn MetricsSink>),
            ..CapabilitySet::default()
        };
        let result = executor(caps).run_cycle().await;

        let metrics = result
            .phases
            .iter()
            .find(|p| p.phase == Phase::MetricsFlush)
            .unwrap();
        assert!(metrics.success && !metrics.degraded);
        assert!(metrics
            .detail
            .as_deref()
            .unwrap_or_default()
            .contains("counters"));
        // The phase already flushed, so a second flush sees nothing.
        assert!(sink.flush().is_empty());
    }
}
