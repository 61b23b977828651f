//! Mock capability providers for pipeline tests.
//!
//! Each mock pops queued responses and falls back to a sensible default
//! when the queue is empty, so tests only script the interactions they
//! care about. Inputs are captured for assertion.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use hk_core::types::{
    AssetPlan, ContentSpec, DeploymentRecord, ListingDraft, MarketAssessment, MarketSignal,
    PaymentRail,
};

use crate::content::plan_assets;
use crate::traits::{CapabilityError, ContentEngine, PaymentProcessor, Publisher};

// ---------------------------------------------------------------------------
// MockContentEngine
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockContentEngine {
    assessments: Arc<Mutex<VecDeque<Result<MarketAssessment, CapabilityError>>>>,
    specs: Arc<Mutex<VecDeque<Result<ContentSpec, CapabilityError>>>>,
    captured_signals: Arc<Mutex<Vec<Vec<MarketSignal>>>>,
}

impl MockContentEngine {
    pub fn new() -> Self {
        Self {
            assessments: Arc::new(Mutex::new(VecDeque::new())),
            specs: Arc::new(Mutex::new(VecDeque::new())),
            captured_signals: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_assessment(self, assessment: MarketAssessment) -> Self {
        self.assessments
            .lock()
            .unwrap()
            .push_back(Ok(assessment));
        self
    }

    pub fn with_assessment_error(self, error: CapabilityError) -> Self {
        self.assessments.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_spec(self, spec: ContentSpec) -> Self {
        self.specs.lock().unwrap().push_back(Ok(spec));
        self
    }

    pub fn with_spec_error(self, error: CapabilityError) -> Self {
        self.specs.lock().unwrap().push_back(Err(error));
        self
    }

    /// Signal batches passed to `assess_market`, in call order.
    pub fn captured_signal_batches(&self) -> Vec<Vec<MarketSignal>> {
        self.captured_signals.lock().unwrap().clone()
    }
}

impl Default for MockContentEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentEngine for MockContentEngine {
    async fn assess_market(
        &self,
        signals: &[MarketSignal],
    ) -> Result<MarketAssessment, CapabilityError> {
        self.captured_signals.lock().unwrap().push(signals.to_vec());
        self.assessments
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(MarketAssessment::fallback()))
    }

    async fn generate(
        &self,
        assessment: &MarketAssessment,
    ) -> Result<ContentSpec, CapabilityError> {
        self.specs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ContentSpec::placeholder(&assessment.niche)))
    }

    async fn design_assets(&self, spec: &ContentSpec) -> Result<Vec<AssetPlan>, CapabilityError> {
        Ok(plan_assets(spec))
    }
}

// ---------------------------------------------------------------------------
// MockPublisher
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockPublisher {
    target: String,
    responses: Arc<Mutex<VecDeque<Result<DeploymentRecord, CapabilityError>>>>,
    published: Arc<Mutex<Vec<ListingDraft>>>,
}

impl MockPublisher {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, record: DeploymentRecord) -> Self {
        self.responses.lock().unwrap().push_back(Ok(record));
        self
    }

    pub fn with_error(self, error: CapabilityError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn last_published(&self) -> Option<ListingDraft> {
        self.published.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn target(&self) -> &str {
        &self.target
    }

    async fn publish(&self, draft: &ListingDraft) -> Result<DeploymentRecord, CapabilityError> {
        self.published.lock().unwrap().push(draft.clone());
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(DeploymentRecord::success(
                self.target.clone(),
                format!("https://{}.example/listing/{}", self.target, draft.id),
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// MockPaymentProcessor
// ---------------------------------------------------------------------------

pub struct MockPaymentProcessor {
    rails: Vec<PaymentRail>,
}

impl MockPaymentProcessor {
    pub fn new(rails: Vec<PaymentRail>) -> Self {
        Self { rails }
    }
}

impl Default for MockPaymentProcessor {
    fn default() -> Self {
        Self {
            rails: vec![
                PaymentRail::fiat_usd(),
                PaymentRail {
                    symbol: "ETH".to_string(),
                    network: "ethereum".to_string(),
                    address: "0xmock".to_string(),
                    uri: Some("ethereum:0xmock".to_string()),
                },
            ],
        }
    }
}

impl PaymentProcessor for MockPaymentProcessor {
    fn rails(&self, _list_price_usd: f64) -> Vec<PaymentRail> {
        self.rails.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hk_core::types::CompetitionLevel;

    #[tokio::test]
    async fn content_engine_pops_queue_then_defaults() {
        let engine = MockContentEngine::new().with_assessment(MarketAssessment {
            niche: "Scripted Niche".to_string(),
            trend_score: 0.5,
            competition: CompetitionLevel::Low,
            price_floor_usd: 10.0,
            price_ceiling_usd: 20.0,
            gaps: Vec::new(),
            recommended_kind: hk_core::types::ListingKind::PdfGuide,
        });

        let first = engine.assess_market(&[]).await.unwrap();
        assert_eq!(first.niche, "Scripted Niche");

        let second = engine.assess_market(&[]).await.unwrap();
        assert_eq!(second.niche, MarketAssessment::fallback().niche);
        assert_eq!(engine.captured_signal_batches().len(), 2);
    }

    #[tokio::test]
    async fn publisher_records_drafts_and_defaults_to_success() {
        let publisher = MockPublisher::new("gumroad")
            .with_error(CapabilityError::Timeout);
        let draft = ListingDraft::from_spec(
            &ContentSpec::placeholder("AI Productivity"),
            49.0,
            vec!["en".to_string()],
        );

        let first = publisher.publish(&draft).await;
        assert!(matches!(first, Err(CapabilityError::Timeout)));

        let second = publisher.publish(&draft).await.unwrap();
        assert!(second.success);
        assert_eq!(second.target, "gumroad");
        assert_eq!(publisher.published_count(), 2);
    }

    #[test]
    fn default_payment_processor_has_two_rails() {
        let rails = MockPaymentProcessor::default().rails(49.0);
        assert_eq!(rails.len(), 2);
        assert_eq!(rails[0].symbol, "USD");
        assert_eq!(rails[1].symbol, "ETH");
    }
}
