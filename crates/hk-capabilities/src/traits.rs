//! Capability trait seams for the cycle pipeline.
//!
//! Each cycle phase talks to at most one of these traits. The concrete
//! providers live in sibling modules; [`crate::registry`] wires the
//! configured ones into the set the executor runs against. A missing
//! provider is not an error: the executor substitutes the phase's
//! built-in default and marks the outcome degraded.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use hk_core::types::{
    AssetPlan, CampaignOutcome, Channel, ContentSpec, CycleResult, DeploymentRecord, IntelReport,
    ListingDraft, LocalizedBundle, MarketAssessment, MarketSignal, PaymentRail, ValidationReport,
};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors a capability provider can surface to the executor.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// An HTTP-level error (connection failure, DNS, TLS, etc.).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The API returned a non-success status with a message.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse the API response body.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The API indicated rate limiting (HTTP 429).
    #[error("rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// A credential env var the provider needs is unset.
    #[error("credential {0} is not set")]
    MissingCredential(String),

    /// The target's daily publish cap has been reached.
    #[error("daily cap reached for {target} ({cap}/day)")]
    CapExhausted { target: String, cap: u32 },
}

impl From<reqwest::Error> for CapabilityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CapabilityError::Timeout
        } else {
            CapabilityError::HttpError(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Market assessment, listing generation and asset planning.
#[async_trait]
pub trait ContentEngine: Send + Sync {
    /// Pick the niche this cycle builds for from raw demand signals.
    async fn assess_market(
        &self,
        signals: &[MarketSignal],
    ) -> Result<MarketAssessment, CapabilityError>;

    /// Produce a listing spec for the assessed niche.
    async fn generate(
        &self,
        assessment: &MarketAssessment,
    ) -> Result<ContentSpec, CapabilityError>;

    /// Plan the promotional assets for a listing.
    async fn design_assets(&self, spec: &ContentSpec) -> Result<Vec<AssetPlan>, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Localization
// ---------------------------------------------------------------------------

/// Renders a listing spec into every configured locale.
#[async_trait]
pub trait Localizer: Send + Sync {
    async fn localize(
        &self,
        spec: &ContentSpec,
        base_price_usd: f64,
    ) -> Result<LocalizedBundle, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

/// Pushes a listing to one sales target.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Stable target name, e.g. "gumroad".
    fn target(&self) -> &str;

    async fn publish(&self, draft: &ListingDraft) -> Result<DeploymentRecord, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Pre-publication quality screen.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, draft: &ListingDraft) -> Result<ValidationReport, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Supplies the payment rails a listing is sold on. Rail discovery reads
/// wallet env vars, so no I/O is involved and the trait stays sync.
pub trait PaymentProcessor: Send + Sync {
    fn rails(&self, list_price_usd: f64) -> Vec<PaymentRail>;
}

// ---------------------------------------------------------------------------
// Marketing
// ---------------------------------------------------------------------------

/// Prepares launch campaigns and delivers them on channels that have
/// live credentials.
#[async_trait]
pub trait MarketingDispatcher: Send + Sync {
    /// Channels this dispatcher prepares campaigns for.
    fn channels(&self) -> Vec<Channel>;

    async fn launch(&self, draft: &ListingDraft) -> Result<Vec<CampaignOutcome>, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Intelligence
// ---------------------------------------------------------------------------

/// Demand signals and competitor research.
#[async_trait]
pub trait IntelProvider: Send + Sync {
    /// Demand signals fed into market analysis at the top of a cycle.
    fn signals(&self) -> Vec<MarketSignal>;

    /// Post-publication competitor analysis for the cycle's niche.
    async fn analyze(&self, niche: &str) -> Result<IntelReport, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Point-in-time dump of the metrics sink, drained on flush.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, f64>,
}

impl MetricsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.gauges.is_empty()
    }
}

/// Cycle counters, folded in per cycle and flushed at the end of each.
pub trait MetricsSink: Send + Sync {
    fn observe_cycle(&self, result: &CycleResult);

    /// Drain the current counters and return the dump.
    fn flush(&self) -> MetricsSnapshot;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let err = CapabilityError::ApiError {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "API error (status 503): maintenance");

        let err = CapabilityError::CapExhausted {
            target: "gumroad".to_string(),
            cap: 10,
        };
        assert_eq!(err.to_string(), "daily cap reached for gumroad (10/day)");

        let err = CapabilityError::MissingCredential("GUMROAD_API_KEY".to_string());
        assert_eq!(err.to_string(), "credential GUMROAD_API_KEY is not set");
    }

    #[test]
    fn empty_snapshot_reports_empty() {
        let snap = MetricsSnapshot::default();
        assert!(snap.is_empty());

        let mut snap = MetricsSnapshot::default();
        snap.counters.insert("cycles".to_string(), 1);
        assert!(!snap.is_empty());
    }
}
