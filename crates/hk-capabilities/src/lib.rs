//! Optional collaborators for the hawker pipeline.
//!
//! Every capability the executor can call lives behind a trait in
//! [`traits`]. HTTP-backed and in-process implementations sit alongside,
//! [`registry`] wires them up from config and the environment, and
//! [`mock`] provides scriptable stand-ins for pipeline tests.

pub mod content;
pub mod intel;
pub mod localization;
pub mod marketing;
pub mod metrics;
pub mod mock;
pub mod payments;
pub mod publish;
pub mod qa;
pub mod registry;
pub mod traits;

// The surface the pipeline executor works against.
pub use registry::{CapabilityKind, CapabilityRegistry, CapabilitySet};
pub use traits::{
    CapabilityError, ContentEngine, IntelProvider, Localizer, MarketingDispatcher, MetricsSink,
    MetricsSnapshot, PaymentProcessor, Publisher, Validator,
};
