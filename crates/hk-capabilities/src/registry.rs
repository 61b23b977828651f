//! Capability registry.
//!
//! `CapabilityRegistry::build` attempts to construct every collaborator
//! the pipeline can use. A capability whose credential is missing, or
//! whose config section is disabled, is left absent; construction of
//! the others proceeds. Building never fails; the worst case is a set
//! with nothing in it, and the pipeline still runs on defaults.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use hk_core::config::{Config, CredentialProvider};

use crate::content::AnthropicContentEngine;
use crate::intel::CatalogIntelProvider;
use crate::localization::TableLocalizer;
use crate::marketing::ChannelDispatcher;
use crate::metrics::CycleMetrics;
use crate::payments::WalletPaymentProcessor;
use crate::publish::{HttpPublisher, PlatformProfile};
use crate::qa::ListingValidator;
use crate::traits::{
    ContentEngine, IntelProvider, Localizer, MarketingDispatcher, MetricsSink, PaymentProcessor,
    Publisher, Validator,
};

// ---------------------------------------------------------------------------
// CapabilityKind
// ---------------------------------------------------------------------------

/// Names for the fixed set of optional collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Content,
    Localization,
    Publish,
    Validation,
    Payments,
    Marketing,
    Intel,
    Metrics,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 8] = [
        CapabilityKind::Content,
        CapabilityKind::Localization,
        CapabilityKind::Publish,
        CapabilityKind::Validation,
        CapabilityKind::Payments,
        CapabilityKind::Marketing,
        CapabilityKind::Intel,
        CapabilityKind::Metrics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Content => "content",
            CapabilityKind::Localization => "localization",
            CapabilityKind::Publish => "publish",
            CapabilityKind::Validation => "validation",
            CapabilityKind::Payments => "payments",
            CapabilityKind::Marketing => "marketing",
            CapabilityKind::Intel => "intel",
            CapabilityKind::Metrics => "metrics",
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CapabilitySet
// ---------------------------------------------------------------------------

/// The collaborators one process lifetime runs with. Built once at
/// startup; membership never changes afterwards.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    pub content: Option<Arc<dyn ContentEngine>>,
    pub localizer: Option<Arc<dyn Localizer>>,
    pub publishers: Vec<Arc<dyn Publisher>>,
    pub validator: Option<Arc<dyn Validator>>,
    pub payments: Option<Arc<dyn PaymentProcessor>>,
    pub marketing: Option<Arc<dyn MarketingDispatcher>>,
    pub intel: Option<Arc<dyn IntelProvider>>,
    pub metrics: Option<Arc<dyn MetricsSink>>,
}

impl CapabilitySet {
    pub fn has(&self, kind: CapabilityKind) -> bool {
        match kind {
            CapabilityKind::Content => self.content.is_some(),
            CapabilityKind::Localization => self.localizer.is_some(),
            CapabilityKind::Publish => !self.publishers.is_empty(),
            CapabilityKind::Validation => self.validator.is_some(),
            CapabilityKind::Payments => self.payments.is_some(),
            CapabilityKind::Marketing => self.marketing.is_some(),
            CapabilityKind::Intel => self.intel.is_some(),
            CapabilityKind::Metrics => self.metrics.is_some(),
        }
    }

    pub fn available(&self) -> Vec<CapabilityKind> {
        CapabilityKind::ALL
            .into_iter()
            .filter(|k| self.has(*k))
            .collect()
    }

    pub fn missing(&self) -> Vec<CapabilityKind> {
        CapabilityKind::ALL
            .into_iter()
            .filter(|k| !self.has(*k))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// CapabilityRegistry
// ---------------------------------------------------------------------------

pub struct CapabilityRegistry;

impl CapabilityRegistry {
    /// Construct every capability the config enables and the
    /// environment has credentials for.
    pub fn build(config: &Config) -> CapabilitySet {
        let timeout = Duration::from_secs(config.pipeline.request_timeout_secs);
        let mut set = CapabilitySet::default();

        if config.content.enabled {
            match CredentialProvider::from_env(&config.content.api_key_env) {
                Some(api_key) => {
                    let engine =
                        AnthropicContentEngine::new(api_key, config.content.model.clone(), timeout)
                            .with_base_url(config.content.base_url.clone());
                    set.content = Some(Arc::new(engine));
                }
                None => warn!(
                    env = %config.content.api_key_env,
                    "content credential not set, capability absent"
                ),
            }
        }

        if config.localization.enabled {
            let localizer = TableLocalizer::new(&config.localization.locales);
            if localizer.locale_count() > 0 {
                set.localizer = Some(Arc::new(localizer));
            } else {
                warn!("no supported locales configured, localization absent");
            }
        }

        if config.publish.enabled {
            for target in &config.publish.targets {
                let Some(profile) = PlatformProfile::named(&target.name) else {
                    warn!(target = %target.name, "unknown publish target, skipped");
                    continue;
                };
                let Some(api_key) = CredentialProvider::from_env(&target.api_key_env) else {
                    warn!(
                        target = %target.name,
                        env = %target.api_key_env,
                        "publish credential not set, target skipped"
                    );
                    continue;
                };
                let mut publisher =
                    HttpPublisher::new(profile, api_key, target.daily_cap, timeout);
                if let Some(base_url) = &target.base_url {
                    publisher = publisher.with_base_url(base_url.clone());
                }
                set.publishers.push(Arc::new(publisher));
            }
        }

        if config.quality.enabled {
            set.validator = Some(Arc::new(ListingValidator::new()));
        }

        if config.payments.enabled {
            match WalletPaymentProcessor::from_env() {
                Some(processor) => set.payments = Some(Arc::new(processor)),
                None => warn!("no wallet addresses configured, payments absent"),
            }
        }

        if config.marketing.enabled {
            let channels = config.marketing.parsed_channels();
            if channels.is_empty() {
                warn!("no marketing channels configured, marketing absent");
            } else {
                let mut dispatcher = ChannelDispatcher::new(channels, timeout);
                let token = CredentialProvider::from_env(&config.marketing.telegram_token_env);
                let chat_id = CredentialProvider::from_env(&config.marketing.telegram_chat_id_env);
                if let (Some(token), Some(chat_id)) = (token, chat_id) {
                    dispatcher = dispatcher.with_telegram(token, chat_id);
                }
                if let Some(webhook) =
                    CredentialProvider::from_env(&config.marketing.discord_webhook_env)
                {
                    dispatcher = dispatcher.with_discord(webhook);
                }
                set.marketing = Some(Arc::new(dispatcher));
            }
        }

        if config.intel.enabled {
            set.intel = Some(Arc::new(CatalogIntelProvider::new()));
        }

        if config.metrics.enabled {
            set.metrics = Some(Arc::new(CycleMetrics::new()));
        }

        let available: Vec<&str> = set.available().iter().map(|k| k.as_str()).collect();
        let missing: Vec<&str> = set.missing().iter().map(|k| k.as_str()).collect();
        info!(?available, ?missing, "capability registry built");
        set
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
