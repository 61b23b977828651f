//! In-process cycle metrics.
//!
//! The sink folds every cycle result into named counters and gauges,
//! then drains them on flush at the end of the cycle's metrics phase.
//! The flush log line is the operator-facing dump; nothing is exported
//! over the network.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::info;

use hk_core::types::{CampaignStatus, CycleResult};

use crate::traits::{MetricsSink, MetricsSnapshot};

#[derive(Default)]
struct MetricsInner {
    counters: BTreeMap<String, u64>,
    gauges: BTreeMap<String, f64>,
}

/// Metrics sink the registry installs by default.
pub struct CycleMetrics {
    inner: Mutex<MetricsInner>,
}

impl CycleMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsInner::default()),
        }
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut MetricsInner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut inner)
    }
}

impl Default for CycleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for CycleMetrics {
    fn observe_cycle(&self, result: &CycleResult) {
        let phases_failed = result.phases.iter().filter(|p| !p.success).count() as u64;
        let phases_degraded = result.phases.iter().filter(|p| p.degraded).count() as u64;
        let deployments_ok = result.deployments_succeeded() as u64;
        let deployments_failed = result.deployments.len() as u64 - deployments_ok;
        let campaigns_sent = result
            .campaigns
            .iter()
            .filter(|c| c.status == CampaignStatus::Sent)
            .count() as u64;

        self.with_inner(|inner| {
            let mut bump = |key: &str, delta: u64| {
                *inner.counters.entry(key.to_string()).or_insert(0) += delta;
            };
            bump("cycles_total", 1);
            bump("cycle_errors_total", result.errors.len() as u64);
            bump("phases_failed_total", phases_failed);
            bump("phases_degraded_total", phases_degraded);
            bump("deployments_succeeded_total", deployments_ok);
            bump("deployments_failed_total", deployments_failed);
            bump("campaigns_total", result.campaigns.len() as u64);
            bump("campaigns_sent_total", campaigns_sent);
            for phase in result.phases.iter().filter(|p| !p.success) {
                bump(&format!("phase_{}_failures", phase.phase.as_str()), 1);
            }

            inner
                .gauges
                .insert("last_cycle_duration_seconds".to_string(), result.duration_seconds());
            inner
                .gauges
                .insert("last_cycle_list_price_usd".to_string(), result.list_price_usd);
            inner.gauges.insert(
                "last_cycle_locales".to_string(),
                result.locales_produced.len() as f64,
            );
        });

        info!(
            cycle_id = %result.cycle_id,
            errors = result.errors.len(),
            phases_failed,
            deployments_ok,
            "cycle observed"
        );
    }

    fn flush(&self) -> MetricsSnapshot {
        let snapshot = self.with_inner(|inner| MetricsSnapshot {
            counters: std::mem::take(&mut inner.counters),
            gauges: std::mem::take(&mut inner.gauges),
        });
        info!(
            counters = ?snapshot.counters,
            gauges = ?snapshot.gauges,
            "metrics flushed"
        );
        snapshot
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
