//! Daemon health tracking.
//!
//! The monitor keeps cumulative counters for the life of the process and
//! combines them with point-in-time resource gauges on every sample.
//! Counters only grow; restarting the process is the only reset, so the
//! status communicates trend, not instantaneous mood.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;

use hk_core::config::HealthConfig;
use hk_core::types::{CycleResult, HealthSnapshot, HealthStatus};

use crate::resources::{ResourceProbe, SystemProbe};

/// Rolling window of supervisor events embedded in every snapshot.
const RECENT_EVENTS_CAP: usize = 20;

struct MonitorInner {
    cycles_completed: u64,
    errors_encountered: u64,
    recent_events: VecDeque<String>,
}

// ---------------------------------------------------------------------------
// HealthMonitor
// ---------------------------------------------------------------------------

pub struct HealthMonitor {
    config: HealthConfig,
    probe: Box<dyn ResourceProbe>,
    client: reqwest::Client,
    started: Instant,
    inner: Mutex<MonitorInner>,
}

impl HealthMonitor {
    pub fn new(config: &HealthConfig) -> Self {
        Self::with_probe(config, Box::new(SystemProbe))
    }

    /// Monitor with a caller-supplied gauge source.
    pub fn with_probe(config: &HealthConfig, probe: Box<dyn ResourceProbe>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config: config.clone(),
            probe,
            client,
            started: Instant::now(),
            inner: Mutex::new(MonitorInner {
                cycles_completed: 0,
                errors_encountered: 0,
                recent_events: VecDeque::new(),
            }),
        }
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut MonitorInner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut inner)
    }

    /// Fold one finished cycle into the cumulative counters.
    pub fn record_cycle(&self, result: &CycleResult) {
        self.with_inner(|inner| {
            inner.cycles_completed += 1;
            inner.errors_encountered += result.errors.len() as u64;
            push_event(
                &mut inner.recent_events,
                format!(
                    "cycle {}: {} errors, {} deployments",
                    result.cycle_id,
                    result.errors.len(),
                    result.deployments_succeeded()
                ),
            );
        });
    }

    /// Note a supervisor-level event (retry exhaustion, persistence
    /// trouble) in the rolling event window.
    pub fn record_event(&self, message: impl Into<String>) {
        self.with_inner(|inner| push_event(&mut inner.recent_events, message.into()));
    }

    pub fn errors_encountered(&self) -> u64 {
        self.with_inner(|inner| inner.errors_encountered)
    }

    /// Read the gauges, probe the network, and classify.
    ///
    /// The network probe is reachability only: any response counts, and an
    /// unreachable endpoint flips `network_ok` without touching status.
    pub async fn sample(&self) -> HealthSnapshot {
        let gauges = self.probe.sample();
        let network_ok = self.client.get(&self.config.probe_url).send().await.is_ok();
        let (cycles_completed, errors_encountered, recent_events) = self.with_inner(|inner| {
            (
                inner.cycles_completed,
                inner.errors_encountered,
                inner.recent_events.iter().cloned().collect::<Vec<_>>(),
            )
        });
        let status = self.classify(
            gauges.cpu_percent,
            gauges.memory_percent,
            gauges.disk_percent,
            errors_encountered,
        );
        HealthSnapshot {
            timestamp: Utc::now(),
            uptime_seconds: self.started.elapsed().as_secs(),
            cpu_percent: gauges.cpu_percent,
            memory_percent: gauges.memory_percent,
            disk_percent: gauges.disk_percent,
            network_ok,
            cycles_completed,
            errors_encountered,
            status,
            recent_events,
        }
    }

    /// Cumulative errors dominate; resource pressure alone never goes
    /// past warning.
    fn classify(&self, cpu: f64, memory: f64, disk: f64, errors: u64) -> HealthStatus {
        if errors > self.config.error_critical_threshold {
            HealthStatus::Critical
        } else if cpu > self.config.cpu_warn_percent
            || memory > self.config.memory_warn_percent
            || disk > self.config.disk_warn_percent
        {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}

fn push_event(events: &mut VecDeque<String>, message: String) {
    if events.len() == RECENT_EVENTS_CAP {
        events.pop_front();
    }
    events.push_back(message);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{FixedProbe, ResourceSample};
    use hk_core::types::{CycleError, Phase};
    use uuid::Uuid;

    /// Probe URL on a port nothing listens on, so network checks fail
    /// fast instead of leaving the sandbox.
    fn offline_config() -> HealthConfig {
        HealthConfig {
            probe_url: "http://127.0.0.1:1/".to_string(),
            probe_timeout_secs: 1,
            ..HealthConfig::default()
        }
    }

    fn quiet_probe() -> Box<FixedProbe> {
        Box::new(FixedProbe(ResourceSample::default()))
    }

    fn result_with_errors(count: usize) -> CycleResult {
        let now = Utc::now();
        CycleResult {
            cycle_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            phases: Vec::new(),
            errors: (0..count)
                .map(|i| CycleError {
                    phase: Phase::MultiTargetPublish,
                    message: format!("error {i}"),
                })
                .collect(),
            niche: "AI Productivity".to_string(),
            listing_name: "AI Productivity Template".to_string(),
            list_price_usd: 49.0,
            locales_produced: vec!["en".to_string()],
            deployments: Vec::new(),
            campaigns: Vec::new(),
        }
    }

    #[test]
    fn classification_thresholds() {
        let monitor = HealthMonitor::with_probe(&offline_config(), quiet_probe());
        assert_eq!(monitor.classify(10.0, 10.0, 10.0, 0), HealthStatus::Healthy);
        assert_eq!(monitor.classify(85.0, 10.0, 10.0, 0), HealthStatus::Warning);
        assert_eq!(monitor.classify(10.0, 85.0, 10.0, 0), HealthStatus::Warning);
        assert_eq!(monitor.classify(10.0, 10.0, 95.0, 0), HealthStatus::Warning);
        // Exactly at a threshold is still fine.
        assert_eq!(monitor.classify(80.0, 80.0, 90.0, 0), HealthStatus::Healthy);
        // Errors dominate every gauge.
        assert_eq!(monitor.classify(85.0, 85.0, 95.0, 11), HealthStatus::Critical);
    }

    #[tokio::test]
    async fn eleventh_error_flips_critical_and_it_stays() {
        let monitor = HealthMonitor::with_probe(&offline_config(), quiet_probe());

        for _ in 0..10 {
            monitor.record_cycle(&result_with_errors(1));
        }
        assert_eq!(monitor.sample().await.status, HealthStatus::Healthy);

        monitor.record_cycle(&result_with_errors(1));
        assert_eq!(monitor.sample().await.status, HealthStatus::Critical);

        // Clean cycles do not reset the cumulative count.
        monitor.record_cycle(&result_with_errors(0));
        let snapshot = monitor.sample().await;
        assert_eq!(snapshot.status, HealthStatus::Critical);
        assert_eq!(snapshot.errors_encountered, 11);
        assert_eq!(snapshot.cycles_completed, 12);
    }

    #[tokio::test]
    async fn unreachable_network_is_reported_but_not_status() {
        let probe = Box::new(FixedProbe(ResourceSample {
            cpu_percent: 85.0,
            memory_percent: 10.0,
            disk_percent: 10.0,
        }));
        let monitor = HealthMonitor::with_probe(&offline_config(), probe);
        let snapshot = monitor.sample().await;
        assert!(!snapshot.network_ok);
        assert_eq!(snapshot.status, HealthStatus::Warning);
    }

    #[tokio::test]
    async fn recent_events_window_is_bounded() {
        let monitor = HealthMonitor::with_probe(&offline_config(), quiet_probe());
        for i in 0..25 {
            monitor.record_event(format!("event {i}"));
        }
        let snapshot = monitor.sample().await;
        assert_eq!(snapshot.recent_events.len(), 20);
        assert_eq!(snapshot.recent_events[0], "event 5");
        assert_eq!(snapshot.recent_events[19], "event 24");
    }
}
