//! Cycle supervision: retries, lifecycle state, persistence, scheduling.
//!
//! The supervisor owns everything around a cycle that the pipeline itself
//! does not: deciding whether a finished cycle counts as a failure, retrying
//! failed cycles with a cooldown, keeping the status file current, and
//! sleeping between cycles until a stop arrives.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use hk_core::config::Config;
use hk_core::reports::{DaemonStatus, LastCycleSummary, ReportStore, ReportStoreError};
use hk_core::types::{CycleResult, DaemonState};
use hk_harness::{StopGuard, StopSignal};
use hk_pipeline::PipelineExecutor;

use crate::health::HealthMonitor;

// ---------------------------------------------------------------------------
// CycleRunner
// ---------------------------------------------------------------------------

/// Anything the supervisor can drive through repeated cycles.
///
/// The daemon binary plugs in a [`PipelineExecutor`]; tests plug in scripted
/// runners that fail on cue.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> CycleResult;
}

#[async_trait]
impl CycleRunner for PipelineExecutor {
    async fn run_cycle(&self) -> CycleResult {
        PipelineExecutor::run_cycle(self).await
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("report store error: {0}")]
    Store(#[from] ReportStoreError),
}

// ---------------------------------------------------------------------------
// DaemonSupervisor
// ---------------------------------------------------------------------------

pub struct DaemonSupervisor {
    config: Config,
    runner: Box<dyn CycleRunner>,
    store: ReportStore,
    health: HealthMonitor,
    stop: StopSignal,
    state: DaemonState,
    status: DaemonStatus,
}

impl DaemonSupervisor {
    pub fn new(config: Config, runner: Box<dyn CycleRunner>) -> Self {
        let store = ReportStore::for_config(&config);
        let health = HealthMonitor::new(&config.health);
        Self {
            config,
            runner,
            store,
            health,
            stop: StopSignal::new(),
            state: DaemonState::Idle,
            status: DaemonStatus::new(DaemonState::Idle),
        }
    }

    /// Handle for signal handlers and tests to request a stop.
    pub fn stop_handle(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    pub fn status(&self) -> &DaemonStatus {
        &self.status
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    fn transition(&mut self, next: DaemonState) {
        if !self.state.can_transition_to(next) {
            debug_assert!(false, "illegal transition {} -> {}", self.state, next);
            warn!(from = %self.state, to = %next, "illegal daemon state transition");
        }
        self.state = next;
        self.status.state = next;
    }

    // -----------------------------------------------------------------------
    // Continuous operation
    // -----------------------------------------------------------------------

    /// Run cycles forever, sleeping `cycle_interval_secs` between them,
    /// until a stop is requested. Stops are honored at loop boundaries, so
    /// a cycle in flight always finishes before the daemon winds down.
    pub async fn run(&mut self) -> Result<(), SupervisorError> {
        let _guard = StopGuard::new(self.stop.clone());
        info!(
            interval_secs = self.config.daemon.cycle_interval_secs,
            max_retries = self.config.daemon.max_retries,
            "daemon supervisor starting"
        );
        self.persist_status_or_log();

        loop {
            if self.stop.stop_requested() {
                break;
            }
            self.transition(DaemonState::Running);
            self.persist_status_or_log();

            self.run_supervised_cycle().await;

            if self.stop.stop_requested() {
                break;
            }
            self.transition(DaemonState::Sleeping);
            self.persist_status_or_log();

            let interval = Duration::from_secs(self.config.daemon.cycle_interval_secs);
            debug!(secs = interval.as_secs(), "sleeping until the next cycle");
            if !self.sleep_interruptibly(interval).await {
                break;
            }
        }

        self.transition(DaemonState::Stopping);
        self.persist_status_or_log();
        self.transition(DaemonState::Stopped);
        self.status.updated_at = Utc::now();
        self.store.write_status(&self.status)?;
        info!(
            cycles = self.status.cycles_completed,
            failed = self.status.cycles_failed,
            "daemon supervisor stopped"
        );
        Ok(())
    }

    /// Run one cycle and retry it, up to `max_retries` total attempts, while
    /// it keeps failing. Every attempt is recorded and persisted; exhausting
    /// the retries is logged and then the daemon simply moves on to the next
    /// interval.
    pub async fn run_supervised_cycle(&mut self) -> CycleResult {
        let max_retries = self.config.daemon.max_retries;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let result = self.runner.run_cycle().await;
            let failed = result.is_failure(self.config.daemon.error_threshold);

            self.health.record_cycle(&result);
            self.record_cycle_in_status(&result, failed);
            self.status.health = Some(self.health.sample().await);
            self.persist_cycle(&result);
            self.persist_status_or_log();

            if !failed {
                return result;
            }
            warn!(
                attempt,
                max_retries,
                errors = result.error_count(),
                "cycle exceeded the error threshold"
            );
            if attempt >= max_retries {
                warn!(attempts = attempt, "retries exhausted, giving up on this cycle");
                self.health
                    .record_event(format!("retries exhausted after {attempt} attempts"));
                self.persist_status_or_log();
                return result;
            }

            self.transition(DaemonState::Retrying);
            self.persist_status_or_log();
            let delay = Duration::from_secs(self.config.daemon.retry_delay_secs);
            info!(delay_secs = delay.as_secs(), "cooling down before retry");
            if !self.sleep_interruptibly(delay).await {
                // Stop arrived mid-cooldown; hand the failed result back and
                // let the outer loop wind down from Retrying.
                return result;
            }
            self.transition(DaemonState::Running);
        }
    }

    // -----------------------------------------------------------------------
    // One-shot operation
    // -----------------------------------------------------------------------

    /// Run a single cycle with no retries.
    ///
    /// Unlike continuous mode, persistence failures are fatal here: a
    /// one-shot invocation that cannot write its report has nothing to show
    /// for itself. Phase errors inside the cycle are still just data.
    pub async fn run_once(&mut self) -> Result<CycleResult, SupervisorError> {
        info!("running a single supervised cycle");
        self.transition(DaemonState::Running);

        let result = self.runner.run_cycle().await;
        let failed = result.is_failure(self.config.daemon.error_threshold);

        self.health.record_cycle(&result);
        self.record_cycle_in_status(&result, failed);
        self.status.health = Some(self.health.sample().await);

        let path = self.store.save_cycle(&result)?;
        info!(path = %path.display(), errors = result.error_count(), "cycle report written");

        self.transition(DaemonState::Stopping);
        self.transition(DaemonState::Stopped);
        self.status.updated_at = Utc::now();
        self.store.write_status(&self.status)?;
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    fn record_cycle_in_status(&mut self, result: &CycleResult, failed: bool) {
        self.status.today.roll_over(Utc::now().date_naive());
        self.status
            .today
            .observe(result, self.config.daemon.error_threshold);
        if failed {
            self.status.cycles_failed += 1;
            self.status.consecutive_failures += 1;
        } else {
            self.status.cycles_completed += 1;
            self.status.consecutive_failures = 0;
        }
        self.status.errors_encountered += result.errors.len() as u64;
        self.status.last_cycle = Some(LastCycleSummary::from_result(result));
    }

    /// Best-effort report write. The daemon keeps running when the disk
    /// misbehaves; the failure lands in the health event window instead.
    fn persist_cycle(&self, result: &CycleResult) {
        match self.store.save_cycle(result) {
            Ok(path) => debug!(path = %path.display(), "cycle report written"),
            Err(e) => {
                error!(error = %e, "failed to persist cycle report");
                self.health
                    .record_event(format!("report persistence failed: {e}"));
            }
        }
    }

    fn persist_status_or_log(&mut self) {
        self.status.updated_at = Utc::now();
        if let Err(e) = self.store.write_status(&self.status) {
            error!(error = %e, "failed to persist daemon status");
        }
    }

    /// Sleep for `duration`, waking early when a stop arrives. Returns
    /// `false` when the sleep was cut short.
    async fn sleep_interruptibly(&self, duration: Duration) -> bool {
        if self.stop.stop_requested() {
            return false;
        }
        let mut stop_rx = self.stop.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.stop.stop_requested(),
            _ = stop_rx.recv() => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use hk_core::types::{CycleError, Phase};
    use uuid::Uuid;

    /// Runner that replays a scripted list of results, then clean ones.
    #[derive(Clone)]
    struct ScriptedRunner {
        inner: Arc<ScriptedInner>,
    }

    struct ScriptedInner {
        results: Mutex<VecDeque<CycleResult>>,
        calls: AtomicU32,
    }

    impl ScriptedRunner {
        fn with_results(results: Vec<CycleResult>) -> Self {
            Self {
                inner: Arc::new(ScriptedInner {
                    results: Mutex::new(results.into()),
                    calls: AtomicU32::new(0),
                }),
            }
        }

        fn calls(&self) -> u32 {
            self.inner.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CycleRunner for ScriptedRunner {
        async fn run_cycle(&self) -> CycleResult {
            self.inner.calls.fetch_add(1, Ordering::SeqCst);
            self.inner
                .results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(clean_result)
        }
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

    fn clean_result() -> CycleResult {
        result_with_errors(0)
    }

    /// Over the default threshold of three errors.
    fn failing_result() -> CycleResult {
        result_with_errors(5)
    }

    fn test_config(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.general.state_dir = Some(dir.path().to_string_lossy().into_owned());
        config.daemon.max_retries = 3;
        config.daemon.retry_delay_secs = 0;
        config.daemon.error_threshold = 3;
        // Closed local port: the network probe fails fast without leaving
        // the machine.
        config.health.probe_url = "http://127.0.0.1:1/".to_string();
        config.health.probe_timeout_secs = 1;
        config
    }

    #[tokio::test]
    async fn failing_cycle_gets_exactly_max_retries_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::with_results(vec![
            failing_result(),
            failing_result(),
            failing_result(),
            // A fourth attempt would hit this and succeed; it must not run.
            clean_result(),
        ]);
        let probe = runner.clone();
        let mut supervisor = DaemonSupervisor::new(test_config(&dir), Box::new(runner));
        supervisor.transition(DaemonState::Running);

        let result = supervisor.run_supervised_cycle().await;

        assert_eq!(probe.calls(), 3);
        assert!(result.is_failure(3));
        assert_eq!(supervisor.status().cycles_failed, 3);
        assert_eq!(supervisor.status().consecutive_failures, 3);
        assert_eq!(supervisor.status().errors_encountered, 15);
        assert_eq!(supervisor.health().errors_encountered(), 15);
    }

    #[tokio::test]
    async fn successful_retry_resets_consecutive_failures() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::with_results(vec![failing_result(), clean_result()]);
        let probe = runner.clone();
        let mut supervisor = DaemonSupervisor::new(test_config(&dir), Box::new(runner));
        supervisor.transition(DaemonState::Running);

        let result = supervisor.run_supervised_cycle().await;

        assert_eq!(probe.calls(), 2);
        assert!(!result.is_failure(3));
        assert_eq!(supervisor.status().cycles_failed, 1);
        assert_eq!(supervisor.status().cycles_completed, 1);
        assert_eq!(supervisor.status().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn stop_during_cooldown_abandons_the_retry() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.daemon.retry_delay_secs = 60;
        let runner = ScriptedRunner::with_results(vec![failing_result()]);
        let probe = runner.clone();
        let mut supervisor = DaemonSupervisor::new(config, Box::new(runner));
        supervisor.transition(DaemonState::Running);

        let stop = supervisor.stop_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stop.request_stop();
        });

        let started = Instant::now();
        let result = supervisor.run_supervised_cycle().await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(probe.calls(), 1);
        assert!(result.is_failure(3));
        assert_eq!(supervisor.state(), DaemonState::Retrying);
    }

    #[tokio::test]
    async fn run_winds_down_cleanly_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.daemon.cycle_interval_secs = 3600;
        let store = ReportStore::for_config(&config);
        let runner = ScriptedRunner::with_results(Vec::new());
        let mut supervisor = DaemonSupervisor::new(config, Box::new(runner));

        let mut stop = supervisor.stop_handle();
        let task = tokio::spawn(async move {
            let outcome = supervisor.run().await;
            (supervisor, outcome)
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        stop.request_stop();
        let finish = stop.wait_for_finish(1, Duration::from_secs(10)).await;
        assert!(finish.is_complete());

        let (supervisor, outcome) = task.await.unwrap();
        assert!(outcome.is_ok());
        assert_eq!(supervisor.state(), DaemonState::Stopped);

        let status = store.read_status().unwrap().unwrap();
        assert_eq!(status.state, DaemonState::Stopped);
        assert_eq!(status.cycles_completed, 1);
        assert_eq!(status.today.cycles_run, 1);
        assert!(status.health.is_some());
        assert_eq!(store.list_cycles().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn run_once_persists_report_and_final_status() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let store = ReportStore::for_config(&config);
        let runner = ScriptedRunner::with_results(vec![failing_result()]);
        let probe = runner.clone();
        let mut supervisor = DaemonSupervisor::new(config, Box::new(runner));

        // A failed cycle is still a completed one-shot run.
        let result = supervisor.run_once().await.unwrap();

        assert_eq!(probe.calls(), 1);
        assert_eq!(result.error_count(), 5);
        assert_eq!(supervisor.state(), DaemonState::Stopped);
        assert_eq!(store.list_cycles().unwrap().len(), 1);

        let status = store.read_status().unwrap().unwrap();
        assert_eq!(status.state, DaemonState::Stopped);
        assert_eq!(status.cycles_failed, 1);
        assert_eq!(status.last_cycle.unwrap().error_count, 5);
    }
}
