//! File-system-backed persistence for cycle reports and daemon status.
//!
//! Cycle reports are append-only JSON files named after the cycle's
//! finish time. The status file is a single JSON document replaced
//! atomically on every update so a concurrent `status` command never
//! reads a torn write.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::Config;
use crate::types::{CycleResult, DaemonState, DailyStats, HealthSnapshot};

// ---------------------------------------------------------------------------
// DaemonStatus
// ---------------------------------------------------------------------------

/// The persisted daemon status record. Written on every state change
/// and after every cycle; read back by the `status` CLI command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub state: DaemonState,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub consecutive_failures: u32,
    pub errors_encountered: u64,
    pub last_cycle: Option<LastCycleSummary>,
    pub today: DailyStats,
    pub health: Option<HealthSnapshot>,
}

impl DaemonStatus {
    pub fn new(state: DaemonState) -> Self {
        let now = Utc::now();
        Self {
            state,
            pid: std::process::id(),
            started_at: now,
            updated_at: now,
            cycles_completed: 0,
            cycles_failed: 0,
            consecutive_failures: 0,
            errors_encountered: 0,
            last_cycle: None,
            today: DailyStats::for_date(now.date_naive()),
            health: None,
        }
    }
}

/// Compact view of the most recent cycle, embedded in the status file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastCycleSummary {
    pub cycle_id: Uuid,
    pub finished_at: DateTime<Utc>,
    pub niche: String,
    pub listing_name: String,
    pub error_count: usize,
    pub deployments_succeeded: usize,
}

impl LastCycleSummary {
    pub fn from_result(result: &CycleResult) -> Self {
        Self {
            cycle_id: result.cycle_id,
            finished_at: result.finished_at,
            niche: result.niche.clone(),
            listing_name: result.listing_name.clone(),
            error_count: result.error_count(),
            deployments_succeeded: result.deployments_succeeded(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReportStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// ReportStore
// ---------------------------------------------------------------------------

/// File-system-backed report persistence.
///
/// Reports are stored as individual JSON files under `<state_dir>/reports/`;
/// the daemon status lives at `<state_dir>/status.json`.
pub struct ReportStore {
    state_dir: PathBuf,
}

impl ReportStore {
    /// Create a store rooted at the configured state directory.
    pub fn for_config(config: &Config) -> Self {
        Self {
            state_dir: config.state_dir(),
        }
    }

    /// Create a store backed by a custom directory (useful for testing).
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    fn reports_dir(&self) -> PathBuf {
        self.state_dir.join("reports")
    }

    fn status_path(&self) -> PathBuf {
        self.state_dir.join("status.json")
    }

    /// Ensure the state and report directories exist.
    fn ensure_dirs(&self) -> Result<(), ReportStoreError> {
        std::fs::create_dir_all(self.reports_dir())?;
        Ok(())
    }

    /// Persist one cycle's result. File name encodes the finish time, so
    /// a directory listing reads chronologically.
    pub fn save_cycle(&self, result: &CycleResult) -> Result<PathBuf, ReportStoreError> {
        self.ensure_dirs()?;
        let name = format!("cycle_{}.json", result.finished_at.format("%Y%m%d_%H%M%S"));
        let path = self.reports_dir().join(name);
        let json = serde_json::to_string_pretty(result)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Load one report by path.
    pub fn load_cycle(&self, path: &PathBuf) -> Result<CycleResult, ReportStoreError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Paths of all saved reports, most recent first.
    pub fn list_cycles(&self) -> Result<Vec<PathBuf>, ReportStoreError> {
        self.ensure_dirs()?;
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(self.reports_dir())? {
            let entry = entry?;
            let path = entry.path();
            let is_report = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("cycle_") && n.ends_with(".json"));
            if is_report {
                paths.push(path);
            }
        }
        paths.sort();
        paths.reverse();
        Ok(paths)
    }

    /// The most recent cycle report, if any exists.
    pub fn latest_cycle(&self) -> Result<Option<CycleResult>, ReportStoreError> {
        match self.list_cycles()?.first() {
            Some(path) => Ok(Some(self.load_cycle(path)?)),
            None => Ok(None),
        }
    }

    /// Atomically replace the status file. Writes to a sibling temp file
    /// and renames over the target so readers see old or new, never half.
    pub fn write_status(&self, status: &DaemonStatus) -> Result<(), ReportStoreError> {
        std::fs::create_dir_all(&self.state_dir)?;
        let path = self.status_path();
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(status)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Read the status file. Returns `None` if no daemon has written one.
    pub fn read_status(&self) -> Result<Option<DaemonStatus>, ReportStoreError> {
        let path = self.status_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    /// Delete reports whose finish time is older than `older_than` from
    /// now. Returns the number of reports removed.
    ///
    /// Uses a lightweight partial deserialization to extract only the
    /// `finished_at` field, avoiding full `CycleResult` parsing for
    /// reports that will just be deleted.
    pub fn cleanup_old_cycles(&self, older_than: Duration) -> Result<usize, ReportStoreError> {
        self.ensure_dirs()?;
        let cutoff = Utc::now() - older_than;
        let mut removed = 0;

        #[derive(Deserialize)]
        struct ReportMeta {
            finished_at: DateTime<Utc>,
        }

        for path in self.list_cycles()? {
            let data = match std::fs::read_to_string(&path) {
                Ok(d) => d,
                Err(_) => continue,
            };
            let meta: ReportMeta = match serde_json::from_str(&data) {
                Ok(m) => m,
                Err(_) => continue,
            };
            if meta.finished_at < cutoff {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Phase;
    use crate::types::{CycleError, DeploymentRecord};

    fn result_finished_at(finished_at: DateTime<Utc>) -> CycleResult {
        CycleResult {
            cycle_id: Uuid::new_v4(),
            started_at: finished_at - Duration::seconds(12),
            finished_at,
            phases: Vec::new(),
            errors: vec![CycleError {
                phase: Phase::Validation,
                message: "sample".to_string(),
            }],
            niche: "AI Productivity System".to_string(),
            listing_name: "AI Productivity Template".to_string(),
            list_price_usd: 49.0,
            locales_produced: vec!["en".to_string()],
            deployments: DeploymentRecord::demo_fallback(),
            campaigns: Vec::new(),
        }
    }

    #[test]
    fn save_cycle_names_file_after_finish_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path().to_path_buf());
        let finished = "2025-06-01T08:30:15Z".parse::<DateTime<Utc>>().unwrap();
        let path = store.save_cycle(&result_finished_at(finished)).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "cycle_20250601_083015.json"
        );
        assert!(path.exists());
    }

    #[test]
    fn list_cycles_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path().to_path_buf());
        for ts in ["2025-06-01T08:00:00Z", "2025-06-01T10:00:00Z", "2025-06-01T09:00:00Z"] {
            store
                .save_cycle(&result_finished_at(ts.parse().unwrap()))
                .unwrap();
        }
        let listed = store.list_cycles().unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed[0].to_str().unwrap().contains("100000"));
        assert!(listed[2].to_str().unwrap().contains("080000"));

        let latest = store.latest_cycle().unwrap().unwrap();
        assert_eq!(latest.finished_at, "2025-06-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn status_write_is_replace_not_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path().to_path_buf());

        let mut status = DaemonStatus::new(DaemonState::Running);
        store.write_status(&status).unwrap();
        status.state = DaemonState::Sleeping;
        status.cycles_completed = 1;
        store.write_status(&status).unwrap();

        let read = store.read_status().unwrap().unwrap();
        assert_eq!(read.state, DaemonState::Sleeping);
        assert_eq!(read.cycles_completed, 1);

        // No temp file may survive a completed write.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn read_status_none_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path().to_path_buf());
        assert!(store.read_status().unwrap().is_none());
    }

    #[test]
    fn cleanup_removes_only_old_reports() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path().to_path_buf());
        store
            .save_cycle(&result_finished_at(Utc::now() - Duration::days(10)))
            .unwrap();
        store.save_cycle(&result_finished_at(Utc::now())).unwrap();

        let removed = store.cleanup_old_cycles(Duration::days(7)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.list_cycles().unwrap().len(), 1);
    }

    #[test]
    fn last_cycle_summary_folds_result() {
        let result = result_finished_at(Utc::now());
        let summary = LastCycleSummary::from_result(&result);
        assert_eq!(summary.cycle_id, result.cycle_id);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.deployments_succeeded, 2);
        assert_eq!(summary.niche, "AI Productivity System");
    }
}
