//! Best-effort resource gauges for the health monitor.
//!
//! Readings come from `/proc` and `statvfs`, so they are meaningful on
//! Linux hosts and degrade to zero anywhere a source is unavailable. A
//! gauge of zero is treated as "unknown", never as an alert.

use std::ffi::CString;

// ---------------------------------------------------------------------------
// ResourceProbe
// ---------------------------------------------------------------------------

/// One reading of the host's resource gauges, all in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

/// Source of resource gauges. Swappable so health tests can pin readings.
pub trait ResourceProbe: Send + Sync {
    fn sample(&self) -> ResourceSample;
}

// ---------------------------------------------------------------------------
// SystemProbe
// ---------------------------------------------------------------------------

/// Reads the live host: load average for CPU, `/proc/meminfo` for memory,
/// `statvfs("/")` for disk. Any source that cannot be read reports zero.
pub struct SystemProbe;

impl ResourceProbe for SystemProbe {
    fn sample(&self) -> ResourceSample {
        ResourceSample {
            cpu_percent: cpu_percent(),
            memory_percent: memory_percent(),
            disk_percent: disk_percent("/"),
        }
    }
}

/// One-minute load average scaled by core count. Saturates at 100.
fn cpu_percent() -> f64 {
    let text = match std::fs::read_to_string("/proc/loadavg") {
        Ok(t) => t,
        Err(_) => return 0.0,
    };
    let load = match parse_loadavg(&text) {
        Some(l) => l,
        None => return 0.0,
    };
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1) as f64;
    (load / cores * 100.0).clamp(0.0, 100.0)
}

fn parse_loadavg(text: &str) -> Option<f64> {
    text.split_whitespace().next()?.parse().ok()
}

fn memory_percent() -> f64 {
    let text = match std::fs::read_to_string("/proc/meminfo") {
        Ok(t) => t,
        Err(_) => return 0.0,
    };
    parse_meminfo(&text).unwrap_or(0.0)
}

/// Percent of memory in use, from `MemTotal` and `MemAvailable` rows.
fn parse_meminfo(text: &str) -> Option<f64> {
    let mut total_kb: Option<f64> = None;
    let mut available_kb: Option<f64> = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total_kb = rest.split_whitespace().next()?.parse().ok();
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available_kb = rest.split_whitespace().next()?.parse().ok();
        }
    }
    let total = total_kb?;
    let available = available_kb?;
    if total <= 0.0 {
        return None;
    }
    Some(((1.0 - available / total) * 100.0).clamp(0.0, 100.0))
}

fn disk_percent(path: &str) -> f64 {
    let c_path = match CString::new(path) {
        Ok(p) => p,
        Err(_) => return 0.0,
    };
    let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stats) };
    if rc != 0 || stats.f_blocks == 0 {
        return 0.0;
    }
    let total = stats.f_blocks as f64;
    let available = stats.f_bavail as f64;
    ((1.0 - available / total) * 100.0).clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// FixedProbe
// ---------------------------------------------------------------------------

/// Probe returning a fixed reading. Test use only, but kept in the crate
/// so health tests and future soak tooling share it.
pub struct FixedProbe(pub ResourceSample);

impl ResourceProbe for FixedProbe {
    fn sample(&self) -> ResourceSample {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_probe_reports_percentages() {
        let sample = SystemProbe.sample();
        assert!((0.0..=100.0).contains(&sample.cpu_percent));
        assert!((0.0..=100.0).contains(&sample.memory_percent));
        assert!((0.0..=100.0).contains(&sample.disk_percent));
    }

    #[test]
    fn loadavg_takes_first_field() {
        assert_eq!(parse_loadavg("0.52 0.58 0.59 1/257 31808\n"), Some(0.52));
        assert_eq!(parse_loadavg(""), None);
        assert_eq!(parse_loadavg("not-a-number"), None);
    }

    #[test]
    fn meminfo_computes_used_percent() {
        let text = "MemTotal:       16000000 kB\n\
                    MemFree:         2000000 kB\n\
                    MemAvailable:    4000000 kB\n\
                    Buffers:          300000 kB\n";
        let used = parse_meminfo(text).unwrap();
        assert!((used - 75.0).abs() < 0.01);
    }

    #[test]
    fn meminfo_without_required_rows_is_none() {
        assert_eq!(parse_meminfo("MemFree: 100 kB\n"), None);
        assert_eq!(parse_meminfo(""), None);
    }

    #[test]
    fn fixed_probe_returns_its_reading() {
        let probe = FixedProbe(ResourceSample {
            cpu_percent: 12.0,
            memory_percent: 34.0,
            disk_percent: 56.0,
        });
        assert_eq!(probe.sample().disk_percent, 56.0);
    }
}
