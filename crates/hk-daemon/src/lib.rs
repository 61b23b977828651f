//! Long-running daemon around the listing pipeline.
//!
//! [`DaemonSupervisor`] drives a [`CycleRunner`] through the
//! run/retry/sleep lifecycle, persists reports and status through
//! `hk_core::reports`, and keeps a [`HealthMonitor`] fed so the `status`
//! and `health` subcommands always have something current to show.

pub mod health;
pub mod resources;
pub mod supervisor;

pub use health::HealthMonitor;
pub use resources::{FixedProbe, ResourceProbe, ResourceSample, SystemProbe};
pub use supervisor::{CycleRunner, DaemonSupervisor, SupervisorError};
