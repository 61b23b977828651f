//! Runtime plumbing shared by hawker's long-running processes.
//!
//! Currently this is the cooperative stop signal: the supervisor loop and the
//! ctrl-c handler coordinate through [`StopSignal`] so a running cycle can
//! finish its persistence work before the process exits.

pub mod stop;

pub use stop::{FinishResult, StopGuard, StopSignal};
