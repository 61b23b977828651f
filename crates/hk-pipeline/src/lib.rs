//! The cycle pipeline.
//!
//! One cycle is a fixed sequence of ten phases: market analysis, content
//! generation, localization, asset generation, validation, pricing,
//! multi-target publish, promotion, competitive intelligence, metrics
//! flush. The executor runs every phase every cycle; membership of the
//! capability set decides whether a phase does real work or applies its
//! built-in default.

pub mod context;
pub mod executor;
pub mod pricing;

pub use context::CycleContext;
pub use executor::{ExecutorSettings, PipelineExecutor};
pub use pricing::decide_price;
