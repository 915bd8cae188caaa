//! The Production Engine.
//!
//! Computes scarcity-scaled production and consumption from a per-tick
//! generator snapshot and applies threshold-quantized deltas to a
//! `ResourceTable` via per-(generator, operation, resource) fractional
//! accumulators. Also defines the `System` trait the Tick Scheduler runs
//! per-tick subsystems against.
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

mod accumulator;
mod engine;
mod system;

pub use accumulator::{AccumulatorKey, AccumulatorTable, Operation};
pub use engine::{
    AppliedFlow, ApplyMode, ProductionEngine, ProductionOptions, ProductionTickReport,
    DEFAULT_APPLY_THRESHOLD,
};
pub use system::{System, TickContext};
