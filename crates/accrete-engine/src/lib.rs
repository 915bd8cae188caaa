//! The Tick Scheduler, Command Dispatcher, Priority Command Queue, Event
//! Bus, Diagnostic Timeline, and Monotonic Clock, orchestrated behind the
//! [`KernelWorld`] facade.
//!
//! The computational pieces (`queue`, `dispatcher`, `scheduler`,
//! `event_bus`, `diagnostics`, `clock`) stay free of logging, exactly
//! like `accrete-resources`/`accrete-production`; `tracing` is used only
//! in `world` for session-lifecycle events a host embedding the kernel
//! would want surfaced without parsing every return value.
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod event_bus;
pub mod metrics;
pub mod queue;
pub mod scheduler;
pub mod world;

pub use clock::MonotonicClock;
pub use config::{ChannelConfig, ConfigError, DispatchBackoff, KernelConfig, ProductionConfig};
pub use diagnostics::{DiagnosticTimeline, QueueSpan, SystemSpan, TickSpan, TimelineRead};
pub use dispatcher::{
    CommandDispatcher, CommandHandler, DispatchRecord, EnqueueHandle, ExecutionContext, FailureInboxEntry,
};
pub use event_bus::{ChannelBackPressure, EventBus, EventRecord};
pub use metrics::TickMetrics;
pub use queue::PriorityCommandQueue;
pub use scheduler::{OfflineCatchupOutcome, TickScheduler};
pub use world::KernelWorld;
