//! Per-tick timing and counter metrics, mirrored into the Diagnostic
//! Timeline's [`TickSpan`](crate::diagnostics::TickSpan) entries.

/// Aggregate timing and counters for one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickMetrics {
    /// Total tick duration in microseconds.
    pub total_us: u64,
    /// Time spent draining and dispatching commands.
    pub command_processing_us: u64,
    /// Per-system durations, in registration order.
    pub system_us: Vec<(String, u64)>,
    /// Commands captured from the queue this tick.
    pub queue_captured: u32,
    /// Commands whose handlers actually ran.
    pub queue_executed: u32,
    /// Commands skipped (disabled type, unknown handler).
    pub queue_skipped: u32,
    /// Failures drained from the dispatcher's failure inbox this tick.
    pub failure_inbox_drained: u32,
    /// Consecutive ticks the kernel has disabled a command type for.
    pub command_types_disabled: u32,
    /// Commands rejected at submission because the queue was full.
    pub queue_full_rejections: u64,
    /// Commands rejected at submission for being stale.
    pub stale_rejections: u64,
}
