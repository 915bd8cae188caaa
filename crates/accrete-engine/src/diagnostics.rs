//! The Diagnostic Timeline.
//!
//! A ring buffer of per-tick spans, read by delta from a caller-held
//! head cursor so a slow reader can detect how many spans it missed.

use std::collections::VecDeque;

use accrete_core::id::StepId;

/// Per-system timing within one [`TickSpan`].
#[derive(Clone, Debug, PartialEq)]
pub struct SystemSpan {
    /// System ID, as returned by `System::id`.
    pub id: String,
    /// How long this system's `tick()` call took.
    pub duration_ms: f64,
    /// This system's soft budget.
    pub budget_ms: f64,
    /// Milliseconds over budget, `0.0` if within budget.
    pub over_budget_ms: f64,
    /// Whether `duration_ms` exceeded `budget_ms`.
    pub is_slow: bool,
}

/// Queue-drain counters recorded in one [`TickSpan`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QueueSpan {
    /// Commands captured from the queue this tick (before filtering).
    pub captured: u32,
    /// Commands whose handlers actually ran.
    pub executed: u32,
    /// Commands skipped (disabled command type, unknown handler).
    pub skipped: u32,
}

/// One completed tick's diagnostic record.
#[derive(Clone, Debug, PartialEq)]
pub struct TickSpan {
    /// The step this span describes.
    pub step: StepId,
    /// Total tick duration.
    pub duration_ms: f64,
    /// The tick's soft budget.
    pub budget_ms: f64,
    /// Milliseconds over budget, `0.0` if within budget.
    pub over_budget_ms: f64,
    /// Whether `duration_ms` exceeded `budget_ms`.
    pub is_slow: bool,
    /// Per-system timings, in registration order.
    pub systems: Vec<SystemSpan>,
    /// Queue-drain counters for this tick.
    pub queue: QueueSpan,
    /// Estimated accumulator backlog, when computable.
    pub accumulator_backlog_ms: Option<f64>,
    /// Description of a tick-level failure, if this tick disabled
    /// further dispatch of some command type.
    pub error: Option<String>,
}

/// Result of a delta read against the timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineRead {
    /// The head cursor to pass on the next read.
    pub head: u64,
    /// Spans lost because the reader fell behind the ring's capacity.
    pub dropped: u64,
    /// Spans appended since the reader's previous cursor, oldest first.
    pub entries: Vec<TickSpan>,
    /// The ring's configured capacity.
    pub configuration: usize,
}

/// Ring buffer of [`TickSpan`]s with delta reads by head cursor.
pub struct DiagnosticTimeline {
    capacity: usize,
    ring: VecDeque<TickSpan>,
    /// Absolute sequence number of the oldest entry still in `ring`.
    base_seq: u64,
    /// Absolute sequence number the next appended entry will receive.
    next_seq: u64,
    enabled: bool,
}

impl DiagnosticTimeline {
    /// Builds a timeline with the given ring capacity. Default capacity
    /// per this kernel's default configuration is 120.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "DiagnosticTimeline capacity must be at least 1");
        Self {
            capacity,
            ring: VecDeque::with_capacity(capacity),
            base_seq: 0,
            next_seq: 0,
            enabled: true,
        }
    }

    /// Enables or disables recording, without altering anything else.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether recording is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Appends one span, evicting the oldest if the ring is full. No-op
    /// if recording is disabled.
    pub fn record(&mut self, span: TickSpan) {
        if !self.enabled {
            return;
        }
        if self.ring.len() >= self.capacity {
            self.ring.pop_front();
            self.base_seq += 1;
        }
        self.ring.push_back(span);
        self.next_seq += 1;
    }

    /// Reads every span appended since `head`, along with how many were
    /// dropped because the reader fell behind the ring's capacity.
    pub fn read_since(&self, head: u64) -> TimelineRead {
        let effective_head = head.max(self.base_seq);
        let dropped = effective_head.saturating_sub(head);

        let skip = (effective_head.saturating_sub(self.base_seq)) as usize;
        let entries = self.ring.iter().skip(skip).cloned().collect();

        TimelineRead {
            head: self.next_seq,
            dropped,
            entries,
            configuration: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(step: u64) -> TickSpan {
        TickSpan {
            step: StepId(step),
            duration_ms: 1.0,
            budget_ms: 100.0,
            over_budget_ms: 0.0,
            is_slow: false,
            systems: Vec::new(),
            queue: QueueSpan::default(),
            accumulator_backlog_ms: None,
            error: None,
        }
    }

    #[test]
    fn read_since_zero_returns_everything_recorded() {
        let mut timeline = DiagnosticTimeline::new(10);
        timeline.record(span(0));
        timeline.record(span(1));

        let read = timeline.read_since(0);
        assert_eq!(read.entries.len(), 2);
        assert_eq!(read.dropped, 0);
        assert_eq!(read.head, 2);
    }

    #[test]
    fn read_since_head_is_incremental() {
        let mut timeline = DiagnosticTimeline::new(10);
        timeline.record(span(0));
        let first = timeline.read_since(0);
        timeline.record(span(1));
        let second = timeline.read_since(first.head);
        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].step, StepId(1));
    }

    #[test]
    fn reader_that_falls_behind_sees_dropped_count() {
        let mut timeline = DiagnosticTimeline::new(2);
        for i in 0..5 {
            timeline.record(span(i));
        }
        let read = timeline.read_since(0);
        assert_eq!(read.dropped, 3);
        assert_eq!(read.entries.len(), 2);
        assert_eq!(read.entries[0].step, StepId(3));
    }

    #[test]
    fn disabling_stops_recording_without_clearing() {
        let mut timeline = DiagnosticTimeline::new(10);
        timeline.record(span(0));
        timeline.set_enabled(false);
        timeline.record(span(1));
        let read = timeline.read_since(0);
        assert_eq!(read.entries.len(), 1);
    }
}
