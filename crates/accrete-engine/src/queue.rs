//! The Priority Command Queue.
//!
//! Commands are ordered by `(priority, step, arrival)`: priority
//! ascending (`SYSTEM` first), then step ascending, then stable arrival
//! order. `dequeue_ready` removes and returns every command whose step
//! has arrived, in that total order.

use std::collections::VecDeque;

use accrete_core::command::Command;
use accrete_core::error::IngressError;
use accrete_core::id::StepId;

struct QueueEntry {
    command: Command,
}

/// Bounded, priority-ordered container of pending commands.
pub struct PriorityCommandQueue {
    entries: VecDeque<QueueEntry>,
    capacity: usize,
    next_arrival_seq: u64,
}

impl PriorityCommandQueue {
    /// Creates an empty queue with room for `capacity` commands.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "PriorityCommandQueue capacity must be at least 1");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_arrival_seq: 0,
        }
    }

    /// Enqueues one command, assigning it the next arrival sequence
    /// number.
    ///
    /// Fails with [`IngressError::QueueFull`] if the queue is at
    /// capacity, or [`IngressError::Stale`] if `command.step` is already
    /// behind `current_step`.
    pub fn enqueue(&mut self, mut command: Command, current_step: StepId) -> Result<(), IngressError> {
        if command.step.0 < current_step.0 {
            return Err(IngressError::Stale);
        }
        if self.entries.len() >= self.capacity {
            return Err(IngressError::QueueFull);
        }
        command.arrival_seq = self.next_arrival_seq;
        self.next_arrival_seq += 1;
        self.entries.push_back(QueueEntry { command });
        Ok(())
    }

    /// Removes and returns every command with `step <= current_step`, in
    /// `(priority, step, arrival)` order.
    pub fn dequeue_ready(&mut self, current_step: StepId) -> Vec<Command> {
        let mut ready = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.entries.len());

        for entry in self.entries.drain(..) {
            if entry.command.step.0 <= current_step.0 {
                ready.push(entry.command);
            } else {
                remaining.push_back(entry);
            }
        }
        self.entries = remaining;

        ready.sort_by_key(|c| (c.priority, c.step, c.arrival_seq));
        ready
    }

    /// Removes and returns every queued command, regardless of step, in
    /// `(priority, step, arrival)` order.
    pub fn dequeue_all(&mut self) -> Vec<Command> {
        let mut all: Vec<Command> = self.entries.drain(..).map(|e| e.command).collect();
        all.sort_by_key(|c| (c.priority, c.step, c.arrival_seq));
        all
    }

    /// Number of commands currently buffered.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of commands this queue can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrete_core::command::{CommandPayload, Priority};

    fn cmd(priority: Priority, step: u64) -> Command {
        Command {
            command_type: "noop".to_string(),
            payload: CommandPayload::SetParameter {
                key: "x".to_string(),
                value: 0.0,
            },
            priority,
            step: StepId(step),
            timestamp: 0.0,
            issued_at: 0.0,
            request_id: None,
            arrival_seq: 0,
        }
    }

    #[test]
    fn enqueue_rejects_stale_step() {
        let mut q = PriorityCommandQueue::new(4);
        let result = q.enqueue(cmd(Priority::Player, 0), StepId(5));
        assert_eq!(result, Err(IngressError::Stale));
    }

    #[test]
    fn enqueue_rejects_when_full() {
        let mut q = PriorityCommandQueue::new(1);
        q.enqueue(cmd(Priority::Player, 0), StepId(0)).unwrap();
        let result = q.enqueue(cmd(Priority::Player, 0), StepId(0));
        assert_eq!(result, Err(IngressError::QueueFull));
    }

    #[test]
    fn dequeue_ready_orders_by_priority_then_step_then_arrival() {
        let mut q = PriorityCommandQueue::new(8);
        q.enqueue(cmd(Priority::Automation, 0), StepId(0)).unwrap();
        q.enqueue(cmd(Priority::System, 0), StepId(0)).unwrap();
        q.enqueue(cmd(Priority::Player, 0), StepId(0)).unwrap();
        q.enqueue(cmd(Priority::System, 0), StepId(0)).unwrap();

        let ready = q.dequeue_ready(StepId(0));
        let priorities: Vec<Priority> = ready.iter().map(|c| c.priority).collect();
        assert_eq!(
            priorities,
            vec![Priority::System, Priority::System, Priority::Player, Priority::Automation]
        );
    }

    #[test]
    fn dequeue_ready_leaves_future_steps_queued() {
        let mut q = PriorityCommandQueue::new(8);
        q.enqueue(cmd(Priority::Player, 0), StepId(0)).unwrap();
        q.enqueue(cmd(Priority::Player, 3), StepId(0)).unwrap();

        let ready = q.dequeue_ready(StepId(0));
        assert_eq!(ready.len(), 1);
        assert_eq!(q.size(), 1);

        let ready = q.dequeue_ready(StepId(3));
        assert_eq!(ready.len(), 1);
        assert_eq!(q.size(), 0);
    }

    proptest::proptest! {
        #[test]
        fn dequeue_ready_always_sorted(
            steps in proptest::collection::vec(0u64..5, 1..20),
        ) {
            let mut q = PriorityCommandQueue::new(64);
            for (i, step) in steps.iter().enumerate() {
                let priority = match i % 3 {
                    0 => Priority::System,
                    1 => Priority::Player,
                    _ => Priority::Automation,
                };
                q.enqueue(cmd(priority, *step), StepId(0)).unwrap();
            }
            let ready = q.dequeue_ready(StepId(10));
            for pair in ready.windows(2) {
                let a = (pair[0].priority, pair[0].step, pair[0].arrival_seq);
                let b = (pair[1].priority, pair[1].step, pair[1].arrival_seq);
                prop_assert!(a <= b);
            }
        }
    }
}
