//! Reusable fixtures for kernel test scenarios.
//!
//! - [`const_resource`] / [`const_generator`] — terse definition builders.
//! - [`RecordingHandler`] — records every payload it handles, for
//!   asserting dispatch order and follow-up wiring.
//! - [`FailingHandler`] — fails deterministically after N calls, for
//!   exercising backoff and failure-inbox behavior.
//! - [`CountingSystem`] — a [`System`] that counts ticks, for exercising
//!   the scheduler's registration-order guarantee.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use accrete_core::command::{Command, CommandPayload};
use accrete_core::error::DispatchError;
use accrete_core::resource::{GeneratorDef, GeneratorFlow, ResourceDef};
use accrete_engine::{CommandHandler, EnqueueHandle, ExecutionContext};
use accrete_production::{System, TickContext};
use accrete_resources::{GeneratorTable, ResourceTable};
use async_trait::async_trait;

/// Builds a [`ResourceDef`] with the given ID and capacity, starting
/// unlocked, visible, and without rate tracking.
pub fn const_resource(id: impl Into<String>, capacity: Option<f64>) -> ResourceDef {
    ResourceDef {
        id: id.into(),
        capacity,
        initially_unlocked: true,
        initially_visible: true,
        track_rates: false,
    }
}

/// Builds a [`GeneratorDef`] with the given ID, owned count, and a
/// single `produces` flow at `rate_per_owned_per_second`.
pub fn const_generator(id: impl Into<String>, owned: u64, produces_resource: impl Into<String>, rate_per_owned_per_second: f64) -> GeneratorDef {
    GeneratorDef {
        id: id.into(),
        owned,
        enabled: true,
        produces: vec![GeneratorFlow {
            resource_id: produces_resource.into(),
            rate_per_owned_per_second,
        }],
        consumes: Vec::new(),
    }
}

/// A [`CommandHandler`] that records every payload it is asked to
/// handle, in call order, for later inspection with
/// [`RecordingHandler::calls`].
///
/// Uses `RefCell` rather than a lock: handlers run on the kernel's
/// single logical thread via `spawn_local` and are never `Send`.
#[derive(Default)]
pub struct RecordingHandler {
    calls: RefCell<Vec<CommandPayload>>,
}

impl RecordingHandler {
    /// Builds a handler with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every payload handled so far, in call order.
    pub fn calls(&self) -> Vec<CommandPayload> {
        self.calls.borrow().clone()
    }
}

#[async_trait(?Send)]
impl CommandHandler for RecordingHandler {
    async fn handle(
        &self,
        payload: &CommandPayload,
        _ctx: ExecutionContext,
        _enqueue: &EnqueueHandle,
    ) -> Result<(), DispatchError> {
        self.calls.borrow_mut().push(payload.clone());
        Ok(())
    }
}

/// A [`CommandHandler`] that enqueues a fixed follow-up command every
/// time it runs, for exercising replay reconciliation and the live
/// tick loop's handler-enqueue path identically.
pub struct SpawningHandler {
    follow_up: Command,
}

impl SpawningHandler {
    /// Builds a handler that enqueues `follow_up` on every call.
    pub fn new(follow_up: Command) -> Self {
        Self { follow_up }
    }
}

#[async_trait(?Send)]
impl CommandHandler for SpawningHandler {
    async fn handle(
        &self,
        _payload: &CommandPayload,
        _ctx: ExecutionContext,
        enqueue: &EnqueueHandle,
    ) -> Result<(), DispatchError> {
        enqueue.enqueue(self.follow_up.clone());
        Ok(())
    }
}

/// A [`CommandHandler`] that succeeds `succeed_count` times, then fails
/// deterministically on every subsequent call.
pub struct FailingHandler {
    succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingHandler {
    /// Builds a handler that succeeds `succeed_count` times before
    /// failing.
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `handle` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait(?Send)]
impl CommandHandler for FailingHandler {
    async fn handle(
        &self,
        _payload: &CommandPayload,
        _ctx: ExecutionContext,
        _enqueue: &EnqueueHandle,
    ) -> Result<(), DispatchError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(DispatchError::CommandFailed {
                code: "deliberate_failure".to_string(),
                message: format!("deliberate failure after {} successful calls", self.succeed_count),
                details: None,
            });
        }
        Ok(())
    }
}

/// A [`System`] that counts how many times it has been ticked, for
/// asserting scheduler registration order and per-tick invocation.
#[derive(Default)]
pub struct CountingSystem {
    id: String,
    ticks: u64,
}

impl CountingSystem {
    /// Builds a counting system identified by `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ticks: 0,
        }
    }

    /// Number of ticks observed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl System for CountingSystem {
    fn id(&self) -> &str {
        &self.id
    }

    fn tick(&mut self, _ctx: TickContext, _resources: &mut ResourceTable, _generators: &GeneratorTable) {
        self.ticks += 1;
    }
}
