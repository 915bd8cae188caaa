//! [`KernelWorld`]: the facade tying the Priority Command Queue, Command
//! Dispatcher, Tick Scheduler, Resource Table, Generator Table,
//! Production Engine, Event Bus, Diagnostic Timeline, and Monotonic
//! Clock together into one deterministic simulation instance, analogous
//! to a lockstep world.
//!
//! This is the only module in the crate that logs. Everything below it
//! (`queue`, `dispatcher`, `scheduler`, `event_bus`, `diagnostics`) stays
//! a pure, observable state machine; `KernelWorld` is where a host
//! embedding the kernel would want session-lifecycle events surfaced.

use std::cell::RefCell;
use std::rc::Rc;

use accrete_core::command::{Command, Receipt};
use accrete_core::error::IngressError;
use accrete_core::resource::GeneratorDef;
use accrete_production::{ProductionEngine, ProductionOptions, System, TickContext};
use accrete_resources::{GeneratorTable, ResourceTable};
use tracing::warn;

use crate::clock::MonotonicClock;
use crate::config::{ConfigError, KernelConfig};
use crate::diagnostics::{DiagnosticTimeline, TickSpan, TimelineRead};
use crate::dispatcher::{CommandDispatcher, CommandHandler};
use crate::event_bus::{ChannelBackPressure, EventBus, EventRecord};
use crate::metrics::TickMetrics;
use crate::queue::PriorityCommandQueue;
use crate::scheduler::{OfflineCatchupOutcome, TickScheduler};

/// Runs the Production Engine each tick against the world's current
/// generator snapshot.
///
/// Holds the engine behind `Rc<RefCell<_>>` rather than by value so
/// [`KernelWorld::apply_offline_catchup`] can borrow the same instance
/// directly, outside the scheduler's `Vec<Box<dyn System>>`.
struct ProductionSystem {
    engine: Rc<RefCell<ProductionEngine>>,
    options: ProductionOptions,
}

impl System for ProductionSystem {
    fn id(&self) -> &str {
        "production"
    }

    fn tick(&mut self, ctx: TickContext, resources: &mut ResourceTable, generators: &GeneratorTable) {
        self.engine.borrow_mut().run_tick(
            generators.as_slice(),
            ctx.delta_ms / 1000.0,
            resources,
            None,
            self.options,
        );
    }
}

/// A fully wired simulation instance: one Resource Table, one Generator
/// Table, one Production Engine, one command queue, and the scheduler
/// driving them all at a fixed step size.
///
/// Generic over the monotonic time source, exactly like
/// [`MonotonicClock`] itself, so hosts can plug in a real wall clock or a
/// deterministic stand-in for tests and replay.
pub struct KernelWorld<F: FnMut() -> f64> {
    config: KernelConfig,
    queue: PriorityCommandQueue,
    dispatcher: CommandDispatcher,
    scheduler: TickScheduler,
    resources: ResourceTable,
    generators: GeneratorTable,
    production: Rc<RefCell<ProductionEngine>>,
    event_bus: EventBus,
    timeline: DiagnosticTimeline,
    clock: MonotonicClock<F>,
    last_metrics: TickMetrics,
    queue_full_rejections: u64,
    stale_rejections: u64,
}

impl<F: FnMut() -> f64> KernelWorld<F> {
    /// Builds a world from a validated [`KernelConfig`] and the initial
    /// generator definitions, wiring a production system into the
    /// scheduler automatically.
    ///
    /// Fails with [`ConfigError`] if `config` does not pass
    /// [`KernelConfig::validate`].
    pub fn new(config: KernelConfig, generator_defs: Vec<GeneratorDef>, clock_source: F) -> Result<Self, ConfigError> {
        config.validate()?;

        let resources = ResourceTable::new(&config.resources);
        let generators = GeneratorTable::new(&generator_defs);
        let queue = PriorityCommandQueue::new(config.max_ingress_queue);
        let dispatcher = CommandDispatcher::new(config.backoff.clone());

        let production = Rc::new(RefCell::new(
            ProductionEngine::new(config.production.apply_threshold).map_err(|_| ConfigError::InvalidApplyThreshold {
                value: config.production.apply_threshold,
            })?,
        ));

        let mut scheduler = TickScheduler::new(
            config.production.step_size_ms,
            config.production.tick_budget_ms,
            config.production.system_budget_ms,
            config.max_accumulator_steps,
        );
        scheduler.register_system(Box::new(ProductionSystem {
            engine: Rc::clone(&production),
            options: ProductionOptions::default(),
        }));

        let mut event_bus = EventBus::new();
        for channel in &config.channels {
            event_bus.register_channel(channel.name.clone(), channel.capacity, channel.soft_watermark, channel.hard_watermark);
        }

        let timeline = DiagnosticTimeline::new(config.diagnostic_timeline_capacity);
        let clock = MonotonicClock::new(clock_source);

        Ok(Self {
            config,
            queue,
            dispatcher,
            scheduler,
            resources,
            generators,
            production,
            event_bus,
            timeline,
            clock,
            last_metrics: TickMetrics::default(),
            queue_full_rejections: 0,
            stale_rejections: 0,
        })
    }

    /// The configuration this world was built from.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Registers a handler for `Custom` command payloads.
    pub fn register_handler(&mut self, command_type: impl Into<String>, handler: Rc<dyn CommandHandler>) {
        self.dispatcher.register(command_type, handler);
    }

    /// Reads a strictly-increasing timestamp from the world's monotonic
    /// clock.
    pub fn now(&mut self) -> f64 {
        self.clock.now()
    }

    /// The step the scheduler is currently at.
    pub fn current_step(&self) -> accrete_core::id::StepId {
        self.scheduler.current_step()
    }

    /// The step a freshly-submitted command becomes executable at.
    pub fn next_executable_step(&self) -> accrete_core::id::StepId {
        self.scheduler.next_executable_step()
    }

    /// Submits a batch of commands to the Priority Command Queue,
    /// returning one receipt per command in submission order.
    pub fn submit(&mut self, commands: Vec<Command>) -> Vec<Receipt> {
        let current_step = self.scheduler.current_step();
        commands
            .into_iter()
            .enumerate()
            .map(|(index, command)| match self.queue.enqueue(command, current_step) {
                Ok(()) => Receipt::accepted(index),
                Err(reason) => {
                    match reason {
                        IngressError::QueueFull => self.queue_full_rejections += 1,
                        IngressError::Stale => self.stale_rejections += 1,
                        _ => {}
                    }
                    Receipt::rejected(index, reason)
                }
            })
            .collect()
    }

    /// Metrics for the most recently completed call to [`KernelWorld::step`].
    pub fn last_metrics(&self) -> &TickMetrics {
        &self.last_metrics
    }

    /// Read-only access to the Resource Table, e.g. for a transport-layer
    /// state-update snapshot.
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Read-only access to the Generator Table.
    pub fn generators(&self) -> &GeneratorTable {
        &self.generators
    }

    /// Publishes one event on a registered channel.
    pub fn publish_event(&mut self, channel: &str, event_type: impl Into<String>, payload: Vec<u8>) {
        let Some(index) = self.event_bus.channel_index(channel) else {
            warn!(channel, "publish to unregistered event channel ignored");
            return;
        };
        let tick = self.scheduler.current_step();
        let issued_at = self.clock.last().unwrap_or(0.0);
        self.event_bus.publish(index, tick, issued_at, event_type.into(), payload);
    }

    /// Drains every channel's outbound buffer, combined and sorted by
    /// `(tick, dispatchOrder)`.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        self.event_bus.drain_all_sorted()
    }

    /// Snapshot of per-channel backpressure counters, then resets them.
    pub fn drain_backpressure(&mut self) -> std::collections::HashMap<String, ChannelBackPressure> {
        let snapshot = self.event_bus.backpressure_snapshot();
        self.event_bus.reset_backpressure_counters();
        snapshot
    }

    /// Reads every diagnostic span recorded since `head`.
    pub fn read_diagnostics(&self, head: u64) -> TimelineRead {
        self.timeline.read_since(head)
    }

    /// Enables or disables diagnostic timeline recording.
    pub fn set_diagnostics_enabled(&mut self, enabled: bool) {
        self.timeline.set_enabled(enabled);
    }

    /// Advances the accumulator by `wall_elapsed_ms`, running every whole
    /// step this unlocks: draining the queue, dispatching commands,
    /// ticking the production system, pumping spawned `Custom` handler
    /// futures, and recording a [`TickSpan`] per step.
    ///
    /// Handler follow-up commands enqueued via [`crate::dispatcher::EnqueueHandle`]
    /// during this call are folded back into the queue before returning,
    /// so they are visible to the next `step` call. Handler failures are
    /// logged and do not abort the tick.
    pub async fn step(&mut self, wall_elapsed_ms: f64) -> Vec<TickSpan> {
        let spans = self.scheduler.advance(
            wall_elapsed_ms,
            &mut self.queue,
            &mut self.dispatcher,
            &mut self.resources,
            &mut self.generators,
        );

        self.dispatcher.pump().await;

        let failures = self.dispatcher.drain_failures();
        for failure in &failures {
            warn!(
                command_type = %failure.command_type,
                step = failure.step.0,
                error = %failure.error,
                "command handler failed",
            );
        }
        self.dispatcher.decay_backoff();

        let current_step = self.scheduler.current_step();
        for followup in self.dispatcher.drain_pending_enqueues() {
            if let Err(err) = self.queue.enqueue(followup, current_step) {
                warn!(error = %err, "dropped handler follow-up command");
            }
        }

        if let Some(span) = spans.last() {
            let system_us: Vec<(String, u64)> = span
                .systems
                .iter()
                .map(|s| (s.id.clone(), (s.duration_ms * 1000.0) as u64))
                .collect();
            let system_total_us: u64 = system_us.iter().map(|(_, us)| *us).sum();
            let total_us = (span.duration_ms * 1000.0) as u64;
            self.last_metrics = TickMetrics {
                total_us,
                command_processing_us: total_us.saturating_sub(system_total_us),
                system_us,
                queue_captured: span.queue.captured,
                queue_executed: span.queue.executed,
                queue_skipped: span.queue.skipped,
                failure_inbox_drained: failures.len() as u32,
                command_types_disabled: self.dispatcher.disabled_count() as u32,
                queue_full_rejections: std::mem::take(&mut self.queue_full_rejections),
                stale_rejections: std::mem::take(&mut self.stale_rejections),
            };
        }

        for span in &spans {
            self.timeline.record(span.clone());
        }
        spans
    }

    /// Applies `elapsed_ms` of offline progression in one call, either via
    /// the production engine's fast path (`fast_path_eligible`, constant
    /// rates / no unlocks / no automation) or by stepping the fixed loop
    /// internally.
    pub fn apply_offline_catchup(&mut self, elapsed_ms: f64, fast_path_eligible: bool) -> OfflineCatchupOutcome {
        let mut engine = self.production.borrow_mut();
        self.scheduler.apply_offline_catchup(
            elapsed_ms,
            &mut self.resources,
            self.generators.as_slice(),
            &mut engine,
            fast_path_eligible,
        )
    }

    /// Detaches the scheduler from its host time source; commands in
    /// flight complete, queued future-step commands are retained.
    pub fn terminate(&mut self) {
        self.scheduler.dispose();
    }

    /// Whether [`KernelWorld::terminate`] has been called.
    pub fn is_terminated(&self) -> bool {
        self.scheduler.is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrete_core::command::{CommandPayload, Priority};
    use accrete_core::resource::ResourceDef;
    use accrete_core::traits::ResourceReader;

    fn config() -> KernelConfig {
        KernelConfig {
            resources: vec![ResourceDef {
                id: "energy".to_string(),
                capacity: Some(1000.0),
                initially_unlocked: true,
                initially_visible: true,
                track_rates: false,
            }],
            ..KernelConfig::default()
        }
    }

    fn fixed_clock() -> impl FnMut() -> f64 {
        let mut t = 0.0;
        move || {
            t += 1.0;
            t
        }
    }

    #[test]
    fn new_rejects_invalid_config() {
        let result = KernelWorld::new(KernelConfig::default(), Vec::new(), fixed_clock());
        assert!(matches!(result, Err(ConfigError::NoResources)));
    }

    #[test]
    fn submit_assigns_receipts_in_order() {
        let mut world = KernelWorld::new(config(), Vec::new(), fixed_clock()).unwrap();
        let receipts = world.submit(vec![
            Command {
                command_type: "set_resource".to_string(),
                payload: CommandPayload::SetResourceAmount {
                    resource_id: "energy".to_string(),
                    amount: 10.0,
                },
                priority: Priority::Player,
                step: world.current_step(),
                timestamp: 0.0,
                issued_at: 0.0,
                request_id: None,
                arrival_seq: 0,
            },
        ]);
        assert_eq!(receipts.len(), 1);
        assert!(receipts[0].accepted);
        assert_eq!(receipts[0].command_index, 0);
    }

    #[tokio::test]
    async fn step_dispatches_queued_commands_and_runs_production() {
        let mut world = KernelWorld::new(
            config(),
            vec![GeneratorDef {
                id: "reactor".to_string(),
                owned: 1,
                enabled: true,
                produces: vec![accrete_core::resource::GeneratorFlow {
                    resource_id: "energy".to_string(),
                    rate_per_owned_per_second: 10.0,
                }],
                consumes: vec![],
            }],
            fixed_clock(),
        )
        .unwrap();

        world.submit(vec![Command {
            command_type: "set_resource".to_string(),
            payload: CommandPayload::SetResourceAmount {
                resource_id: "energy".to_string(),
                amount: 5.0,
            },
            priority: Priority::Player,
            step: world.current_step(),
            timestamp: 0.0,
            issued_at: 0.0,
            request_id: None,
            arrival_seq: 0,
        }]);

        let spans = world.step(100.0).await;
        assert_eq!(spans.len(), 1);

        let idx = world.resources().require_index("energy").unwrap();
        assert!((world.resources().amount(idx).unwrap() - 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn offline_catchup_fast_path_advances_step_without_ticking_queue() {
        let mut world = KernelWorld::new(
            config(),
            vec![GeneratorDef {
                id: "reactor".to_string(),
                owned: 1,
                enabled: true,
                produces: vec![accrete_core::resource::GeneratorFlow {
                    resource_id: "energy".to_string(),
                    rate_per_owned_per_second: 1.0,
                }],
                consumes: vec![],
            }],
            fixed_clock(),
        )
        .unwrap();

        let outcome = world.apply_offline_catchup(10_000.0, true);
        assert_eq!(outcome.steps_simulated, 100);
        assert_eq!(world.current_step(), accrete_core::id::StepId(100));

        let idx = world.resources().require_index("energy").unwrap();
        assert!((world.resources().amount(idx).unwrap() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn terminate_disposes_scheduler() {
        let mut world = KernelWorld::new(config(), Vec::new(), fixed_clock()).unwrap();
        world.terminate();
        assert!(world.is_terminated());
    }
}
