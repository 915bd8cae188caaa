//! The Tick Scheduler.
//!
//! A fixed-step wall-clock accumulator loop: drains the command queue,
//! runs registered systems in order, advances the step counter, and
//! records one [`TickSpan`] per completed step.

use std::time::Instant;

use accrete_core::command::CommandPayload;
use accrete_core::id::StepId;
use accrete_core::resource::GeneratorDef;
use accrete_production::{ProductionEngine, ProductionOptions, System, TickContext};
use accrete_resources::{GeneratorTable, ResourceTable};

use crate::diagnostics::{QueueSpan, TickSpan};
use crate::dispatcher::{CommandDispatcher, DispatchRecord};
use crate::queue::PriorityCommandQueue;

/// Outcome of simulating a large elapsed offline duration in one shot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfflineCatchupOutcome {
    /// Number of fixed steps the catchup advanced `current_step` by.
    pub steps_simulated: u64,
}

/// Fixed-step accumulator loop owning the step counter and registered
/// systems.
pub struct TickScheduler {
    current_step: StepId,
    accumulator_ms: f64,
    step_size_ms: f64,
    tick_budget_ms: f64,
    system_budget_ms: f64,
    max_accumulator_ms: f64,
    systems: Vec<Box<dyn System>>,
    disposed: bool,
}

impl TickScheduler {
    /// Builds a scheduler at step 0.
    pub fn new(step_size_ms: f64, tick_budget_ms: f64, system_budget_ms: f64, max_accumulator_steps: f64) -> Self {
        Self {
            current_step: StepId(0),
            accumulator_ms: 0.0,
            step_size_ms,
            tick_budget_ms,
            system_budget_ms,
            max_accumulator_ms: step_size_ms * max_accumulator_steps,
            systems: Vec::new(),
            disposed: false,
        }
    }

    /// Registers a system to run each tick, in registration order.
    pub fn register_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    /// The step the scheduler is currently at.
    pub fn current_step(&self) -> StepId {
        self.current_step
    }

    /// The step at which a freshly-submitted command becomes executable.
    pub fn next_executable_step(&self) -> StepId {
        self.current_step.next()
    }

    /// Detaches the scheduler from its host time source. Commands in
    /// flight complete; queued future-step commands are retained for
    /// the next initialization.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    /// Whether [`TickScheduler::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Advances the accumulator by `wall_elapsed_ms` (capped at the
    /// configured safety limit) and runs every whole step this unlocks,
    /// dispatching commands, ticking systems, and recording one
    /// [`TickSpan`] per step.
    pub fn advance(
        &mut self,
        wall_elapsed_ms: f64,
        queue: &mut PriorityCommandQueue,
        dispatcher: &mut CommandDispatcher,
        resources: &mut ResourceTable,
        generators: &mut GeneratorTable,
    ) -> Vec<TickSpan> {
        if self.disposed {
            return Vec::new();
        }

        self.accumulator_ms = (self.accumulator_ms + wall_elapsed_ms).min(self.max_accumulator_ms);

        let mut spans = Vec::new();
        while self.accumulator_ms >= self.step_size_ms {
            let tick_start = Instant::now();
            let mut queue_span = QueueSpan::default();

            let ready = queue.dequeue_ready(self.current_step);
            queue_span.captured = ready.len() as u32;
            for command in &ready {
                match command.payload {
                    CommandPayload::Custom { .. } | CommandPayload::SetResourceAmount { .. } |
                    CommandPayload::AdjustGeneratorOwned { .. } | CommandPayload::SetGeneratorEnabled { .. } |
                    CommandPayload::SetParameter { .. } => {
                        match dispatcher.dispatch(command, resources, generators) {
                            DispatchRecord::Applied | DispatchRecord::Spawned => {
                                queue_span.executed += 1;
                            }
                            DispatchRecord::Failed(_) => {
                                queue_span.skipped += 1;
                            }
                        }
                    }
                }
            }

            let mut system_spans = Vec::with_capacity(self.systems.len());
            let ctx = TickContext {
                delta_ms: self.step_size_ms,
                current_step: self.current_step.0,
            };
            for system in &mut self.systems {
                let start = Instant::now();
                system.tick(ctx, resources, generators);
                let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                let over_budget_ms = (duration_ms - self.system_budget_ms).max(0.0);
                system_spans.push(crate::diagnostics::SystemSpan {
                    id: system.id().to_string(),
                    duration_ms,
                    budget_ms: self.system_budget_ms,
                    over_budget_ms,
                    is_slow: over_budget_ms > 0.0,
                });
            }

            self.current_step = self.current_step.next();
            self.accumulator_ms -= self.step_size_ms;

            let duration_ms = tick_start.elapsed().as_secs_f64() * 1000.0;
            let over_budget_ms = (duration_ms - self.tick_budget_ms).max(0.0);
            spans.push(TickSpan {
                step: self.current_step,
                duration_ms,
                budget_ms: self.tick_budget_ms,
                over_budget_ms,
                is_slow: over_budget_ms > 0.0,
                systems: system_spans,
                queue: queue_span,
                accumulator_backlog_ms: Some(self.accumulator_ms),
                error: None,
            });
        }

        spans
    }

    /// Simulates `elapsed_ms` of offline progression without going
    /// through the normal queue-driven loop.
    ///
    /// When `fast_path_eligible` (constant rates, no unlocks, no
    /// achievements, no automation, modeled capacity bounds — a
    /// precondition the content loader is responsible for checking),
    /// the entire duration is applied via one production-engine pass
    /// over the same accumulators. Otherwise, the fixed loop runs
    /// internally, one `step_size_ms` step at a time, until the elapsed
    /// budget is exhausted.
    pub fn apply_offline_catchup(
        &mut self,
        elapsed_ms: f64,
        resources: &mut ResourceTable,
        generators: &[GeneratorDef],
        production: &mut ProductionEngine,
        fast_path_eligible: bool,
    ) -> OfflineCatchupOutcome {
        if elapsed_ms <= 0.0 {
            return OfflineCatchupOutcome { steps_simulated: 0 };
        }

        if fast_path_eligible {
            production.run_tick(
                generators,
                elapsed_ms / 1000.0,
                resources,
                None,
                ProductionOptions::default(),
            );
            let steps = (elapsed_ms / self.step_size_ms).floor() as u64;
            for _ in 0..steps {
                self.current_step = self.current_step.next();
            }
            return OfflineCatchupOutcome { steps_simulated: steps };
        }

        let mut remaining = elapsed_ms;
        let mut steps_simulated = 0u64;
        while remaining >= self.step_size_ms {
            production.run_tick(
                generators,
                self.step_size_ms / 1000.0,
                resources,
                None,
                ProductionOptions::default(),
            );
            self.current_step = self.current_step.next();
            remaining -= self.step_size_ms;
            steps_simulated += 1;
        }
        OfflineCatchupOutcome { steps_simulated }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchBackoff;
    use accrete_core::command::{Command, Priority};
    use accrete_core::resource::ResourceDef;

    fn resources() -> ResourceTable {
        ResourceTable::new(&[ResourceDef {
            id: "energy".to_string(),
            capacity: Some(1000.0),
            initially_unlocked: true,
            initially_visible: true,
            track_rates: false,
        }])
    }

    fn gen_table() -> GeneratorTable {
        GeneratorTable::new(&[])
    }

    #[test]
    fn advance_runs_every_whole_step_unlocked_by_elapsed_time() {
        let mut scheduler = TickScheduler::new(100.0, 100.0, 16.0, 5.0);
        let mut queue = PriorityCommandQueue::new(8);
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        let mut table = resources();
        let mut generators = gen_table();

        let spans = scheduler.advance(250.0, &mut queue, &mut dispatcher, &mut table, &mut generators);
        assert_eq!(spans.len(), 2);
        assert_eq!(scheduler.current_step(), StepId(2));
    }

    #[test]
    fn advance_caps_accumulator_at_safety_limit() {
        let mut scheduler = TickScheduler::new(100.0, 100.0, 16.0, 5.0);
        let mut queue = PriorityCommandQueue::new(8);
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        let mut table = resources();
        let mut generators = gen_table();

        let spans = scheduler.advance(100_000.0, &mut queue, &mut dispatcher, &mut table, &mut generators);
        assert_eq!(spans.len(), 5);
    }

    #[test]
    fn disposed_scheduler_does_not_advance() {
        let mut scheduler = TickScheduler::new(100.0, 100.0, 16.0, 5.0);
        scheduler.dispose();
        let mut queue = PriorityCommandQueue::new(8);
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        let mut table = resources();
        let mut generators = gen_table();

        let spans = scheduler.advance(1000.0, &mut queue, &mut dispatcher, &mut table, &mut generators);
        assert!(spans.is_empty());
    }

    #[test]
    fn dispatched_intrinsic_command_mutates_resources_within_the_tick() {
        let mut scheduler = TickScheduler::new(100.0, 100.0, 16.0, 5.0);
        let mut queue = PriorityCommandQueue::new(8);
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        let mut table = resources();
        let mut generators = gen_table();

        queue
            .enqueue(
                Command {
                    command_type: "set_resource".to_string(),
                    payload: CommandPayload::SetResourceAmount {
                        resource_id: "energy".to_string(),
                        amount: 5.0,
                    },
                    priority: Priority::Player,
                    step: StepId(0),
                    timestamp: 0.0,
                    issued_at: 0.0,
                    request_id: None,
                    arrival_seq: 0,
                },
                scheduler.current_step(),
            )
            .unwrap();

        scheduler.advance(100.0, &mut queue, &mut dispatcher, &mut table, &mut generators);
        let idx = table.require_index("energy").unwrap();
        assert_eq!(table.amount(idx), Some(5.0));
    }

    #[test]
    fn dispatched_adjust_generator_owned_mutates_generator_table_within_the_tick() {
        let mut scheduler = TickScheduler::new(100.0, 100.0, 16.0, 5.0);
        let mut queue = PriorityCommandQueue::new(8);
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        let mut table = resources();
        let mut generators = GeneratorTable::new(&[GeneratorDef {
            id: "reactor".to_string(),
            owned: 1,
            enabled: true,
            produces: vec![],
            consumes: vec![],
        }]);

        queue
            .enqueue(
                Command {
                    command_type: "adjust_generator".to_string(),
                    payload: CommandPayload::AdjustGeneratorOwned {
                        generator_id: "reactor".to_string(),
                        delta: 2,
                    },
                    priority: Priority::Player,
                    step: StepId(0),
                    timestamp: 0.0,
                    issued_at: 0.0,
                    request_id: None,
                    arrival_seq: 0,
                },
                scheduler.current_step(),
            )
            .unwrap();

        scheduler.advance(100.0, &mut queue, &mut dispatcher, &mut table, &mut generators);
        let idx = generators.require_index("reactor").unwrap();
        assert_eq!(generators.get(idx).unwrap().owned, 3);
    }

    #[test]
    fn offline_catchup_fast_path_advances_step_and_applies_production() {
        let mut scheduler = TickScheduler::new(100.0, 100.0, 16.0, 5.0);
        let mut table = resources();
        let mut production = ProductionEngine::new(1e-4).unwrap();
        let generators = vec![GeneratorDef {
            id: "reactor".to_string(),
            owned: 1,
            enabled: true,
            produces: vec![accrete_core::resource::GeneratorFlow {
                resource_id: "energy".to_string(),
                rate_per_owned_per_second: 1.0,
            }],
            consumes: vec![],
        }];

        let outcome = scheduler.apply_offline_catchup(10_000.0, &mut table, &generators, &mut production, true);
        assert_eq!(outcome.steps_simulated, 100);
        assert_eq!(scheduler.current_step(), StepId(100));
        let idx = table.require_index("energy").unwrap();
        assert!((table.amount(idx).unwrap() - 10.0).abs() < 1e-6);
    }
}
