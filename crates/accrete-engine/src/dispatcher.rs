//! The Command Dispatcher.
//!
//! Four [`CommandPayload`] variants (`SetResourceAmount`,
//! `AdjustGeneratorOwned`, `SetGeneratorEnabled`, `SetParameter`) are
//! kernel-intrinsic: the dispatcher applies them directly and
//! synchronously against the resource table within the same tick,
//! keeping the single-threaded, lock-free ownership model intact.
//!
//! `Custom` payloads route through the registered handler table. A
//! handler may be genuinely asynchronous; rather than sharing mutable
//! resource-table access across an await point (which would need a
//! shared `Rc<RefCell<_>>`/lock), a handler's only channel back into
//! the simulation is enqueuing follow-up commands, which flow through
//! the ordinary queue → dispatch cycle on a later tick. Handler
//! failures are recorded in a failure inbox the scheduler drains each
//! tick rather than propagated synchronously.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use accrete_core::command::{Command, CommandPayload, Priority};
use accrete_core::error::{DispatchError, GeneratorError, ResourceError};
use accrete_core::id::StepId;
use accrete_core::traits::{ResourceReader, ResourceWriter};
use accrete_resources::{GeneratorTable, ResourceTable};
use async_trait::async_trait;

use crate::config::DispatchBackoff;

/// Execution context a handler receives alongside its payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExecutionContext {
    /// The step this command is executing at.
    pub step: StepId,
    /// The command's stamped timestamp.
    pub timestamp: f64,
    /// The command's ordering class.
    pub priority: Priority,
}

/// A handle a `Custom` command handler uses to enqueue follow-up
/// commands. The only way handler logic can affect simulation state.
#[derive(Clone, Default)]
pub struct EnqueueHandle {
    pending: Rc<RefCell<Vec<Command>>>,
}

impl EnqueueHandle {
    /// Queues `command` to be submitted to the Priority Command Queue on
    /// a later drain of [`CommandDispatcher::drain_pending_enqueues`].
    pub fn enqueue(&self, command: Command) {
        self.pending.borrow_mut().push(command);
    }
}

/// Handles a `Custom` command payload.
///
/// Runs on the kernel's single logical thread via `spawn_local`, so
/// implementations need not be `Send`.
#[async_trait(?Send)]
pub trait CommandHandler {
    /// Executes the handler's logic for one command.
    async fn handle(
        &self,
        payload: &CommandPayload,
        ctx: ExecutionContext,
        enqueue: &EnqueueHandle,
    ) -> Result<(), DispatchError>;
}

/// One asynchronously-reported handler failure, awaiting pickup by the
/// scheduler's per-tick flush.
#[derive(Clone, Debug, PartialEq)]
pub struct FailureInboxEntry {
    /// The command type whose handler failed.
    pub command_type: String,
    /// The caller-supplied correlation ID, if any.
    pub request_id: Option<String>,
    /// The step the command was executing at.
    pub step: StepId,
    /// Why the handler failed.
    pub error: DispatchError,
}

/// Outcome of dispatching one command.
#[derive(Debug)]
pub enum DispatchRecord {
    /// A kernel-intrinsic payload was applied directly.
    Applied,
    /// A `Custom` payload's handler was spawned to run asynchronously.
    Spawned,
    /// Dispatch failed synchronously (unknown type, or an intrinsic
    /// mutation that failed validation).
    Failed(DispatchError),
}

/// Registry mapping command type to handler, with direct application of
/// kernel-intrinsic payloads and a failure inbox for async handlers.
pub struct CommandDispatcher {
    handlers: HashMap<String, Rc<dyn CommandHandler>>,
    local: tokio::task::LocalSet,
    failures: Rc<RefCell<Vec<FailureInboxEntry>>>,
    enqueue_handle: EnqueueHandle,
    consecutive_failures: HashMap<String, u32>,
    ticks_since_last_failure: HashMap<String, u64>,
    disabled_types: HashMap<String, ()>,
    backoff: DispatchBackoff,
}

impl CommandDispatcher {
    /// Builds an empty dispatcher.
    pub fn new(backoff: DispatchBackoff) -> Self {
        Self {
            handlers: HashMap::new(),
            local: tokio::task::LocalSet::new(),
            failures: Rc::new(RefCell::new(Vec::new())),
            enqueue_handle: EnqueueHandle::default(),
            consecutive_failures: HashMap::new(),
            ticks_since_last_failure: HashMap::new(),
            disabled_types: HashMap::new(),
            backoff,
        }
    }

    /// Registers a handler for `Custom` payloads carrying `command_type`.
    pub fn register(&mut self, command_type: impl Into<String>, handler: Rc<dyn CommandHandler>) {
        self.handlers.insert(command_type.into(), handler);
    }

    /// Looks up the handler registered for `command_type`, if any.
    pub fn get_handler(&self, command_type: &str) -> Option<Rc<dyn CommandHandler>> {
        self.handlers.get(command_type).cloned()
    }

    /// Whether dispatch of `command_type` has been disabled after
    /// exceeding [`DispatchBackoff::max_consecutive_failures`].
    pub fn is_disabled(&self, command_type: &str) -> bool {
        self.disabled_types.contains_key(command_type)
    }

    /// Number of command types currently disabled by the backoff policy.
    pub fn disabled_count(&self) -> usize {
        self.disabled_types.len()
    }

    /// Dispatches one command: applies it directly if its payload is
    /// kernel-intrinsic, or spawns its registered handler otherwise.
    pub fn dispatch(
        &mut self,
        command: &Command,
        resources: &mut ResourceTable,
        generators: &mut GeneratorTable,
    ) -> DispatchRecord {
        if self.is_disabled(&command.command_type) {
            return DispatchRecord::Failed(DispatchError::UnknownCommandType {
                command_type: command.command_type.clone(),
            });
        }

        match &command.payload {
            CommandPayload::Custom { .. } => self.dispatch_custom(command),
            intrinsic => match apply_intrinsic(intrinsic, resources, generators) {
                Ok(()) => {
                    self.record_success(&command.command_type);
                    DispatchRecord::Applied
                }
                Err(err) => {
                    self.record_failure(&command.command_type);
                    DispatchRecord::Failed(err)
                }
            },
        }
    }

    fn dispatch_custom(&mut self, command: &Command) -> DispatchRecord {
        let Some(handler) = self.get_handler(&command.command_type) else {
            self.record_failure(&command.command_type);
            return DispatchRecord::Failed(DispatchError::UnknownCommandType {
                command_type: command.command_type.clone(),
            });
        };

        let ctx = ExecutionContext {
            step: command.step,
            timestamp: command.timestamp,
            priority: command.priority,
        };
        let payload = command.payload.clone();
        let command_type = command.command_type.clone();
        let request_id = command.request_id.clone();
        let step = command.step;
        let failures = Rc::clone(&self.failures);
        let enqueue = self.enqueue_handle.clone();

        self.local.spawn_local(async move {
            if let Err(error) = handler.handle(&payload, ctx, &enqueue).await {
                failures.borrow_mut().push(FailureInboxEntry {
                    command_type,
                    request_id,
                    step,
                    error,
                });
            }
        });

        DispatchRecord::Spawned
    }

    fn record_failure(&mut self, command_type: &str) {
        let count = self
            .consecutive_failures
            .entry(command_type.to_string())
            .or_insert(0);
        *count += 1;
        self.ticks_since_last_failure.insert(command_type.to_string(), 0);
        if *count >= self.backoff.max_consecutive_failures {
            self.disabled_types.insert(command_type.to_string(), ());
        }
    }

    fn record_success(&mut self, command_type: &str) {
        self.consecutive_failures.remove(command_type);
    }

    /// Advances the backoff decay clock by one tick, re-enabling any
    /// disabled command type that has gone `decay_rate` ticks without a
    /// new failure.
    pub fn decay_backoff(&mut self) {
        let decay_rate = self.backoff.decay_rate;
        let mut to_reenable = Vec::new();
        for (command_type, ticks) in self.ticks_since_last_failure.iter_mut() {
            *ticks += 1;
            if *ticks >= decay_rate {
                to_reenable.push(command_type.clone());
            }
        }
        for command_type in to_reenable {
            self.ticks_since_last_failure.remove(&command_type);
            self.consecutive_failures.remove(&command_type);
            self.disabled_types.remove(&command_type);
        }
    }

    /// Gives spawned handler tasks a chance to run, without blocking
    /// until every task completes. Call once per tick before
    /// [`CommandDispatcher::drain_failures`].
    pub async fn pump(&self) {
        self.local.run_until(tokio::task::yield_now()).await;
    }

    /// Drains and returns every failure reported since the last drain.
    pub fn drain_failures(&mut self) -> Vec<FailureInboxEntry> {
        self.failures.borrow_mut().drain(..).collect()
    }

    /// Drains and returns every command enqueued by a handler via
    /// [`EnqueueHandle`] since the last drain.
    pub fn drain_pending_enqueues(&mut self) -> Vec<Command> {
        self.enqueue_handle.pending.borrow_mut().drain(..).collect()
    }
}

fn apply_intrinsic(
    payload: &CommandPayload,
    resources: &mut ResourceTable,
    generators: &mut GeneratorTable,
) -> Result<(), DispatchError> {
    match payload {
        CommandPayload::SetResourceAmount { resource_id, amount } => {
            let index = require_resource_index(resources, resource_id)?;
            let current = resources.amount(index).unwrap_or(0.0);
            resources.add_amount(index, amount - current);
            Ok(())
        }
        CommandPayload::AdjustGeneratorOwned { generator_id, delta } => {
            let index = require_generator_index(generators, generator_id)?;
            generators.adjust_owned(index, *delta);
            Ok(())
        }
        CommandPayload::SetGeneratorEnabled { generator_id, enabled } => {
            let index = require_generator_index(generators, generator_id)?;
            generators.set_enabled(index, *enabled);
            Ok(())
        }
        // SetParameter carries host-defined tuning knobs the kernel
        // itself has no fixed semantics for; a registered Custom handler
        // or system reads it back out via the resource/generator tables.
        CommandPayload::SetParameter { .. } => Ok(()),
        CommandPayload::Custom { .. } => unreachable!("Custom payloads never reach apply_intrinsic"),
    }
}

fn require_resource_index(resources: &ResourceTable, resource_id: &str) -> Result<accrete_core::id::ResourceIndex, DispatchError> {
    resources.require_index(resource_id).map_err(|ResourceError::UnknownResource { resource_id }| {
        DispatchError::CommandFailed {
            code: "UnknownResource".to_string(),
            message: format!("unknown resource '{resource_id}'"),
            details: None,
        }
    })
}

fn require_generator_index(generators: &GeneratorTable, generator_id: &str) -> Result<accrete_core::id::GeneratorIndex, DispatchError> {
    generators.require_index(generator_id).map_err(|GeneratorError::UnknownGenerator { generator_id }| {
        DispatchError::CommandFailed {
            code: "UnknownGenerator".to_string(),
            message: format!("unknown generator '{generator_id}'"),
            details: None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrete_core::resource::{GeneratorDef, GeneratorFlow, ResourceDef};

    fn table() -> ResourceTable {
        ResourceTable::new(&[ResourceDef {
            id: "energy".to_string(),
            capacity: Some(100.0),
            initially_unlocked: true,
            initially_visible: true,
            track_rates: false,
        }])
    }

    fn gen_table() -> GeneratorTable {
        GeneratorTable::new(&[GeneratorDef {
            id: "reactor".to_string(),
            owned: 1,
            enabled: true,
            produces: vec![GeneratorFlow {
                resource_id: "energy".to_string(),
                rate_per_owned_per_second: 1.0,
            }],
            consumes: Vec::new(),
        }])
    }

    fn cmd_typed(command_type: &str, payload: CommandPayload) -> Command {
        Command {
            command_type: command_type.to_string(),
            payload,
            priority: Priority::Player,
            step: StepId(0),
            timestamp: 0.0,
            issued_at: 0.0,
            request_id: None,
            arrival_seq: 0,
        }
    }

    fn cmd(payload: CommandPayload) -> Command {
        cmd_typed("set_resource", payload)
    }

    #[test]
    fn applies_set_resource_amount_directly() {
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        let mut resources = table();
        let mut generators = gen_table();
        let command = cmd(CommandPayload::SetResourceAmount {
            resource_id: "energy".to_string(),
            amount: 42.0,
        });

        let record = dispatcher.dispatch(&command, &mut resources, &mut generators);
        assert!(matches!(record, DispatchRecord::Applied));
        let idx = resources.require_index("energy").unwrap();
        assert_eq!(resources.amount(idx), Some(42.0));
    }

    #[test]
    fn set_resource_amount_on_unknown_resource_fails() {
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        let mut resources = table();
        let mut generators = gen_table();
        let command = cmd(CommandPayload::SetResourceAmount {
            resource_id: "ghost".to_string(),
            amount: 1.0,
        });

        let record = dispatcher.dispatch(&command, &mut resources, &mut generators);
        assert!(matches!(record, DispatchRecord::Failed(_)));
    }

    #[test]
    fn adjusts_generator_owned_count() {
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        let mut resources = table();
        let mut generators = gen_table();
        let command = cmd_typed(
            "adjust_generator",
            CommandPayload::AdjustGeneratorOwned {
                generator_id: "reactor".to_string(),
                delta: 3,
            },
        );

        let record = dispatcher.dispatch(&command, &mut resources, &mut generators);
        assert!(matches!(record, DispatchRecord::Applied));
        let idx = generators.require_index("reactor").unwrap();
        assert_eq!(generators.get(idx).unwrap().owned, 4);
    }

    #[test]
    fn adjust_generator_owned_on_unknown_generator_fails() {
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        let mut resources = table();
        let mut generators = gen_table();
        let command = cmd_typed(
            "adjust_generator",
            CommandPayload::AdjustGeneratorOwned {
                generator_id: "ghost".to_string(),
                delta: 1,
            },
        );

        let record = dispatcher.dispatch(&command, &mut resources, &mut generators);
        assert!(matches!(record, DispatchRecord::Failed(_)));
    }

    #[test]
    fn sets_generator_enabled_flag() {
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        let mut resources = table();
        let mut generators = gen_table();
        let command = cmd_typed(
            "set_generator_enabled",
            CommandPayload::SetGeneratorEnabled {
                generator_id: "reactor".to_string(),
                enabled: false,
            },
        );

        dispatcher.dispatch(&command, &mut resources, &mut generators);
        let idx = generators.require_index("reactor").unwrap();
        assert!(!generators.get(idx).unwrap().enabled);
    }

    #[test]
    fn disables_command_type_after_consecutive_failures() {
        let mut dispatcher = CommandDispatcher::new(DispatchBackoff {
            max_consecutive_failures: 2,
            decay_rate: 60,
        });
        let mut resources = table();
        let mut generators = gen_table();
        let bad = cmd(CommandPayload::SetResourceAmount {
            resource_id: "ghost".to_string(),
            amount: 1.0,
        });

        dispatcher.dispatch(&bad, &mut resources, &mut generators);
        assert!(!dispatcher.is_disabled("set_resource"));
        dispatcher.dispatch(&bad, &mut resources, &mut generators);
        assert!(dispatcher.is_disabled("set_resource"));
    }

    #[tokio::test]
    async fn custom_handler_failure_reaches_failure_inbox() {
        struct AlwaysFails;
        #[async_trait(?Send)]
        impl CommandHandler for AlwaysFails {
            async fn handle(
                &self,
                _payload: &CommandPayload,
                _ctx: ExecutionContext,
                _enqueue: &EnqueueHandle,
            ) -> Result<(), DispatchError> {
                Err(DispatchError::CommandFailed {
                    code: "boom".to_string(),
                    message: "always fails".to_string(),
                    details: None,
                })
            }
        }

        let mut dispatcher = CommandDispatcher::new(DispatchBackoff::default());
        dispatcher.register("social_gift", Rc::new(AlwaysFails));
        let mut resources = table();
        let mut generators = gen_table();
        let command = cmd_typed(
            "social_gift",
            CommandPayload::Custom {
                type_id: "social_gift".to_string(),
                data: Vec::new(),
            },
        );

        let record = dispatcher.dispatch(&command, &mut resources, &mut generators);
        assert!(matches!(record, DispatchRecord::Spawned));

        dispatcher.pump().await;
        let failures = dispatcher.drain_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].command_type, "social_gift");
    }
}
