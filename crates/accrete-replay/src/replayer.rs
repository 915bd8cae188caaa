//! Replays a [`CommandLog`] against a fresh kernel.
//!
//! Replay restores the log's start state, seeds an RNG if the log
//! carries one, and executes every recorded command in order through
//! the real [`CommandDispatcher`] — the same dispatcher used live, not
//! a parallel sandbox implementation. A handler's only channel back
//! into the simulation is [`EnqueueHandle`](accrete_engine::EnqueueHandle)
//! enqueues, which the dispatcher already buffers separately from the
//! destination queue; replay drains that buffer itself and reconciles
//! each follow-up against the log instead of ever touching the live
//! queue, so no parallel sandbox plumbing is needed beyond what the
//! dispatcher already provides for the ordinary tick loop.

use accrete_core::command::{Command, Priority};
use accrete_core::id::StepId;
use accrete_core::resource::ResourceDef;
use accrete_engine::{CommandDispatcher, DispatchRecord, PriorityCommandQueue};
use accrete_resources::{GeneratorTable, ResourceTable};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{ReplayDiagnostic, ReplayError};
use crate::types::CommandLog;

/// What replay produced: step advancement plus any non-aborting
/// diagnostics observed along the way.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayOutcome {
    /// The step the kernel reached after a successful replay
    /// (`log.metadata.last_step + 1`).
    pub next_step: StepId,
}

/// Full report of a completed replay: the outcome plus every
/// non-aborting diagnostic observed while executing the log.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayReport {
    /// Step advancement produced by this replay.
    pub outcome: ReplayOutcome,
    /// Unknown-command-type and handler-failure diagnostics recorded
    /// along the way. Does not include the abort condition itself,
    /// which is returned as an `Err` instead.
    pub diagnostics: Vec<ReplayDiagnostic>,
}

/// Replays `log` against `resources`/`generators`/`queue`/`dispatcher`.
///
/// `current_step` is updated to `log.metadata.last_step + 1` only on
/// success; a failed replay leaves it untouched, which is the only
/// rollback this module performs (resource and generator table mutations
/// already applied by commands executed before the failure are not
/// undone).
///
/// `rng` is required when `log.metadata.seed` is `Some`
/// ([`ReplayError::NoSeedRequested`] otherwise) and is seeded with that
/// value before any command executes.
///
/// `target_config_hash` is the replay target's
/// [`KernelConfig::content_hash`](accrete_engine::config::KernelConfig::content_hash).
/// If the log carries a `config_hash` and it disagrees with
/// `target_config_hash`, replay aborts with
/// [`ReplayError::ConfigMismatch`] before any state is touched. A log
/// recorded with no `config_hash`, or a replay target that passes
/// `None`, skips this check.
pub async fn replay(
    log: &CommandLog,
    resource_defs: &[ResourceDef],
    resources: &mut ResourceTable,
    generators: &mut GeneratorTable,
    queue: &PriorityCommandQueue,
    dispatcher: &mut CommandDispatcher,
    current_step: &mut StepId,
    rng: Option<&mut ChaCha8Rng>,
    target_config_hash: Option<u64>,
) -> Result<ReplayReport, ReplayError> {
    if !queue.is_empty() {
        return Err(ReplayError::QueueNotEmpty);
    }

    if let (Some(expected), Some(found)) = (log.metadata.config_hash, target_config_hash) {
        if expected != found {
            return Err(ReplayError::ConfigMismatch { expected, found });
        }
    }

    match (log.metadata.seed, rng) {
        (Some(seed), Some(rng)) => *rng = ChaCha8Rng::seed_from_u64(seed),
        (Some(_), None) => return Err(ReplayError::NoSeedRequested),
        (None, _) => {}
    }

    log.start_state.restore_into(resource_defs, resources, generators);

    let mut diagnostics = Vec::new();
    let mut claimed = vec![false; log.commands.len()];

    for index in 0..log.commands.len() {
        if claimed[index] {
            continue;
        }
        let command = &log.commands[index];
        claimed[index] = true;

        match dispatcher.dispatch(command, resources, generators) {
            DispatchRecord::Applied | DispatchRecord::Spawned => {}
            DispatchRecord::Failed(accrete_core::error::DispatchError::UnknownCommandType { .. }) => {
                diagnostics.push(ReplayDiagnostic::UnknownCommandType {
                    command_type: command.command_type.clone(),
                    step: command.step.0,
                });
            }
            DispatchRecord::Failed(error @ accrete_core::error::DispatchError::CommandFailed { .. }) => {
                diagnostics.push(ReplayDiagnostic::ExecutionFailed {
                    command_type: command.command_type.clone(),
                    step: command.step.0,
                    code: dispatch_error_code(&error),
                    message: error.to_string(),
                });
            }
        }

        dispatcher.pump().await;
        for failure in dispatcher.drain_failures() {
            diagnostics.push(ReplayDiagnostic::ExecutionFailed {
                command_type: failure.command_type,
                step: failure.step.0,
                code: dispatch_error_code(&failure.error),
                message: failure.error.to_string(),
            });
        }

        for followup in dispatcher.drain_pending_enqueues() {
            reconcile_followup(&followup, &log.commands, &mut claimed, index)?;
        }
    }

    let next_step = StepId(log.metadata.last_step + 1);
    *current_step = next_step;

    Ok(ReplayReport {
        outcome: ReplayOutcome { next_step },
        diagnostics,
    })
}

/// Matches a handler-issued follow-up command against the first
/// unclaimed log entry after `after_index` with the same
/// `(command_type, priority, step, payload)`, the
/// reconciliation rule. Claims that entry on match; aborts replay with
/// [`ReplayError::MissingFollowupCommand`] otherwise.
fn reconcile_followup(
    followup: &Command,
    log_commands: &[Command],
    claimed: &mut [bool],
    after_index: usize,
) -> Result<(), ReplayError> {
    let matched = log_commands
        .iter()
        .enumerate()
        .skip(after_index + 1)
        .find(|(i, candidate)| {
            !claimed[*i]
                && candidate.command_type == followup.command_type
                && candidate.priority == followup.priority
                && candidate.step == followup.step
                && candidate.payload == followup.payload
        })
        .map(|(i, _)| i);

    match matched {
        Some(i) => {
            claimed[i] = true;
            Ok(())
        }
        None => Err(ReplayError::MissingFollowupCommand {
            command_type: followup.command_type.clone(),
            step: followup.step.0,
        }),
    }
}

fn dispatch_error_code(error: &accrete_core::error::DispatchError) -> String {
    match error {
        accrete_core::error::DispatchError::UnknownCommandType { .. } => "UnknownCommandType".to_string(),
        accrete_core::error::DispatchError::CommandFailed { code, .. } => code.clone(),
    }
}
