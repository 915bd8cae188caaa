//! Commands, payloads, and the receipts the Priority Command Queue and
//! Command Dispatcher produce when handling them.

use serde::{Deserialize, Serialize};

use crate::error::IngressError;
use crate::id::StepId;

/// Ordering class of a command (`SYSTEM=0, PLAYER=1,
/// AUTOMATION=2`). Lower values execute first within the same step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    /// Kernel-internal commands (offline catchup, restore rebasing).
    System = 0,
    /// Commands originating from the player via the transport boundary.
    Player = 1,
    /// Commands originating from automation systems.
    Automation = 2,
}

/// The body of a command, opaque to the queue and dispatcher outside the
/// handler that owns its `command_type`.
///
/// Kept as a closed enum rather than `Box<dyn Any>`: both the recorder's
/// deep-freeze snapshots and the replayer's structural equality check
/// need `Clone` + `PartialEq`, which a type-erased payload cannot give
/// without a parallel vtable of copy/compare functions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CommandPayload {
    /// Sets a resource's amount directly, bypassing production.
    SetResourceAmount {
        /// Target resource ID.
        resource_id: String,
        /// New amount, pre-clamp.
        amount: f64,
    },
    /// Adjusts how many of a generator are owned.
    AdjustGeneratorOwned {
        /// Target generator ID.
        generator_id: String,
        /// Signed change in owned count.
        delta: i64,
    },
    /// Enables or disables a generator.
    SetGeneratorEnabled {
        /// Target generator ID.
        generator_id: String,
        /// New enabled state.
        enabled: bool,
    },
    /// Sets a named simulation parameter.
    SetParameter {
        /// Parameter key.
        key: String,
        /// New value.
        value: f64,
    },
    /// Handler-defined payload opaque to the kernel.
    Custom {
        /// Discriminates the custom shape for the registered handler.
        type_id: String,
        /// Raw bytes interpreted only by that handler.
        data: Vec<u8>,
    },
}

/// A command awaiting or undergoing execution.
///
/// `command_type` is kept independent of the `payload` variant tag so the
/// dispatcher's string-keyed handler registry can route on it directly,
/// matching the `{ type, payload, ... }` shape commands are admitted in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Dispatcher registry key.
    pub command_type: String,
    /// Command body.
    pub payload: CommandPayload,
    /// Ordering class.
    pub priority: Priority,
    /// Step at which this command becomes executable. Must be
    /// `>= currentStep` at enqueue time.
    pub step: StepId,
    /// Simulation-clock timestamp the command was stamped with.
    pub timestamp: f64,
    /// Monotonic clock reading taken at admission, used to reject stale
    /// resubmissions at the transport boundary.
    pub issued_at: f64,
    /// Caller-supplied correlation ID, echoed back in receipts/errors.
    pub request_id: Option<String>,
    /// Arrival order assigned by the queue at `enqueue`, used as the
    /// final tiebreaker in the queue's total order.
    pub arrival_seq: u64,
}

/// Outcome of submitting or executing a [`Command`].
#[derive(Clone, Debug, PartialEq)]
pub struct Receipt {
    /// Whether the command was accepted into the queue.
    pub accepted: bool,
    /// The step the command actually executed at, once known.
    pub applied_step: Option<StepId>,
    /// Why the command was rejected, if it was.
    pub reason: Option<IngressError>,
    /// Position of this command within the batch it was submitted with.
    pub command_index: usize,
}

impl Receipt {
    /// Builds an accepted receipt for a command that has not yet executed.
    pub fn accepted(command_index: usize) -> Self {
        Self {
            accepted: true,
            applied_step: None,
            reason: None,
            command_index,
        }
    }

    /// Builds a rejected receipt carrying the reason for rejection.
    pub fn rejected(command_index: usize, reason: IngressError) -> Self {
        Self {
            accepted: false,
            applied_step: None,
            reason: Some(reason),
            command_index,
        }
    }
}
