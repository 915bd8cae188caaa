//! Inbound and outbound message shapes.
//!
//! These are the types a host embedding the kernel serializes onto (or
//! reads off of) whatever transport it chooses; this crate only defines
//! the shapes, not a wire encoding or socket.

use accrete_core::command::{Command, CommandPayload, Priority};
use serde::{Deserialize, Serialize};

use crate::error::ErrorPayload;
use crate::snapshot::SessionSnapshot;

/// Current message schema version, carried on every envelope.
pub const MESSAGE_SCHEMA_VERSION: u32 = 1;

/// Where a `COMMAND` message originated, carried for diagnostics and
/// receipts. This does *not* determine the [`Priority`] a
/// transport-admitted command enqueues at — every inbound `COMMAND`
/// message is admitted at `Priority::Player` regardless of `source`;
/// `SYSTEM`/`AUTOMATION` priority is reserved for commands the kernel
/// enqueues itself (offline catchup, handler follow-ups), never for
/// anything arriving across the transport boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandSource {
    /// Issued directly by the player.
    Player,
    /// Issued by an automation system on the player's behalf.
    Automation,
    /// Issued by a kernel-internal system and merely relayed through the
    /// transport boundary for logging purposes.
    System,
}

/// Body of an inbound `COMMAND` message, before it is admitted to the
/// queue as a [`Command`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Registry key the dispatcher routes on.
    pub command_type: String,
    /// Command body.
    pub payload: CommandPayload,
    /// Where this command originated.
    pub source: CommandSource,
    /// Step this command becomes executable at, if the host wants to
    /// pin it; otherwise the transport stamps `currentStep`.
    pub step: Option<u64>,
    /// Caller clock reading at submission, checked against the sender's
    /// last accepted value to reject stale resubmission.
    pub issued_at: f64,
    /// Caller-supplied correlation ID, echoed back in the receipt.
    pub request_id: Option<String>,
}

impl CommandRequest {
    /// Builds the kernel [`Command`] this request describes, stamping
    /// `step`/`timestamp`/`arrival_seq` with values the caller supplies
    /// (the queue assigns the real `arrival_seq` at `enqueue`; `0` here
    /// is a placeholder overwritten there).
    ///
    /// Always admits at `Priority::Player`: `self.source` is diagnostic
    /// metadata, not an ordering-class selector (see [`CommandSource`]).
    pub fn into_command(self, resolved_step: u64, timestamp: f64) -> Command {
        Command {
            command_type: self.command_type,
            payload: self.payload,
            priority: Priority::Player,
            step: accrete_core::id::StepId(self.step.unwrap_or(resolved_step)),
            timestamp,
            issued_at: self.issued_at,
            request_id: self.request_id,
            arrival_seq: 0,
        }
    }
}

/// Body of an inbound `RESTORE_SESSION` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestoreSessionRequest {
    /// The snapshot to restore from.
    pub snapshot: SessionSnapshot,
}

/// Body of an inbound `REQUEST_SESSION_SNAPSHOT` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestSessionSnapshotRequest {
    /// Host-assigned slot to stamp onto the produced snapshot.
    pub slot_id: String,
}

/// Body of an inbound `SOCIAL_COMMAND` message; opaque to the kernel
/// beyond its `type_id`/`data` framing, handled entirely by the social
/// feature's own registered handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SocialCommandRequest {
    /// Discriminates the social command shape for its handler.
    pub type_id: String,
    /// Raw bytes interpreted only by that handler.
    pub data: Vec<u8>,
    /// Caller-supplied correlation ID, echoed back in the result.
    pub request_id: Option<String>,
}

/// Every inbound message a host can send the kernel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Submit a command for admission to the queue.
    #[serde(rename = "COMMAND")]
    Command(CommandRequest),
    /// Restore a session from a persisted snapshot.
    #[serde(rename = "RESTORE_SESSION")]
    RestoreSession(RestoreSessionRequest),
    /// Subscribe to `DIAGNOSTICS_UPDATE` messages.
    #[serde(rename = "DIAGNOSTICS_SUBSCRIBE")]
    DiagnosticsSubscribe,
    /// Unsubscribe from `DIAGNOSTICS_UPDATE` messages.
    #[serde(rename = "DIAGNOSTICS_UNSUBSCRIBE")]
    DiagnosticsUnsubscribe,
    /// Request a fresh [`SessionSnapshot`].
    #[serde(rename = "REQUEST_SESSION_SNAPSHOT")]
    RequestSessionSnapshot(RequestSessionSnapshotRequest),
    /// Terminate the session.
    #[serde(rename = "TERMINATE")]
    Terminate,
    /// Submit a social-feature command.
    #[serde(rename = "SOCIAL_COMMAND")]
    SocialCommand(SocialCommandRequest),
}

impl InboundMessage {
    /// The `type` discriminant this message serializes under, for
    /// diagnostics and error reporting.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Command(_) => "COMMAND",
            Self::RestoreSession(_) => "RESTORE_SESSION",
            Self::DiagnosticsSubscribe => "DIAGNOSTICS_SUBSCRIBE",
            Self::DiagnosticsUnsubscribe => "DIAGNOSTICS_UNSUBSCRIBE",
            Self::RequestSessionSnapshot(_) => "REQUEST_SESSION_SNAPSHOT",
            Self::Terminate => "TERMINATE",
            Self::SocialCommand(_) => "SOCIAL_COMMAND",
        }
    }
}

/// Body of the outbound `READY` message, sent once a session's kernel
/// has finished constructing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadyPayload {
    /// The message schema version this session speaks.
    pub schema_version: u32,
    /// The step the kernel starts at.
    pub worker_step: u64,
}

/// Body of the outbound `STATE_UPDATE` message, sent after every tick
/// (or batch of ticks) a host chooses to flush.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateUpdatePayload {
    /// The step this update reflects.
    pub worker_step: u64,
    /// Resource IDs in index order, mirroring `amounts`.
    pub resource_ids: Vec<String>,
    /// Amounts in index order.
    pub amounts: Vec<f64>,
    /// Receipts for commands admitted since the last `STATE_UPDATE`.
    pub receipts: Vec<ReceiptPayload>,
}

/// Host-serializable mirror of [`accrete_core::command::Receipt`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceiptPayload {
    /// Whether the command was accepted into the queue.
    pub accepted: bool,
    /// The step the command executed at, once known.
    pub applied_step: Option<u64>,
    /// Stable rejection code, when `accepted` is `false`.
    pub reason: Option<String>,
    /// Position of this command within the batch it was submitted with.
    pub command_index: usize,
    /// Echoes the originating `COMMAND` message's `requestId`.
    pub request_id: Option<String>,
}

/// Body of the outbound `DIAGNOSTICS_UPDATE` message, sent to
/// subscribed hosts after each tick span is recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsUpdatePayload {
    /// The timeline head cursor to pass on the next read.
    pub head: u64,
    /// Spans dropped because this reader fell behind the ring.
    pub dropped: u64,
    /// Encoded diagnostic spans, opaque framing left to the host's
    /// diagnostics viewer.
    pub spans: Vec<u8>,
}

/// Body of the outbound `SESSION_RESTORED` message, sent after a
/// `RESTORE_SESSION` message succeeds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRestoredPayload {
    /// The step the kernel resumed at.
    pub worker_step: u64,
    /// Commands re-admitted from the snapshot's queued commands.
    pub requeued_commands: usize,
}

/// Body of the outbound `SESSION_SNAPSHOT` message, sent in response to
/// `REQUEST_SESSION_SNAPSHOT`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshotPayload {
    /// The captured snapshot.
    pub snapshot: SessionSnapshot,
}

/// Body of the outbound `SOCIAL_COMMAND_RESULT` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SocialCommandResultPayload {
    /// Whether the social command succeeded.
    pub success: bool,
    /// Handler-defined result payload, opaque to the kernel.
    pub data: Option<Vec<u8>>,
    /// Echoes the originating `SOCIAL_COMMAND` message's `requestId`.
    pub request_id: Option<String>,
}

/// Every outbound message the kernel can send a host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Session is constructed and ready to accept messages.
    #[serde(rename = "READY")]
    Ready(ReadyPayload),
    /// Resource state changed since the last update.
    #[serde(rename = "STATE_UPDATE")]
    StateUpdate(StateUpdatePayload),
    /// A diagnostic timeline span was recorded.
    #[serde(rename = "DIAGNOSTICS_UPDATE")]
    DiagnosticsUpdate(DiagnosticsUpdatePayload),
    /// A `RESTORE_SESSION` message succeeded.
    #[serde(rename = "SESSION_RESTORED")]
    SessionRestored(SessionRestoredPayload),
    /// A `REQUEST_SESSION_SNAPSHOT` message succeeded.
    #[serde(rename = "SESSION_SNAPSHOT")]
    SessionSnapshot(SessionSnapshotPayload),
    /// A `SOCIAL_COMMAND` message was handled.
    #[serde(rename = "SOCIAL_COMMAND_RESULT")]
    SocialCommandResult(SocialCommandResultPayload),
    /// Any inbound message failed, including validation failures that
    /// never reached the kernel.
    #[serde(rename = "ERROR")]
    Error(ErrorPayload),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_command_always_admits_at_player_priority_regardless_of_source() {
        for source in [CommandSource::Player, CommandSource::Automation, CommandSource::System] {
            let request = CommandRequest {
                command_type: "set_resource_amount".to_string(),
                payload: CommandPayload::SetResourceAmount {
                    resource_id: "energy".to_string(),
                    amount: 10.0,
                },
                source,
                step: None,
                issued_at: 1.0,
                request_id: None,
            };
            assert_eq!(request.into_command(0, 0.0).priority, Priority::Player);
        }
    }

    #[test]
    fn inbound_message_type_name_matches_serde_tag() {
        assert_eq!(InboundMessage::Terminate.type_name(), "TERMINATE");
        assert_eq!(
            InboundMessage::DiagnosticsSubscribe.type_name(),
            "DIAGNOSTICS_SUBSCRIBE"
        );
    }

    #[test]
    fn command_request_into_command_uses_resolved_step_when_unpinned() {
        let request = CommandRequest {
            command_type: "set_resource_amount".to_string(),
            payload: CommandPayload::SetResourceAmount {
                resource_id: "energy".to_string(),
                amount: 10.0,
            },
            source: CommandSource::Player,
            step: None,
            issued_at: 1.0,
            request_id: Some("req-1".to_string()),
        };
        let command = request.into_command(5, 100.0);
        assert_eq!(command.step.0, 5);
        assert_eq!(command.priority, Priority::Player);
    }

    #[test]
    fn command_request_into_command_honors_pinned_step() {
        let request = CommandRequest {
            command_type: "set_resource_amount".to_string(),
            payload: CommandPayload::SetResourceAmount {
                resource_id: "energy".to_string(),
                amount: 10.0,
            },
            source: CommandSource::Automation,
            step: Some(42),
            issued_at: 1.0,
            request_id: None,
        };
        let command = request.into_command(5, 100.0);
        assert_eq!(command.step.0, 42);
        assert_eq!(command.priority, Priority::Player);
    }
}
