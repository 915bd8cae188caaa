//! Error types for the transport boundary.
//!
//! `TransportError` covers every way a host's inbound message can be
//! rejected before (or instead of) reaching the kernel, plus the stable
//! error codes the outbound `Error` message carries back to the host.

use std::fmt;

use accrete_core::error::{DispatchError, IngressError, ProductionError};
use accrete_engine::ConfigError;
use accrete_replay::ReplayError;

/// Everything that can go wrong translating a host message into kernel
/// state, or restoring/snapshotting a session.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportError {
    /// `persistenceSchemaVersion` on an inbound `RESTORE_SESSION` message
    /// does not match the version this build writes.
    SchemaVersionMismatch {
        /// The version found on the inbound message or snapshot.
        found: u32,
        /// The version this build expects.
        expected: u32,
    },
    /// The inbound message's `type` field did not match any known
    /// message, or its `payload` did not match the shape its `type`
    /// implies.
    UnsupportedMessage {
        /// The unrecognized or malformed message type.
        message_type: String,
    },
    /// A `COMMAND` message's payload failed structural validation before
    /// it was ever handed to the queue.
    InvalidCommandPayload {
        /// Description of what was wrong with the payload.
        reason: String,
    },
    /// A `COMMAND` message's `issuedAt` was non-finite or did not advance
    /// past the sender's last accepted `issuedAt`.
    StaleCommand,
    /// Rejected by the Priority Command Queue's admission path.
    Ingress(IngressError),
    /// Rejected during command execution.
    Dispatch(DispatchError),
    /// Rejected during replay.
    Replay(ReplayError),
    /// Rejected by world configuration validation.
    Config(ConfigError),
    /// Rejected by the Production Engine.
    Production(ProductionError),
    /// `RESTORE_SESSION` failed after its precheck passed; the kernel
    /// was rolled back to its pre-restore state.
    RestoreFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// `REQUEST_SESSION_SNAPSHOT` could not produce a snapshot.
    SnapshotFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A `SOCIAL_COMMAND` was received while social features are
    /// disabled for this session.
    SocialCommandsDisabled,
    /// A `SOCIAL_COMMAND` reached its handler but failed.
    SocialCommandFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A `SOCIAL_COMMAND` payload failed structural validation.
    InvalidSocialCommandPayload {
        /// Description of what was wrong with the payload.
        reason: String,
    },
}

impl TransportError {
    /// The stable error code this variant maps to on the outbound
    /// `Error` message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SchemaVersionMismatch { .. } => "SchemaVersionMismatch",
            Self::UnsupportedMessage { .. } => "UnsupportedMessage",
            Self::InvalidCommandPayload { .. } => "InvalidCommandPayload",
            Self::StaleCommand => "StaleCommand",
            Self::Ingress(IngressError::UnsupportedCommand) => "UnknownCommandType",
            Self::Ingress(_) => "CommandFailed",
            Self::Dispatch(DispatchError::UnknownCommandType { .. }) => "UnknownCommandType",
            Self::Dispatch(DispatchError::CommandFailed { .. }) => "CommandFailed",
            Self::Replay(ReplayError::QueueNotEmpty) => "ReplayQueueNotEmpty",
            Self::Replay(ReplayError::NoSeedRequested) => "ReplayExecutionFailed",
            Self::Replay(ReplayError::ConfigMismatch { .. }) => "ReplayConfigMismatch",
            Self::Replay(ReplayError::MissingFollowupCommand { .. }) => "ReplayMissingFollowupCommand",
            Self::Config(_) => "RestoreFailed",
            Self::Production(ProductionError::InvalidApplyThreshold) => "InvalidApplyThreshold",
            Self::RestoreFailed { .. } => "RestoreFailed",
            Self::SnapshotFailed { .. } => "SnapshotFailed",
            Self::SocialCommandsDisabled => "SocialCommandsDisabled",
            Self::SocialCommandFailed { .. } => "SocialCommandFailed",
            Self::InvalidSocialCommandPayload { .. } => "InvalidSocialCommandPayload",
        }
    }

    /// Builds the outbound [`ErrorPayload`] this error maps to.
    pub fn into_payload(self, request_id: Option<String>) -> ErrorPayload {
        let message = self.to_string();
        ErrorPayload {
            code: self.code().to_string(),
            message,
            request_id,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaVersionMismatch { found, expected } => {
                write!(f, "persistence schema version {found} does not match expected {expected}")
            }
            Self::UnsupportedMessage { message_type } => {
                write!(f, "unsupported message type '{message_type}'")
            }
            Self::InvalidCommandPayload { reason } => write!(f, "invalid command payload: {reason}"),
            Self::StaleCommand => write!(f, "command issuedAt did not advance past the last accepted value"),
            Self::Ingress(e) => write!(f, "{e}"),
            Self::Dispatch(e) => write!(f, "{e}"),
            Self::Replay(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::Production(e) => write!(f, "{e}"),
            Self::RestoreFailed { reason } => write!(f, "restore failed: {reason}"),
            Self::SnapshotFailed { reason } => write!(f, "snapshot failed: {reason}"),
            Self::SocialCommandsDisabled => write!(f, "social commands are disabled for this session"),
            Self::SocialCommandFailed { reason } => write!(f, "social command failed: {reason}"),
            Self::InvalidSocialCommandPayload { reason } => {
                write!(f, "invalid social command payload: {reason}")
            }
        }
    }
}

impl std::error::Error for TransportError {}

impl From<IngressError> for TransportError {
    fn from(e: IngressError) -> Self {
        Self::Ingress(e)
    }
}

impl From<DispatchError> for TransportError {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl From<ReplayError> for TransportError {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}

impl From<ConfigError> for TransportError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ProductionError> for TransportError {
    fn from(e: ProductionError) -> Self {
        Self::Production(e)
    }
}

/// Body of the outbound `ERROR` message.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorPayload {
    /// Stable error code from the transport error code table.
    pub code: String,
    /// Human-readable description, not meant for stable matching.
    pub message: String,
    /// Echoes the failing message's `requestId`, when it had one.
    pub request_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_command_maps_to_stable_code() {
        assert_eq!(TransportError::StaleCommand.code(), "StaleCommand");
    }

    #[test]
    fn schema_mismatch_into_payload_carries_request_id() {
        let err = TransportError::SchemaVersionMismatch { found: 2, expected: 1 };
        let payload = err.into_payload(Some("req-1".to_string()));
        assert_eq!(payload.code, "SchemaVersionMismatch");
        assert_eq!(payload.request_id, Some("req-1".to_string()));
    }

    #[test]
    fn unknown_command_type_dispatch_error_maps_through() {
        let err = TransportError::Dispatch(DispatchError::UnknownCommandType {
            command_type: "foo".to_string(),
        });
        assert_eq!(err.code(), "UnknownCommandType");
    }
}
