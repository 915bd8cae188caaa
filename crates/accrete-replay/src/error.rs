//! Error types for recording, replay, and the binary log codec.

use std::fmt;
use std::io;

/// Errors from replaying a [`crate::types::CommandLog`].
#[derive(Clone, Debug, PartialEq)]
pub enum ReplayError {
    /// The destination command queue was not empty when replay began
    /// (*ReplayQueueNotEmpty*).
    QueueNotEmpty,
    /// The recorded log declares a seed the caller's RNG doesn't accept,
    /// or no RNG was requested of a seeded log.
    NoSeedRequested,
    /// The log's `config_hash` does not match the target kernel's
    /// current configuration.
    ConfigMismatch {
        /// Hash of the config the log was recorded against.
        expected: u64,
        /// Hash of the config replay is running against.
        found: u64,
    },
    /// A handler-issued follow-up command during replay had no unclaimed
    /// match among later log entries (*ReplayMissingFollowupCommand*).
    MissingFollowupCommand {
        /// The follow-up's command type.
        command_type: String,
        /// The step the follow-up was stamped for.
        step: u64,
    },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueNotEmpty => write!(f, "replay target command queue is not empty"),
            Self::NoSeedRequested => write!(f, "command log carries no RNG seed"),
            Self::ConfigMismatch { expected, found } => write!(
                f,
                "command log config hash {expected} does not match replay target config hash {found}"
            ),
            Self::MissingFollowupCommand { command_type, step } => write!(
                f,
                "handler follow-up '{command_type}' at step {step} matched no unclaimed later log entry"
            ),
        }
    }
}

impl std::error::Error for ReplayError {}

/// One command that executed during replay but whose handler was
/// unregistered or failed (*ReplayUnknownCommandType* / *ReplayExecutionFailed*).
///
/// Recorded rather than raised: replay continues past
/// individual command failures and only aborts on
/// [`ReplayError::MissingFollowupCommand`] or a pre-flight check failure.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplayDiagnostic {
    /// No handler was registered for this command type during replay.
    UnknownCommandType {
        /// The command type with no registered handler.
        command_type: String,
        /// The step the command was stamped for.
        step: u64,
    },
    /// The command's handler executed but reported failure.
    ExecutionFailed {
        /// The failing command's type.
        command_type: String,
        /// The step the command was stamped for.
        step: u64,
        /// Handler-reported error code.
        code: String,
        /// Handler-reported message.
        message: String,
    },
}

/// Errors from encoding or decoding the binary command log format.
#[derive(Debug)]
pub enum CodecError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The stream does not start with the expected magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version string found in the stream.
        found: String,
    },
    /// The stream ended or contained invalid data partway through a
    /// record.
    MalformedLog {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A command payload type tag is not recognized.
    UnknownPayloadType {
        /// The unrecognized type tag.
        tag: u8,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"ACLG\")"),
            Self::UnsupportedVersion { found } => write!(f, "unsupported command log version '{found}'"),
            Self::MalformedLog { detail } => write!(f, "malformed command log: {detail}"),
            Self::UnknownPayloadType { tag } => write!(f, "unknown command payload type tag {tag}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
