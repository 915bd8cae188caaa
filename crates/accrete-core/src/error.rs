//! Error types shared across the Accrete simulation kernel.
//!
//! Organized by subsystem:
//! ingress (queue admission), dispatch (command execution), production
//! (the scarcity-scaled accumulator engine), and resource lookups.

use std::error::Error;
use std::fmt;

/// Errors from the Priority Command Queue's admission path.
///
/// Surfaced in [`Receipt::reason`](crate::command::Receipt::reason) to
/// explain why a command was rejected at submission or expired before
/// its stamped step arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngressError {
    /// The queue is at capacity (`QueueFull`).
    QueueFull,
    /// The command's `step` is now in the past (`StaleCommand`).
    Stale,
    /// Dispatch is disabled after consecutive failures for this command
    /// type (`TickDisabled`).
    TickDisabled,
    /// The kernel is shutting down (`ShuttingDown`).
    ShuttingDown,
    /// No handler is registered for this command type
    /// (`UnknownCommandType`).
    UnsupportedCommand,
}

impl fmt::Display for IngressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "command queue is full"),
            Self::Stale => write!(f, "command step is stale"),
            Self::TickDisabled => write!(f, "dispatch disabled for this command type"),
            Self::ShuttingDown => write!(f, "kernel is shutting down"),
            Self::UnsupportedCommand => write!(f, "command type not supported"),
        }
    }
}

impl Error for IngressError {}

/// Errors from command execution (`CommandFailed`, `UnknownCommandType`).
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchError {
    /// No handler is registered for the command's `command_type`.
    UnknownCommandType {
        /// The type string that had no registered handler.
        command_type: String,
    },
    /// The handler executed but reported failure.
    CommandFailed {
        /// Handler-defined error code.
        code: String,
        /// Human-readable description.
        message: String,
        /// Optional structured detail, opaque to the dispatcher.
        details: Option<String>,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommandType { command_type } => {
                write!(f, "no handler registered for command type '{command_type}'")
            }
            Self::CommandFailed {
                code, message, ..
            } => {
                write!(f, "command failed ({code}): {message}")
            }
        }
    }
}

impl Error for DispatchError {}

/// Errors from Production Engine construction.
///
/// All per-tick input validation failures (non-finite rates, unknown
/// resources, non-positive `deltaSeconds`) are silently filtered per
/// rather than raised as errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductionError {
    /// `applyThreshold` was non-finite or `<= 0` at construction.
    InvalidApplyThreshold,
}

impl fmt::Display for ProductionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidApplyThreshold => {
                write!(f, "applyThreshold must be finite and > 0")
            }
        }
    }
}

impl Error for ProductionError {}

/// Errors from Resource Table index lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceError {
    /// `requireIndex` was called with a resource ID that is not registered.
    UnknownResource {
        /// The resource ID that had no registered index.
        resource_id: String,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownResource { resource_id } => {
                write!(f, "unknown resource '{resource_id}'")
            }
        }
    }
}

impl Error for ResourceError {}

/// Errors from Generator Table index lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeneratorError {
    /// A command referenced a generator ID that is not registered.
    UnknownGenerator {
        /// The generator ID that had no registered index.
        generator_id: String,
    },
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownGenerator { generator_id } => {
                write!(f, "unknown generator '{generator_id}'")
            }
        }
    }
}

impl Error for GeneratorError {}
