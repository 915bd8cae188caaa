//! Transport-boundary validation.
//!
//! Runs before a [`CommandRequest`](crate::envelope::CommandRequest) is
//! ever turned into a [`Command`] and handed to the queue. Validation
//! never mutates kernel state; every check here is a pure function of
//! the request and the sender's own prior state.

use crate::envelope::CommandRequest;
use crate::error::TransportError;

/// Tracks the last accepted `issuedAt` per sender, so repeated or
/// out-of-order resubmission of the same logical command is rejected
/// before it reaches the queue.
#[derive(Debug, Default)]
pub struct IssuedAtTracker {
    last_issued_at: Option<f64>,
}

impl IssuedAtTracker {
    /// Builds a tracker with no prior history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `request` against this tracker's history, advancing
    /// the tracker on success.
    ///
    /// Rejects a non-finite `issuedAt` or one that does not strictly
    /// advance past the last accepted value as
    /// [`TransportError::StaleCommand`].
    pub fn validate(&mut self, request: &CommandRequest) -> Result<(), TransportError> {
        validate_command_request(request)?;
        if let Some(last) = self.last_issued_at {
            if request.issued_at <= last {
                tracing::warn!(
                    command_type = %request.command_type,
                    issued_at = request.issued_at,
                    last_accepted = last,
                    "rejecting stale command at transport boundary"
                );
                return Err(TransportError::StaleCommand);
            }
        }
        self.last_issued_at = Some(request.issued_at);
        Ok(())
    }
}

/// Structural validation of a [`CommandRequest`], independent of sender
/// history: non-empty `command_type`, finite `issuedAt`.
pub fn validate_command_request(request: &CommandRequest) -> Result<(), TransportError> {
    if request.command_type.trim().is_empty() {
        return Err(TransportError::InvalidCommandPayload {
            reason: "command_type must not be empty".to_string(),
        });
    }
    if !request.issued_at.is_finite() {
        return Err(TransportError::InvalidCommandPayload {
            reason: "issued_at must be finite".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use accrete_core::command::CommandPayload;

    use super::*;
    use crate::envelope::CommandSource;

    fn request(issued_at: f64) -> CommandRequest {
        CommandRequest {
            command_type: "set_resource_amount".to_string(),
            payload: CommandPayload::SetResourceAmount {
                resource_id: "energy".to_string(),
                amount: 10.0,
            },
            source: CommandSource::Player,
            step: None,
            issued_at,
            request_id: None,
        }
    }

    #[test]
    fn empty_command_type_is_rejected() {
        let mut req = request(1.0);
        req.command_type = "   ".to_string();
        assert!(matches!(
            validate_command_request(&req),
            Err(TransportError::InvalidCommandPayload { .. })
        ));
    }

    #[test]
    fn non_finite_issued_at_is_rejected() {
        let req = request(f64::NAN);
        assert!(matches!(
            validate_command_request(&req),
            Err(TransportError::InvalidCommandPayload { .. })
        ));
    }

    #[test]
    fn tracker_accepts_strictly_increasing_issued_at() {
        let mut tracker = IssuedAtTracker::new();
        assert!(tracker.validate(&request(1.0)).is_ok());
        assert!(tracker.validate(&request(2.0)).is_ok());
    }

    #[test]
    fn tracker_rejects_non_increasing_issued_at() {
        let mut tracker = IssuedAtTracker::new();
        tracker.validate(&request(5.0)).unwrap();
        assert_eq!(tracker.validate(&request(5.0)), Err(TransportError::StaleCommand));
        assert_eq!(tracker.validate(&request(4.0)), Err(TransportError::StaleCommand));
    }
}
