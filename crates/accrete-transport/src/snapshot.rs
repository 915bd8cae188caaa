//! The persisted session snapshot layout.
//!
//! `SessionSnapshot` is the host-owned persisted form of a kernel
//! session: canonical resource/generator state plus enough queue and
//! progression bookkeeping to resume a session exactly where it left
//! off, modulo the commands the host chooses to replay on top of it.

use accrete_core::command::Command;
use accrete_resources::SerializedResourceState;
use serde::{Deserialize, Serialize};

/// The persistence schema version this build reads and writes.
///
/// A `RESTORE_SESSION` message carrying any other value is rejected
/// with `SchemaVersionMismatch` before any kernel state is touched.
pub const PERSISTENCE_SCHEMA_VERSION: u32 = 1;

/// Identifies the exact content roster a snapshot was captured against.
///
/// `ids` and `hash` let a host detect a snapshot captured under a
/// different resource/generator roster before attempting to restore it
/// into a kernel built from the current one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentDigest {
    /// Resource and generator IDs, in registration order, concatenated
    /// in the order they were hashed.
    pub ids: Vec<String>,
    /// Content version string, host-assigned.
    pub version: String,
    /// Digest of `ids` plus `version`, opaque to the kernel.
    pub hash: String,
}

/// Carries an in-flight offline-progression computation across a
/// snapshot/restore boundary, so a host that captures a snapshot mid
/// catch-up does not lose the remaining elapsed time.
///
/// Modeled as the minimum state needed to resume a fast-path or
/// step-by-step catchup exactly where it was interrupted, rather than
/// re-deriving it from `capturedAt`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfflineProgressionSnapshot {
    /// Milliseconds of elapsed offline time not yet applied.
    pub remaining_elapsed_ms: f64,
    /// Whether the remaining time is eligible for the fast-path
    /// closed-form projection rather than step-by-step replay.
    pub fast_path_eligible: bool,
}

/// Opaque, host-unreadable carrier for automation-system state that
/// must survive a restore.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutomationStateSnapshot {
    /// Serialized automation-system state, interpreted only by the
    /// automation system that produced it.
    pub data: Vec<u8>,
}

/// Opaque, host-unreadable carrier for transform-system state that must
/// survive a restore.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformStateSnapshot {
    /// Serialized transform-system state, interpreted only by the
    /// transform system that produced it.
    pub data: Vec<u8>,
}

/// The full persisted form of a session, written on
/// `REQUEST_SESSION_SNAPSHOT` and read back on `RESTORE_SESSION`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Always [`PERSISTENCE_SCHEMA_VERSION`] for a snapshot this build
    /// wrote; checked against that constant on restore.
    pub persistence_schema_version: u32,
    /// Host-assigned save-slot identifier, echoed back unchanged.
    pub slot_id: String,
    /// Wall-clock time the snapshot was captured, host clock,
    /// milliseconds since the Unix epoch.
    pub captured_at: u64,
    /// The kernel's `currentStep` at capture.
    pub worker_step: u64,
    /// The kernel's monotonic clock reading at capture, used to detect
    /// stale resubmission of commands queued before the snapshot.
    pub monotonic_ms: f64,
    /// This build's runtime version string, informational only.
    pub runtime_version: String,
    /// Identifies the resource/generator roster this snapshot assumes.
    pub content_digest: ContentDigest,
    /// Canonical resource table state.
    pub state: SerializedResourceState,
    /// Commands queued but not yet executed at capture, in queue order.
    pub command_queue: Vec<Command>,
    /// In-flight offline progression, if capture interrupted one.
    pub offline_progression: Option<OfflineProgressionSnapshot>,
    /// Opaque automation-system state, carried through unchanged.
    pub automation_state: Option<AutomationStateSnapshot>,
    /// Opaque transform-system state, carried through unchanged.
    pub transform_state: Option<TransformStateSnapshot>,
}

impl SessionSnapshot {
    /// Whether this snapshot's schema version matches what this build
    /// reads, the first check `RESTORE_SESSION` performs.
    pub fn is_schema_compatible(&self) -> bool {
        self.persistence_schema_version == PERSISTENCE_SCHEMA_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionSnapshot {
        SessionSnapshot {
            persistence_schema_version: PERSISTENCE_SCHEMA_VERSION,
            slot_id: "slot-0".to_string(),
            captured_at: 0,
            worker_step: 42,
            monotonic_ms: 1000.0,
            runtime_version: "0.1.0".to_string(),
            content_digest: ContentDigest {
                ids: vec!["energy".to_string()],
                version: "v1".to_string(),
                hash: "abc".to_string(),
            },
            state: SerializedResourceState::default(),
            command_queue: Vec::new(),
            offline_progression: None,
            automation_state: None,
            transform_state: None,
        }
    }

    #[test]
    fn matching_schema_version_is_compatible() {
        assert!(sample().is_schema_compatible());
    }

    #[test]
    fn mismatched_schema_version_is_incompatible() {
        let mut snap = sample();
        snap.persistence_schema_version = PERSISTENCE_SCHEMA_VERSION + 1;
        assert!(!snap.is_schema_compatible());
    }
}
