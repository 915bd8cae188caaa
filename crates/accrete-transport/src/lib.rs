//! The transport boundary.
//!
//! Defines the inbound/outbound message shapes a host embeds the kernel
//! behind, the persisted session snapshot layout, and the validation
//! that runs on a message before it ever reaches the kernel. Carries no
//! wire encoding or socket transport of its own — a host chooses its
//! own framing (CBOR, JSON, whatever) around these types.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod envelope;
pub mod error;
pub mod snapshot;
pub mod validation;

pub use envelope::{
    CommandRequest, CommandSource, DiagnosticsUpdatePayload, InboundMessage, OutboundMessage,
    ReadyPayload, ReceiptPayload, RequestSessionSnapshotRequest, RestoreSessionRequest,
    SessionRestoredPayload, SessionSnapshotPayload, SocialCommandRequest,
    SocialCommandResultPayload, StateUpdatePayload, MESSAGE_SCHEMA_VERSION,
};
pub use error::{ErrorPayload, TransportError};
pub use snapshot::{
    AutomationStateSnapshot, ContentDigest, OfflineProgressionSnapshot, SessionSnapshot,
    TransformStateSnapshot, PERSISTENCE_SCHEMA_VERSION,
};
pub use validation::{validate_command_request, IssuedAtTracker};
