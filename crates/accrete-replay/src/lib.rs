//! The Command Recorder/Replayer.
//!
//! Records executed commands plus start state and RNG seed into a
//! [`CommandLog`], persists it through a hand-rolled binary codec, and
//! replays a log against a fresh dispatcher with sandboxed re-enqueue
//! verification.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod codec;
pub mod error;
pub mod recorder;
pub mod replayer;
pub mod types;

/// Magic bytes prefixing every encoded command log: `b"ACLG"`.
pub const MAGIC: [u8; 4] = *b"ACLG";

/// Binary command log format version understood by this build.
pub const FORMAT_VERSION: &str = "1";

pub use error::{CodecError, ReplayDiagnostic, ReplayError};
pub use recorder::CommandRecorder;
pub use replayer::{replay, ReplayOutcome, ReplayReport};
pub use types::{CommandLog, LogMetadata, StartState};
