//! Core types and traits for the Accrete deterministic simulation kernel.
//!
//! This crate has no dependency on the rest of the workspace. It defines
//! the identifiers, command/receipt types, per-subsystem error enums,
//! content-loader-shaped resource/generator definitions, and the trait
//! seams (`ResourceReader`, `ResourceWriter`, `ResourceSnapshot`) that
//! `accrete-resources` and `accrete-production` build against without
//! depending on each other.
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod command;
pub mod error;
pub mod id;
pub mod resource;
pub mod traits;

pub use command::{Command, CommandPayload, Priority, Receipt};
pub use error::{DispatchError, GeneratorError, IngressError, ProductionError, ResourceError};
pub use id::{ChannelIndex, GeneratorIndex, ResourceIndex, StepId};
pub use resource::{GeneratorDef, GeneratorFlow, ResourceDef};
pub use traits::{ResourceReader, ResourceSnapshot, ResourceWriter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_id_next_increments_by_one() {
        assert_eq!(StepId(0).next(), StepId(1));
        assert_eq!(StepId(41).next(), StepId(42));
    }

    #[test]
    fn receipt_accepted_has_no_reason() {
        let r = Receipt::accepted(3);
        assert!(r.accepted);
        assert_eq!(r.reason, None);
        assert_eq!(r.command_index, 3);
    }

    #[test]
    fn receipt_rejected_carries_reason() {
        let r = Receipt::rejected(0, IngressError::QueueFull);
        assert!(!r.accepted);
        assert_eq!(r.reason, Some(IngressError::QueueFull));
    }

    #[test]
    fn priority_orders_system_first() {
        assert!(Priority::System < Priority::Player);
        assert!(Priority::Player < Priority::Automation);
    }
}
