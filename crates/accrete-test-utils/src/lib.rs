//! Test utilities and mock types for kernel development.
//!
//! Provides mock [`CommandHandler`](accrete_engine::CommandHandler) and
//! [`System`](accrete_production::System) implementations plus small
//! builders for resource/generator definitions, so downstream crates
//! can assemble test scenarios without hand-rolling fixtures.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    CountingSystem, FailingHandler, RecordingHandler, SpawningHandler, const_generator, const_resource,
};
