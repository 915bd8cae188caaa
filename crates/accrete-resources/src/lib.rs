//! The Resource Table.
//!
//! Dense, index-addressed storage of numeric resources with capacity
//! clamping, unlock/visibility flags, optional per-tick income/expense
//! rate tracking, and a bit-stable export/import form.
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

mod generators;
mod table;

pub use generators::GeneratorTable;
pub use table::{ResourceTable, ResourceTableSnapshot, SerializedResourceState, SnapshotMode};
