//! Strongly-typed identifiers shared across the Accrete workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dense index into the Resource Table.
///
/// Assigned once at content load: `ResourceIndex(n)` corresponds to the
/// n-th resource in registration order. Stable for the lifetime of the
/// resource table that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIndex(pub u32);

impl fmt::Display for ResourceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ResourceIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing simulation step counter.
///
/// Incremented by exactly one each time the Tick Scheduler completes a
/// fixed-step iteration. Commands are stamped with the step at which
/// they become executable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(pub u64);

impl StepId {
    /// The step immediately following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Dense index into the Generator Table.
///
/// Assigned once at content load, mirroring [`ResourceIndex`] but kept
/// as a distinct type so the two index spaces can't be swapped by
/// mistake at a call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneratorIndex(pub u32);

impl fmt::Display for GeneratorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GeneratorIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a channel within the Event Bus.
///
/// Channels are registered by name at world construction; `ChannelIndex`
/// is the dense index assigned to each registered name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelIndex(pub u32);

impl fmt::Display for ChannelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ChannelIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
