//! Data types for command recording and playback.

use accrete_core::command::Command;
use accrete_core::resource::{GeneratorDef, ResourceDef};
use accrete_resources::{GeneratorTable, ResourceTable, SerializedResourceState};

/// Everything needed to reconstruct the exact kernel state a recording
/// started from.
///
/// Generator state has no bit-stable export form of its own ([`GeneratorTable`]
/// is rebuilt wholesale from [`GeneratorDef`] each tick), so
/// the start state simply carries the definitions as they stood at the
/// start of recording.
#[derive(Clone, Debug, PartialEq)]
pub struct StartState {
    /// Resource Table state at the start of recording.
    pub resources: SerializedResourceState,
    /// Generator definitions at the start of recording.
    pub generators: Vec<GeneratorDef>,
}

impl StartState {
    /// Captures the current state of `resources` and `generators`.
    pub fn capture(resources: &ResourceTable, generators: &GeneratorTable) -> Self {
        Self {
            resources: resources.export(None, None),
            generators: generators.as_slice().to_vec(),
        }
    }

    /// Rebuilds `resources` and `generators` from this start state.
    ///
    /// `resource_defs` supplies the `track_rates` flag per resource (not
    /// carried in [`SerializedResourceState`]), matched positionally to
    /// [`ResourceTable::import`]'s existing contract.
    pub fn restore_into(
        &self,
        resource_defs: &[ResourceDef],
        resources: &mut ResourceTable,
        generators: &mut GeneratorTable,
    ) {
        *resources = ResourceTable::import(&self.resources, resource_defs);
        *generators = GeneratorTable::new(&self.generators);
    }
}

/// Metadata recorded alongside a [`CommandLog`]'s command sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogMetadata {
    /// RNG seed the recorded run was seeded with, if any.
    pub seed: Option<u64>,
    /// The step the kernel had reached when recording stopped.
    pub last_step: u64,
    /// `KernelConfig::content_hash` of the config the recording ran
    /// under, if the recorder was given one. Checked against the
    /// replay target's own hash before any state is restored.
    pub config_hash: Option<u64>,
}

/// A complete, replayable recording: the format version, the state
/// recording started from, the ordered command sequence, and metadata.
///
/// Exported by [`crate::recorder::CommandRecorder::export`] as an
/// immutable, deep-frozen structure: ownership is moved out of the
/// recorder entirely, so nothing can mutate it in place afterward.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandLog {
    /// Format version string, checked by the binary codec on decode.
    pub version: String,
    /// State the recording started from.
    pub start_state: StartState,
    /// Every command executed during the recording, in execution order.
    pub commands: Vec<Command>,
    /// Seed and final step metadata.
    pub metadata: LogMetadata,
}
