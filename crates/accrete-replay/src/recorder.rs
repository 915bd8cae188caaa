//! [`CommandRecorder`]: records executed commands plus start state and
//! RNG seed.
//!
//! `Command` is an owned value type (`Clone + PartialEq`, no shared
//! mutable interior), so recording a command is already non-mutating
//! and the recorder's copy can never be observed by the original
//! caller — there is no separate "deep-frozen snapshot" step to model
//! beyond taking an owned clone, unlike a host language where command
//! objects are mutable references by default.

use accrete_core::command::Command;
use accrete_core::id::StepId;
use accrete_resources::{GeneratorTable, ResourceTable};

use crate::types::{CommandLog, LogMetadata, StartState};

/// Records a sequence of executed commands plus the state and seed a
/// run started from, for later export as a [`CommandLog`].
#[derive(Debug, Default)]
pub struct CommandRecorder {
    start_state: Option<StartState>,
    seed: Option<u64>,
    config_hash: Option<u64>,
    commands: Vec<Command>,
}

impl CommandRecorder {
    /// Builds an empty, not-yet-started recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the recording's start state, RNG seed, and the config
    /// hash the run is executing under. Resets any previously recorded
    /// commands.
    pub fn begin(
        &mut self,
        resources: &ResourceTable,
        generators: &GeneratorTable,
        seed: Option<u64>,
        config_hash: Option<u64>,
    ) {
        self.start_state = Some(StartState::capture(resources, generators));
        self.seed = seed;
        self.config_hash = config_hash;
        self.commands.clear();
    }

    /// Whether [`CommandRecorder::begin`] has been called.
    pub fn is_recording(&self) -> bool {
        self.start_state.is_some()
    }

    /// Appends one executed command to the recording, in execution
    /// order. Does not mutate `command`; the recorder keeps its own
    /// owned copy.
    pub fn record(&mut self, command: &Command) {
        self.commands.push(command.clone());
    }

    /// Number of commands recorded so far.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Produces an immutable [`CommandLog`] covering every command
    /// recorded since [`CommandRecorder::begin`].
    ///
    /// `last_step` is the step the kernel had reached when recording
    /// stopped, carried in [`LogMetadata::last_step`].
    ///
    /// # Panics
    ///
    /// Panics if called before [`CommandRecorder::begin`].
    pub fn export(&self, last_step: StepId) -> CommandLog {
        let start_state = self
            .start_state
            .clone()
            .expect("CommandRecorder::export called before begin");
        CommandLog {
            version: crate::FORMAT_VERSION.to_string(),
            start_state,
            commands: self.commands.clone(),
            metadata: LogMetadata {
                seed: self.seed,
                last_step: last_step.0,
                config_hash: self.config_hash,
            },
        }
    }

    /// Clears recorded commands and start state, returning the recorder
    /// to its initial, not-recording state.
    pub fn clear(&mut self) {
        self.start_state = None;
        self.seed = None;
        self.config_hash = None;
        self.commands.clear();
    }
}
