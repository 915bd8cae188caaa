//! The [`System`] trait executed by the Tick Scheduler each tick, in
//! registration order.

use accrete_resources::{GeneratorTable, ResourceTable};

/// Per-tick timing context handed to a [`System`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickContext {
    /// Fixed step duration in milliseconds.
    pub delta_ms: f64,
    /// The step this tick is advancing into.
    pub current_step: u64,
}

/// A per-tick subsystem run by the Tick Scheduler in registration order.
///
/// # Object safety
///
/// This trait is object-safe; the scheduler stores systems as
/// `Vec<Box<dyn System>>`. Not `Send`: the kernel runs on a single
/// logical thread, and a system may share state with its host via
/// `Rc<RefCell<_>>`, as the Production Engine's facade wiring does.
pub trait System: 'static {
    /// Human-readable name for diagnostics and per-system tick spans.
    fn id(&self) -> &str;

    /// Runs this system for one tick against the shared resource table
    /// and the current (read-only, within the tick) generator snapshot.
    fn tick(&mut self, ctx: TickContext, resources: &mut ResourceTable, generators: &GeneratorTable);
}
