//! Static definitions consumed by the Resource Table and Production Engine.
//!
//! These are content-loader outputs — this crate only defines their shape.

/// Declares one resource slot ahead of Resource Table construction.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceDef {
    /// Stable string ID, mapped once to a dense index at load.
    pub id: String,
    /// Upper bound on the resource's amount, or `None` for unbounded.
    pub capacity: Option<f64>,
    /// Whether the resource starts unlocked.
    pub initially_unlocked: bool,
    /// Whether the resource starts visible.
    pub initially_visible: bool,
    /// Whether the table should track per-tick income/expense rates for
    /// this resource.
    pub track_rates: bool,
}

/// One `(resourceId, rate-per-second-per-owned)` entry in a generator's
/// `produces` or `consumes` list.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorFlow {
    /// Target resource ID.
    pub resource_id: String,
    /// Rate per second, per owned unit of the generator.
    pub rate_per_owned_per_second: f64,
}

/// A Production Engine input, supplied fresh each tick by the caller.
///
/// The engine treats this as immutable within a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorDef {
    /// Stable generator ID, used as the accumulator table's `generatorId`
    /// key component.
    pub id: String,
    /// Non-negative count of owned instances.
    pub owned: u64,
    /// Whether this generator runs this tick.
    pub enabled: bool,
    /// Resources this generator produces.
    pub produces: Vec<GeneratorFlow>,
    /// Resources this generator consumes.
    pub consumes: Vec<GeneratorFlow>,
}
