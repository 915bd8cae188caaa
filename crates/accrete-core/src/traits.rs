//! Trait seams the Production Engine is built against, letting it depend
//! only on `accrete-core` rather than directly on `accrete-resources`.

use crate::id::ResourceIndex;

/// Read-only access to resource amounts and capacities.
pub trait ResourceReader {
    /// Current amount at `index`, or `None` if the index is out of range.
    fn amount(&self, index: ResourceIndex) -> Option<f64>;

    /// Capacity at `index` (`None` means unbounded), or `None` if the
    /// index is out of range.
    fn capacity(&self, index: ResourceIndex) -> Option<f64>;

    /// Whether the resource at `index` is unlocked.
    fn is_unlocked(&self, index: ResourceIndex) -> bool;

    /// Whether the resource at `index` is visible.
    fn is_visible(&self, index: ResourceIndex) -> bool;
}

/// Mutating access to resource amounts, used by the Production Engine
/// and command handlers.
pub trait ResourceWriter: ResourceReader {
    /// Adds `delta` to the amount at `index`, clamped to `[0, capacity]`.
    /// Returns the delta actually applied.
    fn add_amount(&mut self, index: ResourceIndex, delta: f64) -> f64;

    /// Atomically subtracts `amount` if `amount <= current`, returning
    /// whether the subtraction happened. Never partially applies.
    fn spend_amount(&mut self, index: ResourceIndex, amount: f64) -> bool;

    /// Accumulates a per-second income rate for rate-tracking resources.
    /// No-op for resources that don't track rates.
    fn apply_income(&mut self, index: ResourceIndex, rate_per_second: f64);

    /// Accumulates a per-second expense rate for rate-tracking resources.
    /// No-op for resources that don't track rates.
    fn apply_expense(&mut self, index: ResourceIndex, rate_per_second: f64);
}

/// A point-in-time, read-only view of the Resource Table used by
/// diagnostics and snapshot export.
pub trait ResourceSnapshot {
    /// Number of resources covered by this snapshot.
    fn resource_count(&self) -> u32;

    /// Amount at `index` at the moment the snapshot was taken.
    fn amount_at(&self, index: ResourceIndex) -> f64;

    /// Capacity at `index` at the moment the snapshot was taken.
    fn capacity_at(&self, index: ResourceIndex) -> Option<f64>;

    /// Unlocked flag at the moment the snapshot was taken.
    fn is_unlocked_at(&self, index: ResourceIndex) -> bool;

    /// Visible flag at the moment the snapshot was taken.
    fn is_visible_at(&self, index: ResourceIndex) -> bool;
}
