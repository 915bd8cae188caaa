//! The Resource Table: dense arrays of resource state addressed by
//! [`ResourceIndex`].

use accrete_core::error::ResourceError;
use accrete_core::id::ResourceIndex;
use accrete_core::resource::ResourceDef;
use accrete_core::traits::{ResourceReader, ResourceSnapshot, ResourceWriter};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Which resources a [`ResourceTable::snapshot`] call should include.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotMode {
    /// Every registered resource, regardless of unlock/visibility state.
    Full,
    /// Only resources that are both unlocked and visible, for a host UI
    /// that must not leak locked content through diagnostics.
    VisibleOnly,
}

/// A point-in-time copy of the table's dense arrays, filtered by
/// [`SnapshotMode`] at capture.
#[derive(Clone, Debug)]
pub struct ResourceTableSnapshot {
    amounts: Vec<f64>,
    capacities: Vec<Option<f64>>,
    unlocked: Vec<bool>,
    visible: Vec<bool>,
}

impl ResourceSnapshot for ResourceTableSnapshot {
    fn resource_count(&self) -> u32 {
        self.amounts.len() as u32
    }

    fn amount_at(&self, index: ResourceIndex) -> f64 {
        self.amounts.get(index.0 as usize).copied().unwrap_or(0.0)
    }

    fn capacity_at(&self, index: ResourceIndex) -> Option<f64> {
        self.capacities.get(index.0 as usize).copied().flatten()
    }

    fn is_unlocked_at(&self, index: ResourceIndex) -> bool {
        self.unlocked.get(index.0 as usize).copied().unwrap_or(false)
    }

    fn is_visible_at(&self, index: ResourceIndex) -> bool {
        self.visible.get(index.0 as usize).copied().unwrap_or(false)
    }
}

/// Bit-stable serialized form of a [`ResourceTable`].
///
/// `automation_state` and `transform_state` are opaque payloads owned by
/// systems outside this crate; the table only carries them through.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct SerializedResourceState {
    /// Resource IDs in index order.
    pub ids: Vec<String>,
    /// Amounts in index order.
    pub amounts: Vec<f64>,
    /// Capacities in index order (`None` = unbounded).
    pub capacities: Vec<Option<f64>>,
    /// Unlocked flags in index order.
    pub unlocked: Vec<bool>,
    /// Visible flags in index order.
    pub visible: Vec<bool>,
    /// Opaque automation-system state, carried through unchanged.
    pub automation_state: Option<Vec<u8>>,
    /// Opaque transform-system state, carried through unchanged.
    pub transform_state: Option<Vec<u8>>,
}

/// Dense, index-addressed store of numeric resources.
///
/// Resources are registered once at content load and never removed.
/// Invariant: `0 <= amount <= capacity` holds at every observable
/// boundary (after every `add_amount`/`spend_amount`/`finalize_tick`).
#[derive(Clone, Debug)]
pub struct ResourceTable {
    ids: Vec<String>,
    index_of: IndexMap<String, ResourceIndex>,
    amounts: Vec<f64>,
    capacities: Vec<Option<f64>>,
    unlocked: Vec<bool>,
    visible: Vec<bool>,
    track_rates: Vec<bool>,
    income_rates: Vec<f64>,
    expense_rates: Vec<f64>,
}

impl ResourceTable {
    /// Builds a table from content-loader definitions, in registration
    /// order. The n-th definition receives `ResourceIndex(n)`.
    pub fn new(defs: &[ResourceDef]) -> Self {
        let mut ids = Vec::with_capacity(defs.len());
        let mut index_of = IndexMap::with_capacity(defs.len());
        let mut amounts = Vec::with_capacity(defs.len());
        let mut capacities = Vec::with_capacity(defs.len());
        let mut unlocked = Vec::with_capacity(defs.len());
        let mut visible = Vec::with_capacity(defs.len());
        let mut track_rates = Vec::with_capacity(defs.len());

        for (i, def) in defs.iter().enumerate() {
            ids.push(def.id.clone());
            index_of.insert(def.id.clone(), ResourceIndex(i as u32));
            amounts.push(0.0);
            capacities.push(def.capacity);
            unlocked.push(def.initially_unlocked);
            visible.push(def.initially_visible);
            track_rates.push(def.track_rates);
        }

        let len = ids.len();
        Self {
            ids,
            index_of,
            amounts,
            capacities,
            unlocked,
            visible,
            track_rates,
            income_rates: vec![0.0; len],
            expense_rates: vec![0.0; len],
        }
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no resources are registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Looks up the dense index for a resource ID, if registered.
    pub fn get_index(&self, id: &str) -> Option<ResourceIndex> {
        self.index_of.get(id).copied()
    }

    /// Looks up the dense index for a resource ID, failing with
    /// [`ResourceError::UnknownResource`] if it isn't registered.
    pub fn require_index(&self, id: &str) -> Result<ResourceIndex, ResourceError> {
        self.get_index(id).ok_or_else(|| ResourceError::UnknownResource {
            resource_id: id.to_string(),
        })
    }

    /// The resource ID registered at `index`, if any.
    pub fn id_at(&self, index: ResourceIndex) -> Option<&str> {
        self.ids.get(index.0 as usize).map(String::as_str)
    }

    /// Sets the unlocked flag at `index`. No-op if out of range.
    pub fn set_unlocked(&mut self, index: ResourceIndex, unlocked: bool) {
        if let Some(slot) = self.unlocked.get_mut(index.0 as usize) {
            *slot = unlocked;
        }
    }

    /// Sets the visible flag at `index`. No-op if out of range.
    pub fn set_visible(&mut self, index: ResourceIndex, visible: bool) {
        if let Some(slot) = self.visible.get_mut(index.0 as usize) {
            *slot = visible;
        }
    }

    /// Rolls accumulated per-second income/expense rates into balances
    /// over `delta_ms` of elapsed time. Only affects resources registered
    /// with `track_rates`. Does not reset the rate accumulators; callers
    /// that want a fresh per-tick window must call
    /// [`ResourceTable::reset_per_tick_accumulators`] afterward.
    pub fn finalize_tick(&mut self, delta_ms: f64) {
        if !(delta_ms > 0.0) {
            return;
        }
        let delta_seconds = delta_ms / 1000.0;
        for i in 0..self.ids.len() {
            if !self.track_rates[i] {
                continue;
            }
            let net = (self.income_rates[i] - self.expense_rates[i]) * delta_seconds;
            if net != 0.0 {
                self.add_amount(ResourceIndex(i as u32), net);
            }
        }
    }

    /// Zeroes every rate-tracking accumulator, starting a fresh per-tick
    /// window for `apply_income`/`apply_expense`.
    pub fn reset_per_tick_accumulators(&mut self) {
        for r in &mut self.income_rates {
            *r = 0.0;
        }
        for r in &mut self.expense_rates {
            *r = 0.0;
        }
    }

    /// Captures a read-only view of the table, filtered by `mode`.
    pub fn snapshot(&self, mode: SnapshotMode) -> ResourceTableSnapshot {
        match mode {
            SnapshotMode::Full => ResourceTableSnapshot {
                amounts: self.amounts.clone(),
                capacities: self.capacities.clone(),
                unlocked: self.unlocked.clone(),
                visible: self.visible.clone(),
            },
            SnapshotMode::VisibleOnly => {
                let len = self.ids.len();
                let mut amounts = vec![0.0; len];
                let mut capacities = vec![None; len];
                for i in 0..len {
                    if self.unlocked[i] && self.visible[i] {
                        amounts[i] = self.amounts[i];
                        capacities[i] = self.capacities[i];
                    }
                }
                ResourceTableSnapshot {
                    amounts,
                    capacities,
                    unlocked: self.unlocked.clone(),
                    visible: self.visible.clone(),
                }
            }
        }
    }

    /// Exports the table's full state in the bit-stable serialized form.
    pub fn export(
        &self,
        automation_state: Option<Vec<u8>>,
        transform_state: Option<Vec<u8>>,
    ) -> SerializedResourceState {
        SerializedResourceState {
            ids: self.ids.clone(),
            amounts: self.amounts.clone(),
            capacities: self.capacities.clone(),
            unlocked: self.unlocked.clone(),
            visible: self.visible.clone(),
            automation_state,
            transform_state,
        }
    }

    /// Rebuilds a table from a previously exported state.
    ///
    /// Resources are re-registered in the serialized order; `track_rates`
    /// is recomputed from `defs` (the serialized form carries no
    /// rate-tracking flag) and matched to the serialized IDs positionally
    /// when lengths agree, falling back to `false` for any ID not found
    /// in `defs`.
    pub fn import(state: &SerializedResourceState, defs: &[ResourceDef]) -> Self {
        let track_rates_of: IndexMap<&str, bool> = defs
            .iter()
            .map(|d| (d.id.as_str(), d.track_rates))
            .collect();

        let mut index_of = IndexMap::with_capacity(state.ids.len());
        let mut track_rates = Vec::with_capacity(state.ids.len());
        for (i, id) in state.ids.iter().enumerate() {
            index_of.insert(id.clone(), ResourceIndex(i as u32));
            track_rates.push(track_rates_of.get(id.as_str()).copied().unwrap_or(false));
        }

        let len = state.ids.len();
        Self {
            ids: state.ids.clone(),
            index_of,
            amounts: state.amounts.clone(),
            capacities: state.capacities.clone(),
            unlocked: state.unlocked.clone(),
            visible: state.visible.clone(),
            track_rates,
            income_rates: vec![0.0; len],
            expense_rates: vec![0.0; len],
        }
    }
}

impl ResourceReader for ResourceTable {
    fn amount(&self, index: ResourceIndex) -> Option<f64> {
        self.amounts.get(index.0 as usize).copied()
    }

    fn capacity(&self, index: ResourceIndex) -> Option<f64> {
        self.capacities.get(index.0 as usize).copied().flatten()
    }

    fn is_unlocked(&self, index: ResourceIndex) -> bool {
        self.unlocked.get(index.0 as usize).copied().unwrap_or(false)
    }

    fn is_visible(&self, index: ResourceIndex) -> bool {
        self.visible.get(index.0 as usize).copied().unwrap_or(false)
    }
}

impl ResourceWriter for ResourceTable {
    fn add_amount(&mut self, index: ResourceIndex, delta: f64) -> f64 {
        let i = index.0 as usize;
        let Some(current) = self.amounts.get(i).copied() else {
            return 0.0;
        };
        let cap = self.capacities[i].unwrap_or(f64::INFINITY);
        let new_amount = (current + delta).clamp(0.0, cap);
        self.amounts[i] = new_amount;
        new_amount - current
    }

    fn spend_amount(&mut self, index: ResourceIndex, amount: f64) -> bool {
        let i = index.0 as usize;
        let Some(current) = self.amounts.get(i).copied() else {
            return false;
        };
        if amount <= current {
            self.amounts[i] = current - amount;
            true
        } else {
            false
        }
    }

    fn apply_income(&mut self, index: ResourceIndex, rate_per_second: f64) {
        let i = index.0 as usize;
        if i < self.track_rates.len() && self.track_rates[i] {
            self.income_rates[i] += rate_per_second;
        }
    }

    fn apply_expense(&mut self, index: ResourceIndex, rate_per_second: f64) {
        let i = index.0 as usize;
        if i < self.track_rates.len() && self.track_rates[i] {
            self.expense_rates[i] += rate_per_second;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> Vec<ResourceDef> {
        vec![
            ResourceDef {
                id: "energy".to_string(),
                capacity: Some(100.0),
                initially_unlocked: true,
                initially_visible: true,
                track_rates: true,
            },
            ResourceDef {
                id: "metal".to_string(),
                capacity: None,
                initially_unlocked: false,
                initially_visible: false,
                track_rates: false,
            },
        ]
    }

    #[test]
    fn require_index_fails_on_unknown_resource() {
        let table = ResourceTable::new(&defs());
        assert_eq!(
            table.require_index("unobtainium"),
            Err(ResourceError::UnknownResource {
                resource_id: "unobtainium".to_string()
            })
        );
        assert_eq!(table.require_index("energy"), Ok(ResourceIndex(0)));
    }

    #[test]
    fn add_amount_clamps_to_capacity() {
        let mut table = ResourceTable::new(&defs());
        let energy = table.require_index("energy").unwrap();
        let applied = table.add_amount(energy, 500.0);
        assert_eq!(applied, 100.0);
        assert_eq!(table.amount(energy), Some(100.0));
    }

    #[test]
    fn add_amount_clamps_to_zero() {
        let mut table = ResourceTable::new(&defs());
        let energy = table.require_index("energy").unwrap();
        let applied = table.add_amount(energy, -5.0);
        assert_eq!(applied, 0.0);
        assert_eq!(table.amount(energy), Some(0.0));
    }

    #[test]
    fn spend_amount_is_all_or_nothing() {
        let mut table = ResourceTable::new(&defs());
        let energy = table.require_index("energy").unwrap();
        table.add_amount(energy, 10.0);

        assert!(!table.spend_amount(energy, 20.0));
        assert_eq!(table.amount(energy), Some(10.0));

        assert!(table.spend_amount(energy, 10.0));
        assert_eq!(table.amount(energy), Some(0.0));
    }

    #[test]
    fn finalize_tick_rolls_rates_into_balance() {
        let mut table = ResourceTable::new(&defs());
        let energy = table.require_index("energy").unwrap();
        table.apply_income(energy, 10.0);
        table.apply_expense(energy, 4.0);
        table.finalize_tick(1000.0);
        assert_eq!(table.amount(energy), Some(6.0));
    }

    #[test]
    fn finalize_tick_ignores_non_tracking_resources() {
        let mut table = ResourceTable::new(&defs());
        let metal = table.require_index("metal").unwrap();
        table.apply_income(metal, 10.0);
        table.finalize_tick(1000.0);
        assert_eq!(table.amount(metal), Some(0.0));
    }

    #[test]
    fn reset_per_tick_accumulators_zeroes_rates() {
        let mut table = ResourceTable::new(&defs());
        let energy = table.require_index("energy").unwrap();
        table.apply_income(energy, 10.0);
        table.reset_per_tick_accumulators();
        table.finalize_tick(1000.0);
        assert_eq!(table.amount(energy), Some(0.0));
    }

    #[test]
    fn export_import_round_trips_state() {
        let mut table = ResourceTable::new(&defs());
        let energy = table.require_index("energy").unwrap();
        table.add_amount(energy, 42.0);
        table.set_unlocked(table.require_index("metal").unwrap(), true);

        let exported = table.export(None, None);
        let imported = ResourceTable::import(&exported, &defs());

        assert_eq!(imported.amount(energy), Some(42.0));
        assert!(imported.is_unlocked(imported.require_index("metal").unwrap()));
    }

    #[test]
    fn snapshot_visible_only_hides_locked_resources() {
        let mut table = ResourceTable::new(&defs());
        let metal = table.require_index("metal").unwrap();
        table.add_amount(metal, 5.0);

        let snap = table.snapshot(SnapshotMode::VisibleOnly);
        assert_eq!(snap.amount_at(metal), 0.0);

        let energy = table.require_index("energy").unwrap();
        table.add_amount(energy, 5.0);
        let snap = table.snapshot(SnapshotMode::VisibleOnly);
        assert_eq!(snap.amount_at(energy), 5.0);
    }
}
