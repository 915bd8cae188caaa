//! The Generator Table: dense storage of generator definitions mutated
//! by `AdjustGeneratorOwned`/`SetGeneratorEnabled` commands and handed
//! to the Production Engine each tick as a plain slice.

use accrete_core::error::GeneratorError;
use accrete_core::id::GeneratorIndex;
use accrete_core::resource::GeneratorDef;
use indexmap::IndexMap;

/// Dense, index-addressed store of generator definitions.
///
/// Generators are registered once at content load and never removed.
/// `owned` and `enabled` are the only fields commands mutate at
/// runtime; `produces`/`consumes` are immutable for the table's
/// lifetime.
#[derive(Clone, Debug)]
pub struct GeneratorTable {
    index_of: IndexMap<String, GeneratorIndex>,
    defs: Vec<GeneratorDef>,
}

impl GeneratorTable {
    /// Builds a table from content-loader definitions, in registration
    /// order.
    pub fn new(defs: &[GeneratorDef]) -> Self {
        let mut index_of = IndexMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            index_of.insert(def.id.clone(), GeneratorIndex(i as u32));
        }
        Self {
            index_of,
            defs: defs.to_vec(),
        }
    }

    /// Number of registered generators.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether no generators are registered.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Looks up the dense index for a generator ID, if registered.
    pub fn get_index(&self, id: &str) -> Option<GeneratorIndex> {
        self.index_of.get(id).copied()
    }

    /// Looks up the dense index for a generator ID, failing with
    /// [`GeneratorError::UnknownGenerator`] if it isn't registered.
    pub fn require_index(&self, id: &str) -> Result<GeneratorIndex, GeneratorError> {
        self.get_index(id).ok_or_else(|| GeneratorError::UnknownGenerator {
            generator_id: id.to_string(),
        })
    }

    /// Reads the definition at `index`, if registered.
    pub fn get(&self, index: GeneratorIndex) -> Option<&GeneratorDef> {
        self.defs.get(index.0 as usize)
    }

    /// Adjusts a generator's owned count by `delta`, clamped at zero.
    /// Returns the resulting owned count.
    pub fn adjust_owned(&mut self, index: GeneratorIndex, delta: i64) -> Option<u64> {
        let def = self.defs.get_mut(index.0 as usize)?;
        def.owned = def.owned.saturating_add_signed(delta);
        Some(def.owned)
    }

    /// Sets a generator's enabled flag.
    pub fn set_enabled(&mut self, index: GeneratorIndex, enabled: bool) -> bool {
        match self.defs.get_mut(index.0 as usize) {
            Some(def) => {
                def.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// The full set of generator definitions, in registration order, as
    /// consumed by the production engine's per-tick pass.
    pub fn as_slice(&self) -> &[GeneratorDef] {
        &self.defs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrete_core::resource::GeneratorFlow;

    fn defs() -> Vec<GeneratorDef> {
        vec![GeneratorDef {
            id: "reactor".to_string(),
            owned: 1,
            enabled: true,
            produces: vec![GeneratorFlow {
                resource_id: "energy".to_string(),
                rate_per_owned_per_second: 1.0,
            }],
            consumes: Vec::new(),
        }]
    }

    #[test]
    fn require_index_fails_on_unknown_generator() {
        let table = GeneratorTable::new(&defs());
        assert_eq!(
            table.require_index("ghost"),
            Err(GeneratorError::UnknownGenerator {
                generator_id: "ghost".to_string()
            })
        );
    }

    #[test]
    fn adjust_owned_saturates_at_zero() {
        let mut table = GeneratorTable::new(&defs());
        let idx = table.require_index("reactor").unwrap();
        assert_eq!(table.adjust_owned(idx, -5), Some(0));
        assert_eq!(table.get(idx).unwrap().owned, 0);
    }

    #[test]
    fn adjust_owned_accumulates_positive_delta() {
        let mut table = GeneratorTable::new(&defs());
        let idx = table.require_index("reactor").unwrap();
        table.adjust_owned(idx, 4);
        assert_eq!(table.get(idx).unwrap().owned, 5);
    }

    #[test]
    fn set_enabled_toggles_flag() {
        let mut table = GeneratorTable::new(&defs());
        let idx = table.require_index("reactor").unwrap();
        table.set_enabled(idx, false);
        assert!(!table.get(idx).unwrap().enabled);
    }
}
