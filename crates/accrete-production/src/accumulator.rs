//! The fractional accumulator table keyed by `(generatorId, operation,
//! resourceId)`.

use std::collections::HashMap;
use std::fmt;

/// Which side of a generator's flow list an accumulator entry tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Tracks a `produces` entry.
    Produce,
    /// Tracks a `consumes` entry.
    Consume,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Produce => "produce",
            Self::Consume => "consume",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "produce" => Some(Self::Produce),
            "consume" => Some(Self::Consume),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key identifying one accumulator slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccumulatorKey {
    /// Owning generator's ID.
    pub generator_id: String,
    /// Which flow list this tracks.
    pub operation: Operation,
    /// Target resource ID.
    pub resource_id: String,
}

fn percent_encode(s: &str) -> String {
    s.replace('%', "%25").replace('|', "%7C")
}

fn percent_decode(s: &str) -> String {
    s.replace("%7C", "|").replace("%25", "%")
}

/// Per-(generator, operation, resource) fractional accumulator table.
///
/// Created lazily on first contribution, persisted across ticks, and
/// pruned only by the explicit management operations below.
#[derive(Clone, Debug, Default)]
pub struct AccumulatorTable {
    values: HashMap<AccumulatorKey, f64>,
    /// Legacy-format export entries this table could not resolve against
    /// known generator/resource IDs at restore time. Retained verbatim
    /// for forward compatibility and re-emitted unchanged on export.
    unparsed: HashMap<String, f64>,
}

impl AccumulatorTable {
    /// An empty accumulator table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value for `key`, or `0.0` if no contribution has been made.
    pub fn get(&self, key: &AccumulatorKey) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Overwrites the value stored at `key`.
    pub fn set(&mut self, key: AccumulatorKey, value: f64) {
        self.values.insert(key, value);
    }

    /// Drops every accumulator entry, including unparsed legacy entries.
    pub fn clear(&mut self) {
        self.values.clear();
        self.unparsed.clear();
    }

    /// Drops entries whose magnitude is below `apply_threshold * 1e-6`.
    pub fn cleanup(&mut self, apply_threshold: f64) {
        let epsilon = apply_threshold * 1e-6;
        self.values.retain(|_, v| v.abs() >= epsilon);
    }

    /// Drops all entries belonging to one generator.
    pub fn clear_for_generator(&mut self, generator_id: &str) {
        self.values.retain(|k, _| k.generator_id != generator_id);
    }

    /// Emits non-zero entries in the collision-free `v2` key form, plus
    /// any legacy entries retained unparsed from a prior `restore`.
    pub fn export(&self) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = self
            .values
            .iter()
            .filter(|(_, v)| **v != 0.0)
            .map(|(k, v)| {
                let key = format!(
                    "v2|{}|{}|{}",
                    percent_encode(&k.generator_id),
                    k.operation,
                    percent_encode(&k.resource_id)
                );
                (key, *v)
            })
            .collect();
        out.extend(self.unparsed.iter().map(|(k, v)| (k.clone(), *v)));
        out
    }

    /// Rebuilds the table from a previous [`AccumulatorTable::export`].
    ///
    /// Parses both the `v2|genId|op|resId` form and the legacy
    /// `genId:op:resId` form. Legacy keys are disambiguated by matching
    /// `known_generators`/`known_resources`; a legacy key that cannot be
    /// resolved this way is retained unparsed rather than dropped.
    pub fn restore(
        &mut self,
        entries: &[(String, f64)],
        known_generators: &[String],
        known_resources: &[String],
    ) {
        self.values.clear();
        self.unparsed.clear();

        for (raw_key, value) in entries {
            if let Some(rest) = raw_key.strip_prefix("v2|") {
                if let Some(key) = parse_v2_key(rest) {
                    self.values.insert(key, *value);
                    continue;
                }
            } else if let Some(key) =
                parse_legacy_key(raw_key, known_generators, known_resources)
            {
                self.values.insert(key, *value);
                continue;
            }
            self.unparsed.insert(raw_key.clone(), *value);
        }
    }
}

fn parse_v2_key(rest: &str) -> Option<AccumulatorKey> {
    let mut parts = rest.splitn(3, '|');
    let generator_id = percent_decode(parts.next()?);
    let op = Operation::parse(parts.next()?)?;
    let resource_id = percent_decode(parts.next()?);
    Some(AccumulatorKey {
        generator_id,
        operation: op,
        resource_id,
    })
}

fn parse_legacy_key(
    raw: &str,
    known_generators: &[String],
    known_resources: &[String],
) -> Option<AccumulatorKey> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let op = Operation::parse(parts[1])?;
    if !known_generators.iter().any(|g| g == parts[0]) {
        return None;
    }
    if !known_resources.iter().any(|r| r == parts[2]) {
        return None;
    }
    Some(AccumulatorKey {
        generator_id: parts[0].to_string(),
        operation: op,
        resource_id: parts[2].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(gen: &str, op: Operation, res: &str) -> AccumulatorKey {
        AccumulatorKey {
            generator_id: gen.to_string(),
            operation: op,
            resource_id: res.to_string(),
        }
    }

    #[test]
    fn get_defaults_to_zero() {
        let table = AccumulatorTable::new();
        assert_eq!(table.get(&key("reactor", Operation::Produce, "energy")), 0.0);
    }

    #[test]
    fn export_round_trips_through_restore() {
        let mut table = AccumulatorTable::new();
        table.set(key("reactor", Operation::Produce, "energy"), 0.00005);
        table.set(key("smelter", Operation::Consume, "energy"), 0.00003);

        let exported = table.export();
        let mut restored = AccumulatorTable::new();
        restored.restore(
            &exported,
            &["reactor".to_string(), "smelter".to_string()],
            &["energy".to_string()],
        );

        assert_eq!(restored.get(&key("reactor", Operation::Produce, "energy")), 0.00005);
        assert_eq!(restored.get(&key("smelter", Operation::Consume, "energy")), 0.00003);
    }

    #[test]
    fn export_encodes_separator_collisions() {
        let mut table = AccumulatorTable::new();
        table.set(key("gen|with|pipes", Operation::Produce, "res"), 1.0);
        let exported = table.export();
        assert_eq!(exported.len(), 1);
        assert!(exported[0].0.contains("%7C"));
        assert_eq!(exported[0].0.matches('|').count(), 3);
    }

    #[test]
    fn restore_keeps_unresolvable_legacy_key_unparsed() {
        let mut table = AccumulatorTable::new();
        table.restore(
            &[("ghost:produce:mystery".to_string(), 1.0)],
            &["reactor".to_string()],
            &["energy".to_string()],
        );
        let exported = table.export();
        assert_eq!(exported, vec![("ghost:produce:mystery".to_string(), 1.0)]);
    }

    #[test]
    fn cleanup_drops_entries_below_threshold() {
        let mut table = AccumulatorTable::new();
        table.set(key("reactor", Operation::Produce, "energy"), 1e-10);
        table.set(key("reactor", Operation::Consume, "energy"), 1.0);
        table.cleanup(1e-4);
        assert_eq!(table.get(&key("reactor", Operation::Produce, "energy")), 0.0);
        assert_eq!(table.get(&key("reactor", Operation::Consume, "energy")), 1.0);
    }

    #[test]
    fn clear_for_generator_only_drops_that_generator() {
        let mut table = AccumulatorTable::new();
        table.set(key("reactor", Operation::Produce, "energy"), 1.0);
        table.set(key("smelter", Operation::Produce, "metal"), 2.0);
        table.clear_for_generator("reactor");
        assert_eq!(table.get(&key("reactor", Operation::Produce, "energy")), 0.0);
        assert_eq!(table.get(&key("smelter", Operation::Produce, "metal")), 2.0);
    }
}
