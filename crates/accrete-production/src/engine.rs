//! The Production Engine: scarcity-scaled production/consumption over a
//! [`ResourceTable`].

use std::collections::HashMap;

use accrete_core::error::ProductionError;
use accrete_core::id::ResourceIndex;
use accrete_core::resource::GeneratorDef;
use accrete_core::traits::{ResourceReader, ResourceWriter};
use accrete_resources::ResourceTable;

use crate::accumulator::{AccumulatorKey, AccumulatorTable, Operation};

/// Default threshold below which a pending accumulator value is not yet
/// applied to the resource table.
pub const DEFAULT_APPLY_THRESHOLD: f64 = 1e-4;

/// How production/consumption balance mutations reach the resource table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ApplyMode {
    /// Balances are mutated directly via `add_amount`/`spend_amount`.
    #[default]
    Direct,
    /// Mutations are aggregated into a tick-local shadow and forwarded to
    /// the table as per-second rates, to be rolled into balances by a
    /// later `finalize_tick(deltaMs)` call. Requires `rate_tracking`.
    ViaFinalizeTick,
}

/// Per-tick engine options.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ProductionOptions {
    /// Whether to also forward per-second rates via `apply_income`/
    /// `apply_expense` for resources that track them.
    pub rate_tracking: bool,
    /// Whether balance mutations route through the finalize-tick shadow.
    pub apply_mode: ApplyMode,
}

/// One applied contribution, recorded for diagnostics and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedFlow {
    /// Owning generator's ID.
    pub generator_id: String,
    /// Target resource ID.
    pub resource_id: String,
    /// Amount actually applied this tick (always a non-negative multiple
    /// of `apply_threshold`).
    pub amount: f64,
}

/// Summary of one [`ProductionEngine::run_tick`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductionTickReport {
    /// Generators that ran this tick (`enabled && owned > 0`).
    pub generators_run: u32,
    /// Production contributions actually applied.
    pub produced: Vec<AppliedFlow>,
    /// Consumption contributions actually applied.
    pub consumed: Vec<AppliedFlow>,
}

struct ConsumptionPeek {
    resource_id: String,
    index: ResourceIndex,
    key: AccumulatorKey,
    total: f64,
    to_apply: f64,
}

/// Computes scarcity-scaled production and consumption and applies
/// threshold-quantized deltas to a [`ResourceTable`] using per-
/// (generator, operation, resource) fractional accumulators.
pub struct ProductionEngine {
    apply_threshold: f64,
    accumulators: AccumulatorTable,
}

impl ProductionEngine {
    /// Builds an engine with the given quantization threshold.
    ///
    /// Fails with [`ProductionError::InvalidApplyThreshold`] if
    /// `apply_threshold` is non-finite or `<= 0`.
    pub fn new(apply_threshold: f64) -> Result<Self, ProductionError> {
        if !apply_threshold.is_finite() || apply_threshold <= 0.0 {
            return Err(ProductionError::InvalidApplyThreshold);
        }
        Ok(Self {
            apply_threshold,
            accumulators: AccumulatorTable::new(),
        })
    }

    /// The quantization threshold this engine was constructed with.
    pub fn apply_threshold(&self) -> f64 {
        self.apply_threshold
    }

    /// Read-only access to the accumulator table, for export/diagnostics.
    pub fn accumulators(&self) -> &AccumulatorTable {
        &self.accumulators
    }

    /// Mutable access to the accumulator table, for restore.
    pub fn accumulators_mut(&mut self) -> &mut AccumulatorTable {
        &mut self.accumulators
    }

    /// Runs one tick of the scarcity-scaled production/consumption algorithm over `generators`.
    ///
    /// `multiplier` scales a generator's effective owned count (e.g. for
    /// prestige bonuses); `None` is equivalent to returning `1.0` for
    /// every generator.
    pub fn run_tick(
        &mut self,
        generators: &[GeneratorDef],
        delta_seconds: f64,
        resources: &mut ResourceTable,
        multiplier: Option<&dyn Fn(&str) -> f64>,
        options: ProductionOptions,
    ) -> ProductionTickReport {
        let mut report = ProductionTickReport::default();

        if !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return report;
        }

        let epsilon = self.apply_threshold * 1e-9;
        let mut shadow: Option<HashMap<ResourceIndex, f64>> = match options.apply_mode {
            ApplyMode::ViaFinalizeTick => Some(HashMap::new()),
            ApplyMode::Direct => None,
        };

        for gen in generators {
            if !gen.enabled || gen.owned == 0 {
                continue;
            }
            report.generators_run += 1;

            let owned_effective = gen.owned as f64
                * multiplier.map(|m| m(&gen.id)).unwrap_or(1.0);

            let consumes: Vec<_> = gen
                .consumes
                .iter()
                .filter(|f| f.rate_per_owned_per_second.is_finite() && f.rate_per_owned_per_second > 0.0)
                .filter_map(|f| resources.get_index(&f.resource_id).map(|i| (f, i)))
                .collect();
            let produces: Vec<_> = gen
                .produces
                .iter()
                .filter(|f| f.rate_per_owned_per_second.is_finite() && f.rate_per_owned_per_second > 0.0)
                .filter_map(|f| resources.get_index(&f.resource_id).map(|i| (f, i)))
                .collect();

            // Phase 1: consumption peek.
            let mut peeks = Vec::with_capacity(consumes.len());
            let mut candidate_ratios = Vec::with_capacity(consumes.len());
            for (flow, index) in &consumes {
                let key = AccumulatorKey {
                    generator_id: gen.id.clone(),
                    operation: Operation::Consume,
                    resource_id: flow.resource_id.clone(),
                };
                let previous = self.accumulators.get(&key);
                let delta = flow.rate_per_owned_per_second * owned_effective * delta_seconds;
                let total = previous + delta;
                let to_apply = (((total + epsilon) / self.apply_threshold).floor())
                    * self.apply_threshold;

                if to_apply > 0.0 {
                    let available = shadow_adjusted_amount(resources, &shadow, *index);
                    let ratio = (available / total).min(available / to_apply);
                    candidate_ratios.push(ratio);
                }

                peeks.push(ConsumptionPeek {
                    resource_id: flow.resource_id.clone(),
                    index: *index,
                    key,
                    total,
                    to_apply,
                });
            }

            let has_consumes = !consumes.is_empty();
            let any_crossed = !candidate_ratios.is_empty();
            let consumption_ratio = if candidate_ratios.is_empty() {
                1.0
            } else {
                candidate_ratios
                    .into_iter()
                    .fold(1.0_f64, f64::min)
                    .clamp(0.0, 1.0)
            };
            let scale = if !has_consumes {
                1.0
            } else if any_crossed {
                consumption_ratio
            } else {
                0.0
            };

            // Phase 2: production.
            for (flow, index) in &produces {
                let key = AccumulatorKey {
                    generator_id: gen.id.clone(),
                    operation: Operation::Produce,
                    resource_id: flow.resource_id.clone(),
                };
                let previous = self.accumulators.get(&key);
                let delta = flow.rate_per_owned_per_second * owned_effective * delta_seconds;
                let total = previous + delta;
                let to_apply = (((total + epsilon) / self.apply_threshold).floor())
                    * self.apply_threshold;
                self.accumulators.set(key, total - to_apply * scale);

                let actual = to_apply * scale;
                if actual > 0.0 {
                    apply_positive(resources, &mut shadow, *index, actual);
                    report.produced.push(AppliedFlow {
                        generator_id: gen.id.clone(),
                        resource_id: flow.resource_id.clone(),
                        amount: actual,
                    });
                }
                if options.rate_tracking {
                    let rate_effective = flow.rate_per_owned_per_second * owned_effective;
                    forward_rate(resources, *index, rate_effective * scale, true);
                }
            }

            // Phase 3: consumption commit.
            for peek in peeks {
                self.accumulators
                    .set(peek.key, peek.total - peek.to_apply * consumption_ratio);
                let actual = peek.to_apply * consumption_ratio;
                if actual > 0.0 {
                    let spent = spend_positive(resources, &mut shadow, peek.index, actual);
                    if spent {
                        report.consumed.push(AppliedFlow {
                            generator_id: gen.id.clone(),
                            resource_id: peek.resource_id,
                            amount: actual,
                        });
                    }
                }
            }
            for (flow, index) in &consumes {
                if options.rate_tracking {
                    let rate_effective = flow.rate_per_owned_per_second * owned_effective;
                    forward_rate(resources, *index, rate_effective * consumption_ratio, false);
                }
            }
        }

        if let Some(shadow) = shadow {
            for (index, net) in shadow {
                let rate_per_second = net / delta_seconds;
                if rate_per_second > 0.0 {
                    resources.apply_income(index, rate_per_second);
                } else if rate_per_second < 0.0 {
                    resources.apply_expense(index, -rate_per_second);
                }
            }
        }

        report
    }
}

fn shadow_adjusted_amount(
    resources: &ResourceTable,
    shadow: &Option<HashMap<ResourceIndex, f64>>,
    index: ResourceIndex,
) -> f64 {
    let base = resources.amount(index).unwrap_or(0.0);
    match shadow {
        Some(map) => base + map.get(&index).copied().unwrap_or(0.0),
        None => base,
    }
}

fn apply_positive(
    resources: &mut ResourceTable,
    shadow: &mut Option<HashMap<ResourceIndex, f64>>,
    index: ResourceIndex,
    amount: f64,
) {
    match shadow {
        Some(map) => {
            *map.entry(index).or_insert(0.0) += amount;
        }
        None => {
            resources.add_amount(index, amount);
        }
    }
}

fn spend_positive(
    resources: &mut ResourceTable,
    shadow: &mut Option<HashMap<ResourceIndex, f64>>,
    index: ResourceIndex,
    amount: f64,
) -> bool {
    match shadow {
        Some(map) => {
            let base = resources.amount(index).unwrap_or(0.0);
            let available = base + map.get(&index).copied().unwrap_or(0.0);
            if amount <= available {
                *map.entry(index).or_insert(0.0) -= amount;
                true
            } else {
                false
            }
        }
        None => resources.spend_amount(index, amount),
    }
}

fn forward_rate(resources: &mut ResourceTable, index: ResourceIndex, rate_per_second: f64, is_income: bool) {
    if rate_per_second <= 0.0 {
        return;
    }
    if is_income {
        resources.apply_income(index, rate_per_second);
    } else {
        resources.apply_expense(index, rate_per_second);
    }
}
