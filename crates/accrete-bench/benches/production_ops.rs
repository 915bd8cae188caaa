//! Criterion micro-benchmarks for the Production Engine's per-tick
//! scarcity-scaled accumulator pass.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use accrete_bench::{reference_generators, reference_resources, REFERENCE_GENERATOR_COUNT, REFERENCE_RESOURCE_COUNT};
use accrete_production::ProductionEngine;
use accrete_resources::{GeneratorTable, ResourceTable};

fn bench_run_tick(c: &mut Criterion) {
    let resource_defs = reference_resources(REFERENCE_RESOURCE_COUNT);
    let generator_defs = reference_generators(REFERENCE_GENERATOR_COUNT, &resource_defs);

    c.bench_function("production_run_tick_64_generators", |b| {
        b.iter_batched(
            || {
                let resources = ResourceTable::new(&resource_defs);
                let generators = GeneratorTable::new(&generator_defs);
                let engine = ProductionEngine::new(1e-4).unwrap();
                (resources, generators, engine)
            },
            |(mut resources, generators, mut engine)| {
                let report = engine.run_tick(generators.as_slice(), 0.1, &mut resources, None, Default::default());
                black_box(report.generators_run);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_run_tick_sub_threshold_accumulation(c: &mut Criterion) {
    let resource_defs = reference_resources(REFERENCE_RESOURCE_COUNT);
    let generator_defs = reference_generators(REFERENCE_GENERATOR_COUNT, &resource_defs);

    c.bench_function("production_run_tick_1000_subthreshold_ticks", |b| {
        b.iter_batched(
            || {
                let resources = ResourceTable::new(&resource_defs);
                let generators = GeneratorTable::new(&generator_defs);
                let engine = ProductionEngine::new(1e-4).unwrap();
                (resources, generators, engine)
            },
            |(mut resources, generators, mut engine)| {
                for _ in 0..1000 {
                    let report = engine.run_tick(generators.as_slice(), 0.001, &mut resources, None, Default::default());
                    black_box(report.generators_run);
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_run_tick, bench_run_tick_sub_threshold_accumulation);
criterion_main!(benches);
