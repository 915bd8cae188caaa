//! Benchmark profiles for the Accrete simulation kernel.
//!
//! Provides pre-built resource/generator sets for benchmarking the
//! Production Engine, Priority Command Queue, and replay codec at a
//! fixed, reproducible scale, mirroring how a content pack would size
//! a real game's generator roster.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use accrete_core::resource::{GeneratorDef, GeneratorFlow, ResourceDef};

/// Builds `count` resources named `resource_0`..`resource_{count-1}`,
/// each with a 1e9 capacity and rate tracking enabled.
pub fn reference_resources(count: usize) -> Vec<ResourceDef> {
    (0..count)
        .map(|i| ResourceDef {
            id: format!("resource_{i}"),
            capacity: Some(1e9),
            initially_unlocked: true,
            initially_visible: true,
            track_rates: true,
        })
        .collect()
}

/// Builds `count` generators named `generator_0`..`generator_{count-1}`,
/// each owning one unit and producing into `resources[i % resources.len()]`
/// at a fixed rate, with every third generator also consuming from the
/// next resource in the cycle (so a benchmark exercises both the
/// production and scarcity-scaling code paths).
pub fn reference_generators(count: usize, resources: &[ResourceDef]) -> Vec<GeneratorDef> {
    assert!(!resources.is_empty(), "reference_generators needs at least one resource");
    (0..count)
        .map(|i| {
            let produces_into = &resources[i % resources.len()].id;
            let mut consumes = Vec::new();
            if i % 3 == 0 {
                let consumes_from = &resources[(i + 1) % resources.len()].id;
                consumes.push(GeneratorFlow {
                    resource_id: consumes_from.clone(),
                    rate_per_owned_per_second: 0.5,
                });
            }
            GeneratorDef {
                id: format!("generator_{i}"),
                owned: 10,
                enabled: true,
                produces: vec![GeneratorFlow {
                    resource_id: produces_into.clone(),
                    rate_per_owned_per_second: 1.0,
                }],
                consumes,
            }
        })
        .collect()
}

/// Scale used by the `codec_ops` and `production_ops` benches for a
/// representative mid-game generator roster.
pub const REFERENCE_GENERATOR_COUNT: usize = 64;

/// Scale used for a representative resource roster.
pub const REFERENCE_RESOURCE_COUNT: usize = 16;
