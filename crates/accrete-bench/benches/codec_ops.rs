//! Criterion micro-benchmarks for the command log binary codec.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use accrete_bench::{reference_generators, reference_resources, REFERENCE_GENERATOR_COUNT, REFERENCE_RESOURCE_COUNT};
use accrete_core::command::{Command, CommandPayload, Priority};
use accrete_core::id::StepId;
use accrete_replay::codec::{decode_log, encode_log};
use accrete_replay::{CommandLog, LogMetadata, StartState};
use accrete_resources::{GeneratorTable, ResourceTable};

/// Builds a [`CommandLog`] with `n` `SetResourceAmount` commands against
/// the reference resource/generator roster, for codec benchmarking.
fn make_log(n: usize) -> CommandLog {
    let resource_defs = reference_resources(REFERENCE_RESOURCE_COUNT);
    let generator_defs = reference_generators(REFERENCE_GENERATOR_COUNT, &resource_defs);
    let resources = ResourceTable::new(&resource_defs);
    let generators = GeneratorTable::new(&generator_defs);

    let commands: Vec<Command> = (0..n)
        .map(|i| Command {
            command_type: "set_resource".to_string(),
            payload: CommandPayload::SetResourceAmount {
                resource_id: format!("resource_{}", i % REFERENCE_RESOURCE_COUNT),
                amount: i as f64,
            },
            priority: Priority::Player,
            step: StepId(i as u64),
            timestamp: i as f64,
            issued_at: i as f64,
            request_id: Some(format!("req-{i}")),
            arrival_seq: i as u64,
        })
        .collect();

    CommandLog {
        version: accrete_replay::FORMAT_VERSION.to_string(),
        start_state: StartState::capture(&resources, &generators),
        commands,
        metadata: LogMetadata {
            seed: Some(42),
            last_step: n as u64,
            config_hash: Some(0xabcd_ef01),
        },
    }
}

fn bench_encode_log(c: &mut Criterion) {
    let log = make_log(500);

    c.bench_function("codec_encode_log_500_commands", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(8192);
            encode_log(&mut buf, &log).unwrap();
            black_box(&buf);
        });
    });
}

fn bench_decode_log(c: &mut Criterion) {
    let log = make_log(500);
    let mut encoded = Vec::with_capacity(8192);
    encode_log(&mut encoded, &log).unwrap();

    c.bench_function("codec_decode_log_500_commands", |b| {
        b.iter(|| {
            let mut cursor = encoded.as_slice();
            let decoded = decode_log(&mut cursor).unwrap();
            black_box(decoded);
        });
    });
}

criterion_group!(benches, bench_encode_log, bench_decode_log);
criterion_main!(benches);
