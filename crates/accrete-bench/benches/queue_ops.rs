//! Criterion micro-benchmarks for the Priority Command Queue.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use accrete_core::command::{Command, CommandPayload, Priority};
use accrete_core::id::StepId;
use accrete_engine::PriorityCommandQueue;

fn make_command(i: usize) -> Command {
    let priority = match i % 3 {
        0 => Priority::System,
        1 => Priority::Player,
        _ => Priority::Automation,
    };
    Command {
        command_type: "set_resource".to_string(),
        payload: CommandPayload::SetResourceAmount {
            resource_id: format!("resource_{}", i % 16),
            amount: i as f64,
        },
        priority,
        step: StepId((i % 8) as u64),
        timestamp: 0.0,
        issued_at: 0.0,
        request_id: None,
        arrival_seq: 0,
    }
}

fn bench_enqueue(c: &mut Criterion) {
    c.bench_function("queue_enqueue_1000", |b| {
        b.iter(|| {
            let mut queue = PriorityCommandQueue::new(2048);
            for i in 0..1000 {
                queue.enqueue(make_command(i), StepId(0)).unwrap();
            }
            black_box(queue.size());
        });
    });
}

fn bench_dequeue_ready(c: &mut Criterion) {
    c.bench_function("queue_dequeue_ready_1000", |b| {
        b.iter_batched(
            || {
                let mut queue = PriorityCommandQueue::new(2048);
                for i in 0..1000 {
                    queue.enqueue(make_command(i), StepId(0)).unwrap();
                }
                queue
            },
            |mut queue| {
                let ready = queue.dequeue_ready(StepId(7));
                black_box(ready.len());
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_enqueue, bench_dequeue_ready);
criterion_main!(benches);
