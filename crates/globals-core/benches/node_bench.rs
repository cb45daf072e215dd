//! # Node Benchmarks
//!
//! Performance benchmarks for globals-core node operations.
//!
//! Run with: `cargo bench -p globals-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use globals_core::keys::encode_key;
use globals_core::{MemoryEngine, Node};
use std::hint::black_box;

/// Create an engine with N children under `^bench("root")`.
fn create_wide_node(size: usize) -> MemoryEngine {
    let engine = MemoryEngine::new();
    let root = Node::new(&engine, "^bench", ["root"]).expect("node");
    for i in 0..size {
        root.set(i.to_string(), "value").expect("set");
    }
    engine
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_set");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_wide_node(size)));
        });
    }

    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_iterate");

    for size in [100, 1000, 10000].iter() {
        let engine = create_wide_node(*size);
        let root = Node::new(&engine, "^bench", ["root"]).expect("node");
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(root.len().expect("len")));
        });
    }

    group.finish();
}

fn bench_encode_key(c: &mut Criterion) {
    let path: Vec<String> = ["123", "name", "-4.5", "address", "2"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();

    c.bench_function("encode_key", |b| {
        b.iter(|| black_box(encode_key(black_box("^patient"), black_box(&path))));
    });
}

criterion_group!(benches, bench_set, bench_iterate, bench_encode_key);
criterion_main!(benches);
