//! Executor Hook Benchmarks
//!
//! The hooks sit on the executor's per-op and per-graph paths:
//! - apply_if_needed: debounced, should cost two relaxed loads when unchanged
//! - maybe_probe (idle): one atomic swap
//! - analyze: full pass over a decoder graph
//!
//! Run with: cargo bench --bench executor_hooks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use opscope_benchmarks::decoder_graph;
use opscope_core::dvfs::{FrequencyApplier, FrequencyTable, RecordingSink};
use opscope_core::intensity::{DiagnosticTarget, ProbeTrigger};
use opscope_core::{GraphAnalyzer, OpKind};
use std::sync::Arc;
use std::time::Duration;

/// Layer counts to analyze
const LAYER_COUNTS: &[usize] = &[1, 12, 32];

fn bench_apply_if_needed(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_if_needed");

    let sink = Arc::new(RecordingSink::new());
    let table = Arc::new(FrequencyTable::new());
    let applier = FrequencyApplier::new(table.clone(), sink.clone());
    table.set(OpKind::MulMat, 1_396_000);
    table.set(OpKind::Add, 1_396_000);
    applier.apply_if_needed(OpKind::MulMat);

    group.bench_function("unchanged", |b| {
        b.iter(|| applier.apply_if_needed(black_box(OpKind::MulMat)));
    });

    group.bench_function("unset_op", |b| {
        b.iter(|| applier.apply_if_needed(black_box(OpKind::SoftMax)));
    });

    group.bench_function("shared_frequency", |b| {
        b.iter(|| {
            applier.apply_if_needed(black_box(OpKind::MulMat));
            applier.apply_if_needed(black_box(OpKind::Add));
        });
    });

    group.finish();
    assert_eq!(sink.write_count(), 1);
}

fn bench_idle_probe(c: &mut Criterion) {
    let trigger = ProbeTrigger::new(false).with_diagnostics(DiagnosticTarget::Off);
    let graph = decoder_graph(1, 512, 1);

    c.bench_function("maybe_probe_idle", |b| {
        b.iter(|| black_box(trigger.maybe_probe(black_box(&graph))));
    });
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_decoder");
    group.measurement_time(Duration::from_secs(5));
    let analyzer = GraphAnalyzer::new();

    for &layers in LAYER_COUNTS {
        let graph = decoder_graph(layers, 4096, 32);
        group.bench_with_input(BenchmarkId::from_parameter(layers), &graph, |b, graph| {
            b.iter(|| black_box(analyzer.analyze(graph)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_apply_if_needed, bench_idle_probe, bench_analyze);
criterion_main!(benches);
