//! Benchmarks for property recomputation.

#![allow(missing_docs)] // Benchmark macros generate undocumented functions

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_parley::core::{Diagnostics, EntityId};
use rust_parley::properties::{Bound, PropChange, PropId, PropOwner, Property, PropertyGraph, PropertyTemplate};

fn property(graph: &mut PropertyGraph, id: usize, entity: u32) -> PropId {
    let template = PropertyTemplate::new(format!("p{id}"), 1.0).bounded(-1e9, 1e9);
    match Property::from_template(&template, PropOwner::Entity(EntityId(entity))) {
        Ok(prop) => graph.insert(prop),
        Err(error) => panic!("fixture property: {error}"),
    }
}

/// A chain where every property reads its predecessor.
fn chain(len: usize) -> (PropertyGraph, PropId) {
    let mut graph = PropertyGraph::new();
    let root = property(&mut graph, 0, 0);
    let mut prev = root;
    for i in 1..len {
        let next = property(&mut graph, i, 0);
        let _ = graph.link(next, Bound::Val, prev);
        prev = next;
    }
    let _ = graph.recompute_all(&mut Diagnostics::quiet());
    (graph, root)
}

/// One root read by `width` properties, each read by one sink.
fn fan(width: usize) -> (PropertyGraph, PropId) {
    let mut graph = PropertyGraph::new();
    let root = property(&mut graph, 0, 0);
    let sink = property(&mut graph, 1, 1);
    for i in 0..width {
        let mid = property(&mut graph, i + 2, 2);
        let _ = graph.link(mid, Bound::Val, root);
        let _ = graph.link(sink, Bound::Val, mid);
    }
    let _ = graph.recompute_all(&mut Diagnostics::quiet());
    (graph, root)
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_apply");
    for len in [16, 128, 1024] {
        let (mut graph, root) = chain(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                let _ = black_box(graph.apply(&[PropChange::add(root, 1.0)], &mut Diagnostics::quiet()));
            });
        });
    }
    group.finish();
}

fn bench_fan(c: &mut Criterion) {
    let (mut graph, root) = fan(256);
    c.bench_function("fan_apply_256", |b| {
        b.iter(|| {
            let _ = black_box(graph.apply(&[PropChange::add(root, 1.0)], &mut Diagnostics::quiet()));
        });
    });
}

fn bench_simulate(c: &mut Criterion) {
    let (mut graph, root) = chain(128);
    c.bench_function("simulate_discard_128", |b| {
        b.iter(|| {
            let _ = black_box(graph.simulate(&[PropChange::add(root, -1.0)], &mut Diagnostics::quiet()));
            graph.discard();
        });
    });
}

criterion_group!(benches, bench_chain, bench_fan, bench_simulate);
criterion_main!(benches);
