//! Contact resolver benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench resolver
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench resolver -- stack

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use quell::ContactResolver;
use quell_bench::*;

const DT: f32 = 1.0 / 60.0;

// ---------------------------------------------------------------------------
// Batch size
// ---------------------------------------------------------------------------

fn bench_contact_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver/contact_count");
    for &n in &[10, 50, 100, 500] {
        let (mut world, contacts) = setup_pile(n);
        let resolver = ContactResolver::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter_batched(
                || contacts.clone(),
                |mut batch| resolver.resolve_contacts(&mut batch, &mut world, DT),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Coupled stacks
// ---------------------------------------------------------------------------

fn bench_stack_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver/stack_depth");
    for &n in &[2, 8, 32, 128] {
        let (mut world, contacts) = setup_stack(n);
        let resolver = ContactResolver::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter_batched(
                || contacts.clone(),
                |mut batch| resolver.resolve_contacts(&mut batch, &mut world, DT),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Iteration caps
// ---------------------------------------------------------------------------

fn bench_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver/iterations");
    let (mut world, contacts) = setup_stack(100);
    for &iterations in &[1, 4, 8, 16, 32] {
        let resolver = resolver_with_iterations(iterations);
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &iterations,
            |b, _| {
                b.iter_batched(
                    || contacts.clone(),
                    |mut batch| resolver.resolve_contacts(&mut batch, &mut world, DT),
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Friction
// ---------------------------------------------------------------------------

fn bench_friction(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver/friction");

    {
        let (mut world, contacts) = setup_pile(100);
        let resolver = ContactResolver::default();
        group.bench_function("frictionless_100", |b| {
            b.iter_batched(
                || contacts.clone(),
                |mut batch| resolver.resolve_contacts(&mut batch, &mut world, DT),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    {
        let (mut world, contacts) = setup_pile_with_friction(100, 0.5);
        let resolver = ContactResolver::default();
        group.bench_function("coulomb_100", |b| {
            b.iter_batched(
                || contacts.clone(),
                |mut batch| resolver.resolve_contacts(&mut batch, &mut world, DT),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_contact_count,
    bench_stack_depth,
    bench_iterations,
    bench_friction,
);
criterion_main!(benches);
