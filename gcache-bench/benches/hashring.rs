//! Criterion benchmarks for the consistent-hash ring: ring construction
//! cost as owner count grows, and steady-state `get` lookup cost as
//! virtual-node count grows.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gcache_core::HashRing;

fn owners(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("10.0.0.{i}:7070")).collect()
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashring_add");
    for owner_count in [4usize, 32, 256] {
        let addrs = owners(owner_count);
        group.bench_with_input(
            BenchmarkId::new("replicas_50", owner_count),
            &addrs,
            |b, addrs| {
                b.iter(|| {
                    let mut ring = HashRing::new(50, None);
                    ring.add(addrs.iter());
                    ring
                });
            },
        );
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashring_get");
    for owner_count in [4usize, 32, 256] {
        let mut ring = HashRing::new(50, None);
        ring.add(owners(owner_count));
        group.bench_with_input(
            BenchmarkId::new("replicas_50", owner_count),
            &owner_count,
            |b, _| {
                let mut i = 0usize;
                b.iter(|| {
                    i = i.wrapping_add(1);
                    ring.get(&format!("key-{i}"))
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_add, bench_get);
criterion_main!(benches);
