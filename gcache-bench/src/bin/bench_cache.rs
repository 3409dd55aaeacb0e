//! # Expiring Cache Benchmark Driver
//!
//! Dependency-free benchmark for [`gcache_core::Cache`]: a fixed-seed PRNG
//! workload, keys and values pre-built off the hot path, direct calls
//! against the concrete type rather than through a trait object.

use std::env;
use std::hint::black_box;
use std::time::Instant;

use gcache_core::{ByteView, Cache, CacheOptions, StoreKind};

const DEFAULT_KEY_COUNT: usize = 1 << 14;
const DEFAULT_OP_COUNT: usize = 500_000;
const DEFAULT_VALUE_SIZE: usize = 128;

struct BenchConfig {
    key_count: usize,
    op_count: usize,
    value_size: usize,
    store_kind: StoreKind,
}

impl BenchConfig {
    fn from_args() -> Self {
        let mut args = env::args().skip(1);
        let key_count = parse_usize(args.next(), DEFAULT_KEY_COUNT).max(1);
        let op_count = parse_usize(args.next(), DEFAULT_OP_COUNT);
        let value_size = parse_usize(args.next(), DEFAULT_VALUE_SIZE);
        let store_kind = args
            .next()
            .map(|raw| StoreKind::from(raw.as_str()))
            .unwrap_or(StoreKind::Lru);
        BenchConfig { key_count, op_count, value_size, store_kind }
    }
}

fn parse_usize(value: Option<String>, fallback: usize) -> usize {
    value.and_then(|raw| raw.parse().ok()).unwrap_or(fallback)
}

/// Tiny deterministic PRNG kept dependency-free so the workload is
/// reproducible across runs without pulling in a `rand` dependency.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        XorShift64 { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_index(&mut self, count: usize) -> usize {
        (self.next_u64() as usize) % count
    }
}

fn build_value(size: usize, seed: u64) -> Vec<u8> {
    let mut buffer = vec![0u8; size];
    let bytes = seed.to_le_bytes();
    let copy_len = buffer.len().min(bytes.len());
    buffer[..copy_len].copy_from_slice(&bytes[..copy_len]);
    buffer
}

fn report(label: &str, ops: usize, elapsed: std::time::Duration) {
    let secs = elapsed.as_secs_f64();
    let ops_per_sec = (ops as f64) / secs;
    let nanos_per_op = (secs * 1e9) / (ops as f64);
    println!("{label}: {ops} ops in {secs:.3}s ({ops_per_sec:.0} ops/s, {nanos_per_op:.1} ns/op)");
}

fn main() {
    let config = BenchConfig::from_args();
    let cache = Cache::new(CacheOptions {
        store_kind: config.store_kind,
        max_bytes: 0,
    });

    let keys: Vec<String> = (0..config.key_count).map(|i| format!("key-{i:08}")).collect();
    for (i, key) in keys.iter().enumerate() {
        let value = build_value(config.value_size, i as u64);
        cache.set(key.clone(), ByteView::from_vec(value), None);
    }

    println!(
        "keys={}, ops={}, value_size={}, store={:?}",
        config.key_count, config.op_count, config.value_size, config.store_kind
    );

    let mut rng = XorShift64::new(0x1234_5678_9ABC_DEF0);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_count);
        let value = cache.get(&keys[idx]);
        black_box(value);
    }
    report("GET", config.op_count, start.elapsed());

    let mut rng = XorShift64::new(0x0FED_CBA9_8765_4321);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_count);
        let value = build_value(config.value_size, rng.next_u64());
        cache.set(keys[idx].clone(), ByteView::from_vec(value), None);
    }
    report("SET", config.op_count, start.elapsed());

    let stats = cache.stats();
    println!("hits={}, misses={}, bytes={}", stats.hits, stats.misses, cache.bytes());
}
