use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use core_compute::{sort_by_key_bitonic, sort_by_key_radix, ComputeParams};

fn keys(n: usize) -> Vec<u32> {
    // Deterministic pseudo-random keys; xorshift keeps the bench dependency-free.
    let mut state = 0x9e3779b9u32;
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        })
        .collect()
}

fn bench_sort_by_key(c: &mut Criterion) {
    let params = ComputeParams::default();
    let mut group = c.benchmark_group("sort_by_key");
    for n in [1 << 10, 1 << 15, 1 << 18] {
        group.bench_with_input(BenchmarkId::new("radix", n), &n, |b, &n| {
            let base_keys = keys(n);
            let base_vals = vec![0u8; n * 4];
            b.iter(|| {
                let mut k = base_keys.clone();
                let mut v = base_vals.clone();
                sort_by_key_radix(&mut k, &mut v, 4, &params, u32::MAX);
                k
            });
        });
        if n <= 1 << 15 {
            group.bench_with_input(BenchmarkId::new("bitonic", n), &n, |b, &n| {
                let base_keys = keys(n);
                let base_vals = vec![0u8; n * 4];
                b.iter(|| {
                    let mut k = base_keys.clone();
                    let mut v = base_vals.clone();
                    sort_by_key_bitonic(&mut k, &mut v, 4);
                    k
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_sort_by_key);
criterion_main!(benches);
