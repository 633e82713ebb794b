//! Benchmarks for Gauss-Jordan elimination
//!
//! Inversion cost for the matrix sizes typical of polarimetric calibration:
//! a handful of receiver parameters up to hundreds of source parameters.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jonesfit::linalg::gauss_jordan;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn bench_inversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("gauss_jordan");
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    for n in [7, 37, 101, 273] {
        let a = Array2::from_shape_fn((n, n), |_| rng.gen_range(-10.0..10.0));
        let b = Array2::from_shape_fn((n, 1), |_| rng.gen_range(-10.0..10.0));
        if n > 100 {
            group.sample_size(10); // Reduce sample size for slow benchmarks
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| {
                let mut a = a.clone();
                let mut b = b.clone();
                black_box(gauss_jordan(&mut a, &mut b, None, 0.0, None).ok())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_inversion);
criterion_main!(benches);
