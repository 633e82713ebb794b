//! Benchmarks for the Levenberg-Marquardt solver
//!
//! A scalar peak fit and a measurement-equation fit of a polar receiver
//! observed through a rotating feed.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jonesfit::algebra::Estimate;
use jonesfit::function::complex2::{polar, Coherency, Rotation1};
use jonesfit::function::scalar::{Gaussian, Polynomial};
use jonesfit::function::{Arena, Function};
use jonesfit::lm::{ScalarReduction, Solver, SolverConfig};
use jonesfit::problem::ScalarFit;
use jonesfit::reception::{simulate, ReceptionModel};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn gaussian_fit() -> ScalarFit {
    let mut arena = Arena::new();
    let x = arena.axis("x");
    let peak = arena.add_scalar(Gaussian, &[x]).unwrap();
    let mut fit = ScalarFit::new(arena, peak, x).unwrap();
    for i in 0..101 {
        let xi = -5.0 + 0.1 * i as f64;
        let yi = 3.0 * (-0.5 * ((xi - 0.5) / 1.5f64).powi(2)).exp();
        fit.add_point(xi, Estimate::new(yi, 1e-4)).unwrap();
    }
    fit
}

/// Returns the model with simulated data and the receiver parameters reset.
fn reception_fit(nsource: usize, nobs: usize) -> ReceptionModel {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut model = ReceptionModel::new();
    let arena = model.arena_mut();
    let ha = arena.axis("ha");
    let receiver = polar(arena).unwrap();
    let rotation = arena.add_complex2(Rotation1::about(2));
    let angle = arena.add_scalar(Polynomial::new(2), &[ha]).unwrap();
    arena.set_param(angle, 1, 1.0).unwrap();
    arena.set_infit(angle, 0, false).unwrap();
    arena.set_infit(angle, 1, false).unwrap();
    let feed = arena.chain(rotation, 0, angle).unwrap();
    let path = arena.product(&[receiver, feed]).unwrap();
    model.add_transformation(path).unwrap();

    let cal = model
        .arena_mut()
        .add_complex2(Coherency::new(jonesfit::Stokes::new(1.0, 0.0, 0.95, 0.0)));
    model.add_input(cal).unwrap();
    for k in 0..4 {
        model.set_infit(k, false).unwrap();
    }
    for _ in 0..nsource {
        let stokes = simulate::random_stokes(0.8, &mut rng) * 10.0;
        let state = model.arena_mut().add_complex2(Coherency::new(stokes));
        model.add_input(state).unwrap();
    }

    let first = 4 * (nsource + 1);
    for (offset, value) in [(0, 1.1), (1, 0.1), (5, -0.1)] {
        model.set_param(first + offset, value).unwrap();
    }
    let inputs: Vec<usize> = (0..=nsource).collect();
    for i in 0..nobs {
        let angle = -1.3 + 2.6 * i as f64 / (nobs - 1) as f64;
        let set = simulate::observe(&mut model, 0, &[(ha, angle)], &inputs, 1e-4, &mut rng).unwrap();
        model.add_data(set).unwrap();
    }
    for (offset, value) in [(0, 1.0), (1, 0.0), (5, 0.0)] {
        model.set_param(first + offset, value).unwrap();
    }
    model
}

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver");

    group.bench_function("gaussian_101", |b| {
        b.iter_batched(
            || {
                let mut fit = gaussian_fit();
                fit.set_param(0, 0.2).unwrap();
                fit
            },
            |mut fit| {
                let mut solver = Solver::new(SolverConfig::default());
                black_box(solver.solve(&mut fit, ScalarReduction).ok())
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.sample_size(10); // Reduce sample size for slow benchmarks
    group.bench_function("reception_8x12", |b| {
        b.iter_batched(
            || reception_fit(8, 12),
            |mut model| {
                let mut solver = Solver::new(SolverConfig::default());
                black_box(model.solve(&mut solver).ok())
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_solver);
criterion_main!(benches);
