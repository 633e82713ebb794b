//! End-to-end fits: scalar data with noise, batches of independent
//! measurement equations, and the reports written afterwards.

use jonesfit::algebra::{Estimate, Stokes};
use jonesfit::function::complex2::{polar, Coherency};
use jonesfit::function::scalar::Gaussian;
use jonesfit::function::{Arena, Function};
use jonesfit::lm::{fit_batch, parameter_change_condition, JonesReduction, ScalarReduction, Solver, SolverConfig};
use jonesfit::problem::ScalarFit;
use jonesfit::reception::ReceptionModel;
use jonesfit::report::{CovarianceReport, ModelParametersReport, Report, SolverReport};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::test_helpers::{approx_eq, exact_observation, init_logger};

const VARIANCE: f64 = 1e-4;

/// Receiver of frequency channel `k`: gain, boost along Q, rotation about V.
fn channel_truth(k: usize) -> [(usize, f64); 3] {
    let k = k as f64;
    [(16, 1.0 + 0.01 * k), (17, 0.02 * k), (22, -0.03 * k)]
}

/// A polar receiver observing four known states; data from `channel_truth(k)`.
fn channel(k: usize) -> ReceptionModel {
    let mut model = ReceptionModel::new();
    let receiver = polar(model.arena_mut()).unwrap();
    model.add_transformation(receiver).unwrap();
    for stokes in [
        Stokes::new(1.0, 0.0, 0.0, 0.0),
        Stokes::new(1.0, 0.9, 0.0, 0.0),
        Stokes::new(1.0, 0.0, 0.9, 0.0),
        Stokes::new(1.0, 0.0, 0.0, 0.9),
    ] {
        let state = model.arena_mut().add_complex2(Coherency::new(stokes));
        model.add_input(state).unwrap();
    }
    for index in 0..16 {
        model.set_infit(index, false).unwrap();
    }

    for (index, value) in channel_truth(k) {
        model.set_param(index, value).unwrap();
    }
    let set = exact_observation(&mut model, 0, &[], &[0, 1, 2, 3], VARIANCE);
    model.add_data(set).unwrap();
    for (index, _) in channel_truth(k) {
        let start = if index == 16 { 1.0 } else { 0.0 };
        model.set_param(index, start).unwrap();
    }
    model
}

#[test]
fn test_channel_batch() {
    init_logger();
    let mut channels: Vec<ReceptionModel> = (0..6).map(channel).collect();
    let config = SolverConfig::default().with_convergence_chisq(VARIANCE * VARIANCE);
    let results = fit_batch(&mut channels, &config, JonesReduction);

    assert_eq!(results.len(), 6);
    for (k, (result, model)) in results.iter().zip(&channels).enumerate() {
        let summary = result.as_ref().unwrap();
        assert!(summary.solved, "channel {}: {}", k, summary);
        assert_eq!(summary.nfree, 16 - 7);
        assert_eq!(summary.parameters.len(), 7);
        for (index, value) in channel_truth(k) {
            let fitted = model.param(index).unwrap();
            assert!(approx_eq(fitted, value, 1e-5), "channel {} param {}={} != {}", k, index, fitted, value);
        }
    }

    let text = ModelParametersReport::new(&channels[3]).to_report_string().unwrap();
    assert!(text.contains("7 unique free parameters"));
    assert!(text.contains("signal path 0 = Gain*Boost*Rotation with 7 parameters"));
}

#[test]
fn test_noisy_gaussian_fit() {
    init_logger();
    let (centre, width, height) = (0.5, 1.5, 3.0);
    let sigma = 0.05;
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let noise = Normal::new(0.0, sigma).unwrap();

    let mut arena = Arena::new();
    let x = arena.axis("x");
    let peak = arena.add_scalar(Gaussian, &[x]).unwrap();
    let mut fit = ScalarFit::new(arena, peak, x).unwrap();
    for i in 0..41 {
        let xi = -4.0 + 0.2 * i as f64;
        let yi = height * (-0.5 * ((xi - centre) / width).powi(2)).exp() + noise.sample(&mut rng);
        fit.add_point(xi, Estimate::new(yi, sigma * sigma)).unwrap();
    }
    fit.set_param(0, 0.2).unwrap();
    fit.set_param(1, 1.2).unwrap();
    fit.set_param(2, 2.5).unwrap();

    let mut solver = Solver::new(SolverConfig::default());
    solver.add_convergence_condition(parameter_change_condition(1e-4));
    solver.solve(&mut fit, ScalarReduction).unwrap();
    assert!(solver.solved());

    let summary = solver.summary();
    let reduced = summary.reduced_chisq();
    assert!(reduced > 0.4 && reduced < 1.8, "reduced chisq={}", reduced);

    for (index, truth) in [(0, centre), (1, width), (2, height)] {
        let error = (fit.param(index).unwrap() - truth) / fit.variance(index).unwrap().sqrt();
        assert!(error.abs() < 5.0, "param {} is {} sigma from the truth", index, error);
    }

    // three free parameters give three correlated pairs
    let text = CovarianceReport::new(&fit, solver.covariance())
        .to_report_string()
        .unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().next().unwrap().starts_with("centre width "));

    let text = SolverReport::new(&solver).to_report_string().unwrap();
    assert!(text.contains("nfree: 38"));
    assert!(text.contains("nullspace dimension: 0"));

    let json = serde_json::to_string(&summary).unwrap();
    assert!(json.contains("\"nfree\":38"));
}
