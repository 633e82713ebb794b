//! Simulated polarimetric calibration experiment.
//!
//! A randomly generated receiver observes a known, linearly polarized
//! calibrator and several unknown sources. The sources are also rotated by
//! a parallactic angle that follows the hour angle. The receiver and the
//! sources are then recovered for two interchangeable parameterizations of
//! the receiver, first from noise-free data and then from noisy data with
//! the default convergence heuristic.

use jonesfit::algebra::pauli::transform;
use jonesfit::algebra::{jones, Jones, Stokes};
use jonesfit::function::complex2::{polar, Coherency, Constant, Elements, Rotation1};
use jonesfit::function::scalar::Polynomial;
use jonesfit::function::{Arena, AxisId, NodeId};
use jonesfit::lm::{Solver, SolverConfig};
use jonesfit::reception::{simulate, CoherencyMeasurementSet, ReceptionModel};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::test_helpers::{exact_observation, init_logger, jones_distance, real_first_element, stokes_distance};

const DIFFICULTY: f64 = 0.2;
const MAX_POLN: f64 = 0.8;
const INTENSITY: f64 = 10.0;
const ERROR_TOLERANCE: f64 = 2.0;
const VARIANCE: f64 = 1e-4;
const NSTATES: usize = 4;
const NOBS: usize = 12;
const NLOOP: usize = 100;
/// Largest error of a recovered source parameter, in standard deviations
const NOISE_TOLERANCE: f64 = 5.0;

/// Hour angle range in radians (five hours either side of transit)
const HA_MAX: f64 = 5.0 * std::f64::consts::PI / 12.0;

fn calibrator() -> Stokes<f64> {
    Stokes::new(1.0, 0.0, 0.95, 0.0)
}

struct Experiment {
    model: ReceptionModel,
    hour_angle: AxisId,
    receiver: NodeId,
    sources: Vec<NodeId>,
}

const CAL_PATH: usize = 0;
const SRC_PATH: usize = 1;

/// Calibrator (input 0) observed through the receiver; sources (inputs
/// 1..) observed through the receiver and the parallactic rotation.
fn experiment(receiver: impl FnOnce(&mut Arena) -> NodeId, sources: &[Stokes<f64>]) -> Experiment {
    let mut model = ReceptionModel::new();
    let arena = model.arena_mut();
    let hour_angle = arena.axis("hour_angle");
    let receiver = receiver(arena);

    // the parallactic angle equals the hour angle
    let rotation = arena.add_complex2(Rotation1::about(2));
    let angle = arena.add_scalar(Polynomial::new(2), &[hour_angle]).unwrap();
    arena.set_param(angle, 1, 1.0).unwrap();
    arena.set_infit(angle, 0, false).unwrap();
    arena.set_infit(angle, 1, false).unwrap();
    let projection = arena.chain(rotation, 0, angle).unwrap();
    let source_path = arena.product(&[receiver, projection]).unwrap();

    let cal = arena.add_complex2(Coherency::new(calibrator()));
    for k in 0..4 {
        arena.set_infit(cal, k, false).unwrap();
    }
    let sources: Vec<NodeId> = sources
        .iter()
        .map(|s| arena.add_complex2(Coherency::new(*s)))
        .collect();

    model.add_input(cal).unwrap();
    for &source in &sources {
        model.add_input(source).unwrap();
    }
    assert_eq!(model.add_transformation(receiver).unwrap(), CAL_PATH);
    assert_eq!(model.add_transformation(source_path).unwrap(), SRC_PATH);

    Experiment {
        model,
        hour_angle,
        receiver,
        sources,
    }
}

fn random_receiver(rng: &mut ChaCha8Rng) -> Jones {
    let mut arena = Arena::new();
    let receiver = polar(&mut arena).unwrap();
    // gain stays at unity; boost and rotation are random
    for index in 1..7 {
        arena
            .set_param(receiver, index, rng.gen_range(-DIFFICULTY..DIFFICULTY))
            .unwrap();
    }
    arena.evaluate::<Jones>(receiver, None).unwrap()
}

fn hour_angles() -> Vec<f64> {
    let step = 2.0 * HA_MAX / (NOBS - 1) as f64;
    (0..NOBS).map(|i| -HA_MAX + step * i as f64).collect()
}

fn simulate_data(truth: &mut Experiment) -> Vec<CoherencyMeasurementSet> {
    let mut data = vec![exact_observation(&mut truth.model, CAL_PATH, &[], &[0], VARIANCE)];
    let inputs: Vec<usize> = (1..=NSTATES).collect();
    for ha in hour_angles() {
        data.push(exact_observation(
            &mut truth.model,
            SRC_PATH,
            &[(truth.hour_angle, ha)],
            &inputs,
            VARIANCE,
        ));
    }
    data
}

fn simulate_noisy_data(truth: &mut Experiment, rng: &mut ChaCha8Rng) -> Vec<CoherencyMeasurementSet> {
    let mut data = vec![simulate::observe(&mut truth.model, CAL_PATH, &[], &[0], VARIANCE, rng).unwrap()];
    let inputs: Vec<usize> = (1..=NSTATES).collect();
    for ha in hour_angles() {
        let coordinates = [(truth.hour_angle, ha)];
        data.push(simulate::observe(&mut truth.model, SRC_PATH, &coordinates, &inputs, VARIANCE, rng).unwrap());
    }
    data
}

/// First guess of each source: the mean of its de-rotated observations.
fn source_guess(data: &[CoherencyMeasurementSet]) -> Vec<Stokes<f64>> {
    let mut arena = Arena::new();
    let rotation = arena.add_complex2(Rotation1::about(2));
    let mut sum = vec![Stokes::new(0.0, 0.0, 0.0, 0.0); NSTATES];
    let mut count = vec![0.0; NSTATES];

    for set in data.iter().filter(|set| set.transformation_index() == SRC_PATH) {
        let ha = set.coordinates()[0].1;
        arena.set_param(rotation, 0, ha).unwrap();
        let para = arena.evaluate::<Jones>(rotation, None).unwrap();
        for measurement in set.iter() {
            let index = measurement.input_index() - 1;
            let state = transform(&measurement.stokes().values(), &jones::herm(&para));
            sum[index] = sum[index] + state;
            count[index] += 1.0;
        }
    }
    sum.into_iter().zip(count).map(|(s, n)| s * (1.0 / n)).collect()
}

/// Returns true when the receiver and every source are recovered.
fn runtest(receiver: fn(&mut Arena) -> NodeId, fixed_phase: bool, noisy: bool, rng: &mut ChaCha8Rng) -> bool {
    let truth_receiver = random_receiver(rng);
    let sources: Vec<Stokes<f64>> = (0..NSTATES)
        .map(|_| simulate::random_stokes(MAX_POLN, rng) * INTENSITY)
        .collect();

    let mut truth = experiment(|arena| arena.add_complex2(Constant::new(truth_receiver)), &sources);
    let data = if noisy {
        simulate_noisy_data(&mut truth, rng)
    } else {
        simulate_data(&mut truth)
    };

    let guess = source_guess(&data);
    let mut fit = experiment(receiver, &guess);
    for set in data {
        fit.model.add_data(set).unwrap();
    }

    let config = if noisy {
        SolverConfig::default()
    } else {
        SolverConfig::default().with_convergence_chisq(VARIANCE * VARIANCE)
    };
    let mut solver = Solver::new(config);
    if let Err(error) = fit.model.solve(&mut solver) {
        log::warn!("recovery: {}", error);
        return false;
    }
    if noisy {
        return solver.solved() && sources_within_errors(&fit, &sources);
    }

    let limit = ERROR_TOLERANCE * ERROR_TOLERANCE * VARIANCE;

    let expected = if fixed_phase {
        real_first_element(&truth_receiver)
    } else {
        truth_receiver
    };
    let model_receiver = fit.model.arena_mut().evaluate::<Jones>(fit.receiver, None).unwrap();
    let diff = jones_distance(&model_receiver, &expected);
    if diff >= limit * jones::norm(&expected) {
        log::warn!("recovery: receiver norm={} model={} truth={}", diff, model_receiver, expected);
        return false;
    }

    for (istate, (&node, source)) in fit.sources.iter().zip(&sources).enumerate() {
        let arena = fit.model.arena();
        let state = Stokes::new(
            arena.param(node, 0).unwrap(),
            arena.param(node, 1).unwrap(),
            arena.param(node, 2).unwrap(),
            arena.param(node, 3).unwrap(),
        );
        let diff = stokes_distance(&state, source).sqrt();
        if diff > limit * source.norm() {
            log::warn!("recovery: source[{}] model={} input={} norm={}", istate, state, source, diff);
            return false;
        }
    }
    true
}

/// Every fitted source parameter lies within its fitted standard deviation
/// times the tolerance.
fn sources_within_errors(fit: &Experiment, sources: &[Stokes<f64>]) -> bool {
    let arena = fit.model.arena();
    for (istate, (&node, source)) in fit.sources.iter().zip(sources).enumerate() {
        for k in 0..4 {
            let value = arena.param(node, k).unwrap();
            let sigma = arena.variance(node, k).unwrap().sqrt();
            if !((value - source[k]).abs() < NOISE_TOLERANCE * sigma) {
                log::warn!(
                    "recovery: source[{}][{}] model={} input={} sigma={}",
                    istate,
                    k,
                    value,
                    source[k],
                    sigma
                );
                return false;
            }
        }
    }
    true
}

fn failure_count(receiver: fn(&mut Arena) -> NodeId, fixed_phase: bool, noisy: bool, seed: u64) -> usize {
    init_logger();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..NLOOP)
        .filter(|_| !runtest(receiver, fixed_phase, noisy, &mut rng))
        .count()
}

fn polar_receiver(arena: &mut Arena) -> NodeId {
    polar(arena).unwrap()
}

fn elements_receiver(arena: &mut Arena) -> NodeId {
    arena.add_complex2(Elements)
}

#[test]
fn test_polar_decomposition() {
    let nfail = failure_count(polar_receiver, false, false, 1);
    assert!(nfail * 20 <= NLOOP, "{} failures in {} trials", nfail, NLOOP);
}

#[test]
fn test_elements_decomposition() {
    let nfail = failure_count(elements_receiver, true, false, 2);
    assert!(nfail * 20 <= NLOOP, "{} failures in {} trials", nfail, NLOOP);
}

#[test]
fn test_polar_decomposition_noisy() {
    let nfail = failure_count(polar_receiver, false, true, 3);
    assert!(nfail * 20 <= NLOOP, "{} failures in {} trials", nfail, NLOOP);
}

#[test]
fn test_elements_decomposition_noisy() {
    let nfail = failure_count(elements_receiver, true, true, 4);
    assert!(nfail * 20 <= NLOOP, "{} failures in {} trials", nfail, NLOOP);
}
