//! Detection of parameters that the data cannot constrain.

use jonesfit::algebra::Stokes;
use jonesfit::function::complex2::{Coherency, Elements, Gain};
use jonesfit::function::{Function, NodeId};
use jonesfit::lm::{eigenanalysis, FitStatus, JonesReduction, LevenbergMarquardt, Solver, SolverConfig};
use jonesfit::reception::ReceptionModel;

use crate::test_helpers::{exact_observation, init_logger};

const VARIANCE: f64 = 1e-4;

/// An elementwise receiver observing `inputs` known states once.
fn elements_model(inputs: &[Stokes<f64>]) -> ReceptionModel {
    let mut model = ReceptionModel::new();
    let arena = model.arena_mut();
    let receiver = arena.add_complex2(Elements);
    let states: Vec<NodeId> = inputs.iter().map(|s| arena.add_complex2(Coherency::new(*s))).collect();
    for &state in &states {
        for k in 0..4 {
            arena.set_infit(state, k, false).unwrap();
        }
    }
    model.add_transformation(receiver).unwrap();
    for state in states {
        model.add_input(state).unwrap();
    }

    // data generated by a receiver slightly different from the first guess
    let nparam = model.nparam();
    model.set_param(nparam - 6, 0.05).unwrap();
    model.set_param(nparam - 1, -0.03).unwrap();
    let all: Vec<usize> = (0..inputs.len()).collect();
    let set = exact_observation(&mut model, 0, &[], &all, VARIANCE);
    model.add_data(set).unwrap();
    model.set_param(nparam - 6, 0.0).unwrap();
    model.set_param(nparam - 1, 0.0).unwrap();
    model
}

fn config() -> SolverConfig {
    // pivots below this are rounding residue of an exactly rank-deficient curvature
    SolverConfig::default().with_singular_threshold(1e-6)
}

#[test]
fn test_rank_deficient_measurements() {
    init_logger();
    // four constraints on seven unknowns
    let mut model = elements_model(&[Stokes::new(1.0, 0.0, 0.0, 0.0)]);
    let mut solver = Solver::new(config());
    let err = model.solve(&mut solver).unwrap_err();
    assert!(err.is_singular(), "{}", err);
    assert!(solver.singular());
    assert!(!solver.solved());
    assert_eq!(err.trace()[0], "ReceptionModel::solve");
}

#[test]
fn test_sufficient_measurements() {
    init_logger();
    let mut model = elements_model(&[
        Stokes::new(1.0, 0.0, 0.0, 0.0),
        Stokes::new(1.0, 0.9, 0.0, 0.0),
        Stokes::new(1.0, 0.0, 0.9, 0.0),
        Stokes::new(1.0, 0.0, 0.0, 0.9),
    ]);
    let mut solver = Solver::new(config().with_convergence_chisq(VARIANCE * VARIANCE));
    model.solve(&mut solver).unwrap();
    assert!(solver.solved());
    assert!(!solver.singular());
    assert_eq!(solver.nfree(), 16 - 7);
    let nparam = model.nparam();
    assert!((model.param(nparam - 6).unwrap() - 0.05).abs() < 1e-5);
    assert!((model.param(nparam - 1).unwrap() + 0.03).abs() < 1e-5);
}

/// Two gains in series observing a source of known intensity: only their
/// product is constrained.
fn redundant_gains() -> ReceptionModel {
    let mut model = ReceptionModel::new();
    let arena = model.arena_mut();
    let first = arena.add_complex2(Gain);
    let second = arena.add_complex2(Gain);
    let path = arena.product(&[first, second]).unwrap();
    let state = arena.add_complex2(Coherency::default());
    arena.set_infit(state, 0, false).unwrap();
    model.add_input(state).unwrap();
    model.add_transformation(path).unwrap();

    let set = exact_observation(&mut model, 0, &[], &[0], VARIANCE);
    model.add_data(set).unwrap();
    model
}

#[test]
fn test_redundant_parameters() {
    init_logger();
    let mut model = redundant_gains();
    let mut engine = LevenbergMarquardt::new(JonesReduction, &SolverConfig::default());
    engine.init(&mut model).unwrap();

    // Q, U and V form a plateau; the difference of the gains has no curvature
    let analysis = eigenanalysis(engine.curvature(), engine.names()).unwrap();
    assert_eq!(analysis.eigenvalues.len(), 5);
    assert_eq!(analysis.ndim_nullspace, 1);

    let direction = &analysis.nullspace[0];
    let names: Vec<&str> = direction.components.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["gain", "gain"]);
    let (a, b) = (direction.components[0].1, direction.components[1].1);
    assert!((a + b).abs() < 1e-8);
    assert!((a.abs() - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-8);

    // fixing one gain removes the degeneracy
    model.set_infit(5, false).unwrap();
    engine.init(&mut model).unwrap();
    let analysis = eigenanalysis(engine.curvature(), engine.names()).unwrap();
    assert_eq!(analysis.eigenvalues.len(), 4);
    assert_eq!(analysis.ndim_nullspace, 0);
}

#[test]
fn test_redundant_parameters_solve() {
    init_logger();
    let mut model = redundant_gains();
    let mut solver = Solver::new(SolverConfig::default());

    // a degenerate curvature is singular or yields a fit, never a parameter error
    match model.solve(&mut solver) {
        Ok(()) => assert!(!solver.singular()),
        Err(err) => {
            assert!(err.is_singular(), "unexpected error: {}", err);
            assert!(solver.singular());
            assert_eq!(solver.status(), FitStatus::Singular);
            assert!(!solver.solved());
        }
    }

    let analysis = solver.eigenanalysis().unwrap();
    assert_eq!(analysis.eigenvalues.len(), 5);
    assert!(analysis.ndim_nullspace >= 1);
    let direction = &analysis.nullspace[0];
    let names: Vec<&str> = direction.components.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["gain", "gain"]);
    assert_eq!(solver.curvature().dim(), (5, 5));
}
