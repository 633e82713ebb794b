//! Composed models: text specifications, repeated evaluation, and
//! propagation of a fitted covariance onto a chain-constrained parameter.

use approx::assert_relative_eq;
use jonesfit::algebra::{jones, Jones, Stokes};
use jonesfit::function::complex2::{Boost1, Coherency, Gain, Rotation1};
use jonesfit::function::{Arena, Function, NodeId};
use jonesfit::reception::ReceptionModel;
use jonesfit::registry::FunctionRegistry;
use ndarray::Array2;

#[test]
fn test_parsed_model_matches_built_model() {
    let registry = FunctionRegistry::with_builtins();
    let mut arena = Arena::new();
    let parsed = registry
        .parse("Gain(gain=1.5) * Boost1(axis=0, beta=0.2) * Rotation1(axis=2, phi=0.3)", &mut arena)
        .unwrap();

    let gain = arena.add_complex2(Gain);
    arena.set_param(gain, 0, 1.5).unwrap();
    let boost = arena.add_complex2(Boost1::about(0));
    arena.set_param(boost, 0, 0.2).unwrap();
    let rotation = arena.add_complex2(Rotation1::about(2));
    arena.set_param(rotation, 0, 0.3).unwrap();
    let built = arena.product(&[gain, boost, rotation]).unwrap();

    assert_eq!(arena.describe(parsed).unwrap(), arena.describe(built).unwrap());
    assert_eq!(arena.nparam(parsed).unwrap(), 3);

    let mut parsed_gradient = Vec::new();
    let a = arena.evaluate::<Jones>(parsed, Some(&mut parsed_gradient)).unwrap();
    let mut built_gradient = Vec::new();
    let b = arena.evaluate::<Jones>(built, Some(&mut built_gradient)).unwrap();
    assert!(jones::norm(&(a - b)) < 1e-24);
    for (x, y) in parsed_gradient.iter().zip(&built_gradient) {
        assert!(jones::norm(&(x - y)) < 1e-24);
    }
}

#[test]
fn test_parse_errors() {
    let registry = FunctionRegistry::with_builtins();
    let mut arena = Arena::new();
    assert!(registry.parse("Gain * Unknown", &mut arena).is_err());
    assert!(registry.parse("Gain(nothing=1)", &mut arena).is_err());
    assert!(registry.parse("Gain(gain=abc)", &mut arena).is_err());
    assert!(registry.parse("Gain *", &mut arena).is_err());
}

struct Fixture {
    model: ReceptionModel,
    chain: NodeId,
}

/// Receiver parsed from text; sources rotated by a parsed polynomial in hour angle.
fn fixture() -> Fixture {
    let registry = FunctionRegistry::with_builtins();
    let mut model = ReceptionModel::new();
    let arena = model.arena_mut();
    let receiver = registry
        .parse("Gain(gain=1.1) * Boost(b_1=0.1, b_3=-0.05) * Rotation(r_2=0.2)", arena)
        .unwrap();
    let rotation = arena.add_complex2(Rotation1::about(2));
    let angle = registry.parse("Polynomial(ncoef=2, c_1=0.8, arg=ha)", arena).unwrap();
    let chain = arena.chain(rotation, 0, angle).unwrap();
    let source_path = arena.product(&[receiver, chain]).unwrap();
    let calibrator = arena.add_complex2(Coherency::new(Stokes::new(1.0, 0.0, 0.9, 0.0)));
    let source = arena.add_complex2(Coherency::new(Stokes::new(2.0, 0.3, -0.4, 0.1)));

    model.add_input(calibrator).unwrap();
    model.add_input(source).unwrap();
    model.add_transformation(receiver).unwrap();
    model.add_transformation(source_path).unwrap();
    Fixture { model, chain }
}

fn evaluate(model: &mut ReceptionModel, path: usize, input: usize) -> (Jones, Vec<Jones>) {
    model.set_transformation_index(path).unwrap();
    model.set_input_index(input).unwrap();
    let mut gradient = Vec::new();
    let value = model.evaluate(Some(&mut gradient)).unwrap();
    (value, gradient)
}

#[test]
fn test_repeated_evaluation_is_idempotent() {
    let mut fixture = fixture();
    let model = &mut fixture.model;
    let ha = model.arena().find_axis("ha").unwrap();
    model.arena_mut().set_abscissa(ha, 0.3).unwrap();

    let (value, gradient) = evaluate(model, 1, 1);
    assert_eq!(gradient.len(), model.nparam());

    // interleave other paths and inputs
    evaluate(model, 0, 0);
    evaluate(model, 1, 0);
    assert_eq!(evaluate(model, 1, 1), (value, gradient.clone()));

    // change and restore a parameter of the shared receiver
    let index = 8;
    let original = model.param(index).unwrap();
    model.set_param(index, original + 0.01).unwrap();
    assert_ne!(evaluate(model, 1, 1).0, value);
    model.set_param(index, original).unwrap();
    assert_eq!(evaluate(model, 1, 1), (value, gradient.clone()));

    // change and restore the abscissa
    model.arena_mut().set_abscissa(ha, -0.2).unwrap();
    assert_ne!(evaluate(model, 1, 1).0, value);
    model.arena_mut().set_abscissa(ha, 0.3).unwrap();
    assert_eq!(evaluate(model, 1, 1), (value, gradient));
}

#[test]
fn test_chain_covariance_propagation() {
    let mut fixture = fixture();
    let model = &mut fixture.model;
    let ha = model.arena().find_axis("ha").unwrap();
    model.arena_mut().set_abscissa(ha, 0.5).unwrap();

    // inputs (8), receiver (7), rotation (1), then the polynomial coefficients
    let nparam = model.nparam();
    assert_eq!(nparam, 18);
    let (c0, c1) = (16, 17);
    assert_eq!(model.param_name(c0).unwrap(), "c_0");
    assert!(!model.infit(15).unwrap());

    let mut covariance = Array2::<f64>::zeros((nparam, nparam));
    for i in 0..nparam {
        covariance[[i, i]] = 0.01 * (i + 1) as f64;
    }
    covariance[[c0, c1]] = 0.02;
    covariance[[c1, c0]] = 0.02;
    covariance[[c0, 3]] = 0.005;
    covariance[[3, c0]] = 0.005;

    let result = model.constraint_covariance(fixture.chain, &covariance).unwrap();
    assert_eq!(result.row.len(), nparam);
    // d(phi)/d(c_0) = 1, d(phi)/d(c_1) = ha
    assert_relative_eq!(result.row[3], 0.005, epsilon = 1e-15);
    assert_relative_eq!(result.row[c0], covariance[[c0, c0]] + 0.5 * 0.02, epsilon = 1e-15);
    assert_relative_eq!(result.row[c1], 0.02 + 0.5 * covariance[[c1, c1]], epsilon = 1e-15);
    assert_relative_eq!(
        result.variance,
        covariance[[c0, c0]] + 2.0 * 0.5 * 0.02 + 0.25 * covariance[[c1, c1]],
        epsilon = 1e-15
    );
    assert_eq!(result.row[0], 0.0);

    assert!(model.constraint_covariance(fixture.chain, &Array2::zeros((3, 3))).is_err());
}
