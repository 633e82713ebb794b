//! Synthetic observations of a measurement equation.
//!
//! These helpers generate noisy data from the current parameters of a
//! [`ReceptionModel`], which is how the solver is exercised without real
//! observations: set known parameters, simulate, perturb, fit, and compare.

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::algebra::pauli::stokes;
use crate::algebra::{Estimate, Stokes};
use crate::error::{JonesFitError, Result, ResultExt};
use crate::function::{AxisId, Function};

use super::{CoherencyMeasurement, CoherencyMeasurementSet, ReceptionModel};

fn normal(variance: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, variance.sqrt())
        .map_err(|e| JonesFitError::InvalidState(format!("simulate: variance={} {}", variance, e)))
}

/// Add Gaussian noise of the given variance to each Stokes parameter.
pub fn add_noise(value: &Stokes<f64>, variance: f64, rng: &mut impl Rng) -> Result<Stokes<Estimate<f64>>> {
    let noise = normal(variance)?;
    Ok(value.map(|s| Estimate::new(s + noise.sample(rng), variance)))
}

/// A random Stokes vector of unit intensity and degree of polarization at most `max_polarization`.
pub fn random_stokes(max_polarization: f64, rng: &mut impl Rng) -> Stokes<f64> {
    let unit = Uniform::new_inclusive(-1.0, 1.0);
    let direction = loop {
        let v = [unit.sample(rng), unit.sample(rng), unit.sample(rng)];
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 1e-3 && norm <= 1.0 {
            break v.map(|x| x / norm);
        }
    };
    let p = max_polarization * rng.gen::<f64>();
    Stokes::new(1.0, p * direction[0], p * direction[1], p * direction[2])
}

/// Add Gaussian noise of standard deviation `sigma` to every free parameter.
pub fn perturb<F: Function>(function: &mut F, sigma: f64, rng: &mut impl Rng) -> Result<()> {
    let noise = normal(sigma * sigma)?;
    for index in function.free_indices()? {
        let value = function.param(index)?;
        function.set_param(index, value + noise.sample(rng))?;
    }
    Ok(())
}

/// Observe every input of `inputs` through signal path `transformation`
/// at the given coordinates, with noise of the given variance.
///
/// The returned set is not added to the model.
pub fn observe(
    model: &mut ReceptionModel,
    transformation: usize,
    coordinates: &[(AxisId, f64)],
    inputs: &[usize],
    variance: f64,
    rng: &mut impl Rng,
) -> Result<CoherencyMeasurementSet> {
    let mut set = CoherencyMeasurementSet::new(transformation);
    for &(axis, value) in coordinates {
        set.add_coordinate(axis, value);
    }
    set.set_coordinates(model.arena_mut()).context("simulate::observe")?;
    model.set_transformation_index(transformation)?;

    for &input in inputs {
        model.set_input_index(input)?;
        let value = model.evaluate(None).context("simulate::observe")?;
        let noisy = add_noise(&stokes(&value), variance, rng)?;
        set.push(CoherencyMeasurement::new(input, noisy)?);
    }

    log::debug!(
        "simulate::observe path={} ninput={} variance={}",
        transformation,
        inputs.len(),
        variance
    );
    Ok(set)
}
