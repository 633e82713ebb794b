//! Observed coherency vectors and the sets they are grouped into.

use serde::{Deserialize, Serialize};

use crate::algebra::pauli::coherency;
use crate::algebra::{Estimate, Jones, Stokes};
use crate::error::{JonesFitError, Result, ResultExt};
use crate::function::{Arena, AxisId};
use crate::uncertainty::ObservationUncertainty;

/// One observed Stokes vector of a known input state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherencyMeasurement {
    input_index: usize,
    stokes: Stokes<Estimate<f64>>,
    uncertainty: ObservationUncertainty,
}

impl CoherencyMeasurement {
    /// A measurement of input `input_index` with the given Stokes estimates.
    ///
    /// # Errors
    ///
    /// * `JonesFitError::InvalidState` if a value is not finite or a variance
    ///   does not have a finite inverse
    pub fn new(input_index: usize, stokes: Stokes<Estimate<f64>>) -> Result<Self> {
        if !stokes.values().is_finite() {
            return Err(JonesFitError::InvalidState(format!(
                "CoherencyMeasurement::new non-finite stokes={}",
                stokes.values()
            )));
        }
        let uncertainty =
            ObservationUncertainty::from_variance(&stokes.variances()).context("CoherencyMeasurement::new")?;
        Ok(Self {
            input_index,
            stokes,
            uncertainty,
        })
    }

    /// Index of the input state that was observed.
    pub fn input_index(&self) -> usize {
        self.input_index
    }

    /// The observed Stokes parameters and their variances.
    pub fn stokes(&self) -> &Stokes<Estimate<f64>> {
        &self.stokes
    }

    /// The observed coherency matrix.
    pub fn coherency(&self) -> Jones {
        coherency(&self.stokes.values())
    }

    /// Weights of the residual.
    pub fn uncertainty(&self) -> &ObservationUncertainty {
        &self.uncertainty
    }

    /// Replace the weights, e.g. with complex variances.
    pub fn set_uncertainty(&mut self, uncertainty: ObservationUncertainty) {
        self.uncertainty = uncertainty;
    }
}

/// Measurements observed through one signal path at one set of coordinates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoherencyMeasurementSet {
    transformation_index: usize,
    coordinates: Vec<(AxisId, f64)>,
    measurements: Vec<CoherencyMeasurement>,
}

impl CoherencyMeasurementSet {
    /// An empty set observed through signal path `transformation_index`.
    pub fn new(transformation_index: usize) -> Self {
        Self {
            transformation_index,
            ..Self::default()
        }
    }

    /// Index of the signal path.
    pub fn transformation_index(&self) -> usize {
        self.transformation_index
    }

    /// Set the value of an independent variable shared by the set.
    pub fn add_coordinate(&mut self, axis: AxisId, value: f64) {
        match self.coordinates.iter_mut().find(|(a, _)| *a == axis) {
            Some(coordinate) => coordinate.1 = value,
            None => self.coordinates.push((axis, value)),
        }
    }

    /// The independent variables of the set.
    pub fn coordinates(&self) -> &[(AxisId, f64)] {
        &self.coordinates
    }

    /// Write the coordinates into the arena.
    pub fn set_coordinates(&self, arena: &mut Arena) -> Result<()> {
        for &(axis, value) in &self.coordinates {
            arena.set_abscissa(axis, value)?;
        }
        Ok(())
    }

    /// Add a measurement.
    pub fn push(&mut self, measurement: CoherencyMeasurement) {
        self.measurements.push(measurement);
    }

    /// Number of measurements.
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// True when the set holds no measurements.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// The measurements.
    pub fn measurements(&self) -> &[CoherencyMeasurement] {
        &self.measurements
    }

    /// Iterate over the measurements.
    pub fn iter(&self) -> std::slice::Iter<'_, CoherencyMeasurement> {
        self.measurements.iter()
    }
}
