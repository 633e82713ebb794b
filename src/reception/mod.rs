//! # Measurement equation
//!
//! A [`ReceptionModel`] relates unknown input polarization states to the
//! Stokes vectors observed through one or more signal paths:
//!
//! ```text
//! rho_observed = J rho_input J^H
//! ```
//!
//! where `J` is the Jones matrix of the active signal path (a
//! "transformation") and `rho_input` the coherency matrix of the active
//! input. Inputs and transformations are nodes of one [`Arena`], so leaves
//! shared between paths (a common receiver, for example) are fit once.
//!
//! Observations are grouped into [`CoherencyMeasurementSet`]s that share a
//! signal path and a set of coordinates (e.g. hour angle). The model is a
//! [`Problem`] and is fit with [`ReceptionModel::solve`].

mod measurement;
pub mod simulate;

pub use measurement::{CoherencyMeasurement, CoherencyMeasurementSet};

use crate::algebra::jones::{self, Jones};
use crate::error::{JonesFitError, Result, ResultExt};
use crate::function::{Arena, ChainCovariance, Function, Kind, NodeId, Scope};
use crate::lm::{JonesReduction, Solver};
use crate::problem::{Problem, Residual};

/// Value of the active signal path, and its gradient when one was requested.
#[derive(Debug, Clone)]
struct PathCache {
    index: usize,
    generation: u64,
    value: Jones,
    gradient: Option<Vec<Jones>>,
}

/// The measurement equation.
#[derive(Debug, Default)]
pub struct ReceptionModel {
    arena: Arena,
    inputs: Vec<NodeId>,
    transformations: Vec<NodeId>,
    scope: Scope,
    input_maps: Vec<Vec<usize>>,
    transformation_maps: Vec<Vec<usize>>,
    input_index: usize,
    transformation_index: usize,
    cache: Option<PathCache>,
    data: Vec<CoherencyMeasurementSet>,
}

impl ReceptionModel {
    /// An empty measurement equation with its own arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// A measurement equation over models already built in `arena`.
    pub fn with_arena(arena: Arena) -> Self {
        Self {
            arena,
            ..Self::default()
        }
    }

    /// The arena holding inputs and signal paths.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Mutable access to the arena, for building models.
    ///
    /// Nodes added to the arena are not part of the equation until passed to
    /// [`ReceptionModel::add_input`] or [`ReceptionModel::add_transformation`].
    pub fn arena_mut(&mut self) -> &mut Arena {
        self.cache = None;
        &mut self.arena
    }

    fn check_complex2(&self, id: NodeId, what: &str) -> Result<()> {
        if self.arena.kind(id)? != Kind::Complex2 {
            return Err(JonesFitError::DimensionMismatch(format!(
                "ReceptionModel::{} node {} is not Jones-valued",
                what, id
            )));
        }
        Ok(())
    }

    fn rebuild_scope(&mut self) -> Result<()> {
        let nodes: Vec<NodeId> = self.inputs.iter().chain(&self.transformations).copied().collect();
        let (scope, mut maps) = self.arena.union_scope(&nodes)?;
        self.transformation_maps = maps.split_off(self.inputs.len());
        self.input_maps = maps;
        self.scope = scope;
        self.cache = None;
        Ok(())
    }

    /// Add an unknown input state; returns its index.
    pub fn add_input(&mut self, input: NodeId) -> Result<usize> {
        self.check_complex2(input, "add_input")?;
        self.inputs.push(input);
        self.rebuild_scope()?;
        Ok(self.inputs.len() - 1)
    }

    /// Add a signal path; returns its index.
    pub fn add_transformation(&mut self, path: NodeId) -> Result<usize> {
        self.check_complex2(path, "add_transformation")?;
        self.transformations.push(path);
        self.rebuild_scope()?;
        Ok(self.transformations.len() - 1)
    }

    /// Number of input states.
    pub fn ninput(&self) -> usize {
        self.inputs.len()
    }

    /// Number of signal paths.
    pub fn ntransformation(&self) -> usize {
        self.transformations.len()
    }

    /// Node of input `index`.
    pub fn input(&self, index: usize) -> Result<NodeId> {
        self.inputs.get(index).copied().ok_or_else(|| {
            JonesFitError::InvalidIndex(format!("input index={} >= ninput={}", index, self.inputs.len()))
        })
    }

    /// Node of signal path `index`.
    pub fn transformation(&self, index: usize) -> Result<NodeId> {
        self.transformations.get(index).copied().ok_or_else(|| {
            JonesFitError::InvalidIndex(format!(
                "transformation index={} >= ntransformation={}",
                index,
                self.transformations.len()
            ))
        })
    }

    /// Select the active input state.
    pub fn set_input_index(&mut self, index: usize) -> Result<()> {
        self.input(index)?;
        self.input_index = index;
        Ok(())
    }

    /// Index of the active input state.
    pub fn input_index(&self) -> usize {
        self.input_index
    }

    /// Select the active signal path.
    pub fn set_transformation_index(&mut self, index: usize) -> Result<()> {
        self.transformation(index)?;
        self.transformation_index = index;
        Ok(())
    }

    /// Index of the active signal path.
    pub fn transformation_index(&self) -> usize {
        self.transformation_index
    }

    /// Add a set of observations.
    ///
    /// # Errors
    ///
    /// * `JonesFitError::InvalidIndex` if the signal path, an input or an axis does not exist
    pub fn add_data(&mut self, data: CoherencyMeasurementSet) -> Result<()> {
        self.transformation(data.transformation_index())
            .context("ReceptionModel::add_data")?;
        for measurement in data.iter() {
            self.input(measurement.input_index())
                .context("ReceptionModel::add_data")?;
        }
        for &(axis, _) in data.coordinates() {
            self.arena.abscissa(axis).context("ReceptionModel::add_data")?;
        }
        self.data.push(data);
        Ok(())
    }

    /// The observations.
    pub fn data(&self) -> &[CoherencyMeasurementSet] {
        &self.data
    }

    /// Remove all observations.
    pub fn clear_data(&mut self) {
        self.data.clear();
    }

    /// Number of measurements across all sets.
    pub fn nmeasurement(&self) -> usize {
        self.data.iter().map(|set| set.len()).sum()
    }

    /// The union scope that indexes the parameters of the equation.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    fn resolve(&self, index: usize) -> Result<(NodeId, usize)> {
        self.scope.resolve(index).ok_or_else(|| {
            JonesFitError::InvalidParameter(format!(
                "ReceptionModel index={} >= nparam={}",
                index,
                self.scope.nparam()
            ))
        })
    }

    fn evaluate_path(&mut self, want_gradient: bool) -> Result<Jones> {
        let index = self.transformation_index;
        let generation = self.arena.generation();
        if let Some(cache) = &self.cache {
            if cache.index == index
                && cache.generation == generation
                && (cache.gradient.is_some() || !want_gradient)
            {
                return Ok(cache.value);
            }
        }

        let path = self.transformation(index)?;
        let (value, gradient) = if want_gradient {
            let mut gradient = Vec::new();
            let value = self.arena.evaluate::<Jones>(path, Some(&mut gradient))?;
            (value, Some(gradient))
        } else {
            (self.arena.evaluate::<Jones>(path, None)?, None)
        };
        log::trace!(
            "ReceptionModel path={} generation={} gradient={} evaluated",
            index,
            generation,
            want_gradient
        );

        self.cache = Some(PathCache {
            index,
            generation,
            value,
            gradient,
        });
        Ok(value)
    }

    /// Fit the equation to its data.
    pub fn solve(&mut self, solver: &mut Solver) -> Result<()> {
        solver.solve(self, JonesReduction).context("ReceptionModel::solve")
    }

    /// Covariance of a chain-constrained parameter with every parameter of
    /// the equation, given the fitted covariance of the equation.
    pub fn constraint_covariance(
        &mut self,
        chain: NodeId,
        covariance: &ndarray::Array2<f64>,
    ) -> Result<ChainCovariance> {
        let scope = self.scope.clone();
        self.arena
            .chain_covariance_in(chain, &scope, covariance)
            .context("ReceptionModel::constraint_covariance")
    }
}

impl Function for ReceptionModel {
    type Output = Jones;

    /// `J rho J^H` for the active path and input.
    fn evaluate(&mut self, gradient: Option<&mut Vec<Jones>>) -> Result<Jones> {
        let input = self.input(self.input_index)?;
        let want_gradient = gradient.is_some();
        let j = self.evaluate_path(want_gradient)?;

        let mut input_gradient = Vec::new();
        let rho = if want_gradient {
            self.arena.evaluate::<Jones>(input, Some(&mut input_gradient))?
        } else {
            self.arena.evaluate::<Jones>(input, None)?
        };

        let j_herm = jones::herm(&j);
        let result = j * rho * j_herm;

        if let Some(gradient) = gradient {
            let path_gradient = self
                .cache
                .as_ref()
                .and_then(|cache| cache.gradient.as_deref())
                .ok_or_else(|| JonesFitError::InvalidState("ReceptionModel: path gradient not cached".to_string()))?;

            gradient.clear();
            gradient.resize(self.scope.nparam(), jones::zero());

            let path_map = &self.transformation_maps[self.transformation_index];
            for (dj, &index) in path_gradient.iter().zip(path_map) {
                // d(J rho J^H) = dJ rho J^H + J rho dJ^H
                let partial = dj * rho * j_herm;
                gradient[index] += partial + jones::herm(&partial);
            }

            let input_map = &self.input_maps[self.input_index];
            for (drho, &index) in input_gradient.iter().zip(input_map) {
                gradient[index] += j * drho * j_herm;
            }
        }

        Ok(result)
    }

    fn nparam(&self) -> usize {
        self.scope.nparam()
    }

    fn param(&self, index: usize) -> Result<f64> {
        let (leaf, local) = self.resolve(index)?;
        self.arena.param(leaf, local)
    }

    fn set_param(&mut self, index: usize, value: f64) -> Result<()> {
        let (leaf, local) = self.resolve(index)?;
        self.arena.set_param(leaf, local, value)
    }

    fn infit(&self, index: usize) -> Result<bool> {
        let (leaf, local) = self.resolve(index)?;
        self.arena.infit(leaf, local)
    }

    fn set_infit(&mut self, index: usize, infit: bool) -> Result<()> {
        let (leaf, local) = self.resolve(index)?;
        self.arena.set_infit(leaf, local, infit)
    }

    fn variance(&self, index: usize) -> Result<f64> {
        let (leaf, local) = self.resolve(index)?;
        self.arena.variance(leaf, local)
    }

    fn set_variance(&mut self, index: usize, variance: f64) -> Result<()> {
        let (leaf, local) = self.resolve(index)?;
        self.arena.set_variance(leaf, local, variance)
    }

    fn param_name(&self, index: usize) -> Result<String> {
        let (leaf, local) = self.resolve(index)?;
        self.arena.param_name(leaf, local)
    }
}

impl Problem for ReceptionModel {
    /// Four Stokes parameters per measurement.
    fn ndat_constraint(&self) -> usize {
        4 * self.nmeasurement()
    }

    fn for_each_residual(&mut self, visit: &mut dyn FnMut(Residual<'_, Jones>) -> Result<()>) -> Result<()> {
        let mut gradient = Vec::new();
        for iset in 0..self.data.len() {
            let path = self.data[iset].transformation_index();
            self.data[iset]
                .set_coordinates(&mut self.arena)
                .with_context(|| format!("ReceptionModel set={}", iset))?;
            self.set_transformation_index(path)?;

            for imeas in 0..self.data[iset].len() {
                let measurement = &self.data[iset].measurements()[imeas];
                let input = measurement.input_index();
                let observed = measurement.coherency();
                let uncertainty = *measurement.uncertainty();

                self.set_input_index(input)?;
                let model = self
                    .evaluate(Some(&mut gradient))
                    .with_context(|| format!("ReceptionModel set={} measurement={}", iset, imeas))?;

                log::trace!(
                    "ReceptionModel set={} input={} data={} model={}",
                    iset,
                    input,
                    observed,
                    model
                );

                visit(Residual {
                    delta: observed - model,
                    gradient: &gradient,
                    weighting: &uncertainty,
                })
                .with_context(|| format!("ReceptionModel set={} measurement={}", iset, imeas))?;
            }
        }
        Ok(())
    }
}
