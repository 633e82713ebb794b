//! Problem definition trait and implementations.
//!
//! A [`Problem`] is a parameterized function together with the data it is
//! fit to. The solver never sees the data directly: it asks the problem to
//! visit every residual, each with the model gradient and the weighting
//! policy of its observation, and accumulates the normal equations from
//! those.

use crate::algebra::Estimate;
use crate::error::{JonesFitError, Result, ResultExt};
use crate::function::{Arena, AxisId, Function, Kind, NodeId};
use crate::uncertainty::{InverseVariance, WeightingScheme};

/// One weighted residual of a problem.
pub struct Residual<'a, E> {
    /// Observed minus model
    pub delta: E,
    /// Model gradient, one element per parameter of the problem
    pub gradient: &'a [E],
    /// Weighting policy of the observation
    pub weighting: &'a dyn WeightingScheme<E>,
}

/// A nonlinear least-squares problem.
pub trait Problem: Function {
    /// Number of independent real constraints provided by the data.
    fn ndat_constraint(&self) -> usize;

    /// Evaluate the model for every observation at the current parameters
    /// and pass each residual to `visit`.
    fn for_each_residual(
        &mut self,
        visit: &mut dyn FnMut(Residual<'_, Self::Output>) -> Result<()>,
    ) -> Result<()>;
}

/// A scalar arena function of one abscissa fit to `(x, y +/- sigma)` data.
#[derive(Debug)]
pub struct ScalarFit {
    arena: Arena,
    function: NodeId,
    axis: AxisId,
    data: Vec<(f64, Estimate<f64>)>,
}

impl ScalarFit {
    /// Fit `function` in `arena` as a function of `axis`.
    pub fn new(arena: Arena, function: NodeId, axis: AxisId) -> Result<Self> {
        if arena.kind(function)? != Kind::Scalar {
            return Err(JonesFitError::DimensionMismatch(format!(
                "ScalarFit: node {} is not scalar-valued",
                function
            )));
        }
        arena.abscissa(axis)?;
        Ok(Self {
            arena,
            function,
            axis,
            data: Vec::new(),
        })
    }

    /// Add an observation `y` at abscissa `x`.
    pub fn add_point(&mut self, x: f64, y: Estimate<f64>) -> Result<()> {
        if !x.is_finite() || !y.val.is_finite() {
            return Err(JonesFitError::InvalidState(format!("ScalarFit::add_point x={} y={}", x, y)));
        }
        InverseVariance::new(y.var).context("ScalarFit::add_point")?;
        self.data.push((x, y));
        Ok(())
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when there are no observations.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The arena holding the model.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// The fitted node.
    pub fn function(&self) -> NodeId {
        self.function
    }
}

impl Function for ScalarFit {
    type Output = f64;

    fn evaluate(&mut self, gradient: Option<&mut Vec<f64>>) -> Result<f64> {
        self.arena.evaluate(self.function, gradient)
    }

    fn nparam(&self) -> usize {
        self.arena.nparam(self.function).unwrap_or(0)
    }

    fn param(&self, index: usize) -> Result<f64> {
        self.arena.param(self.function, index)
    }

    fn set_param(&mut self, index: usize, value: f64) -> Result<()> {
        self.arena.set_param(self.function, index, value)
    }

    fn infit(&self, index: usize) -> Result<bool> {
        self.arena.infit(self.function, index)
    }

    fn set_infit(&mut self, index: usize, infit: bool) -> Result<()> {
        self.arena.set_infit(self.function, index, infit)
    }

    fn variance(&self, index: usize) -> Result<f64> {
        self.arena.variance(self.function, index)
    }

    fn set_variance(&mut self, index: usize, variance: f64) -> Result<()> {
        self.arena.set_variance(self.function, index, variance)
    }

    fn param_name(&self, index: usize) -> Result<String> {
        self.arena.param_name(self.function, index)
    }
}

impl Problem for ScalarFit {
    fn ndat_constraint(&self) -> usize {
        self.data.len()
    }

    fn for_each_residual(&mut self, visit: &mut dyn FnMut(Residual<'_, f64>) -> Result<()>) -> Result<()> {
        let mut gradient = Vec::new();
        for (index, (x, y)) in self.data.iter().enumerate() {
            self.arena.set_abscissa(self.axis, *x)?;
            let model = self
                .arena
                .evaluate::<f64>(self.function, Some(&mut gradient))
                .with_context(|| format!("ScalarFit point={}", index))?;
            let weighting = InverseVariance::new(y.var)?;
            visit(Residual {
                delta: y.val - model,
                gradient: &gradient,
                weighting: &weighting,
            })?;
        }
        Ok(())
    }
}
