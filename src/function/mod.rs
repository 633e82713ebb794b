//! Parameterized functions and their composition.
//!
//! The [`Function`] trait is the capability interface shared by every model
//! the solver can fit: a vector of named parameters (value, variance, fit
//! flag) and an `evaluate` that returns a value and, optionally, one gradient
//! element per parameter.
//!
//! Models are built in an [`Arena`] from leaves ([`complex2`], [`scalar`])
//! combined by products and chain constraints; [`Model`] is the `Function`
//! view of one arena node.
//!
//! # Example
//!
//! ```
//! use jonesfit::function::{complex2, Arena, Function};
//! use jonesfit::algebra::Jones;
//!
//! let mut arena = Arena::new();
//! let polar = complex2::polar(&mut arena).unwrap();
//! let mut model = arena.model::<Jones>(polar).unwrap();
//! model.set_param(0, 2.0).unwrap();
//!
//! let mut gradient = Vec::new();
//! let value = model.evaluate(Some(&mut gradient)).unwrap();
//! assert_eq!(value[(0, 0)].re, 2.0);
//! assert_eq!(gradient.len(), model.nparam());
//! ```

pub mod arena;
pub mod complex2;
pub mod element;
pub mod leaf;
pub mod scalar;

use std::marker::PhantomData;

use crate::error::{JonesFitError, Result};

pub use arena::{Arena, AxisId, ChainCovariance, NodeId, Scope};
pub use element::{Element, Kind};
pub use leaf::{Complex2Leaf, Leaf, ScalarLeaf};

/// A parameterized function that can be evaluated with its gradient.
pub trait Function {
    /// Value type (Jones matrix or scalar).
    type Output: Element;

    /// Evaluate the function; when `gradient` is given it is resized to
    /// [`Function::nparam`] and filled.
    fn evaluate(&mut self, gradient: Option<&mut Vec<Self::Output>>) -> Result<Self::Output>;

    /// Number of parameters, free or not.
    fn nparam(&self) -> usize;

    /// Value of parameter `index`.
    fn param(&self, index: usize) -> Result<f64>;

    /// Set the value of parameter `index`.
    fn set_param(&mut self, index: usize, value: f64) -> Result<()>;

    /// Whether parameter `index` is varied by the fit.
    fn infit(&self, index: usize) -> Result<bool>;

    /// Set the fit flag of parameter `index`.
    fn set_infit(&mut self, index: usize, infit: bool) -> Result<()>;

    /// Variance of parameter `index`.
    fn variance(&self, index: usize) -> Result<f64>;

    /// Set the variance of parameter `index`.
    fn set_variance(&mut self, index: usize, variance: f64) -> Result<()>;

    /// Name of parameter `index`.
    fn param_name(&self, index: usize) -> Result<String>;

    /// Number of free parameters.
    fn nparam_infit(&self) -> usize {
        (0..self.nparam())
            .filter(|&i| self.infit(i).unwrap_or(false))
            .count()
    }

    /// Names of all parameters.
    fn param_names(&self) -> Result<Vec<String>> {
        (0..self.nparam()).map(|i| self.param_name(i)).collect()
    }

    /// Indices of the free parameters, in order.
    fn free_indices(&self) -> Result<Vec<usize>> {
        let mut free = Vec::with_capacity(self.nparam());
        for i in 0..self.nparam() {
            if self.infit(i)? {
                free.push(i);
            }
        }
        Ok(free)
    }
}

/// The [`Function`] view of one arena node.
#[derive(Debug)]
pub struct Model<'a, E> {
    arena: &'a mut Arena,
    id: NodeId,
    element: PhantomData<E>,
}

impl Arena {
    /// A [`Function`] view of node `id`, checked to produce `E`.
    pub fn model<E: Element>(&mut self, id: NodeId) -> Result<Model<'_, E>> {
        let kind = self.kind(id)?;
        if kind != E::KIND {
            return Err(JonesFitError::DimensionMismatch(format!(
                "node {} is {:?}, not {:?}",
                id,
                kind,
                E::KIND
            )));
        }
        Ok(Model {
            arena: self,
            id,
            element: PhantomData,
        })
    }
}

impl<'a, E> Model<'a, E> {
    /// Handle of the viewed node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The arena owning the node.
    pub fn arena(&mut self) -> &mut Arena {
        self.arena
    }
}

impl<'a, E: Element> Function for Model<'a, E> {
    type Output = E;

    fn evaluate(&mut self, gradient: Option<&mut Vec<E>>) -> Result<E> {
        self.arena.evaluate(self.id, gradient)
    }

    fn nparam(&self) -> usize {
        self.arena.nparam(self.id).unwrap_or(0)
    }

    fn param(&self, index: usize) -> Result<f64> {
        self.arena.param(self.id, index)
    }

    fn set_param(&mut self, index: usize, value: f64) -> Result<()> {
        self.arena.set_param(self.id, index, value)
    }

    fn infit(&self, index: usize) -> Result<bool> {
        self.arena.infit(self.id, index)
    }

    fn set_infit(&mut self, index: usize, infit: bool) -> Result<()> {
        self.arena.set_infit(self.id, index, infit)
    }

    fn variance(&self, index: usize) -> Result<f64> {
        self.arena.variance(self.id, index)
    }

    fn set_variance(&mut self, index: usize, variance: f64) -> Result<()> {
        self.arena.set_variance(self.id, index, variance)
    }

    fn param_name(&self, index: usize) -> Result<String> {
        self.arena.param_name(self.id, index)
    }
}
