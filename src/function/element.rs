//! Value types a function may produce.

use std::fmt;

use crate::algebra::jones::{self, Jones};
use crate::error::Result;

use super::arena::{Arena, NodeId};

/// Value type of a node in the function graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// 2x2 complex matrix
    Complex2,
    /// real scalar
    Scalar,
}

/// Algebra required of a function value by the composition rules.
pub trait Element: Clone + fmt::Debug + Send + Sync + 'static {
    /// The node kind that produces this element.
    const KIND: Kind;

    /// Additive identity.
    fn zero() -> Self;

    /// Multiplicative identity.
    fn one() -> Self;

    /// Ordered product `self * rhs`.
    fn product(&self, rhs: &Self) -> Self;

    /// Multiply by a real factor.
    fn scaled(&self, factor: f64) -> Self;

    /// `self += rhs`.
    fn accumulate(&mut self, rhs: &Self);

    /// True when every component is finite.
    fn is_finite(&self) -> bool;

    /// Evaluate the leaf node `id` of this element type.
    fn evaluate_leaf(arena: &Arena, id: NodeId, grad: Option<&mut [Self]>) -> Result<Self>;
}

impl Element for Jones {
    const KIND: Kind = Kind::Complex2;

    fn zero() -> Self {
        jones::zero()
    }

    fn one() -> Self {
        jones::identity()
    }

    fn product(&self, rhs: &Self) -> Self {
        self * rhs
    }

    fn scaled(&self, factor: f64) -> Self {
        jones::scale(self, factor)
    }

    fn accumulate(&mut self, rhs: &Self) {
        *self += rhs;
    }

    fn is_finite(&self) -> bool {
        jones::is_finite(self)
    }

    fn evaluate_leaf(arena: &Arena, id: NodeId, grad: Option<&mut [Self]>) -> Result<Self> {
        let (leaf, params) = arena.complex2_leaf(id)?;
        Ok(leaf.evaluate(&params.values(), grad))
    }
}

impl Element for f64 {
    const KIND: Kind = Kind::Scalar;

    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn product(&self, rhs: &Self) -> Self {
        self * rhs
    }

    fn scaled(&self, factor: f64) -> Self {
        self * factor
    }

    fn accumulate(&mut self, rhs: &Self) {
        *self += rhs;
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }

    fn evaluate_leaf(arena: &Arena, id: NodeId, grad: Option<&mut [Self]>) -> Result<Self> {
        let (leaf, arguments, params) = arena.scalar_leaf(id)?;
        let args = arguments
            .iter()
            .map(|&axis| arena.abscissa(axis))
            .collect::<Result<Vec<f64>>>()?;
        Ok(leaf.evaluate(&params.values(), &args, grad))
    }
}
