//! Stokes parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Index, IndexMut, Mul, Sub};

use super::estimate::Estimate;

/// The four Stokes parameters, total intensity first.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stokes<T> {
    components: [T; 4],
}

impl<T> Stokes<T> {
    /// Build from `(I, Q, U, V)`.
    pub fn new(i: T, q: T, u: T, v: T) -> Self {
        Self {
            components: [i, q, u, v],
        }
    }

    /// Build from an array ordered `(I, Q, U, V)`.
    pub fn from_array(components: [T; 4]) -> Self {
        Self { components }
    }

    /// The components as an array.
    pub fn as_array(&self) -> &[T; 4] {
        &self.components
    }

    /// Apply `f` to each component.
    pub fn map<U, F: FnMut(&T) -> U>(&self, mut f: F) -> Stokes<U> {
        Stokes {
            components: [
                f(&self.components[0]),
                f(&self.components[1]),
                f(&self.components[2]),
                f(&self.components[3]),
            ],
        }
    }

    /// Iterate over `(I, Q, U, V)`.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.components.iter()
    }
}

impl<T: Copy> Stokes<T> {
    /// Total intensity.
    pub fn intensity(&self) -> T {
        self.components[0]
    }

    /// The polarization vector `(Q, U, V)`.
    pub fn vector(&self) -> [T; 3] {
        [self.components[1], self.components[2], self.components[3]]
    }
}

impl Stokes<f64> {
    /// Sum of squares of all four components.
    pub fn norm(&self) -> f64 {
        self.components.iter().map(|s| s * s).sum()
    }

    /// Length of the polarization vector.
    pub fn abs_vect(&self) -> f64 {
        self.vector().iter().map(|s| s * s).sum::<f64>().sqrt()
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.components.iter().all(|s| s.is_finite())
    }
}

impl Stokes<Estimate<f64>> {
    /// The values without their variances.
    pub fn values(&self) -> Stokes<f64> {
        self.map(|e| e.val)
    }

    /// The variances without their values.
    pub fn variances(&self) -> Stokes<f64> {
        self.map(|e| e.var)
    }
}

impl<T> Index<usize> for Stokes<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.components[index]
    }
}

impl<T> IndexMut<usize> for Stokes<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.components[index]
    }
}

impl Add for Stokes<f64> {
    type Output = Stokes<f64>;

    fn add(self, rhs: Self) -> Self {
        Stokes::from_array(std::array::from_fn(|k| self[k] + rhs[k]))
    }
}

impl Sub for Stokes<f64> {
    type Output = Stokes<f64>;

    fn sub(self, rhs: Self) -> Self {
        Stokes::from_array(std::array::from_fn(|k| self[k] - rhs[k]))
    }
}

impl Mul<f64> for Stokes<f64> {
    type Output = Stokes<f64>;

    fn mul(self, rhs: f64) -> Self {
        self.map(|s| s * rhs)
    }
}

impl<T: fmt::Display> fmt::Display for Stokes<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [i, q, u, v] = &self.components;
        write!(f, "[{}, {}, {}, {}]", i, q, u, v)
    }
}
