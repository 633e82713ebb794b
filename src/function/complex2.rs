//! Jones-valued leaf functions.

use crate::algebra::jones::{self, real, Jones};
use crate::algebra::pauli::{coherency, hermitian, sigma, unitary};
use crate::algebra::Stokes;
use crate::error::{JonesFitError, Result};
use crate::interface::{parse_value, Configurable, Interface};
use crate::parameters::{Parameter, ParameterSet};

use super::arena::{Arena, NodeId};
use super::leaf::Complex2Leaf;

fn basis(axis: usize) -> [f64; 3] {
    let mut n = [0.0; 3];
    n[axis] = 1.0;
    n
}

fn axis_index(axis: &[f64; 3]) -> usize {
    axis.iter().position(|&c| c != 0.0).unwrap_or(0)
}

fn set_axis(axis: &mut [f64; 3], text: &str) -> Result<()> {
    let index: usize = parse_value("axis", text)?;
    if index > 2 {
        return Err(JonesFitError::InvalidParameter(format!("axis {} not in 0..3", index)));
    }
    *axis = basis(index);
    Ok(())
}

fn vector_parameters(prefix: &str, description: &str) -> ParameterSet {
    (1..=3).fold(ParameterSet::new(), |set, k| {
        set.with(Parameter::new(&format!("{}_{}", prefix, k), 0.0).with_description(description))
    })
}

/// Scalar gain `G I`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gain;

impl Complex2Leaf for Gain {
    fn name(&self) -> &'static str {
        "Gain"
    }

    fn parameters(&self) -> ParameterSet {
        ParameterSet::new().with(Parameter::new("gain", 1.0).with_description("scalar gain"))
    }

    fn evaluate(&self, params: &[f64], grad: Option<&mut [Jones]>) -> Jones {
        if let Some(grad) = grad {
            grad[0] = jones::identity();
        }
        jones::identity().map(|z| z * params[0])
    }
}

/// Hermitian boost `cosh(beta) I + sinh(beta) b.sigma/|b|` with `beta = |b|`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boost;

impl Complex2Leaf for Boost {
    fn name(&self) -> &'static str {
        "Boost"
    }

    fn parameters(&self) -> ParameterSet {
        vector_parameters("b", "boost component")
    }

    fn evaluate(&self, params: &[f64], grad: Option<&mut [Jones]>) -> Jones {
        let b = [params[0], params[1], params[2]];
        let beta = b.iter().map(|x| x * x).sum::<f64>().sqrt();
        let cosh = beta.cosh();
        let sinhc = if beta == 0.0 { 1.0 } else { beta.sinh() / beta };

        if let Some(grad) = grad {
            let dsinhc = if beta == 0.0 { 0.0 } else { (cosh - sinhc) / beta };
            for i in 0..3 {
                let unit = if beta == 0.0 { 0.0 } else { b[i] / beta };
                let mut dvec = [0.0; 3];
                for k in 0..3 {
                    dvec[k] = dsinhc * unit * b[k];
                }
                dvec[i] += sinhc;
                grad[i] = hermitian(sinhc * b[i], dvec);
            }
        }

        hermitian(cosh, [sinhc * b[0], sinhc * b[1], sinhc * b[2]])
    }
}

/// Boost about a fixed axis of the Poincare sphere.
#[derive(Debug, Clone, Copy)]
pub struct Boost1 {
    /// Unit vector of the boost axis
    pub axis: [f64; 3],
}

impl Boost1 {
    /// Boost about Stokes axis `k` (0 = Q, 1 = U, 2 = V).
    pub fn about(k: usize) -> Self {
        Self { axis: basis(k.min(2)) }
    }
}

impl Default for Boost1 {
    fn default() -> Self {
        Self::about(0)
    }
}

impl Complex2Leaf for Boost1 {
    fn name(&self) -> &'static str {
        "Boost1"
    }

    fn parameters(&self) -> ParameterSet {
        ParameterSet::new().with(Parameter::new("beta", 0.0).with_description("boost about axis"))
    }

    fn evaluate(&self, params: &[f64], grad: Option<&mut [Jones]>) -> Jones {
        let beta = params[0];
        let n = self.axis;
        if let Some(grad) = grad {
            let c = beta.cosh();
            grad[0] = hermitian(beta.sinh(), [c * n[0], c * n[1], c * n[2]]);
        }
        let s = beta.sinh();
        hermitian(beta.cosh(), [s * n[0], s * n[1], s * n[2]])
    }
}

impl Configurable for Boost1 {
    fn interface() -> Interface<Self> {
        Interface::<Boost1>::new().add(
            "axis",
            "Stokes axis index (0=Q, 1=U, 2=V)",
            |b| axis_index(&b.axis).to_string(),
            |b, text| set_axis(&mut b.axis, text),
        )
    }
}

/// Unitary rotation `cos(phi) I + i sin(phi) r.sigma/|r|` with `phi = |r|`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rotation;

impl Complex2Leaf for Rotation {
    fn name(&self) -> &'static str {
        "Rotation"
    }

    fn parameters(&self) -> ParameterSet {
        vector_parameters("r", "rotation component")
    }

    fn evaluate(&self, params: &[f64], grad: Option<&mut [Jones]>) -> Jones {
        let r = [params[0], params[1], params[2]];
        let phi = r.iter().map(|x| x * x).sum::<f64>().sqrt();
        let cos = phi.cos();
        let sinc = if phi == 0.0 { 1.0 } else { phi.sin() / phi };

        if let Some(grad) = grad {
            let dsinc = if phi == 0.0 { 0.0 } else { (cos - sinc) / phi };
            for i in 0..3 {
                let unit = if phi == 0.0 { 0.0 } else { r[i] / phi };
                let mut dvec = [0.0; 3];
                for k in 0..3 {
                    dvec[k] = dsinc * unit * r[k];
                }
                dvec[i] += sinc;
                grad[i] = unitary(-r[i] * sinc, dvec);
            }
        }

        unitary(cos, [sinc * r[0], sinc * r[1], sinc * r[2]])
    }
}

/// Rotation about a fixed axis of the Poincare sphere.
#[derive(Debug, Clone, Copy)]
pub struct Rotation1 {
    /// Unit vector of the rotation axis
    pub axis: [f64; 3],
}

impl Rotation1 {
    /// Rotation about Stokes axis `k` (0 = Q, 1 = U, 2 = V).
    pub fn about(k: usize) -> Self {
        Self { axis: basis(k.min(2)) }
    }
}

impl Default for Rotation1 {
    fn default() -> Self {
        Self::about(0)
    }
}

impl Complex2Leaf for Rotation1 {
    fn name(&self) -> &'static str {
        "Rotation1"
    }

    fn parameters(&self) -> ParameterSet {
        ParameterSet::new().with(Parameter::new("phi", 0.0).with_description("rotation about axis"))
    }

    fn evaluate(&self, params: &[f64], grad: Option<&mut [Jones]>) -> Jones {
        let phi = params[0];
        let n = self.axis;
        let (sin, cos) = phi.sin_cos();
        if let Some(grad) = grad {
            grad[0] = unitary(-sin, [cos * n[0], cos * n[1], cos * n[2]]);
        }
        unitary(cos, [sin * n[0], sin * n[1], sin * n[2]])
    }
}

impl Configurable for Rotation1 {
    fn interface() -> Interface<Self> {
        Interface::<Rotation1>::new().add(
            "axis",
            "Stokes axis index (0=Q, 1=U, 2=V)",
            |r| axis_index(&r.axis).to_string(),
            |r, text| set_axis(&mut r.axis, text),
        )
    }
}

/// Coherency matrix of a partially polarized state, parameterized by its Stokes vector.
#[derive(Debug, Clone, Copy)]
pub struct Coherency {
    /// Initial Stokes parameters
    pub stokes: Stokes<f64>,
}

impl Coherency {
    /// A state with the given initial Stokes parameters.
    pub fn new(stokes: Stokes<f64>) -> Self {
        Self { stokes }
    }
}

impl Default for Coherency {
    fn default() -> Self {
        Self::new(Stokes::new(1.0, 0.0, 0.0, 0.0))
    }
}

impl Complex2Leaf for Coherency {
    fn name(&self) -> &'static str {
        "Coherency"
    }

    fn parameters(&self) -> ParameterSet {
        ["I", "Q", "U", "V"]
            .iter()
            .enumerate()
            .fold(ParameterSet::new(), |set, (k, name)| {
                set.with(Parameter::new(name, self.stokes[k]).with_description("Stokes parameter"))
            })
    }

    fn evaluate(&self, params: &[f64], grad: Option<&mut [Jones]>) -> Jones {
        if let Some(grad) = grad {
            for (k, g) in grad.iter_mut().enumerate() {
                *g = sigma(k).map(|z| z * 0.5);
            }
        }
        coherency(&Stokes::new(params[0], params[1], params[2], params[3]))
    }
}

/// A fixed Jones matrix with no parameters.
#[derive(Debug, Clone, Copy)]
pub struct Constant {
    /// The value
    pub value: Jones,
}

impl Constant {
    /// A constant with the given value.
    pub fn new(value: Jones) -> Self {
        Self { value }
    }
}

impl Default for Constant {
    fn default() -> Self {
        Self::new(jones::identity())
    }
}

impl Complex2Leaf for Constant {
    fn name(&self) -> &'static str {
        "Constant"
    }

    fn parameters(&self) -> ParameterSet {
        ParameterSet::new()
    }

    fn evaluate(&self, _params: &[f64], _grad: Option<&mut [Jones]>) -> Jones {
        self.value
    }
}

/// Elementwise Jones matrix with a real (0,0) element (7 parameters).
///
/// Parameters are `j00`, then the real and imaginary parts of `j01`, `j10`
/// and `j11`. The initial value is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Elements;

const ELEMENT_NAMES: [&str; 7] = ["j00", "j01_re", "j01_im", "j10_re", "j10_im", "j11_re", "j11_im"];

// (row, col, imaginary) of each parameter
const ELEMENT_SLOTS: [(usize, usize, bool); 7] = [
    (0, 0, false),
    (0, 1, false),
    (0, 1, true),
    (1, 0, false),
    (1, 0, true),
    (1, 1, false),
    (1, 1, true),
];

impl Complex2Leaf for Elements {
    fn name(&self) -> &'static str {
        "Elements"
    }

    fn parameters(&self) -> ParameterSet {
        ELEMENT_NAMES.iter().fold(ParameterSet::new(), |set, name| {
            let value = if *name == "j00" || *name == "j11_re" { 1.0 } else { 0.0 };
            set.with(Parameter::new(name, value).with_description("Jones matrix element"))
        })
    }

    fn evaluate(&self, params: &[f64], grad: Option<&mut [Jones]>) -> Jones {
        let unit = |imaginary: bool| if imaginary { num_complex::Complex64::i() } else { real(1.0) };

        let mut value = jones::zero();
        for (k, &(row, col, imaginary)) in ELEMENT_SLOTS.iter().enumerate() {
            value[(row, col)] += unit(imaginary) * params[k];
        }

        if let Some(grad) = grad {
            for (k, &(row, col, imaginary)) in ELEMENT_SLOTS.iter().enumerate() {
                let mut g = jones::zero();
                g[(row, col)] = unit(imaginary);
                grad[k] = g;
            }
        }
        value
    }
}

impl Configurable for Gain {}
impl Configurable for Boost {}
impl Configurable for Rotation {}
impl Configurable for Coherency {}
impl Configurable for Constant {}
impl Configurable for Elements {}

/// The polar decomposition `Gain * Boost * Rotation` of a general Jones matrix.
pub fn polar(arena: &mut Arena) -> Result<NodeId> {
    let gain = arena.add_complex2(Gain);
    let boost = arena.add_complex2(Boost);
    let rotation = arena.add_complex2(Rotation);
    arena.product(&[gain, boost, rotation])
}
