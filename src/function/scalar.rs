//! Scalar-valued leaf functions of abscissa arguments.

use crate::error::{JonesFitError, Result};
use crate::interface::{parse_value, Configurable, Interface};
use crate::parameters::{Parameter, ParameterSet};

use super::leaf::ScalarLeaf;

/// Polynomial `sum_k c_k (x - x0)^k` in one abscissa.
#[derive(Debug, Clone, Copy)]
pub struct Polynomial {
    /// Number of coefficients
    pub ncoef: usize,
    /// Abscissa offset
    pub x0: f64,
}

impl Polynomial {
    /// A polynomial with `ncoef` coefficients, all zero.
    pub fn new(ncoef: usize) -> Self {
        Self { ncoef, x0: 0.0 }
    }
}

impl Default for Polynomial {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ScalarLeaf for Polynomial {
    fn name(&self) -> &'static str {
        "Polynomial"
    }

    fn ndim(&self) -> usize {
        1
    }

    fn parameters(&self) -> ParameterSet {
        (0..self.ncoef).fold(ParameterSet::new(), |set, k| {
            set.with(Parameter::new(&format!("c_{}", k), 0.0).with_description("polynomial coefficient"))
        })
    }

    fn evaluate(&self, params: &[f64], args: &[f64], grad: Option<&mut [f64]>) -> f64 {
        let x = args[0] - self.x0;
        let mut power = 1.0;
        let mut value = 0.0;
        match grad {
            Some(grad) => {
                for (k, c) in params.iter().enumerate() {
                    grad[k] = power;
                    value += c * power;
                    power *= x;
                }
            }
            None => {
                for c in params {
                    value += c * power;
                    power *= x;
                }
            }
        }
        value
    }
}

impl Configurable for Polynomial {
    fn interface() -> Interface<Self> {
        Interface::<Polynomial>::new()
            .add(
                "ncoef",
                "number of coefficients",
                |p| p.ncoef.to_string(),
                |p, text| {
                    let ncoef = parse_value("ncoef", text)?;
                    check_ncoef(ncoef)?;
                    p.ncoef = ncoef;
                    Ok(())
                },
            )
            .add(
                "x0",
                "abscissa offset",
                |p| p.x0.to_string(),
                |p, text| {
                    let x0: f64 = parse_value("x0", text)?;
                    if !x0.is_finite() {
                        return Err(JonesFitError::InvalidParameter(format!("x0={}", x0)));
                    }
                    p.x0 = x0;
                    Ok(())
                },
            )
    }
}

/// Gaussian `height * exp(-((x - centre) / width)^2 / 2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl ScalarLeaf for Gaussian {
    fn name(&self) -> &'static str {
        "Gaussian"
    }

    fn ndim(&self) -> usize {
        1
    }

    fn parameters(&self) -> ParameterSet {
        ParameterSet::new()
            .with(Parameter::new("centre", 0.0))
            .with(Parameter::new("width", 1.0))
            .with(Parameter::new("height", 1.0))
    }

    fn evaluate(&self, params: &[f64], args: &[f64], grad: Option<&mut [f64]>) -> f64 {
        let (centre, width, height) = (params[0], params[1], params[2]);
        let z = (args[0] - centre) / width;
        let shape = (-0.5 * z * z).exp();
        let value = height * shape;
        if let Some(grad) = grad {
            grad[0] = value * z / width;
            grad[1] = value * z * z / width;
            grad[2] = shape;
        }
        value
    }
}

impl Configurable for Gaussian {}

/// A free scalar with no abscissa dependence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarValue {
    /// Initial value
    pub value: f64,
}

impl ScalarValue {
    /// A scalar with the given initial value.
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl ScalarLeaf for ScalarValue {
    fn name(&self) -> &'static str {
        "ScalarValue"
    }

    fn ndim(&self) -> usize {
        0
    }

    fn parameters(&self) -> ParameterSet {
        ParameterSet::new().with(Parameter::new("value", self.value))
    }

    fn evaluate(&self, params: &[f64], _args: &[f64], grad: Option<&mut [f64]>) -> f64 {
        if let Some(grad) = grad {
            grad[0] = 1.0;
        }
        params[0]
    }
}

impl Configurable for ScalarValue {
    fn interface() -> Interface<Self> {
        Interface::<ScalarValue>::new().add(
            "value",
            "initial value",
            |s| s.value.to_string(),
            |s, text| {
                s.value = parse_value("value", text)?;
                Ok(())
            },
        )
    }
}

fn check_ncoef(ncoef: usize) -> Result<()> {
    if ncoef == 0 {
        return Err(JonesFitError::InvalidParameter("Polynomial needs ncoef >= 1".to_string()));
    }
    Ok(())
}
