//! # Parameter System
//!
//! Every leaf function owns an ordered [`ParameterSet`]. Each [`Parameter`]
//! carries a value, a variance written back after a successful fit, and an
//! `infit` flag that decides whether the solver may vary it.
//!
//! ## Example Usage
//!
//! ```rust
//! use jonesfit::parameters::{Parameter, ParameterSet};
//!
//! let mut params = ParameterSet::new();
//! params.add(Parameter::new("gain", 1.0));
//! params.add(Parameter::new("b_1", 0.0).with_description("boost along Stokes Q"));
//!
//! // hold the gain fixed
//! params.get_mut(0).unwrap().set_infit(false);
//! assert_eq!(params.nparam_infit(), 1);
//! ```

pub mod parameter;
pub mod parameters;

// Re-export key types
pub use parameter::{Parameter, ParameterError};
pub use parameters::ParameterSet;
