//! Ordered parameter collection
//!
//! This module provides the ParameterSet struct, the ordered list of
//! parameters owned by one leaf function. Unlike a map keyed by name, the
//! position of each parameter is its identity: gradients and covariance
//! matrices are indexed by it.

use crate::error::Result;
use crate::parameters::parameter::{Parameter, ParameterError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// An ordered collection of parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    /// Create a new empty parameter set
    ///
    /// # Examples
    ///
    /// ```
    /// use jonesfit::parameters::ParameterSet;
    ///
    /// let params = ParameterSet::new();
    /// assert_eq!(params.len(), 0);
    /// ```
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Append a parameter and return its index
    ///
    /// # Examples
    ///
    /// ```
    /// use jonesfit::parameters::{Parameter, ParameterSet};
    ///
    /// let mut params = ParameterSet::new();
    /// assert_eq!(params.add(Parameter::new("gain", 1.0)), 0);
    /// assert_eq!(params.add(Parameter::new("b_1", 0.0)), 1);
    /// ```
    pub fn add(&mut self, param: Parameter) -> usize {
        self.params.push(param);
        self.params.len() - 1
    }

    /// Builder form of [`ParameterSet::add`]
    pub fn with(mut self, param: Parameter) -> Self {
        self.add(param);
        self
    }

    /// Get a parameter by index
    pub fn get(&self, index: usize) -> std::result::Result<&Parameter, ParameterError> {
        let nparam = self.params.len();
        self.params
            .get(index)
            .ok_or(ParameterError::IndexOutOfRange { index, nparam })
    }

    /// Get a mutable parameter by index
    pub fn get_mut(&mut self, index: usize) -> std::result::Result<&mut Parameter, ParameterError> {
        let nparam = self.params.len();
        self.params
            .get_mut(index)
            .ok_or(ParameterError::IndexOutOfRange { index, nparam })
    }

    /// Index of the first parameter with the given name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name() == name)
    }

    /// Get a parameter by name
    pub fn by_name(&self, name: &str) -> std::result::Result<&Parameter, ParameterError> {
        self.find(name)
            .map(|i| &self.params[i])
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over the parameters in order
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.params.iter()
    }

    /// All parameter values in order
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value()).collect()
    }

    /// All parameter names in order
    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name().to_string()).collect()
    }

    /// Number of parameters varied during the fit
    pub fn nparam_infit(&self) -> usize {
        self.params.iter().filter(|p| p.infit()).count()
    }

    /// Set all values at once
    ///
    /// # Returns
    ///
    /// An error if the number of values differs from the number of parameters
    /// or any value is not finite; the set is unchanged on error.
    pub fn set_values(&mut self, values: &[f64]) -> std::result::Result<(), ParameterError> {
        if values.len() != self.params.len() {
            return Err(ParameterError::IndexOutOfRange {
                index: values.len(),
                nparam: self.params.len(),
            });
        }
        if let Some((i, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ParameterError::NonFiniteValue {
                name: self.params[i].name().to_string(),
                value,
            });
        }
        for (param, &value) in self.params.iter_mut().zip(values) {
            param.set_value(value)?;
        }
        Ok(())
    }

    /// Serialize the parameter set to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize a parameter set from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save the parameter set to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a parameter set from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_json(&contents)
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boost() -> ParameterSet {
        ParameterSet::new()
            .with(Parameter::new("b_1", 0.1))
            .with(Parameter::new("b_2", 0.2))
            .with(Parameter::new("b_3", 0.3).fixed())
    }

    #[test]
    fn test_ordering_and_lookup() {
        let params = boost();
        assert_eq!(params.len(), 3);
        assert_eq!(params.names(), vec!["b_1", "b_2", "b_3"]);
        assert_eq!(params.values(), vec![0.1, 0.2, 0.3]);
        assert_eq!(params.find("b_2"), Some(1));
        assert_eq!(params.by_name("b_3").unwrap().value(), 0.3);
        assert!(params.by_name("r_1").is_err());
        assert_eq!(params.nparam_infit(), 2);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut params = boost();
        assert_eq!(
            params.get(3).unwrap_err(),
            ParameterError::IndexOutOfRange { index: 3, nparam: 3 }
        );
        assert!(params.get_mut(7).is_err());
    }

    #[test]
    fn test_set_values() {
        let mut params = boost();
        params.set_values(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(params.values(), vec![1.0, 2.0, 3.0]);

        assert!(params.set_values(&[1.0]).is_err());
        assert!(params.set_values(&[1.0, f64::INFINITY, 0.0]).is_err());
        assert_eq!(params.values(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_json_round_trip() {
        let params = boost();
        let json = params.to_json().unwrap();
        let back = ParameterSet::from_json(&json).unwrap();
        assert_eq!(params, back);
    }
}
