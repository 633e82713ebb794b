//! Typed property descriptors.
//!
//! An [`Interface`] is an explicit list of named properties of some type `T`,
//! each with a getter, an optional setter, and a description. Reporting and
//! configuration code looks properties up by name through it; nothing is
//! discovered at run time.
//!
//! ```
//! use jonesfit::interface::{Configurable, Interface};
//! use jonesfit::lm::SolverConfig;
//!
//! let mut config = SolverConfig::default();
//! let interface = SolverConfig::interface();
//! interface.set(&mut config, "maximum_iterations", "25").unwrap();
//! assert_eq!(interface.get(&config, "maximum_iterations").unwrap(), "25");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{JonesFitError, Result};

/// Getter of a property, rendered as text.
pub type Getter<T> = fn(&T) -> String;

/// Setter of a property, parsed from text.
pub type Setter<T> = fn(&mut T, &str) -> Result<()>;

/// One named property of `T`.
pub struct Property<T> {
    name: &'static str,
    description: &'static str,
    get: Getter<T>,
    set: Option<Setter<T>>,
}

impl<T> Property<T> {
    /// Name used for lookup.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// True when the property has no setter.
    pub fn is_read_only(&self) -> bool {
        self.set.is_none()
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

/// An ordered list of property descriptors for `T`.
#[derive(Debug)]
pub struct Interface<T> {
    properties: Vec<Property<T>>,
}

impl<T> Default for Interface<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Interface<T> {
    /// An empty interface.
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
        }
    }

    /// Add a read-write property.
    pub fn add(
        mut self,
        name: &'static str,
        description: &'static str,
        get: Getter<T>,
        set: Setter<T>,
    ) -> Self {
        self.properties.push(Property {
            name,
            description,
            get,
            set: Some(set),
        });
        self
    }

    /// Add a read-only property.
    pub fn add_read_only(mut self, name: &'static str, description: &'static str, get: Getter<T>) -> Self {
        self.properties.push(Property {
            name,
            description,
            get,
            set: None,
        });
        self
    }

    fn find(&self, name: &str) -> Result<&Property<T>> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| JonesFitError::NotFound(format!("property '{}'", name)))
    }

    /// Get a property as text.
    pub fn get(&self, target: &T, name: &str) -> Result<String> {
        Ok((self.find(name)?.get)(target))
    }

    /// Set a property from text.
    pub fn set(&self, target: &mut T, name: &str, value: &str) -> Result<()> {
        let property = self.find(name)?;
        match property.set {
            Some(set) => set(target, value),
            None => Err(JonesFitError::InvalidState(format!(
                "property '{}' is read-only",
                name
            ))),
        }
    }

    /// Names of all properties, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.properties.iter().map(|p| p.name).collect()
    }

    /// All property descriptors.
    pub fn properties(&self) -> &[Property<T>] {
        &self.properties
    }
}

/// Types that describe their own properties.
pub trait Configurable: Sized {
    /// The property list of this type; empty unless overridden.
    fn interface() -> Interface<Self> {
        Interface::new()
    }
}

/// Parse `text` as the value of property `name`.
pub fn parse_value<V>(name: &str, text: &str) -> Result<V>
where
    V: FromStr,
    V::Err: fmt::Display,
{
    text.trim().parse::<V>().map_err(|e| {
        JonesFitError::ParseError(format!("property '{}' value '{}': {}", name, text, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Knobs {
        count: usize,
        label: String,
    }

    fn interface() -> Interface<Knobs> {
        Interface::<Knobs>::new()
            .add(
                "count",
                "number of things",
                |k| k.count.to_string(),
                |k, v| {
                    k.count = parse_value("count", v)?;
                    Ok(())
                },
            )
            .add_read_only("label", "a label", |k| k.label.clone())
    }

    #[test]
    fn test_get_and_set() {
        let mut knobs = Knobs {
            label: "fixed".into(),
            ..Default::default()
        };
        let interface = interface();
        assert_eq!(interface.names(), vec!["count", "label"]);

        interface.set(&mut knobs, "count", " 12 ").unwrap();
        assert_eq!(knobs.count, 12);
        assert_eq!(interface.get(&knobs, "label").unwrap(), "fixed");
    }

    #[test]
    fn test_errors() {
        let mut knobs = Knobs::default();
        let interface = interface();
        assert!(matches!(
            interface.set(&mut knobs, "count", "many"),
            Err(JonesFitError::ParseError(_))
        ));
        assert!(matches!(
            interface.set(&mut knobs, "label", "x"),
            Err(JonesFitError::InvalidState(_))
        ));
        assert!(matches!(
            interface.get(&knobs, "missing"),
            Err(JonesFitError::NotFound(_))
        ));
        assert!(interface.properties()[1].is_read_only());
    }
}
