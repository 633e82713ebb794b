//! Function registry and text specifications of models.
//!
//! A [`FunctionRegistry`] maps function names to constructors. Models are
//! written as `*`-separated products of terms, each term a function name
//! with an optional list of `key=value` settings:
//!
//! ```text
//! Gain * Boost * Rotation
//! Rotation1(axis=2, phi=0.1)
//! Polynomial(ncoef=3, x0=0.5, arg=ha)
//! ```
//!
//! A key is, in order of precedence: `arg` (an abscissa axis name, repeated
//! once per argument of a scalar function), a property of the function type,
//! or the name of one of its parameters (setting the initial value).
//!
//! ```
//! use jonesfit::function::Arena;
//! use jonesfit::registry::FunctionRegistry;
//!
//! let registry = FunctionRegistry::with_builtins();
//! let mut arena = Arena::new();
//! let id = registry.parse("Gain(gain=2) * Rotation1(axis=2)", &mut arena).unwrap();
//! assert_eq!(arena.describe(id).unwrap(), "Gain*Rotation1");
//! assert_eq!(arena.param(id, 0).unwrap(), 2.0);
//! ```

use std::collections::BTreeMap;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::{map, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult, Parser,
};

use crate::error::{JonesFitError, Result, ResultExt};
use crate::function::complex2::{Boost, Boost1, Coherency, Constant, Elements, Gain, Rotation, Rotation1};
use crate::function::scalar::{Gaussian, Polynomial, ScalarValue};
use crate::function::{Arena, Complex2Leaf, Leaf, NodeId, ScalarLeaf};
use crate::interface::{parse_value, Configurable};

type Builder = Box<dyn Fn(&[(&str, &str)]) -> Result<Leaf> + Send + Sync>;

struct Entry {
    properties: Vec<&'static str>,
    build: Builder,
}

/// Named constructors of leaf functions.
pub struct FunctionRegistry {
    entries: BTreeMap<String, Entry>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// One term of a product, as parsed.
#[derive(Debug, Clone, PartialEq)]
struct Term<'a> {
    name: &'a str,
    settings: Vec<(&'a str, &'a str)>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in leaf function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_complex2::<Gain>();
        registry.register_complex2::<Boost>();
        registry.register_complex2::<Boost1>();
        registry.register_complex2::<Rotation>();
        registry.register_complex2::<Rotation1>();
        registry.register_complex2::<Coherency>();
        registry.register_complex2::<Constant>();
        registry.register_complex2::<Elements>();
        registry.register_scalar::<Polynomial>();
        registry.register_scalar::<Gaussian>();
        registry.register_scalar::<ScalarValue>();
        registry
    }

    /// Register a function type under the name its default value reports.
    pub fn register<T, W>(&mut self, wrap: W)
    where
        T: Configurable + Default + 'static,
        W: Fn(T) -> Leaf + Send + Sync + 'static,
    {
        let interface = T::interface();
        let properties = interface.names();
        let name = wrap(T::default()).name();
        let build = move |settings: &[(&str, &str)]| -> Result<Leaf> {
            let mut target = T::default();
            for (key, value) in settings {
                interface.set(&mut target, key, value)?;
            }
            Ok(wrap(target))
        };
        if self
            .entries
            .insert(
                name.to_string(),
                Entry {
                    properties,
                    build: Box::new(build),
                },
            )
            .is_some()
        {
            log::debug!("FunctionRegistry::register replaced {}", name);
        }
    }

    /// Register a Jones-valued leaf type.
    pub fn register_complex2<T>(&mut self)
    where
        T: Complex2Leaf + Configurable + Default + 'static,
    {
        self.register(|leaf: T| Leaf::Complex2(Box::new(leaf)));
    }

    /// Register a scalar leaf type.
    pub fn register_scalar<T>(&mut self)
    where
        T: ScalarLeaf + Configurable + Default + 'static,
    {
        self.register(|leaf: T| Leaf::Scalar(Box::new(leaf)));
    }

    /// Registered function names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Construct a leaf by name, applying property settings.
    pub fn create(&self, name: &str, properties: &[(&str, &str)]) -> Result<Leaf> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| JonesFitError::UnknownFunction(name.to_string()))?;
        (entry.build)(properties)
    }

    /// Parse a model specification, adding its nodes to `arena`.
    ///
    /// A single term yields its leaf; several terms yield their product.
    ///
    /// # Errors
    ///
    /// * `JonesFitError::ParseError` for malformed text or property values
    /// * `JonesFitError::UnknownFunction` for unregistered names
    /// * `JonesFitError::NotFound` for keys that are neither properties nor parameters
    pub fn parse(&self, text: &str, arena: &mut Arena) -> Result<NodeId> {
        let terms = match product(text) {
            Ok((rest, terms)) if rest.trim().is_empty() => terms,
            Ok((rest, _)) => {
                return Err(JonesFitError::ParseError(format!(
                    "unexpected trailing text '{}' in '{}'",
                    rest, text
                )))
            }
            Err(e) => return Err(JonesFitError::ParseError(format!("'{}': {}", text, e))),
        };

        let ids = terms
            .iter()
            .map(|term| self.build(term, arena))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("FunctionRegistry::parse '{}'", text))?;

        match ids.as_slice() {
            [single] => Ok(*single),
            _ => arena.product(&ids),
        }
    }

    fn build(&self, term: &Term<'_>, arena: &mut Arena) -> Result<NodeId> {
        let entry = self
            .entries
            .get(term.name)
            .ok_or_else(|| JonesFitError::UnknownFunction(term.name.to_string()))?;

        let mut properties = Vec::new();
        let mut arguments = Vec::new();
        let mut values = Vec::new();
        for &(key, value) in &term.settings {
            if key == "arg" {
                arguments.push(arena.axis(value));
            } else if entry.properties.contains(&key) {
                properties.push((key, value));
            } else {
                values.push((key, value));
            }
        }

        let leaf = (entry.build)(&properties)?;
        let id = arena.add_leaf(leaf, &arguments)?;

        for (key, value) in values {
            let index = arena.find_param(id, key)?.ok_or_else(|| {
                JonesFitError::NotFound(format!("{} has no property or parameter '{}'", term.name, key))
            })?;
            arena.set_param(id, index, parse_value(key, value)?)?;
        }
        Ok(id)
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn value(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !matches!(c, ',' | '(' | ')' | '*' | '=')).parse(input)
}

fn setting(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        delimited(multispace0, identifier, multispace0),
        char('='),
        delimited(multispace0, value, multispace0),
    )
    .parse(input)
}

fn term(input: &str) -> IResult<&str, Term<'_>> {
    map(
        pair(
            delimited(multispace0, identifier, multispace0),
            opt(delimited(
                char('('),
                separated_list0(char(','), setting),
                preceded(multispace0, char(')')),
            )),
        ),
        |(name, settings)| Term {
            name,
            settings: settings.unwrap_or_default(),
        },
    )
    .parse(input)
}

fn product(input: &str) -> IResult<&str, Vec<Term<'_>>> {
    terminated(separated_list1(char('*'), term), multispace0).parse(input)
}
