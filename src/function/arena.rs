//! Arena-owned function graph.
//!
//! Every leaf and composite function lives in an [`Arena`] and is addressed by
//! a [`NodeId`]. Leaves own their parameters; composites (products and
//! chains) own nothing but references to other nodes, and expose the union of
//! the parameters of the leaves they reach, in first-occurrence order, each
//! shared leaf counted once.
//!
//! Abscissa values (e.g. hour angle) are arena-level axes addressed by
//! [`AxisId`]; scalar leaves read them through their argument list.
//!
//! Composites are immutable once created, so their parameter scope and the
//! index maps from constituent to composite are computed at creation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{JonesFitError, Result};
use crate::parameters::{Parameter, ParameterSet};

use super::element::{Element, Kind};
use super::leaf::{Complex2Leaf, Leaf, ScalarLeaf};

/// Handle to a node in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to an abscissa axis in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AxisId(usize);

impl AxisId {
    /// Position of the axis in its arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Axis {
    name: String,
    value: f64,
}

/// The leaves reachable from a node and where their parameters start.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    leaves: Vec<NodeId>,
    offsets: Vec<usize>,
    nparam: usize,
}

impl Scope {
    fn leaf(id: NodeId, nparam: usize) -> Self {
        Self {
            leaves: vec![id],
            offsets: vec![0],
            nparam,
        }
    }

    /// Leaves in first-occurrence order.
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// Total number of parameters.
    pub fn nparam(&self) -> usize {
        self.nparam
    }

    /// Index of the first parameter of `leaf`, if it is in scope.
    pub fn offset_of(&self, leaf: NodeId) -> Option<usize> {
        self.leaves
            .iter()
            .position(|&l| l == leaf)
            .map(|k| self.offsets[k])
    }

    /// The leaf owning parameter `index` and the index within that leaf.
    // zero-parameter leaves share their offset with the next leaf, so the
    // last offset not exceeding the index is the owner
    pub fn resolve(&self, index: usize) -> Option<(NodeId, usize)> {
        if index >= self.nparam {
            return None;
        }
        let k = self.offsets.partition_point(|&o| o <= index).checked_sub(1)?;
        Some((self.leaves[k], index - self.offsets[k]))
    }
}

#[derive(Debug)]
enum NodeKind {
    Complex2(Box<dyn Complex2Leaf>),
    Scalar {
        leaf: Box<dyn ScalarLeaf>,
        arguments: Vec<AxisId>,
    },
    Product {
        factors: Vec<NodeId>,
        maps: Vec<Vec<usize>>,
    },
    Chain {
        model: NodeId,
        function: NodeId,
        index: usize,
        target: (NodeId, usize),
        model_map: Vec<usize>,
        function_map: Vec<usize>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Leaf,
    Product,
    Chain,
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    element: Kind,
    params: ParameterSet,
    scope: Scope,
}

impl Node {
    fn shape(&self) -> Shape {
        match self.kind {
            NodeKind::Complex2(_) | NodeKind::Scalar { .. } => Shape::Leaf,
            NodeKind::Product { .. } => Shape::Product,
            NodeKind::Chain { .. } => Shape::Chain,
        }
    }
}

/// Derived-parameter covariance produced by a chain constraint.
#[derive(Debug, Clone)]
pub struct ChainCovariance {
    /// Covariance of the derived parameter with every parameter of the outer model
    pub row: Vec<f64>,
    /// Variance of the derived parameter
    pub variance: f64,
}

/// Owner of a graph of parameterized functions.
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
    axes: Vec<Axis>,
    generation: u64,
}

impl Arena {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node has been added.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Counter bumped whenever a parameter or abscissa value changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| JonesFitError::InvalidIndex(format!("node {} (arena size {})", id, self.nodes.len())))
    }

    fn push(&mut self, kind: NodeKind, element: Kind, params: ParameterSet, scope: impl FnOnce(NodeId, usize) -> Scope) -> NodeId {
        let id = NodeId(self.nodes.len());
        let scope = scope(id, params.len());
        self.nodes.push(Node {
            kind,
            element,
            params,
            scope,
        });
        id
    }

    // ----- construction -------------------------------------------------

    /// Add a Jones-valued leaf.
    pub fn add_complex2<L: Complex2Leaf + 'static>(&mut self, leaf: L) -> NodeId {
        self.add_complex2_boxed(Box::new(leaf))
    }

    fn add_complex2_boxed(&mut self, leaf: Box<dyn Complex2Leaf>) -> NodeId {
        let params = leaf.parameters();
        log::trace!("Arena::add_complex2 {} nparam={}", leaf.name(), params.len());
        self.push(NodeKind::Complex2(leaf), Kind::Complex2, params, Scope::leaf)
    }

    /// Add a scalar leaf reading its arguments from the given axes.
    ///
    /// # Errors
    ///
    /// * `JonesFitError::DimensionMismatch` if the number of arguments differs
    ///   from the leaf's dimensionality
    /// * `JonesFitError::InvalidIndex` if an axis does not exist
    pub fn add_scalar<L: ScalarLeaf + 'static>(&mut self, leaf: L, arguments: &[AxisId]) -> Result<NodeId> {
        self.add_scalar_boxed(Box::new(leaf), arguments)
    }

    fn add_scalar_boxed(&mut self, leaf: Box<dyn ScalarLeaf>, arguments: &[AxisId]) -> Result<NodeId> {
        if arguments.len() != leaf.ndim() {
            return Err(JonesFitError::DimensionMismatch(format!(
                "{} takes {} arguments, {} given",
                leaf.name(),
                leaf.ndim(),
                arguments.len()
            )));
        }
        for axis in arguments {
            self.abscissa(*axis)?;
        }
        let params = leaf.parameters();
        let kind = NodeKind::Scalar {
            leaf,
            arguments: arguments.to_vec(),
        };
        Ok(self.push(kind, Kind::Scalar, params, Scope::leaf))
    }

    /// Add a leaf of either kind.
    pub fn add_leaf(&mut self, leaf: Leaf, arguments: &[AxisId]) -> Result<NodeId> {
        match leaf {
            Leaf::Complex2(leaf) => {
                if !arguments.is_empty() {
                    return Err(JonesFitError::DimensionMismatch(format!(
                        "{} takes no arguments, {} given",
                        leaf.name(),
                        arguments.len()
                    )));
                }
                Ok(self.add_complex2_boxed(leaf))
            }
            Leaf::Scalar(leaf) => self.add_scalar_boxed(leaf, arguments),
        }
    }

    /// Union scope of `children` and, for each child, the map from its
    /// parameter indices to the union indices.
    fn union(&self, children: &[NodeId]) -> (Scope, Vec<Vec<usize>>) {
        let mut scope = Scope::default();
        for &child in children {
            for &leaf in &self.nodes[child.0].scope.leaves {
                if !scope.leaves.contains(&leaf) {
                    scope.leaves.push(leaf);
                    scope.offsets.push(scope.nparam);
                    scope.nparam += self.nodes[leaf.0].params.len();
                }
            }
        }

        let maps = children
            .iter()
            .map(|&child| {
                let mut map = Vec::with_capacity(self.nodes[child.0].scope.nparam);
                for &leaf in &self.nodes[child.0].scope.leaves {
                    // every child leaf was inserted above
                    let offset = scope.offset_of(leaf).unwrap_or_default();
                    map.extend(offset..offset + self.nodes[leaf.0].params.len());
                }
                map
            })
            .collect();

        (scope, maps)
    }

    /// Union scope of independent nodes and the parameter map of each.
    ///
    /// Used by owners of several models that share leaves, such as a
    /// measurement equation with many signal paths.
    pub fn union_scope(&self, children: &[NodeId]) -> Result<(Scope, Vec<Vec<usize>>)> {
        for &child in children {
            self.node(child)?;
        }
        Ok(self.union(children))
    }

    /// Ordered product of nodes of one kind.
    ///
    /// # Errors
    ///
    /// * `JonesFitError::DimensionMismatch` if the list is empty or mixes kinds
    /// * `JonesFitError::InvalidIndex` if a node does not exist
    pub fn product(&mut self, factors: &[NodeId]) -> Result<NodeId> {
        let first = factors
            .first()
            .ok_or_else(|| JonesFitError::DimensionMismatch("empty product".to_string()))?;
        let element = self.node(*first)?.element;
        for &factor in factors {
            if self.node(factor)?.element != element {
                return Err(JonesFitError::DimensionMismatch(format!(
                    "product mixes {:?} and {:?} factors",
                    element,
                    self.node(factor)?.element
                )));
            }
        }

        let (scope, maps) = self.union(factors);
        let kind = NodeKind::Product {
            factors: factors.to_vec(),
            maps,
        };
        Ok(self.push(kind, element, ParameterSet::new(), |_, _| scope))
    }

    /// Constrain parameter `index` of `model` to the output of `function`.
    ///
    /// The constrained parameter is removed from the fit; its value is
    /// rewritten by every evaluation of the chain.
    ///
    /// # Errors
    ///
    /// * `JonesFitError::InvalidParameter` if `index` is not a parameter of `model`
    /// * `JonesFitError::DimensionMismatch` if `function` is not scalar-valued
    pub fn chain(&mut self, model: NodeId, index: usize, function: NodeId) -> Result<NodeId> {
        let element = self.node(model)?.element;
        if self.node(function)?.element != Kind::Scalar {
            return Err(JonesFitError::DimensionMismatch(format!(
                "chain function {} is not scalar-valued",
                function
            )));
        }
        let target = self.node(model)?.scope.resolve(index).ok_or_else(|| {
            JonesFitError::InvalidParameter(format!(
                "chain: index {} >= nparam {} of model {}",
                index,
                self.nodes[model.0].scope.nparam,
                model
            ))
        })?;
        if self.nodes[function.0].scope.leaves.contains(&target.0) {
            return Err(JonesFitError::InvalidParameter(format!(
                "chain: function {} depends on the constrained parameter",
                function
            )));
        }

        self.nodes[target.0 .0].params.get_mut(target.1)?.set_infit(false);

        let (scope, maps) = self.union(&[model, function]);
        let mut maps = maps.into_iter();
        let model_map = maps.next().unwrap_or_default();
        let function_map = maps.next().unwrap_or_default();

        let kind = NodeKind::Chain {
            model,
            function,
            index,
            target,
            model_map,
            function_map,
        };
        Ok(self.push(kind, element, ParameterSet::new(), |_, _| scope))
    }

    // ----- axes -----------------------------------------------------------

    /// The axis with the given name, created (with value 0) if new.
    pub fn axis(&mut self, name: &str) -> AxisId {
        if let Some(id) = self.find_axis(name) {
            return id;
        }
        self.axes.push(Axis {
            name: name.to_string(),
            value: 0.0,
        });
        AxisId(self.axes.len() - 1)
    }

    /// The axis with the given name, if any.
    pub fn find_axis(&self, name: &str) -> Option<AxisId> {
        self.axes.iter().position(|a| a.name == name).map(AxisId)
    }

    /// Name of an axis.
    pub fn axis_name(&self, axis: AxisId) -> Result<&str> {
        self.axes
            .get(axis.0)
            .map(|a| a.name.as_str())
            .ok_or_else(|| JonesFitError::InvalidIndex(format!("axis {}", axis.0)))
    }

    /// Current value of an abscissa.
    pub fn abscissa(&self, axis: AxisId) -> Result<f64> {
        self.axes
            .get(axis.0)
            .map(|a| a.value)
            .ok_or_else(|| JonesFitError::InvalidIndex(format!("axis {}", axis.0)))
    }

    /// Set an abscissa value.
    pub fn set_abscissa(&mut self, axis: AxisId, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(JonesFitError::InvalidState(format!(
                "non-finite abscissa {} for axis {}",
                value, axis.0
            )));
        }
        let entry = self
            .axes
            .get_mut(axis.0)
            .ok_or_else(|| JonesFitError::InvalidIndex(format!("axis {}", axis.0)))?;
        if entry.value != value {
            entry.value = value;
            self.generation += 1;
        }
        Ok(())
    }

    // ----- inspection -----------------------------------------------------

    /// Value kind of a node.
    pub fn kind(&self, id: NodeId) -> Result<Kind> {
        Ok(self.node(id)?.element)
    }

    /// Parameter scope of a node.
    pub fn scope(&self, id: NodeId) -> Result<&Scope> {
        Ok(&self.node(id)?.scope)
    }

    /// Number of parameters reachable from a node.
    pub fn nparam(&self, id: NodeId) -> Result<usize> {
        Ok(self.node(id)?.scope.nparam)
    }

    /// Number of free parameters reachable from a node.
    pub fn nparam_infit(&self, id: NodeId) -> Result<usize> {
        let scope = &self.node(id)?.scope;
        Ok(scope
            .leaves
            .iter()
            .map(|leaf| self.nodes[leaf.0].params.nparam_infit())
            .sum())
    }

    /// Parameters owned by a leaf node (empty for composites).
    pub fn leaf_parameters(&self, id: NodeId) -> Result<&ParameterSet> {
        Ok(&self.node(id)?.params)
    }

    /// Human-readable description of a node, e.g. `Gain*Boost*Rotation`.
    pub fn describe(&self, id: NodeId) -> Result<String> {
        let node = self.node(id)?;
        Ok(match &node.kind {
            NodeKind::Complex2(leaf) => leaf.name().to_string(),
            NodeKind::Scalar { leaf, arguments } => {
                let names = arguments
                    .iter()
                    .map(|a| self.axis_name(*a).map(str::to_string))
                    .collect::<Result<Vec<_>>>()?;
                format!("{}({})", leaf.name(), names.join(","))
            }
            NodeKind::Product { factors, .. } => factors
                .iter()
                .map(|f| self.describe(*f))
                .collect::<Result<Vec<_>>>()?
                .join("*"),
            NodeKind::Chain {
                model,
                function,
                index,
                ..
            } => format!(
                "Chain({}[{}] <- {})",
                self.describe(*model)?,
                index,
                self.describe(*function)?
            ),
        })
    }

    // ----- parameters -----------------------------------------------------

    fn resolve(&self, id: NodeId, index: usize) -> Result<(NodeId, usize)> {
        let scope = &self.node(id)?.scope;
        scope.resolve(index).ok_or_else(|| {
            JonesFitError::InvalidParameter(format!("index {} >= nparam {} of node {}", index, scope.nparam, id))
        })
    }

    /// The parameter at `index` in the scope of `id`.
    pub fn parameter(&self, id: NodeId, index: usize) -> Result<&Parameter> {
        let (leaf, local) = self.resolve(id, index)?;
        Ok(self.nodes[leaf.0].params.get(local)?)
    }

    fn parameter_mut(&mut self, id: NodeId, index: usize) -> Result<&mut Parameter> {
        let (leaf, local) = self.resolve(id, index)?;
        Ok(self.nodes[leaf.0].params.get_mut(local)?)
    }

    /// Value of a parameter.
    pub fn param(&self, id: NodeId, index: usize) -> Result<f64> {
        Ok(self.parameter(id, index)?.value())
    }

    /// Set the value of a parameter.
    pub fn set_param(&mut self, id: NodeId, index: usize, value: f64) -> Result<()> {
        let param = self.parameter_mut(id, index)?;
        if param.value() != value {
            param.set_value(value)?;
            self.generation += 1;
        }
        Ok(())
    }

    /// Fit flag of a parameter.
    pub fn infit(&self, id: NodeId, index: usize) -> Result<bool> {
        Ok(self.parameter(id, index)?.infit())
    }

    /// Set the fit flag of a parameter.
    pub fn set_infit(&mut self, id: NodeId, index: usize, infit: bool) -> Result<()> {
        self.parameter_mut(id, index)?.set_infit(infit);
        Ok(())
    }

    /// Variance of a parameter.
    pub fn variance(&self, id: NodeId, index: usize) -> Result<f64> {
        Ok(self.parameter(id, index)?.variance())
    }

    /// Set the variance of a parameter.
    pub fn set_variance(&mut self, id: NodeId, index: usize, variance: f64) -> Result<()> {
        Ok(self.parameter_mut(id, index)?.set_variance(variance)?)
    }

    /// Name of a parameter.
    pub fn param_name(&self, id: NodeId, index: usize) -> Result<String> {
        Ok(self.parameter(id, index)?.name().to_string())
    }

    /// Index of the first parameter with the given name in the scope of `id`.
    pub fn find_param(&self, id: NodeId, name: &str) -> Result<Option<usize>> {
        let scope = &self.node(id)?.scope;
        for (k, leaf) in scope.leaves.iter().enumerate() {
            if let Some(local) = self.nodes[leaf.0].params.find(name) {
                return Ok(Some(scope.offsets[k] + local));
            }
        }
        Ok(None)
    }

    /// Set every parameter value in the scope of `id`.
    pub fn set_values(&mut self, id: NodeId, values: &[f64]) -> Result<()> {
        let nparam = self.nparam(id)?;
        if values.len() != nparam {
            return Err(JonesFitError::DimensionMismatch(format!(
                "{} values for {} parameters",
                values.len(),
                nparam
            )));
        }
        for (index, value) in values.iter().enumerate() {
            self.set_param(id, index, *value)?;
        }
        Ok(())
    }

    pub(crate) fn complex2_leaf(&self, id: NodeId) -> Result<(&dyn Complex2Leaf, &ParameterSet)> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Complex2(leaf) => Ok((leaf.as_ref(), &node.params)),
            _ => Err(JonesFitError::InvalidState(format!("node {} is not a Jones leaf", id))),
        }
    }

    pub(crate) fn scalar_leaf(&self, id: NodeId) -> Result<(&dyn ScalarLeaf, &[AxisId], &ParameterSet)> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Scalar { leaf, arguments } => Ok((leaf.as_ref(), arguments, &node.params)),
            _ => Err(JonesFitError::InvalidState(format!("node {} is not a scalar leaf", id))),
        }
    }

    // ----- evaluation -----------------------------------------------------

    /// Evaluate node `id`, filling `grad` with one entry per parameter in its scope.
    ///
    /// # Errors
    ///
    /// * `JonesFitError::InvalidState` if the node does not produce `E`
    /// * `JonesFitError::NonFinite` if the value is not finite
    pub fn evaluate<E: Element>(&mut self, id: NodeId, grad: Option<&mut Vec<E>>) -> Result<E> {
        let node = self.node(id)?;
        if node.element != E::KIND {
            return Err(JonesFitError::InvalidState(format!(
                "node {} evaluates to {:?}, not {:?}",
                id,
                node.element,
                E::KIND
            )));
        }
        let nparam = node.scope.nparam;
        let shape = node.shape();

        let grad = grad.map(|g| {
            g.clear();
            g.resize(nparam, E::zero());
            g
        });

        let value = match shape {
            Shape::Leaf => E::evaluate_leaf(self, id, grad.map(|g| g.as_mut_slice()))?,
            Shape::Product => self.evaluate_product(id, grad)?,
            Shape::Chain => self.evaluate_chain(id, grad)?,
        };

        if !value.is_finite() {
            return Err(JonesFitError::NonFinite(format!("{} = {:?}", self.describe(id)?, value)));
        }
        Ok(value)
    }

    fn evaluate_product<E: Element>(&mut self, id: NodeId, grad: Option<&mut Vec<E>>) -> Result<E> {
        let factors = match &self.nodes[id.0].kind {
            NodeKind::Product { factors, .. } => factors.clone(),
            _ => return Err(JonesFitError::InvalidState(format!("node {} is not a product", id))),
        };

        let want = grad.is_some();
        let mut values = Vec::with_capacity(factors.len());
        let mut grads: Vec<Vec<E>> = Vec::with_capacity(if want { factors.len() } else { 0 });
        for &factor in &factors {
            if want {
                let mut g = Vec::new();
                values.push(self.evaluate(factor, Some(&mut g))?);
                grads.push(g);
            } else {
                values.push(self.evaluate::<E>(factor, None)?);
            }
        }

        let value = values.iter().fold(E::one(), |acc, v| acc.product(v));

        if let Some(grad) = grad {
            let n = values.len();
            let mut prefix = Vec::with_capacity(n);
            let mut acc = E::one();
            for v in &values {
                prefix.push(acc.clone());
                acc = acc.product(v);
            }
            let mut suffix = vec![E::one(); n];
            let mut acc = E::one();
            for k in (0..n).rev() {
                suffix[k] = acc.clone();
                acc = values[k].product(&acc);
            }

            if let NodeKind::Product { maps, .. } = &self.nodes[id.0].kind {
                for (k, factor_grad) in grads.iter().enumerate() {
                    for (i, g) in factor_grad.iter().enumerate() {
                        let term = prefix[k].product(g).product(&suffix[k]);
                        grad[maps[k][i]].accumulate(&term);
                    }
                }
            }
        }

        Ok(value)
    }

    fn evaluate_chain<E: Element>(&mut self, id: NodeId, grad: Option<&mut Vec<E>>) -> Result<E> {
        let (model, function, index, target) = match &self.nodes[id.0].kind {
            NodeKind::Chain {
                model,
                function,
                index,
                target,
                ..
            } => (*model, *function, *index, *target),
            _ => return Err(JonesFitError::InvalidState(format!("node {} is not a chain", id))),
        };

        let want = grad.is_some();
        let mut fgrad: Vec<f64> = Vec::new();
        let derived = self.evaluate::<f64>(function, if want { Some(&mut fgrad) } else { None })?;

        // the derived value does not bump the generation: it is a pure
        // function of state already counted
        self.nodes[target.0 .0].params.get_mut(target.1)?.set_value(derived)?;

        let mut mgrad: Vec<E> = Vec::new();
        let value = self.evaluate::<E>(model, if want { Some(&mut mgrad) } else { None })?;

        if let Some(grad) = grad {
            if let NodeKind::Chain {
                model_map,
                function_map,
                ..
            } = &self.nodes[id.0].kind
            {
                for (i, g) in mgrad.iter().enumerate() {
                    grad[model_map[i]].accumulate(g);
                }
                let dmodel = &mgrad[index];
                for (p, df) in fgrad.iter().enumerate() {
                    grad[function_map[p]].accumulate(&dmodel.scaled(*df));
                }
            }
        }

        Ok(value)
    }

    /// Chain-rule propagation of a fitted covariance onto the parameter
    /// constrained by chain `id`.
    ///
    /// `covariance` is indexed by the scope of `outer`, which must contain
    /// the chain. Returns `cov(f, i) = sum_p df/dp cov(p, i)` for every outer
    /// index `i` and the variance `g^T C g`.
    pub fn chain_covariance(&mut self, id: NodeId, outer: NodeId, covariance: &ndarray::Array2<f64>) -> Result<ChainCovariance> {
        let scope = self.scope(outer)?.clone();
        self.chain_covariance_in(id, &scope, covariance)
    }

    /// Like [`Arena::chain_covariance`], with `covariance` indexed by an
    /// arbitrary scope (see [`Arena::union_scope`]).
    pub fn chain_covariance_in(&mut self, id: NodeId, scope: &Scope, covariance: &ndarray::Array2<f64>) -> Result<ChainCovariance> {
        let function = match &self.node(id)?.kind {
            NodeKind::Chain { function, .. } => *function,
            _ => return Err(JonesFitError::InvalidState(format!("node {} is not a chain", id))),
        };
        let nparam = scope.nparam();
        if covariance.nrows() != nparam || covariance.ncols() != nparam {
            return Err(JonesFitError::DimensionMismatch(format!(
                "covariance is {}x{}; nparam={}",
                covariance.nrows(),
                covariance.ncols(),
                nparam
            )));
        }

        let mut fgrad: Vec<f64> = Vec::new();
        self.evaluate::<f64>(function, Some(&mut fgrad))?;

        let mut gradient = ndarray::Array1::<f64>::zeros(nparam);
        let mut p = 0;
        for &leaf in &self.nodes[function.0].scope.leaves {
            let offset = scope.offset_of(leaf).ok_or_else(|| {
                JonesFitError::InvalidIndex(format!("chain {} is not part of the covariance scope", id))
            })?;
            for k in 0..self.nodes[leaf.0].params.len() {
                gradient[offset + k] += fgrad[p];
                p += 1;
            }
        }

        let (row, variance) = crate::uncertainty::propagate(&gradient, covariance)?;
        Ok(ChainCovariance {
            row: row.to_vec(),
            variance,
        })
    }
}
