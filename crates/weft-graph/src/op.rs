//! Op definitions and the op registry.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use weft_types::Type;

use crate::error::GraphError;
use crate::node::{Node, NodeRef};

/// Derives an output type from the supplied input nodes
pub type DeriveFn = Arc<dyn Fn(&IndexMap<String, NodeRef>) -> Type + Send + Sync>;

/// Rewrites an op application into the expression it stands for
///
/// Synthetic panel ops carry one of these so "apply this panel's transform"
/// is an ordinary graph rewrite.
pub type ExpansionFn =
    Arc<dyn Fn(&IndexMap<String, NodeRef>) -> Result<NodeRef, GraphError> + Send + Sync>;

/// How an op's output type is determined at construction time
#[derive(Clone)]
pub enum OutputType {
    /// Always the same type
    Fixed(Type),
    /// Computed from the input nodes' types
    Derived(DeriveFn),
}

impl fmt::Debug for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputType::Fixed(ty) => f.debug_tuple("Fixed").field(ty).finish(),
            OutputType::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Definition of a graph op
///
/// Ops declare their named inputs with types; [`OpRegistry::call`] checks
/// arity and assignability before a node is built, so malformed applications
/// never enter the graph.
#[derive(Clone)]
pub struct OpDef {
    name: String,
    input_types: IndexMap<String, Type>,
    output: OutputType,
    expansion: Option<ExpansionFn>,
}

impl OpDef {
    /// Define an op
    #[must_use]
    pub fn new<K: Into<String>>(
        name: impl Into<String>,
        input_types: impl IntoIterator<Item = (K, Type)>,
        output: OutputType,
    ) -> Self {
        Self {
            name: name.into(),
            input_types: input_types
                .into_iter()
                .map(|(k, t)| (k.into(), t))
                .collect(),
            output,
            expansion: None,
        }
    }

    /// Attach an expansion rewrite
    #[must_use]
    pub fn with_expansion(mut self, expansion: ExpansionFn) -> Self {
        self.expansion = Some(expansion);
        self
    }

    /// Op name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared inputs in declaration order
    #[inline]
    #[must_use]
    pub fn input_types(&self) -> &IndexMap<String, Type> {
        &self.input_types
    }

    /// Output type for a concrete application
    #[must_use]
    pub fn output_type_for(&self, inputs: &IndexMap<String, NodeRef>) -> Type {
        match &self.output {
            OutputType::Fixed(ty) => ty.clone(),
            OutputType::Derived(derive) => derive(inputs),
        }
    }

    /// Expand an application into the expression it stands for, if this op
    /// carries an expansion
    ///
    /// # Errors
    /// Propagates construction errors from the expansion body.
    pub fn expand(&self, inputs: &IndexMap<String, NodeRef>) -> Option<Result<NodeRef, GraphError>> {
        self.expansion.as_ref().map(|expansion| expansion(inputs))
    }
}

impl fmt::Debug for OpDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpDef")
            .field("name", &self.name)
            .field("inputs", &self.input_types.keys().collect::<Vec<_>>())
            .field("output", &self.output)
            .field("expansion", &self.expansion.is_some())
            .finish()
    }
}

/// Append-only catalog of ops, keyed by name
///
/// Registration happens once at startup; construction and evaluation only
/// read. Registration order is preserved.
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    ops: IndexMap<String, Arc<OpDef>>,
}

impl OpRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an op definition
    ///
    /// # Errors
    /// Returns [`GraphError::DuplicateOp`] if the name is already taken.
    pub fn register(&mut self, def: OpDef) -> Result<(), GraphError> {
        if self.ops.contains_key(def.name()) {
            return Err(GraphError::DuplicateOp(def.name().to_string()));
        }
        self.ops.insert(def.name().to_string(), Arc::new(def));
        Ok(())
    }

    /// Register the synthetic op for a panel transform
    ///
    /// The op is named `panel-<id>`, takes a single `input` expression, and
    /// expands to the panel's transform of that expression.
    ///
    /// # Errors
    /// Returns [`GraphError::DuplicateOp`] if the panel id was already
    /// registered.
    pub fn register_panel_op(
        &mut self,
        panel_id: &str,
        input_type: Type,
        output: OutputType,
        expansion: ExpansionFn,
    ) -> Result<(), GraphError> {
        let def = OpDef::new(
            format!("panel-{panel_id}"),
            [("input", input_type)],
            output,
        )
        .with_expansion(expansion);
        self.register(def)
    }

    /// Look up an op by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<OpDef>> {
        self.ops.get(name)
    }

    /// Registered names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.ops.keys().map(String::as_str).collect()
    }

    /// Number of registered ops
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Build an `Output` node applying `name` to `inputs`
    ///
    /// Checks that every declared input is supplied with an assignable type
    /// and that nothing undeclared is supplied, then derives the output type.
    ///
    /// # Errors
    /// - [`GraphError::OpNotFound`] for an unknown op
    /// - [`GraphError::MissingInput`] / [`GraphError::UnknownInput`] on arity
    ///   mismatch
    /// - [`GraphError::InputTypeMismatch`] when a supplied node does not fit
    ///   the declared input type
    pub fn call<K: Into<String>>(
        &self,
        name: &str,
        inputs: impl IntoIterator<Item = (K, NodeRef)>,
    ) -> Result<NodeRef, GraphError> {
        let def = self
            .get(name)
            .ok_or_else(|| GraphError::OpNotFound(name.to_string()))?;

        let supplied: IndexMap<String, NodeRef> = inputs
            .into_iter()
            .map(|(k, node)| (k.into(), node))
            .collect();

        for input_name in supplied.keys() {
            if !def.input_types().contains_key(input_name) {
                return Err(GraphError::UnknownInput {
                    op: name.to_string(),
                    input: input_name.clone(),
                });
            }
        }
        // Re-key in declaration order so structurally equal applications
        // hash equally regardless of argument spelling order.
        let mut ordered = IndexMap::with_capacity(def.input_types().len());
        for (input_name, expected) in def.input_types() {
            let node = supplied
                .get(input_name)
                .ok_or_else(|| GraphError::MissingInput {
                    op: name.to_string(),
                    input: input_name.clone(),
                })?;
            if !node.ty().is_assignable_to(expected) {
                return Err(GraphError::InputTypeMismatch {
                    op: name.to_string(),
                    input: input_name.clone(),
                    expected: expected.clone(),
                    actual: node.ty().clone(),
                });
            }
            ordered.insert(input_name.clone(), Arc::clone(node));
        }

        let ty = def.output_type_for(&ordered);
        Ok(Arc::new(Node::Output {
            op: name.to_string(),
            inputs: ordered,
            ty,
        }))
    }
}
