//! Expression nodes.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use weft_types::Type;

/// Literal values carried by `const` nodes and produced by evaluation
pub type Value = serde_json::Value;

/// Shared reference to an immutable expression
///
/// Shared subexpressions are held by reference, so expressions form a DAG
/// rather than a tree.
pub type NodeRef = Arc<Node>;

/// An expression in the computation graph
///
/// Nodes are immutable once built. The three variants are an explicit tagged
/// union; nothing downstream probes shapes to classify a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum Node {
    /// Named free variable, resolved against a frame at evaluation time
    Var {
        /// Variable name
        name: String,
        /// Declared type of the binding this variable expects
        ty: Type,
    },

    /// Literal value with its type
    Const {
        /// Type of the literal
        ty: Type,
        /// The literal itself
        value: Value,
    },

    /// Application of a named op to named input expressions
    Output {
        /// Op name, resolved through the op registry
        op: String,
        /// Named inputs in declaration order
        inputs: IndexMap<String, NodeRef>,
        /// Output type; provisional until backend refinement
        ty: Type,
    },
}

impl Node {
    /// The node's (possibly provisional) type
    #[inline]
    #[must_use]
    pub fn ty(&self) -> &Type {
        match self {
            Node::Var { ty, .. } | Node::Const { ty, .. } | Node::Output { ty, .. } => ty,
        }
    }

    /// The literal value, for `const` nodes
    #[inline]
    #[must_use]
    pub fn const_value(&self) -> Option<&Value> {
        match self {
            Node::Const { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Whether any `var` node occurs in this expression
    #[must_use]
    pub fn has_free_vars(&self) -> bool {
        match self {
            Node::Var { .. } => true,
            Node::Const { .. } => false,
            Node::Output { inputs, .. } => inputs.values().any(|input| input.has_free_vars()),
        }
    }

    /// Build a free variable node
    #[inline]
    #[must_use]
    pub fn var(name: impl Into<String>, ty: Type) -> NodeRef {
        Arc::new(Node::Var {
            name: name.into(),
            ty,
        })
    }

    /// Build a typed literal node
    #[inline]
    #[must_use]
    pub fn constant(ty: Type, value: Value) -> NodeRef {
        Arc::new(Node::Const { ty, value })
    }

    /// String literal
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> NodeRef {
        Self::constant(Type::String, Value::String(value.into()))
    }

    /// Numeric literal
    #[inline]
    #[must_use]
    pub fn number(value: f64) -> NodeRef {
        let value = serde_json::Number::from_f64(value)
            .map_or(Value::Null, Value::Number);
        Self::constant(Type::Number, value)
    }

    /// Boolean literal
    #[inline]
    #[must_use]
    pub fn boolean(value: bool) -> NodeRef {
        Self::constant(Type::Boolean, Value::Bool(value))
    }

    /// The absent value
    #[inline]
    #[must_use]
    pub fn none() -> NodeRef {
        Self::constant(Type::None, Value::Null)
    }
}
