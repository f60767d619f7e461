//! Builtin op catalog
//!
//! The small op vocabulary every installation starts from: artifact access,
//! list indexing and paging, record field access. Panel transforms extend
//! this catalog at startup through [`OpRegistry::register_panel_op`].

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use weft_types::Type;

use crate::error::GraphError;
use crate::node::{Node, NodeRef};
use crate::op::{OpDef, OpRegistry, OutputType};

/// Op fetching an artifact by URI; its output type is refined by the backend
pub const OP_GET: &str = "get";
/// Op selecting one element of a list
pub const OP_INDEX: &str = "index";
/// Op selecting one field of a record
pub const OP_PICK: &str = "pick";
/// Op counting list elements
pub const OP_COUNT: &str = "count";
/// Op taking a bounded page of a list
pub const OP_LIMIT: &str = "limit";

static BUILTINS: Lazy<OpRegistry> = Lazy::new(|| {
    let mut ops = OpRegistry::new();
    for def in builtin_defs() {
        ops.register(def).expect("builtin catalog has unique names");
    }
    ops
});

fn builtin_defs() -> Vec<OpDef> {
    vec![
        OpDef::new(
            OP_GET,
            [("uri", Type::String)],
            OutputType::Fixed(Type::Any),
        ),
        OpDef::new(
            OP_INDEX,
            [("arr", Type::list(Type::Any)), ("index", Type::Number)],
            OutputType::Derived(Arc::new(derive_index)),
        ),
        OpDef::new(
            OP_PICK,
            [("obj", Type::Any), ("key", Type::String)],
            OutputType::Derived(Arc::new(derive_pick)),
        ),
        OpDef::new(
            OP_COUNT,
            [("arr", Type::list(Type::Any))],
            OutputType::Fixed(Type::Number),
        ),
        OpDef::new(
            OP_LIMIT,
            [
                ("arr", Type::list(Type::Any)),
                ("limit", Type::Number),
                ("offset", Type::Number),
            ],
            OutputType::Derived(Arc::new(derive_limit)),
        ),
    ]
}

/// Indexing may run past the end, so the element type is made nullable.
fn derive_index(inputs: &IndexMap<String, NodeRef>) -> Type {
    match inputs.get("arr").map(|arr| arr.ty()) {
        Some(Type::List { of }) => Type::maybe((**of).clone()),
        Some(Type::Unknown) => Type::Unknown,
        _ => Type::Any,
    }
}

/// A field type when the record shape and key are statically known.
fn derive_pick(inputs: &IndexMap<String, NodeRef>) -> Type {
    let obj_ty = inputs.get("obj").map(|obj| obj.ty());
    let key = inputs
        .get("key")
        .and_then(|key| key.const_value())
        .and_then(serde_json::Value::as_str);
    match (obj_ty, key) {
        (Some(Type::TypedDict { fields }), Some(key)) => {
            fields.get(key).cloned().unwrap_or(Type::None)
        }
        _ => Type::Any,
    }
}

/// A page of a list has the list's own type.
fn derive_limit(inputs: &IndexMap<String, NodeRef>) -> Type {
    inputs
        .get("arr")
        .map_or(Type::Any, |arr| arr.ty().clone())
}

impl OpRegistry {
    /// Registry pre-seeded with the builtin catalog
    #[must_use]
    pub fn with_builtins() -> Self {
        BUILTINS.clone()
    }

    /// `get(uri)` construction helper
    ///
    /// # Errors
    /// Propagates construction errors from [`OpRegistry::call`].
    pub fn op_get(&self, uri: &str) -> Result<NodeRef, GraphError> {
        self.call(OP_GET, [("uri", Node::string(uri))])
    }

    /// `index(arr, index)` construction helper
    ///
    /// # Errors
    /// Propagates construction errors from [`OpRegistry::call`].
    pub fn op_index(&self, arr: NodeRef, index: f64) -> Result<NodeRef, GraphError> {
        self.call(OP_INDEX, [("arr", arr), ("index", Node::number(index))])
    }

    /// `pick(obj, key)` construction helper
    ///
    /// # Errors
    /// Propagates construction errors from [`OpRegistry::call`].
    pub fn op_pick(&self, obj: NodeRef, key: &str) -> Result<NodeRef, GraphError> {
        self.call(OP_PICK, [("obj", obj), ("key", Node::string(key))])
    }

    /// `count(arr)` construction helper
    ///
    /// # Errors
    /// Propagates construction errors from [`OpRegistry::call`].
    pub fn op_count(&self, arr: NodeRef) -> Result<NodeRef, GraphError> {
        self.call(OP_COUNT, [("arr", arr)])
    }

    /// `limit(arr, limit, offset)` construction helper
    ///
    /// # Errors
    /// Propagates construction errors from [`OpRegistry::call`].
    pub fn op_limit(&self, arr: NodeRef, limit: f64, offset: f64) -> Result<NodeRef, GraphError> {
        self.call(
            OP_LIMIT,
            [
                ("arr", arr),
                ("limit", Node::number(limit)),
                ("offset", Node::number(offset)),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_any_until_refined() {
        let ops = OpRegistry::with_builtins();
        let node = ops.op_get("local-artifact:///runs/table.json").unwrap();
        assert_eq!(node.ty(), &Type::Any);
    }

    #[test]
    fn index_derives_nullable_element_type() {
        let ops = OpRegistry::with_builtins();
        let arr = Node::constant(Type::list(Type::String), serde_json::json!(["a", "b"]));
        let node = ops.op_index(arr, 0.0).unwrap();
        assert_eq!(node.ty(), &Type::maybe(Type::String));
    }

    #[test]
    fn index_rejects_non_lists() {
        let ops = OpRegistry::with_builtins();
        let err = ops.op_index(Node::string("not a list"), 0.0).unwrap_err();
        assert!(matches!(err, GraphError::InputTypeMismatch { .. }));
    }

    #[test]
    fn pick_derives_field_type_for_known_shapes() {
        let ops = OpRegistry::with_builtins();
        let obj = Node::constant(
            Type::typed_dict([("name", Type::String), ("step", Type::Number)]),
            serde_json::json!({"name": "run-a", "step": 7}),
        );
        let node = ops.op_pick(Arc::clone(&obj), "step").unwrap();
        assert_eq!(node.ty(), &Type::Number);

        let missing = ops.op_pick(obj, "absent").unwrap();
        assert_eq!(missing.ty(), &Type::None);
    }

    #[test]
    fn limit_preserves_the_list_type() {
        let ops = OpRegistry::with_builtins();
        let arr = Node::constant(Type::list(Type::Number), serde_json::json!([1, 2, 3]));
        let node = ops.op_limit(arr, 2.0, 0.0).unwrap();
        assert_eq!(node.ty(), &Type::list(Type::Number));
    }

    #[test]
    fn count_is_a_number() {
        let ops = OpRegistry::with_builtins();
        let arr = Node::constant(Type::list(Type::Any), serde_json::json!([]));
        let node = ops.op_count(arr).unwrap();
        assert_eq!(node.ty(), &Type::Number);
    }
}
