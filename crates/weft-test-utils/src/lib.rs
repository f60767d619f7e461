//! Testing utilities for the Weft workspace
//!
//! Shared fixtures: a scriptable execution backend and node builders.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use weft_engine::{BackendError, ExecutionBackend, WriteRequest};
use weft_graph::builtins::{OP_COUNT, OP_GET, OP_INDEX, OP_LIMIT, OP_PICK};
use weft_graph::{ExprHash, Node, NodeRef, Value};
use weft_types::Type;

/// In-memory execution backend scripted per expression hash
///
/// Unscripted expressions are evaluated structurally: literals yield their
/// values, and the builtin list/record ops are interpreted over whatever
/// their inputs evaluate to. Latencies let tests stage slow/fast races.
#[derive(Default)]
pub struct StubBackend {
    values: Mutex<HashMap<ExprHash, Value>>,
    refinements: Mutex<HashMap<ExprHash, NodeRef>>,
    latencies: Mutex<HashMap<ExprHash, Duration>>,
    queries: Mutex<Vec<ExprHash>>,
    fail_writes: Mutex<bool>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Script the value returned for exactly this expression
    pub fn put_value(&self, node: &NodeRef, value: Value) {
        let hash = ExprHash::of(node).expect("fixture nodes encode");
        self.values.lock().insert(hash, value);
    }

    /// Script the refined node returned for exactly this expression
    pub fn put_refinement(&self, node: &NodeRef, refined: NodeRef) {
        let hash = ExprHash::of(node).expect("fixture nodes encode");
        self.refinements.lock().insert(hash, refined);
    }

    /// Delay responses for exactly this expression
    pub fn put_latency(&self, node: &NodeRef, latency: Duration) {
        let hash = ExprHash::of(node).expect("fixture nodes encode");
        self.latencies.lock().insert(hash, latency);
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self) {
        *self.fail_writes.lock() = true;
    }

    /// Number of queries dispatched so far
    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    /// How many queries were dispatched for exactly this expression
    pub fn queries_for(&self, node: &NodeRef) -> usize {
        let hash = ExprHash::of(node).expect("fixture nodes encode");
        self.queries.lock().iter().filter(|q| **q == hash).count()
    }

    fn eval(&self, node: &NodeRef) -> Result<Value, BackendError> {
        let hash = ExprHash::of(node)
            .map_err(|err| BackendError::Query(err.to_string()))?;
        if let Some(value) = self.values.lock().get(&hash) {
            return Ok(value.clone());
        }
        match node.as_ref() {
            Node::Const { value, .. } => Ok(value.clone()),
            Node::Var { name, .. } => Err(BackendError::Query(format!(
                "unresolved variable reached backend: {name}"
            ))),
            Node::Output { op, inputs, .. } => self.eval_op(op, inputs),
        }
    }

    fn eval_op(
        &self,
        op: &str,
        inputs: &IndexMap<String, NodeRef>,
    ) -> Result<Value, BackendError> {
        let input = |name: &str| -> Result<Value, BackendError> {
            let node = inputs
                .get(name)
                .ok_or_else(|| BackendError::Query(format!("{op}: missing input {name}")))?;
            self.eval(node)
        };
        match op {
            OP_GET => Err(BackendError::Query(
                "no scripted artifact for get".to_string(),
            )),
            OP_COUNT => {
                let arr = as_array(&input("arr")?)?;
                Ok(Value::from(arr.len()))
            }
            OP_INDEX => {
                let arr = as_array(&input("arr")?)?;
                let index = as_index(&input("index")?)?;
                Ok(arr.get(index).cloned().unwrap_or(Value::Null))
            }
            OP_LIMIT => {
                let arr = as_array(&input("arr")?)?;
                let limit = as_index(&input("limit")?)?;
                let offset = as_index(&input("offset")?)?;
                let page: Vec<Value> = arr.iter().skip(offset).take(limit).cloned().collect();
                Ok(Value::Array(page))
            }
            OP_PICK => {
                let obj = input("obj")?;
                let key = input("key")?;
                let key = key
                    .as_str()
                    .ok_or_else(|| BackendError::Query("pick: key is not a string".into()))?;
                Ok(obj.get(key).cloned().unwrap_or(Value::Null))
            }
            other => Err(BackendError::Query(format!("unscripted op: {other}"))),
        }
    }
}

fn as_array(value: &Value) -> Result<Vec<Value>, BackendError> {
    value
        .as_array()
        .cloned()
        .ok_or_else(|| BackendError::Query("expected a list value".into()))
}

fn as_index(value: &Value) -> Result<usize, BackendError> {
    value
        .as_f64()
        .map(|f| f.max(0.0) as usize)
        .ok_or_else(|| BackendError::Query("expected a numeric value".into()))
}

#[async_trait::async_trait]
impl ExecutionBackend for StubBackend {
    async fn query(&self, node: &NodeRef) -> Result<Value, BackendError> {
        let hash = ExprHash::of(node)
            .map_err(|err| BackendError::Query(err.to_string()))?;
        self.queries.lock().push(hash);
        let latency = self.latencies.lock().get(&hash).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.eval(node)
    }

    async fn refine_type(&self, node: &NodeRef) -> Result<NodeRef, BackendError> {
        let hash = ExprHash::of(node)
            .map_err(|err| BackendError::Refine(err.to_string()))?;
        if let Some(refined) = self.refinements.lock().get(&hash) {
            return Ok(Arc::clone(refined));
        }
        Ok(Arc::clone(node))
    }

    async fn write(&self, request: WriteRequest) -> Result<NodeRef, BackendError> {
        if *self.fail_writes.lock() {
            return Err(BackendError::Write("scripted write failure".into()));
        }
        Ok(request.root)
    }
}

/// Const node holding a list of values
pub fn list_node(elem_ty: Type, values: Vec<Value>) -> NodeRef {
    Node::constant(Type::list(elem_ty), Value::Array(values))
}

/// Const node holding a list of strings
pub fn string_list_node(items: &[&str]) -> NodeRef {
    list_node(
        Type::String,
        items.iter().map(|s| Value::from(*s)).collect(),
    )
}

/// A typed-dict node shaped like a run record
pub fn run_record_node(name: &str, step: f64) -> NodeRef {
    Node::constant(
        Type::typed_dict([("name", Type::String), ("step", Type::Number)]),
        serde_json::json!({ "name": name, "step": step }),
    )
}
