//! Execution backend contract.

use weft_graph::NodeRef;

/// Op name used for replacement writes
pub const MUTATION_SET: &str = "set";

/// A write against the backend, derived from an absolute target expression
#[derive(Debug, Clone)]
pub struct WriteRequest {
    /// The innermost artifact fetch being replaced
    pub root: NodeRef,
    /// The absolute (variable-free) target expression
    pub target: NodeRef,
    /// Mutation op name, e.g. [`MUTATION_SET`]
    pub op: String,
    /// Replacement expression
    pub value: NodeRef,
}

/// The external service that runs expressions
///
/// Expressions handed to a backend are always variable-free: the client
/// dereferences against the frame stack before dispatch. Backends must be
/// idempotent for pure expressions and tolerate repeated identical queries.
#[async_trait::async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Materialize an expression's value
    async fn query(&self, node: &NodeRef) -> Result<weft_graph::Value, BackendError>;

    /// Compute the concrete output type of an expression without fully
    /// materializing its value; the returned node carries the refined type
    async fn refine_type(&self, node: &NodeRef) -> Result<NodeRef, BackendError>;

    /// Apply a write and return a node addressing the updated artifact
    async fn write(&self, request: WriteRequest) -> Result<NodeRef, BackendError>;
}

/// Errors surfaced by an execution backend
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// Query execution rejected
    #[error("query failed: {0}")]
    Query(String),

    /// Type refinement rejected
    #[error("type refinement failed: {0}")]
    Refine(String),

    /// Write rejected
    #[error("write rejected: {0}")]
    Write(String),

    /// Backend not reachable
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
