//! Mutation executor: absolute-target writes with refresh propagation.

use std::sync::Arc;

use weft_graph::builtins::OP_GET;
use weft_graph::{resolve_vars, FrameStack, Node, NodeRef};

use crate::backend::{WriteRequest, MUTATION_SET};
use crate::client::EvalClient;
use crate::error::EvalError;

/// Translates "set this logical target" into a backend write
///
/// Writes are deliberately followed by a coarse [`EvalClient::refresh_all`]
/// rather than fine-grained invalidation.
#[derive(Debug, Clone)]
pub struct MutationExecutor {
    client: EvalClient,
}

impl MutationExecutor {
    /// Create an executor over a client
    #[inline]
    #[must_use]
    pub fn new(client: EvalClient) -> Self {
        Self { client }
    }

    /// Replace the artifact addressed by `uri` with `value`
    ///
    /// # Errors
    /// Construction/resolution errors, or the backend's rejection. Rejected
    /// writes are surfaced as-is; there is no automatic retry.
    pub async fn set_uri(
        &self,
        uri: &str,
        stack: &FrameStack,
        value: NodeRef,
    ) -> Result<NodeRef, EvalError> {
        let target = self.client.ops().op_get(uri)?;
        self.set(&target, stack, value).await
    }

    /// Replace the value addressed by `target` with `value`
    ///
    /// The target is made absolute against `stack`, the root artifact fetch
    /// is derived from its shape, and the write is submitted. On success all
    /// cached loadables are refreshed and the node for the updated artifact
    /// is returned.
    ///
    /// # Errors
    /// Construction/resolution errors, [`EvalError::NoMutationRoot`] when the
    /// target has no addressable root, or the backend's rejection.
    pub async fn set(
        &self,
        target: &NodeRef,
        stack: &FrameStack,
        value: NodeRef,
    ) -> Result<NodeRef, EvalError> {
        let absolute = resolve_vars(target, stack)?;
        let root = mutation_root(&absolute).ok_or(EvalError::NoMutationRoot)?;
        tracing::info!(op = MUTATION_SET, "submitting mutation");

        let request = WriteRequest {
            root,
            target: absolute,
            op: MUTATION_SET.to_string(),
            value,
        };
        let updated = self.client.backend().write(request).await?;
        self.client.refresh_all();
        Ok(updated)
    }
}

/// The innermost artifact fetch a target expression hangs off
///
/// Walks the first-input chain of op applications until a `get` (or a bare
/// literal root) is found.
fn mutation_root(node: &NodeRef) -> Option<NodeRef> {
    match node.as_ref() {
        Node::Const { .. } => Some(Arc::clone(node)),
        Node::Var { .. } => None,
        Node::Output { op, inputs, .. } => {
            if op == OP_GET {
                Some(Arc::clone(node))
            } else {
                inputs.values().next().and_then(mutation_root)
            }
        }
    }
}
