//! Variable-binding frames and substitution.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::GraphError;
use crate::node::{Node, NodeRef};

/// One level of variable bindings: name to bound expression
pub type Frame = IndexMap<String, NodeRef>;

/// Ordered list of frames threaded through evaluation
///
/// Lookup proceeds innermost-first, so a pushed frame shadows outer bindings
/// of the same name. The stack never mutates the nodes it binds.
#[derive(Debug, Clone, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

/// Bindings nested deeper than this indicate a cycle in the frame itself.
const MAX_RESOLVE_DEPTH: usize = 64;

impl FrameStack {
    /// Empty stack
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack with a single frame
    #[inline]
    #[must_use]
    pub fn from_frame(frame: Frame) -> Self {
        Self {
            frames: vec![frame],
        }
    }

    /// Push an inner frame, shadowing outer bindings
    #[inline]
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Look up a binding, innermost frame first
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&NodeRef> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Number of frames
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether the stack holds no frames
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Rebuild `node` with every `var` substituted from `stack`
///
/// The result is variable-free and suitable for content addressing. Subtrees
/// without variables keep their original `Arc`s, preserving sharing.
///
/// # Errors
/// - [`GraphError::UnboundVariable`] when a variable has no binding
/// - [`GraphError::ResolutionDepth`] when bindings chain through more than
///   64 substitutions (a cyclic frame)
pub fn resolve_vars(node: &NodeRef, stack: &FrameStack) -> Result<NodeRef, GraphError> {
    resolve_at_depth(node, stack, 0)
}

fn resolve_at_depth(
    node: &NodeRef,
    stack: &FrameStack,
    depth: usize,
) -> Result<NodeRef, GraphError> {
    if depth > MAX_RESOLVE_DEPTH {
        return Err(GraphError::ResolutionDepth(MAX_RESOLVE_DEPTH));
    }
    match node.as_ref() {
        Node::Const { .. } => Ok(Arc::clone(node)),
        Node::Var { name, .. } => {
            let bound = stack
                .lookup(name)
                .ok_or_else(|| GraphError::UnboundVariable(name.clone()))?;
            // The binding may itself contain variables.
            resolve_at_depth(bound, stack, depth + 1)
        }
        Node::Output { op, inputs, ty } => {
            if !node.has_free_vars() {
                return Ok(Arc::clone(node));
            }
            let mut resolved = IndexMap::with_capacity(inputs.len());
            for (name, input) in inputs {
                resolved.insert(name.clone(), resolve_at_depth(input, stack, depth)?);
            }
            Ok(Arc::new(Node::Output {
                op: op.clone(),
                inputs: resolved,
                ty: ty.clone(),
            }))
        }
    }
}
