//! Error types for the evaluation client.

use crate::backend::BackendError;
use weft_graph::GraphError;

/// Errors raised while evaluating or mutating expressions
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Expression construction or variable resolution failed
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// The backend rejected the request
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A mutation target's expression has no addressable root fetch
    #[error("mutation target has no addressable root")]
    NoMutationRoot,
}
