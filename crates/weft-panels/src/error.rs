//! Error types for the panel layer.

use weft_engine::EvalError;
use weft_graph::GraphError;

/// Registration-time errors
///
/// These are the only panel errors that indicate a programming mistake; all
/// runtime resolution mismatches are handled by fallback sentinels instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two specs registered under the same id
    #[error("panel id already registered: {0}")]
    DuplicateId(String),

    /// A panel id containing `.` (reserved for stack paths)
    #[error("panel id may not contain '.': {0}")]
    InvalidId(String),
}

/// Errors raised by the panel host
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// Expression construction failed while building a layer's input
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Evaluation against the backend failed
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// Registry assembly failed
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}
