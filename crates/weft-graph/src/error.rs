//! Error types for graph construction and variable resolution.

use weft_types::Type;

/// Errors raised while building or resolving expressions
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Op name not present in the registry
    #[error("unknown op: {0}")]
    OpNotFound(String),

    /// Registration attempted under a name that already exists
    #[error("op already registered: {0}")]
    DuplicateOp(String),

    /// A declared input was not supplied
    #[error("op {op} missing input: {input}")]
    MissingInput {
        /// Op being called
        op: String,
        /// Name of the absent input
        input: String,
    },

    /// A supplied input is not declared by the op
    #[error("op {op} does not declare input: {input}")]
    UnknownInput {
        /// Op being called
        op: String,
        /// Name of the unexpected input
        input: String,
    },

    /// A supplied input's type does not fit the declared input type
    #[error("op {op} input {input} expects {expected}, got {actual}")]
    InputTypeMismatch {
        /// Op being called
        op: String,
        /// Input name
        input: String,
        /// Declared input type
        expected: Type,
        /// Type of the supplied node
        actual: Type,
    },

    /// A `var` node has no binding in the frame stack
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    /// Frame bindings chained deeper than the resolution limit
    #[error("variable resolution exceeded depth {0}")]
    ResolutionDepth(usize),

    /// Canonical encoding of an expression failed
    #[error("expression encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
