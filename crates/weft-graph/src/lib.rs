//! Weft Graph Model
//!
//! Immutable expressions over a small op vocabulary, plus the machinery to
//! construct and address them.
//!
//! # Core Concepts
//!
//! - [`Node`]: an expression — a free variable, a typed literal, or an op
//!   application. Shared by reference ([`NodeRef`]), forming a DAG.
//! - [`FrameStack`]: the variable-binding context threaded through
//!   evaluation; [`resolve_vars`] rebuilds a variable-free expression.
//! - [`ExprHash`]: content address of an expression, the key every cache
//!   and in-flight table downstream is defined over.
//! - [`OpRegistry`]: append-only catalog of [`OpDef`]s; [`OpRegistry::call`]
//!   is the only way an `Output` node is built.
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_graph::OpRegistry;
//!
//! let ops = OpRegistry::with_builtins();
//! let rows = ops.op_get("local-artifact:///runs/table.json")?;
//! let first = ops.op_index(rows, 0.0)?;
//! ```

mod error;
mod frame;
mod hash;
mod node;
mod op;

pub mod builtins;

pub use error::GraphError;
pub use frame::{resolve_vars, Frame, FrameStack};
pub use hash::{ExprHash, HashError};
pub use node::{Node, NodeRef, Value};
pub use op::{DeriveFn, ExpansionFn, OpDef, OpRegistry, OutputType};
