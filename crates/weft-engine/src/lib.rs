//! Weft Node Evaluation Client
//!
//! Resolves lazy expressions to concrete values and types against an
//! external execution backend, with caching, supersede-safe subscriptions,
//! and a coarse mutation path.
//!
//! # Core Concepts
//!
//! - [`ExecutionBackend`]: the external collaborator that actually runs
//!   expressions. Everything here assumes it is idempotent for pure
//!   expressions.
//! - [`EvalClient`]: cached, deduplicated `value`/`refined_type` access.
//! - [`Loadable`]: the `{loading, result}` view a rendering host consumes.
//! - [`ValueSlot`] / [`RefineSlot`]: one mount point each; a slot publishes
//!   [`Loadable`] snapshots and guarantees that only the most recently
//!   issued request for its key ever commits.
//! - [`MutationExecutor`]: absolute-target writes with refresh propagation.

mod backend;
mod cache;
mod client;
mod error;
mod loadable;
mod mutation;
mod slot;

pub use backend::{BackendError, ExecutionBackend, WriteRequest, MUTATION_SET};
pub use cache::{CacheStats, EvalCache};
pub use client::EvalClient;
pub use error::EvalError;
pub use loadable::Loadable;
pub use mutation::MutationExecutor;
pub use slot::{RefineSlot, SlotSnapshot, ValueSlot};
