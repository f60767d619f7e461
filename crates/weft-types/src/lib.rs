//! Weft Type System
//!
//! Structural, recursively-defined descriptions of value shapes.
//!
//! # Core Concepts
//!
//! - [`Type`]: immutable structural type built by pure constructors
//! - [`Type::is_assignable_to`]: the partial order every other layer
//!   (op construction, panel resolution) is defined against
//! - [`Type::strip_tags`]: the explicit tag-removal operation; assignability
//!   never strips tags implicitly
//!
//! # Example
//!
//! ```rust
//! use weft_types::Type;
//!
//! let rows = Type::maybe(Type::list(Type::maybe(Type::String)));
//! assert!(Type::None.is_assignable_to(&rows));
//! assert!(!Type::Number.is_assignable_to(&rows));
//! ```

mod assign;
mod ty;

pub use ty::Type;
