//! Weft Panels
//!
//! Type-addressed panel resolution and layered configuration.
//!
//! # Core Concepts
//!
//! - [`PanelSpecNode`]: an explicit tagged union of leaf, converter, and
//!   converter-with-child specs. Nothing probes shapes to classify a spec.
//! - [`PanelRegistry`]: built once at startup by [`RegistryBuilder`], then
//!   frozen. Registration order is the priority list.
//! - [`resolve_stack`]: computes the ordered chain of specs for a type, with
//!   dotted-id overrides and an explicit [`Resolution::NoPanel`] sentinel.
//! - [`ConfigStore`]: one JSON root threaded through the stack; each layer
//!   owns a disjoint slice, updates are `{scope, patch}` messages applied by
//!   a single reducer, and adaptive leaf defaults freeze on first edit.
//! - [`PanelHost`]: ties a resolved stack to live evaluation, building each
//!   converter layer's transformed node through the op registry.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use weft_panels::prelude::*;
//!
//! let registry = RegistryBuilder::new()
//!     .register(maybe_converter())
//!     .register(row_converter())
//!     .register(string_leaf())
//!     .build()?;
//!
//! match resolve_stack(&registry, &ty, None) {
//!     Resolution::Stack(stack) => println!("{}", stack.composite_id()),
//!     Resolution::NoPanel { input } => println!("no panel for {input}"),
//! }
//! ```

mod config;
mod error;
mod host;
mod registry;
mod resolve;
mod spec;

pub mod harness;

pub use config::{
    apply_patch, merge_shallow, split_config, ConfigPatch, ConfigStore, PatchScope,
    CHILD_CONFIG_KEY,
};
pub use error::{PanelError, RegistryError};
pub use host::{LayerView, Opened, PanelHost, PanelInstance};
pub use registry::{PanelRegistry, RegistryBuilder};
pub use resolve::{resolve_stack, PanelStack, Resolution, StackLayer};
pub use spec::{
    ConvertFn, ConverterSpec, LeafSpec, OutputTypeFn, PanelId, PanelIdPath, PanelSpecNode,
    TransformFn,
};

/// Convenience re-exports for registry assembly and resolution
pub mod prelude {
    pub use crate::config::{ConfigPatch, ConfigStore, PatchScope};
    pub use crate::host::{Opened, PanelHost, PanelInstance};
    pub use crate::registry::{PanelRegistry, RegistryBuilder};
    pub use crate::resolve::{resolve_stack, PanelStack, Resolution};
    pub use crate::spec::{ConverterSpec, LeafSpec, PanelId, PanelIdPath, PanelSpecNode};
}
