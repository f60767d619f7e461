//! The panel catalog: an explicit, ordered, append-only build step that
//! freezes into an immutable registry.

use indexmap::IndexMap;
use std::sync::Arc;

use weft_graph::{GraphError, OpRegistry, OutputType};
use weft_types::Type;

use crate::error::RegistryError;
use crate::spec::{ConverterSpec, PanelSpecNode};

/// Collects panel specs in registration order before freezing
///
/// Registration order is the priority list: when several specs apply to a
/// type, resolution picks the first registered. Assemble the full catalog in
/// one place at startup rather than scattering registrations across modules.
#[derive(Debug, Default)]
pub struct RegistryBuilder<C> {
    specs: Vec<PanelSpecNode<C>>,
}

impl<C> RegistryBuilder<C> {
    /// Start an empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// Append a spec
    #[must_use]
    pub fn register(mut self, spec: PanelSpecNode<C>) -> Self {
        self.specs.push(spec);
        self
    }

    /// Validate and freeze the catalog
    ///
    /// # Errors
    /// [`RegistryError::DuplicateId`] and [`RegistryError::InvalidId`] are
    /// programming mistakes caught here, at startup; nothing later mutates
    /// the registry.
    pub fn build(self) -> Result<PanelRegistry<C>, RegistryError> {
        let mut by_id = IndexMap::with_capacity(self.specs.len());
        for (index, spec) in self.specs.iter().enumerate() {
            let id = spec.id().as_str();
            if id.contains('.') {
                return Err(RegistryError::InvalidId(id.to_string()));
            }
            if by_id.insert(id.to_string(), index).is_some() {
                return Err(RegistryError::DuplicateId(id.to_string()));
            }
        }
        tracing::debug!(specs = self.specs.len(), "panel registry frozen");
        Ok(PanelRegistry {
            specs: self.specs,
            by_id,
        })
    }
}

/// The frozen panel catalog
///
/// Process-wide read-only state after startup; resolution only reads.
#[derive(Debug)]
pub struct PanelRegistry<C> {
    specs: Vec<PanelSpecNode<C>>,
    by_id: IndexMap<String, usize>,
}

impl<C> PanelRegistry<C> {
    /// Every spec, in registration order
    #[inline]
    #[must_use]
    pub fn specs(&self) -> &[PanelSpecNode<C>] {
        &self.specs
    }

    /// Look up a spec by id
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<&PanelSpecNode<C>> {
        self.by_id.get(id).map(|index| &self.specs[*index])
    }

    /// Number of registered specs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Mirror every converter into the op registry as `panel-<id>`
    ///
    /// Each converter's transform becomes the op's expansion, so applying a
    /// panel's transform is an ordinary graph rewrite. Transforms are built
    /// against a snapshot of `ops` taken before any panel op is added.
    ///
    /// # Errors
    /// Propagates [`GraphError::DuplicateOp`] for a panel id that collides
    /// with an existing op.
    pub fn register_ops(&self, ops: &mut OpRegistry) -> Result<(), GraphError>
    where
        C: Send + Sync + 'static,
    {
        let snapshot = ops.clone();
        for spec in &self.specs {
            let Some(converter) = spec.as_converter() else {
                continue;
            };
            register_converter_op(ops, &snapshot, converter)?;
            // A fixed child may itself be a converter chain.
            let mut child = match spec {
                PanelSpecNode::ConverterWithChild { child, .. } => Some(Arc::clone(child)),
                _ => None,
            };
            while let Some(node) = child {
                if let Some(inner) = node.as_converter() {
                    register_converter_op(ops, &snapshot, inner)?;
                }
                child = match node.as_ref() {
                    PanelSpecNode::ConverterWithChild { child, .. } => Some(Arc::clone(child)),
                    _ => None,
                };
            }
        }
        Ok(())
    }
}

fn register_converter_op<C: Send + Sync + 'static>(
    ops: &mut OpRegistry,
    snapshot: &OpRegistry,
    converter: &Arc<ConverterSpec<C>>,
) -> Result<(), GraphError> {
    let derive_converter = Arc::clone(converter);
    let expand_converter = Arc::clone(converter);
    let expand_ops = snapshot.clone();
    ops.register_panel_op(
        converter.id.as_str(),
        Type::Any,
        OutputType::Derived(Arc::new(move |inputs| {
            inputs
                .get("input")
                .and_then(|input| derive_converter.convert(input.ty()))
                .unwrap_or(Type::Any)
        })),
        Arc::new(move |inputs| {
            let input = inputs
                .get("input")
                .ok_or_else(|| GraphError::MissingInput {
                    op: format!("panel-{}", expand_converter.id),
                    input: "input".to_string(),
                })?;
            expand_converter.transform(&expand_ops, input)
        }),
    )
}
