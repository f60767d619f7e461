//! The panel host: a resolved stack wired to live evaluation and config.

use std::sync::Arc;

use serde_json::Value;
use weft_engine::EvalClient;
use weft_graph::{FrameStack, NodeRef};
use weft_types::Type;

use crate::config::{ConfigPatch, ConfigStore};
use crate::error::PanelError;
use crate::registry::PanelRegistry;
use crate::resolve::{resolve_stack, PanelStack, Resolution};
use crate::spec::{PanelIdPath, PanelSpecNode};

/// One layer of an opened panel, ready to render
#[derive(Debug, Clone)]
pub struct LayerView<C> {
    /// The spec rendering this layer
    pub spec: PanelSpecNode<C>,
    /// The expression this layer renders (converters transform it for the
    /// next layer)
    pub input: NodeRef,
    /// The type this layer was resolved against
    pub input_type: Type,
    /// Depth in the stack; addresses this layer's config slice
    pub depth: usize,
}

/// Outcome of opening a node: a live panel or the no-panel affordance
#[derive(Debug)]
pub enum Opened<C> {
    /// A stack resolved and its layers are ready
    Panel(PanelInstance<C>),
    /// Nothing renders this type; the host shows a fallback
    NoPanel {
        /// The refined type nothing applied to
        input: Type,
    },
}

/// Ties a registry and an evaluation client together
#[derive(Debug, Clone)]
pub struct PanelHost<C> {
    client: EvalClient,
    registry: Arc<PanelRegistry<C>>,
}

impl<C: Clone> PanelHost<C> {
    /// Create a host
    #[must_use]
    pub fn new(client: EvalClient, registry: Arc<PanelRegistry<C>>) -> Self {
        Self { client, registry }
    }

    /// The registry this host resolves against
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &PanelRegistry<C> {
        &self.registry
    }

    /// The evaluation client
    #[inline]
    #[must_use]
    pub fn client(&self) -> &EvalClient {
        &self.client
    }

    /// Open a panel over `node` with no persisted config
    ///
    /// # Errors
    /// Refinement or layer-transform failures; "no panel for this type" is
    /// the [`Opened::NoPanel`] variant, not an error.
    pub async fn open(
        &self,
        node: &NodeRef,
        stack: &FrameStack,
        requested: Option<&PanelIdPath>,
    ) -> Result<Opened<C>, PanelError> {
        self.open_inner(node, stack, requested, ConfigStore::new_adaptive())
            .await
    }

    /// Open a panel over `node`, rehydrating persisted config
    ///
    /// # Errors
    /// Same as [`PanelHost::open`].
    pub async fn open_with_config(
        &self,
        node: &NodeRef,
        stack: &FrameStack,
        requested: Option<&PanelIdPath>,
        config: Value,
    ) -> Result<Opened<C>, PanelError> {
        self.open_inner(node, stack, requested, ConfigStore::from_committed(config))
            .await
    }

    async fn open_inner(
        &self,
        node: &NodeRef,
        stack: &FrameStack,
        requested: Option<&PanelIdPath>,
        config: ConfigStore,
    ) -> Result<Opened<C>, PanelError> {
        // Stack resolution needs a type, not a value: refine first.
        let refined = self.client.refined_type(node, stack).await?;
        let input_type = refined.ty().clone();

        let panel_stack = match resolve_stack(&self.registry, &input_type, requested) {
            Resolution::NoPanel { input } => return Ok(Opened::NoPanel { input }),
            Resolution::Stack(panel_stack) => panel_stack,
        };
        tracing::info!(stack = %panel_stack.composite_id(), input = %input_type, "panel stack resolved");

        let mut layers = Vec::with_capacity(panel_stack.depth());
        let mut current = refined;
        for (depth, layer) in panel_stack.layers().iter().enumerate() {
            layers.push(LayerView {
                spec: layer.spec.clone(),
                input: Arc::clone(&current),
                input_type: layer.input.clone(),
                depth,
            });
            // Plain converters hand a transformed node to the next layer;
            // a terminal layer has no next layer to feed.
            if !layer.spec.is_terminal() {
                if let Some(converter) = layer.spec.as_converter() {
                    current = converter.transform(self.client.ops(), &current)?;
                }
            }
        }

        Ok(Opened::Panel(PanelInstance {
            stack: panel_stack,
            layers,
            config,
        }))
    }
}

/// A resolved stack with live layer inputs and its config root
#[derive(Debug)]
pub struct PanelInstance<C> {
    stack: PanelStack<C>,
    layers: Vec<LayerView<C>>,
    config: ConfigStore,
}

impl<C> PanelInstance<C> {
    /// The resolved stack
    #[inline]
    #[must_use]
    pub fn stack(&self) -> &PanelStack<C> {
        &self.stack
    }

    /// Layer ids joined with `.`
    #[must_use]
    pub fn composite_id(&self) -> String {
        self.stack.composite_id()
    }

    /// The live layers, outermost first
    #[inline]
    #[must_use]
    pub fn layers(&self) -> &[LayerView<C>] {
        &self.layers
    }

    /// The terminal layer
    #[must_use]
    pub fn terminal(&self) -> &LayerView<C> {
        self.layers
            .last()
            .expect("an opened panel has at least one layer")
    }

    /// The expression a terminal with-child converter's fixed child renders
    ///
    /// `None` for plain leaves.
    ///
    /// # Errors
    /// Propagates transform construction failures.
    pub fn terminal_child(
        &self,
        client: &EvalClient,
    ) -> Result<Option<(Arc<PanelSpecNode<C>>, NodeRef)>, PanelError> {
        let terminal = self.terminal();
        match &terminal.spec {
            PanelSpecNode::ConverterWithChild { converter, child } => {
                let input = converter.transform(client.ops(), &terminal.input)?;
                Ok(Some((Arc::clone(child), input)))
            }
            _ => Ok(None),
        }
    }

    /// The config store shared by every layer
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Apply a patch from the layer at `depth`; returns the new root
    pub fn update(&self, depth: usize, patch: &ConfigPatch) -> Value {
        self.config.update(depth, patch)
    }

    /// A leaf edit: freezes the adaptive default on first use
    pub fn update_leaf(&self, adaptive: &Value, delta: &Value) -> Value {
        self.config
            .commit_leaf(self.terminal().depth, adaptive, delta)
    }

    /// The config the leaf renders with right now
    #[must_use]
    pub fn leaf_config(&self, adaptive: &Value) -> Value {
        self.config.leaf_config(self.terminal().depth, adaptive)
    }
}
