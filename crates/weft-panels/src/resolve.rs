//! Panel stack resolution
//!
//! Given a concrete type and an optional requested id path, compute the
//! ordered chain of applicable specs: zero or more converters ending in a
//! terminal spec. Resolution is a pure function of the frozen registry.

use weft_types::Type;

use crate::registry::PanelRegistry;
use crate::spec::{PanelIdPath, PanelSpecNode};

/// One layer of a resolved stack
#[derive(Debug, Clone)]
pub struct StackLayer<C> {
    /// The spec rendering this layer
    pub spec: PanelSpecNode<C>,
    /// The type this layer receives
    pub input: Type,
}

/// The resolved, ordered chain of specs for a type
///
/// Outermost converter first, terminal spec last. The composite id joins the
/// layer ids with `.`; re-resolving a composite id against the same registry
/// and type reproduces the same chain.
#[derive(Debug, Clone)]
pub struct PanelStack<C> {
    layers: Vec<StackLayer<C>>,
}

impl<C> PanelStack<C> {
    /// The layers, outermost first
    #[inline]
    #[must_use]
    pub fn layers(&self) -> &[StackLayer<C>] {
        &self.layers
    }

    /// Number of layers
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// The terminal layer
    ///
    /// Present by construction; resolution never produces a dangling chain.
    #[must_use]
    pub fn terminal(&self) -> &StackLayer<C> {
        self.layers
            .last()
            .expect("a resolved stack has at least one layer")
    }

    /// Layer ids joined with `.`
    #[must_use]
    pub fn composite_id(&self) -> String {
        self.layers
            .iter()
            .map(|layer| layer.spec.id().as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Outcome of resolution
///
/// "No panel for this type" is a first-class result the caller renders as a
/// fallback affordance, never an error.
#[derive(Debug)]
pub enum Resolution<C> {
    /// A complete stack was found
    Stack(PanelStack<C>),
    /// No registered spec applies to the input type
    NoPanel {
        /// The type nothing applied to
        input: Type,
    },
}

impl<C> Resolution<C> {
    /// The stack, if resolution succeeded
    #[must_use]
    pub fn stack(self) -> Option<PanelStack<C>> {
        match self {
            Self::Stack(stack) => Some(stack),
            Self::NoPanel { .. } => None,
        }
    }

    /// Whether nothing applied
    #[inline]
    #[must_use]
    pub fn is_no_panel(&self) -> bool {
        matches!(self, Self::NoPanel { .. })
    }
}

/// Resolve the panel stack for `input`
///
/// With no requested id, the first applicable terminal spec in registration
/// order wins; if only plain converters apply, the first applicable one is
/// taken and resolution recurses on its narrowed type. A dotted requested id
/// is honored segment by segment and falls back to default resolution from
/// the first segment that no longer applies.
///
/// Converter steps are bounded by registry size, so a non-narrowing
/// `convert` degrades to [`Resolution::NoPanel`] rather than looping.
#[must_use]
pub fn resolve_stack<C>(
    registry: &PanelRegistry<C>,
    input: &Type,
    requested: Option<&PanelIdPath>,
) -> Resolution<C> {
    let mut layers = Vec::new();
    let segments = requested.map_or(&[][..], PanelIdPath::segments);
    let complete = resolve_into(registry, input, segments, &mut layers, registry.len());
    if complete {
        Resolution::Stack(PanelStack { layers })
    } else {
        Resolution::NoPanel {
            input: input.clone(),
        }
    }
}

fn resolve_into<C>(
    registry: &PanelRegistry<C>,
    input: &Type,
    requested: &[String],
    layers: &mut Vec<StackLayer<C>>,
    budget: usize,
) -> bool {
    if let Some((head, rest)) = requested.split_first() {
        match registry.by_id(head) {
            Some(spec) if spec.accepts(input) => {
                return descend(registry, spec, input, rest, layers, budget);
            }
            _ => {
                // The schema moved underneath a stored override; resolve as
                // if nothing had been requested from this point on.
                tracing::warn!(requested = %head, input = %input, "requested panel no longer applies, falling back");
            }
        }
    }
    default_resolve(registry, input, layers, budget)
}

fn default_resolve<C>(
    registry: &PanelRegistry<C>,
    input: &Type,
    layers: &mut Vec<StackLayer<C>>,
    budget: usize,
) -> bool {
    if let Some(spec) = registry
        .specs()
        .iter()
        .find(|spec| spec.is_terminal() && spec.accepts(input))
    {
        layers.push(StackLayer {
            spec: spec.clone(),
            input: input.clone(),
        });
        return true;
    }
    if let Some(spec) = registry.specs().iter().find(|spec| spec.accepts(input)) {
        return descend(registry, spec, input, &[], layers, budget);
    }
    tracing::debug!(input = %input, "no panel for type");
    false
}

/// Push `spec` as a layer and continue resolution past it.
fn descend<C>(
    registry: &PanelRegistry<C>,
    spec: &PanelSpecNode<C>,
    input: &Type,
    requested: &[String],
    layers: &mut Vec<StackLayer<C>>,
    budget: usize,
) -> bool {
    layers.push(StackLayer {
        spec: spec.clone(),
        input: input.clone(),
    });
    if spec.is_terminal() {
        return true;
    }
    let Some(narrowed) = spec.narrowed(input) else {
        // accepts() held, so convert() cannot refuse here.
        return false;
    };
    if budget == 0 {
        tracing::warn!(id = %spec.id(), "converter budget exhausted; convert is not narrowing");
        return false;
    }
    resolve_into(registry, &narrowed, requested, layers, budget - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;
    use crate::spec::{ConverterSpec, LeafSpec};
    use std::sync::Arc;

    type Spec = PanelSpecNode<&'static str>;

    fn leaf(id: &str, input_type: Type) -> Spec {
        PanelSpecNode::leaf(LeafSpec::new(id, input_type, "component"))
    }

    fn maybe_converter() -> Spec {
        PanelSpecNode::converter(ConverterSpec::new(
            "maybe",
            "maybe-component",
            Arc::new(|ty: &Type| if ty.is_nullable() { ty.non_none() } else { None }),
            Arc::new(|_ops, node| Ok(Arc::clone(node))),
        ))
    }

    fn row_converter() -> Spec {
        PanelSpecNode::converter(ConverterSpec::new(
            "row",
            "row-component",
            // One row of the list; absent rows are not rendered, so the
            // element's none member is dropped from the narrowed type.
            Arc::new(|ty: &Type| match ty {
                Type::List { of } => of.non_none().or_else(|| Some((**of).clone())),
                _ => None,
            }),
            Arc::new(|ops, node| ops.op_index(Arc::clone(node), 0.0)),
        ))
    }

    fn standard_registry() -> PanelRegistry<&'static str> {
        RegistryBuilder::new()
            .register(maybe_converter())
            .register(row_converter())
            .register(leaf("string", Type::String))
            .register(leaf("number", Type::Number))
            .build()
            .unwrap()
    }

    #[test]
    fn nested_maybe_list_resolves_through_both_converters() {
        let registry = standard_registry();
        let input = Type::maybe(Type::list(Type::maybe(Type::String)));

        let stack = resolve_stack(&registry, &input, None).stack().unwrap();
        assert_eq!(stack.composite_id(), "maybe.row.string");

        // The type narrows at every step and ends at string.
        let inputs: Vec<&Type> = stack.layers().iter().map(|layer| &layer.input).collect();
        assert_eq!(*inputs[0], input);
        assert_eq!(*inputs[1], Type::list(Type::maybe(Type::String)));
        assert_eq!(*inputs[2], Type::String);
    }

    #[test]
    fn resolution_is_deterministic() {
        let registry = standard_registry();
        let input = Type::maybe(Type::list(Type::maybe(Type::String)));

        let first = resolve_stack(&registry, &input, None).stack().unwrap();
        let second = resolve_stack(&registry, &input, None).stack().unwrap();
        assert_eq!(first.composite_id(), second.composite_id());
        assert_eq!(first.depth(), second.depth());
    }

    #[test]
    fn composite_id_reresolves_to_the_same_chain() {
        let registry = standard_registry();
        let input = Type::maybe(Type::list(Type::maybe(Type::String)));

        let stack = resolve_stack(&registry, &input, None).stack().unwrap();
        let path: PanelIdPath = stack.composite_id().parse().unwrap();
        let again = resolve_stack(&registry, &input, Some(&path)).stack().unwrap();
        assert_eq!(again.composite_id(), stack.composite_id());
    }

    #[test]
    fn first_registered_terminal_wins() {
        let registry = RegistryBuilder::new()
            .register(leaf("first", Type::String))
            .register(leaf("second", Type::String))
            .build()
            .unwrap();

        let stack = resolve_stack(&registry, &Type::String, None).stack().unwrap();
        assert_eq!(stack.composite_id(), "first");
    }

    #[test]
    fn requested_id_overrides_registration_order() {
        let registry = RegistryBuilder::new()
            .register(leaf("first", Type::String))
            .register(leaf("second", Type::String))
            .build()
            .unwrap();

        let path: PanelIdPath = "second".parse().unwrap();
        let stack = resolve_stack(&registry, &Type::String, Some(&path))
            .stack()
            .unwrap();
        assert_eq!(stack.composite_id(), "second");
    }

    #[test]
    fn stale_override_falls_back_to_default_resolution() {
        let registry = RegistryBuilder::new()
            .register(row_converter())
            .register(leaf("number", Type::Number))
            .build()
            .unwrap();

        // "row.number" was stored while the input was a list; the schema
        // changed to a scalar, so resolution falls back to a single leaf.
        let path: PanelIdPath = "row.number".parse().unwrap();
        let stack = resolve_stack(&registry, &Type::Number, Some(&path))
            .stack()
            .unwrap();
        assert_eq!(stack.composite_id(), "number");
    }

    #[test]
    fn stale_inner_segment_falls_back_below_the_valid_prefix() {
        let registry = standard_registry();

        // "row.number" on list(string): row still applies, number does not;
        // the inner segment falls back to the string leaf.
        let path: PanelIdPath = "row.number".parse().unwrap();
        let stack = resolve_stack(&registry, &Type::list(Type::String), Some(&path))
            .stack()
            .unwrap();
        assert_eq!(stack.composite_id(), "row.string");
    }

    #[test]
    fn no_applicable_spec_yields_the_sentinel() {
        let registry = standard_registry();
        let resolution = resolve_stack(&registry, &Type::Boolean, None);
        assert!(resolution.is_no_panel());
    }

    #[test]
    fn non_narrowing_convert_degrades_to_the_sentinel() {
        let identity_converter: Spec = PanelSpecNode::converter(ConverterSpec::new(
            "identity",
            "identity-component",
            Arc::new(|ty: &Type| Some(ty.clone())),
            Arc::new(|_ops, node| Ok(Arc::clone(node))),
        ));
        let registry = RegistryBuilder::new()
            .register(identity_converter)
            .build()
            .unwrap();

        // convert never narrows; the step budget ends resolution instead of
        // looping.
        let resolution = resolve_stack(&registry, &Type::maybe(Type::String), None);
        assert!(resolution.is_no_panel());
    }

    #[test]
    fn with_child_terminates_without_dynamic_recursion() {
        let wrapped = PanelSpecNode::converter_with_child(
            ConverterSpec::new(
                "list-of",
                "list-of-component",
                Arc::new(|ty: &Type| match ty {
                    Type::List { of } => Some((**of).clone()),
                    _ => None,
                }),
                Arc::new(|ops, node| ops.op_index(Arc::clone(node), 0.0)),
            ),
            leaf("inner-string", Type::String),
        );
        let registry = RegistryBuilder::new()
            .register(wrapped)
            .register(leaf("string", Type::String))
            .build()
            .unwrap();

        let stack = resolve_stack(&registry, &Type::list(Type::String), None)
            .stack()
            .unwrap();
        // The chain ends at the with-child converter; its fixed child is not
        // a separate resolved layer.
        assert_eq!(stack.composite_id(), "list-of");
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn converter_without_a_terminal_for_its_narrowed_type_is_no_panel() {
        let registry = RegistryBuilder::new()
            .register(row_converter())
            .build()
            .unwrap();

        // row narrows list(boolean) to boolean, but nothing renders boolean.
        let resolution = resolve_stack(&registry, &Type::list(Type::Boolean), None);
        assert!(resolution.is_no_panel());
    }
}
