//! Panel spec variants: leaf, converter, converter-with-child.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use weft_graph::{GraphError, NodeRef, OpRegistry};
use weft_types::Type;

/// Identifier of a single panel spec
///
/// Ids never contain `.`; dotted paths address layers of a resolved stack
/// and are modeled by [`PanelIdPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PanelId(String);

impl PanelId {
    /// Create an id; the registry rejects dotted ids at registration time
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PanelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PanelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A dotted id path addressing a stack layer by layer (`maybe.row.string`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelIdPath(Vec<String>);

impl PanelIdPath {
    /// The path's segments, outermost first
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether the path has no segments
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for PanelIdPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(
            s.split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }
}

impl Display for PanelIdPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Narrows an input type; `None` means the converter does not apply
pub type ConvertFn = Arc<dyn Fn(&Type) -> Option<Type> + Send + Sync>;

/// Rewrites the input node into the narrowed node a child renders
pub type TransformFn =
    Arc<dyn Fn(&OpRegistry, &NodeRef) -> Result<NodeRef, GraphError> + Send + Sync>;

/// Derives a leaf's output type from its input type
pub type OutputTypeFn = Arc<dyn Fn(&Type) -> Type + Send + Sync>;

/// A terminal renderer for values assignable to its input type
///
/// The component handle `C` is opaque here; the rendering host supplies
/// whatever it paints with. A leaf cannot be built without one.
#[derive(Clone)]
pub struct LeafSpec<C> {
    /// Panel id
    pub id: PanelId,
    /// Values assignable to this type can be rendered
    pub input_type: Type,
    /// The host's render component
    pub component: C,
    /// Optional config editor component
    pub config_component: Option<C>,
    /// Optional derived output type (for panels that re-expose data)
    pub output_type: Option<OutputTypeFn>,
    /// Whether the host may expand this panel to full screen
    pub can_fullscreen: bool,
    /// Preferred fixed size, if any (width, height)
    pub default_fixed_size: Option<(u32, u32)>,
}

impl<C> LeafSpec<C> {
    /// Create a leaf spec
    #[must_use]
    pub fn new(id: impl Into<PanelId>, input_type: Type, component: C) -> Self {
        Self {
            id: id.into(),
            input_type,
            component,
            config_component: None,
            output_type: None,
            can_fullscreen: false,
            default_fixed_size: None,
        }
    }

    /// Attach a config editor component
    #[must_use]
    pub fn with_config_component(mut self, component: C) -> Self {
        self.config_component = Some(component);
        self
    }

    /// Attach an output type derivation
    #[must_use]
    pub fn with_output_type(mut self, output_type: OutputTypeFn) -> Self {
        self.output_type = Some(output_type);
        self
    }

    /// Allow fullscreen
    #[must_use]
    pub fn fullscreen(mut self) -> Self {
        self.can_fullscreen = true;
        self
    }

    /// Set a preferred fixed size
    #[must_use]
    pub fn with_default_fixed_size(mut self, width: u32, height: u32) -> Self {
        self.default_fixed_size = Some((width, height));
        self
    }
}

impl<C> fmt::Debug for LeafSpec<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafSpec")
            .field("id", &self.id)
            .field("input_type", &self.input_type)
            .field("can_fullscreen", &self.can_fullscreen)
            .finish_non_exhaustive()
    }
}

/// A panel that narrows its input type and delegates to a child
#[derive(Clone)]
pub struct ConverterSpec<C> {
    /// Panel id
    pub id: PanelId,
    /// The host's render component (the wrapper chrome)
    pub component: C,
    /// Optional config editor component
    pub config_component: Option<C>,
    convert: ConvertFn,
    transform: TransformFn,
}

impl<C> ConverterSpec<C> {
    /// Create a converter spec
    ///
    /// `convert` must strictly narrow: repeatedly applying it to its own
    /// output has to bottom out. The resolver bounds converter steps by
    /// registry size, so a non-narrowing `convert` degrades to a fallback,
    /// never a hang.
    #[must_use]
    pub fn new(
        id: impl Into<PanelId>,
        component: C,
        convert: ConvertFn,
        transform: TransformFn,
    ) -> Self {
        Self {
            id: id.into(),
            component,
            config_component: None,
            convert,
            transform,
        }
    }

    /// Attach a config editor component
    #[must_use]
    pub fn with_config_component(mut self, component: C) -> Self {
        self.config_component = Some(component);
        self
    }

    /// The narrowed type, or `None` when this converter does not apply
    #[inline]
    #[must_use]
    pub fn convert(&self, input: &Type) -> Option<Type> {
        (self.convert)(input)
    }

    /// Rewrite the input node into the node the child renders
    ///
    /// # Errors
    /// Propagates construction errors from the op registry.
    pub fn transform(&self, ops: &OpRegistry, input: &NodeRef) -> Result<NodeRef, GraphError> {
        (self.transform)(ops, input)
    }
}

impl<C> fmt::Debug for ConverterSpec<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterSpec")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// One registered panel spec: the explicit tagged union
#[derive(Debug)]
pub enum PanelSpecNode<C> {
    /// Terminal renderer
    Leaf(Arc<LeafSpec<C>>),
    /// Narrowing wrapper whose child is chosen dynamically by resolution
    Converter(Arc<ConverterSpec<C>>),
    /// Narrowing wrapper with a statically bound child
    ///
    /// The child is fixed at registration and does not re-enter dynamic
    /// resolution for the narrowed type.
    ConverterWithChild {
        /// The wrapping converter
        converter: Arc<ConverterSpec<C>>,
        /// The fixed child spec
        child: Arc<PanelSpecNode<C>>,
    },
}

// Variants hold their specs behind `Arc`, so cloning never requires the
// component handle itself to be cloneable.
impl<C> Clone for PanelSpecNode<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Leaf(leaf) => Self::Leaf(Arc::clone(leaf)),
            Self::Converter(converter) => Self::Converter(Arc::clone(converter)),
            Self::ConverterWithChild { converter, child } => Self::ConverterWithChild {
                converter: Arc::clone(converter),
                child: Arc::clone(child),
            },
        }
    }
}

impl<C> PanelSpecNode<C> {
    /// Wrap a leaf spec
    #[inline]
    #[must_use]
    pub fn leaf(spec: LeafSpec<C>) -> Self {
        Self::Leaf(Arc::new(spec))
    }

    /// Wrap a converter spec
    #[inline]
    #[must_use]
    pub fn converter(spec: ConverterSpec<C>) -> Self {
        Self::Converter(Arc::new(spec))
    }

    /// Wrap a converter with a fixed child
    #[inline]
    #[must_use]
    pub fn converter_with_child(spec: ConverterSpec<C>, child: PanelSpecNode<C>) -> Self {
        Self::ConverterWithChild {
            converter: Arc::new(spec),
            child: Arc::new(child),
        }
    }

    /// This spec's id
    #[must_use]
    pub fn id(&self) -> &PanelId {
        match self {
            Self::Leaf(leaf) => &leaf.id,
            Self::Converter(converter) => &converter.id,
            Self::ConverterWithChild { converter, .. } => &converter.id,
        }
    }

    /// Whether this spec terminates a stack
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Leaf(_) | Self::ConverterWithChild { .. })
    }

    /// Whether this spec is a plain leaf
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Whether this spec applies to `input`
    #[must_use]
    pub fn accepts(&self, input: &Type) -> bool {
        match self {
            Self::Leaf(leaf) => input.is_assignable_to(&leaf.input_type),
            Self::Converter(converter) | Self::ConverterWithChild { converter, .. } => {
                converter.convert(input).is_some()
            }
        }
    }

    /// The type handed to the next layer, for converters
    #[must_use]
    pub fn narrowed(&self, input: &Type) -> Option<Type> {
        match self {
            Self::Leaf(_) => None,
            Self::Converter(converter) | Self::ConverterWithChild { converter, .. } => {
                converter.convert(input)
            }
        }
    }

    /// The converter spec, for the two converter variants
    #[must_use]
    pub fn as_converter(&self) -> Option<&Arc<ConverterSpec<C>>> {
        match self {
            Self::Leaf(_) => None,
            Self::Converter(converter) | Self::ConverterWithChild { converter, .. } => {
                Some(converter)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_leaf() -> PanelSpecNode<&'static str> {
        PanelSpecNode::leaf(LeafSpec::new("string", Type::String, "string-component"))
    }

    fn maybe_converter() -> PanelSpecNode<&'static str> {
        PanelSpecNode::converter(ConverterSpec::new(
            "maybe",
            "maybe-component",
            Arc::new(|ty: &Type| {
                if ty.is_nullable() {
                    ty.non_none()
                } else {
                    None
                }
            }),
            Arc::new(|_ops, node| Ok(Arc::clone(node))),
        ))
    }

    #[test]
    fn id_path_parses_dotted_segments() {
        let path: PanelIdPath = "maybe.row.string".parse().unwrap();
        assert_eq!(path.segments(), ["maybe", "row", "string"]);
        assert_eq!(path.to_string(), "maybe.row.string");

        let empty: PanelIdPath = "".parse().unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn leaf_accepts_assignable_inputs() {
        let leaf = string_leaf();
        assert!(leaf.accepts(&Type::String));
        assert!(!leaf.accepts(&Type::Number));
        assert!(leaf.is_terminal());
        assert_eq!(leaf.narrowed(&Type::String), None);
    }

    #[test]
    fn converter_accepts_through_convert() {
        let converter = maybe_converter();
        assert!(converter.accepts(&Type::maybe(Type::String)));
        assert!(!converter.accepts(&Type::String));
        assert_eq!(
            converter.narrowed(&Type::maybe(Type::String)),
            Some(Type::String)
        );
    }

    #[test]
    fn with_child_is_terminal_but_still_narrows() {
        let node = PanelSpecNode::converter_with_child(
            ConverterSpec::new(
                "maybe-wrap",
                "wrap-component",
                Arc::new(|ty: &Type| if ty.is_nullable() { ty.non_none() } else { None }),
                Arc::new(|_ops, node| Ok(Arc::clone(node))),
            ),
            string_leaf(),
        );
        assert!(node.is_terminal());
        assert!(!node.is_leaf());
        assert_eq!(node.narrowed(&Type::maybe(Type::String)), Some(Type::String));
    }
}
