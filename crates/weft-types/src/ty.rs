//! The structural [`Type`] enum and its pure constructors.

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A structural description of a value's shape
///
/// Types are immutable values created by pure constructors. `maybe(T)` is not
/// a distinct variant: it is `union(none, T)`, which keeps the assignability
/// rules uniform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Type {
    /// Top type: every type is assignable to `Any`
    Any,

    /// The element type of an empty container; assignable to everything
    Unknown,

    /// The type of the absent value
    None,

    /// Boolean primitive
    Boolean,

    /// Numeric primitive (integers and floats are not distinguished)
    Number,

    /// String primitive
    String,

    /// Homogeneous list, covariant in its element type
    List {
        /// Element type
        of: Box<Type>,
    },

    /// Untagged union; member order is preserved but not significant
    Union {
        /// Union members, flattened and deduplicated by construction
        members: Vec<Type>,
    },

    /// A value carrying provenance tags alongside its payload type
    TaggedValue {
        /// Tag payload type
        tag: Box<Type>,
        /// Value payload type
        value: Box<Type>,
    },

    /// Ordered string-keyed record with per-key types
    TypedDict {
        /// Property name to property type, in declaration order
        fields: IndexMap<String, Type>,
    },
}

impl Type {
    /// `list(of)` constructor
    #[inline]
    #[must_use]
    pub fn list(of: Type) -> Self {
        Self::List { of: Box::new(of) }
    }

    /// Union constructor
    ///
    /// Flattens nested unions, deduplicates structurally equal members, and
    /// collapses a single-member union to that member. An empty member list
    /// yields [`Type::Unknown`].
    #[must_use]
    pub fn union(members: impl IntoIterator<Item = Type>) -> Self {
        let mut flat: Vec<Type> = Vec::new();
        for member in members {
            match member {
                Type::Union { members } => {
                    for inner in members {
                        if !flat.contains(&inner) {
                            flat.push(inner);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => Type::Unknown,
            1 => flat.remove(0),
            _ => Type::Union { members: flat },
        }
    }

    /// `maybe(of)` constructor: `union(none, of)`
    #[inline]
    #[must_use]
    pub fn maybe(of: Type) -> Self {
        Self::union([Type::None, of])
    }

    /// Tagged-value constructor
    #[inline]
    #[must_use]
    pub fn tagged(tag: Type, value: Type) -> Self {
        Self::TaggedValue {
            tag: Box::new(tag),
            value: Box::new(value),
        }
    }

    /// Typed-dict constructor preserving key order
    #[must_use]
    pub fn typed_dict<K: Into<String>>(fields: impl IntoIterator<Item = (K, Type)>) -> Self {
        Self::TypedDict {
            fields: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
        }
    }

    /// Whether this is exactly the `none` type
    #[inline]
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Type::None)
    }

    /// Whether the absent value inhabits this type
    ///
    /// True for `none` itself and for any union with a `none` member.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match self {
            Type::None => true,
            Type::Union { members } => members.iter().any(Type::is_none),
            _ => false,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Unknown => write!(f, "unknown"),
            Type::None => write!(f, "none"),
            Type::Boolean => write!(f, "boolean"),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::List { of } => write!(f, "list({of})"),
            Type::Union { members } => {
                // Render union(none, T) in its familiar maybe(T) spelling.
                if self.is_nullable() {
                    if let Some(inner) = self.non_none() {
                        return write!(f, "maybe({inner})");
                    }
                }
                write!(f, "union(")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{member}")?;
                }
                write!(f, ")")
            }
            Type::TaggedValue { tag, value } => write!(f, "tagged<{tag}, {value}>"),
            Type::TypedDict { fields } => {
                write!(f, "{{")?;
                for (i, (key, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {ty}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_flattens_and_dedups() {
        let ty = Type::union([
            Type::String,
            Type::union([Type::Number, Type::String]),
            Type::Number,
        ]);
        assert_eq!(
            ty,
            Type::Union {
                members: vec![Type::String, Type::Number]
            }
        );
    }

    #[test]
    fn union_collapses_singleton() {
        assert_eq!(Type::union([Type::String]), Type::String);
        assert_eq!(Type::union([Type::String, Type::String]), Type::String);
    }

    #[test]
    fn union_of_nothing_is_unknown() {
        assert_eq!(Type::union([]), Type::Unknown);
    }

    #[test]
    fn maybe_is_union_with_none() {
        let ty = Type::maybe(Type::Number);
        assert!(ty.is_nullable());
        assert_eq!(
            ty,
            Type::Union {
                members: vec![Type::None, Type::Number]
            }
        );
    }

    #[test]
    fn maybe_of_maybe_flattens() {
        assert_eq!(
            Type::maybe(Type::maybe(Type::String)),
            Type::maybe(Type::String)
        );
    }

    #[test]
    fn display_renders_maybe_spelling() {
        let ty = Type::maybe(Type::list(Type::maybe(Type::String)));
        assert_eq!(ty.to_string(), "maybe(list(maybe(string)))");
    }

    #[test]
    fn display_renders_dict_fields_in_order() {
        let ty = Type::typed_dict([("a", Type::String), ("b", Type::Number)]);
        assert_eq!(ty.to_string(), "{a: string, b: number}");
    }

    #[test]
    fn serde_round_trip() {
        let ty = Type::tagged(
            Type::typed_dict([("run", Type::String)]),
            Type::list(Type::Number),
        );
        let json = serde_json::to_string(&ty).unwrap();
        let back: Type = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }
}
