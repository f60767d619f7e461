//! Assignability and the explicit narrowing helpers built on it.

use crate::ty::Type;

impl Type {
    /// Whether a value of this type can be used where `target` is expected
    ///
    /// This is a partial order: reflexive and transitive, not symmetric.
    /// Mismatches return `false`; no variant combination is an error.
    ///
    /// Tagged sources are only assignable to tagged targets. Call-sites that
    /// accept tagged input against an untagged expectation must narrow with
    /// [`Type::strip_tags`] first; stripping is never implicit here.
    #[must_use]
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        if matches!(target, Type::Any) {
            return true;
        }
        if matches!(self, Type::Unknown) {
            return true;
        }
        match (self, target) {
            // A union source must fit the target wholesale, member by member.
            (Type::Union { members }, _) => {
                members.iter().all(|member| member.is_assignable_to(target))
            }
            // A non-union source fits a union target through any one member.
            (_, Type::Union { members }) => {
                members.iter().any(|member| self.is_assignable_to(member))
            }
            (Type::List { of: source }, Type::List { of: target }) => {
                source.is_assignable_to(target)
            }
            (
                Type::TaggedValue { tag, value },
                Type::TaggedValue {
                    tag: target_tag,
                    value: target_value,
                },
            ) => tag.is_assignable_to(target_tag) && value.is_assignable_to(target_value),
            // Width subtyping: the source may carry extra keys.
            (Type::TypedDict { fields }, Type::TypedDict { fields: target }) => {
                target.iter().all(|(key, target_ty)| {
                    fields
                        .get(key)
                        .is_some_and(|source_ty| source_ty.is_assignable_to(target_ty))
                })
            }
            _ => false,
        }
    }

    /// Remove every tagged-value wrapper, recursively
    ///
    /// The deliberate counterpart to the "no implicit stripping" rule in
    /// [`Type::is_assignable_to`].
    #[must_use]
    pub fn strip_tags(&self) -> Type {
        match self {
            Type::TaggedValue { value, .. } => value.strip_tags(),
            Type::List { of } => Type::list(of.strip_tags()),
            Type::Union { members } => Type::union(members.iter().map(Type::strip_tags)),
            Type::TypedDict { fields } => Type::TypedDict {
                fields: fields
                    .iter()
                    .map(|(k, t)| (k.clone(), t.strip_tags()))
                    .collect(),
            },
            other => other.clone(),
        }
    }

    /// Drop `none` from this type
    ///
    /// Returns `None` when nothing remains (the type was `none` itself).
    /// Non-nullable types come back unchanged.
    #[must_use]
    pub fn non_none(&self) -> Option<Type> {
        match self {
            Type::None => None,
            Type::Union { members } => {
                let kept: Vec<Type> = members
                    .iter()
                    .filter(|member| !member.is_none())
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(Type::union(kept))
                }
            }
            other => Some(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_fits_every_maybe() {
        assert!(Type::None.is_assignable_to(&Type::maybe(Type::Number)));
        assert!(Type::None.is_assignable_to(&Type::maybe(Type::list(Type::String))));
    }

    #[test]
    fn number_does_not_fit_maybe_string() {
        assert!(!Type::Number.is_assignable_to(&Type::maybe(Type::String)));
    }

    #[test]
    fn plain_value_upcasts_into_its_maybe() {
        assert!(Type::String.is_assignable_to(&Type::maybe(Type::String)));
    }

    #[test]
    fn union_source_requires_all_members_to_fit() {
        let source = Type::union([Type::String, Type::Number]);
        let wide = Type::union([Type::String, Type::Number, Type::Boolean]);
        assert!(source.is_assignable_to(&wide));
        assert!(!source.is_assignable_to(&Type::String));
    }

    #[test]
    fn everything_fits_any_but_any_fits_only_any() {
        assert!(Type::list(Type::Number).is_assignable_to(&Type::Any));
        assert!(Type::Any.is_assignable_to(&Type::Any));
        assert!(!Type::Any.is_assignable_to(&Type::Number));
    }

    #[test]
    fn unknown_fits_everything() {
        assert!(Type::Unknown.is_assignable_to(&Type::Number));
        assert!(Type::list(Type::Unknown).is_assignable_to(&Type::list(Type::String)));
    }

    #[test]
    fn lists_are_covariant() {
        let narrow = Type::list(Type::String);
        let wide = Type::list(Type::maybe(Type::String));
        assert!(narrow.is_assignable_to(&wide));
        assert!(!wide.is_assignable_to(&narrow));
    }

    #[test]
    fn dicts_use_width_subtyping() {
        let source = Type::typed_dict([("a", Type::String), ("b", Type::Number)]);
        let target = Type::typed_dict([("a", Type::String)]);
        assert!(source.is_assignable_to(&target));
        assert!(!target.is_assignable_to(&source));
    }

    #[test]
    fn tags_never_strip_implicitly() {
        let tagged = Type::tagged(Type::typed_dict([("run", Type::String)]), Type::Number);
        assert!(!tagged.is_assignable_to(&Type::Number));
        assert!(tagged.strip_tags().is_assignable_to(&Type::Number));
    }

    #[test]
    fn tagged_targets_are_covariant_in_both_positions() {
        let source = Type::tagged(Type::String, Type::String);
        let target = Type::tagged(Type::maybe(Type::String), Type::maybe(Type::String));
        assert!(source.is_assignable_to(&target));
        assert!(!target.is_assignable_to(&source));
    }

    #[test]
    fn strip_tags_reaches_nested_positions() {
        let ty = Type::list(Type::maybe(Type::tagged(Type::String, Type::Number)));
        assert_eq!(ty.strip_tags(), Type::list(Type::maybe(Type::Number)));
    }

    #[test]
    fn non_none_unwraps_maybe() {
        assert_eq!(
            Type::maybe(Type::String).non_none(),
            Some(Type::String)
        );
        assert_eq!(Type::None.non_none(), None);
        assert_eq!(Type::Number.non_none(), Some(Type::Number));
    }

    #[test]
    fn non_none_keeps_multi_member_remainder() {
        let ty = Type::union([Type::None, Type::String, Type::Number]);
        assert_eq!(
            ty.non_none(),
            Some(Type::union([Type::String, Type::Number]))
        );
    }
}
