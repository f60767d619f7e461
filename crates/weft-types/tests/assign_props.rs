use proptest::prelude::*;
use weft_types::Type;

fn arb_type() -> impl Strategy<Value = Type> {
    let leaf = prop_oneof![
        Just(Type::Any),
        Just(Type::Unknown),
        Just(Type::None),
        Just(Type::Boolean),
        Just(Type::Number),
        Just(Type::String),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::list),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Type::union),
            (inner.clone(), inner.clone()).prop_map(|(tag, value)| Type::tagged(tag, value)),
            prop::collection::vec(("[a-d]", inner), 0..4)
                .prop_map(Type::typed_dict),
        ]
    })
}

fn contains_tag(ty: &Type) -> bool {
    match ty {
        Type::TaggedValue { .. } => true,
        Type::List { of } => contains_tag(of),
        Type::Union { members } => members.iter().any(contains_tag),
        Type::TypedDict { fields } => fields.values().any(contains_tag),
        _ => false,
    }
}

proptest! {
    #[test]
    fn prop_assignability_is_reflexive(ty in arb_type()) {
        prop_assert!(ty.is_assignable_to(&ty));
    }

    #[test]
    fn prop_none_fits_every_maybe(ty in arb_type()) {
        prop_assert!(Type::None.is_assignable_to(&Type::maybe(ty)));
    }

    #[test]
    fn prop_value_upcasts_into_its_maybe(ty in arb_type()) {
        prop_assert!(ty.is_assignable_to(&Type::maybe(ty.clone())));
    }

    #[test]
    fn prop_everything_fits_any(ty in arb_type()) {
        prop_assert!(ty.is_assignable_to(&Type::Any));
    }

    #[test]
    fn prop_strip_tags_removes_all_tags(ty in arb_type()) {
        prop_assert!(!contains_tag(&ty.strip_tags()));
    }

    #[test]
    fn prop_strip_tags_is_idempotent(ty in arb_type()) {
        let once = ty.strip_tags();
        prop_assert_eq!(once.strip_tags(), once);
    }

    #[test]
    fn prop_union_members_fit_their_union(members in prop::collection::vec(arb_type(), 1..4)) {
        let union = Type::union(members.clone());
        for member in members {
            prop_assert!(member.is_assignable_to(&union));
        }
    }

    #[test]
    fn prop_serde_round_trip(ty in arb_type()) {
        let json = serde_json::to_string(&ty).unwrap();
        let back: Type = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, ty);
    }
}
