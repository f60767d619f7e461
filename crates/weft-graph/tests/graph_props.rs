//! Property suites for expression hashing and variable resolution.

use std::sync::Arc;

use proptest::prelude::*;
use weft_graph::{resolve_vars, ExprHash, FrameStack, Node, NodeRef};
use weft_types::Type;

fn arb_leaf() -> impl Strategy<Value = NodeRef> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(Node::string),
        (0..1000i32).prop_map(|n| Node::number(f64::from(n))),
        any::<bool>().prop_map(Node::boolean),
        Just(Node::none()),
    ]
}

/// Closed expressions: literals composed under op applications.
fn arb_closed_node() -> impl Strategy<Value = NodeRef> {
    arb_leaf().prop_recursive(3, 16, 3, |inner| {
        prop::collection::vec(("[a-c]", inner), 1..4).prop_map(|inputs| {
            Arc::new(Node::Output {
                op: "tuple".into(),
                inputs: inputs.into_iter().collect(),
                ty: Type::Any,
            })
        })
    })
}

proptest! {
    #[test]
    fn prop_hashing_is_deterministic(node in arb_closed_node()) {
        prop_assert_eq!(ExprHash::of(&node).unwrap(), ExprHash::of(&node).unwrap());
    }

    #[test]
    fn prop_serde_round_trip_preserves_the_hash(node in arb_closed_node()) {
        let json = serde_json::to_string(node.as_ref()).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&back, node.as_ref());
        prop_assert_eq!(ExprHash::of(&back).unwrap(), ExprHash::of(&node).unwrap());
    }

    #[test]
    fn prop_closed_nodes_resolve_to_themselves(node in arb_closed_node()) {
        let resolved = resolve_vars(&node, &FrameStack::new()).unwrap();
        prop_assert!(Arc::ptr_eq(&node, &resolved));
    }

    #[test]
    fn prop_substitution_eliminates_the_variable(bound in arb_closed_node(), name in "[a-z]{1,6}") {
        let stack = FrameStack::from_frame(
            [(name.clone(), Arc::clone(&bound))].into_iter().collect(),
        );
        let expr = Node::var(name, Type::Any);
        let resolved = resolve_vars(&expr, &stack).unwrap();
        prop_assert!(!resolved.has_free_vars());
        prop_assert!(Arc::ptr_eq(&bound, &resolved));
    }
}
