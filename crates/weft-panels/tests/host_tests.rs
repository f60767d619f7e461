//! Host integration over a scripted backend: refinement feeding resolution,
//! layer transforms, config routing, and the fallback paths.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use weft_engine::{EvalClient, ExecutionBackend};
use weft_graph::{FrameStack, Node, NodeRef, OpRegistry};
use weft_panels::harness::sample_registry;
use weft_panels::{ConfigPatch, Opened, PanelHost, PanelIdPath, PanelRegistry};
use weft_test_utils::StubBackend;
use weft_types::Type;

type Component = &'static str;

fn setup() -> (Arc<StubBackend>, EvalClient, PanelHost<Component>) {
    let registry: Arc<PanelRegistry<Component>> = Arc::new(sample_registry().unwrap());
    let mut ops = OpRegistry::with_builtins();
    registry.register_ops(&mut ops).unwrap();

    let backend = Arc::new(StubBackend::new());
    let client = EvalClient::new(Arc::clone(&backend) as Arc<dyn ExecutionBackend>, ops);
    let host = PanelHost::new(client.clone(), registry);
    (backend, client, host)
}

#[tokio::test]
async fn refinement_feeds_resolution_and_layer_transforms() {
    let (backend, client, host) = setup();

    // An artifact fetch whose concrete type is only known after refinement.
    let fetch = client.ops().op_get("runs/values.json").unwrap();
    let refined: NodeRef = Node::constant(
        Type::maybe(Type::list(Type::maybe(Type::String))),
        json!(["r1", null, "r3"]),
    );
    backend.put_refinement(&fetch, Arc::clone(&refined));

    let opened = host.open(&fetch, &FrameStack::new(), None).await.unwrap();
    let Opened::Panel(instance) = opened else {
        panic!("expected a resolved panel");
    };

    assert_eq!(instance.composite_id(), "maybe.row.string");

    // The outermost layer renders the refined node itself; the maybe wrapper
    // passes it through; the row layer renders an index expression.
    let layers = instance.layers();
    assert!(Arc::ptr_eq(&layers[0].input, &refined));
    assert!(Arc::ptr_eq(&layers[1].input, &refined));
    assert!(matches!(
        layers[2].input.as_ref(),
        Node::Output { op, .. } if op == "index"
    ));

    // The leaf expression evaluates through the same client.
    let value = client
        .value(&instance.terminal().input, &FrameStack::new())
        .await
        .unwrap();
    assert_eq!(*value, json!("r1"));
}

#[tokio::test]
async fn unrenderable_types_come_back_as_the_no_panel_affordance() {
    let (backend, client, host) = setup();

    let fetch = client.ops().op_get("runs/opaque.bin").unwrap();
    backend.put_refinement(&fetch, Node::constant(Type::Any, json!(null)));

    let opened = host.open(&fetch, &FrameStack::new(), None).await.unwrap();
    let Opened::NoPanel { input } = opened else {
        panic!("expected the no-panel affordance");
    };
    assert_eq!(input, Type::Any);
}

#[tokio::test]
async fn stored_override_on_a_changed_schema_falls_back() {
    let (backend, client, host) = setup();

    // The user pinned "table.row" while this was a list; the artifact now
    // refines to a scalar.
    let fetch = client.ops().op_get("runs/metric.json").unwrap();
    backend.put_refinement(&fetch, Node::constant(Type::Number, json!(7)));

    let requested: PanelIdPath = "table.row".parse().unwrap();
    let opened = host
        .open(&fetch, &FrameStack::new(), Some(&requested))
        .await
        .unwrap();
    let Opened::Panel(instance) = opened else {
        panic!("expected fallback to a resolved panel");
    };
    assert_eq!(instance.composite_id(), "number");
    assert_eq!(instance.layers().len(), 1);
}

#[tokio::test]
async fn config_routes_by_depth_and_freezes_on_first_leaf_edit() {
    let (backend, client, host) = setup();

    let fetch = client.ops().op_get("runs/values.json").unwrap();
    backend.put_refinement(
        &fetch,
        Node::constant(Type::maybe(Type::list(Type::String)), json!(["a"])),
    );

    let Opened::Panel(instance) = host.open(&fetch, &FrameStack::new(), None).await.unwrap()
    else {
        panic!("expected a resolved panel");
    };
    assert_eq!(instance.composite_id(), "maybe.row.string");

    // A wrapper edit at depth 0, then the leaf's first edit at depth 2.
    instance.update(0, &ConfigPatch::base(json!({"collapsed": false})));
    let adaptive = json!({"fontSize": 12});
    let root = instance.update_leaf(&adaptive, &json!({"bold": true}));

    assert_eq!(
        root,
        json!({
            "collapsed": false,
            "childConfig": {
                "childConfig": {"fontSize": 12, "bold": true}
            }
        })
    );
    assert!(instance.config().is_committed());
    assert_eq!(
        instance.leaf_config(&json!({"fontSize": 99})),
        json!({"fontSize": 12, "bold": true})
    );
}

#[tokio::test]
async fn persisted_config_rehydrates_committed() {
    let (backend, client, host) = setup();

    let fetch = client.ops().op_get("runs/note.txt").unwrap();
    backend.put_refinement(&fetch, Node::constant(Type::String, json!("hello")));

    let saved = json!({"fontSize": 14});
    let Opened::Panel(instance) = host
        .open_with_config(&fetch, &FrameStack::new(), None, saved.clone())
        .await
        .unwrap()
    else {
        panic!("expected a resolved panel");
    };

    // A rehydrated panel never falls back to the adaptive default.
    assert!(instance.config().is_committed());
    assert_eq!(instance.leaf_config(&json!({"fontSize": 1})), saved);
}
