//! Layered configuration
//!
//! A resolved stack shares one JSON root. Layer 0 owns the top level; layer
//! k owns the object nested k levels deep under `childConfig`. Updates are
//! `{scope, patch}` messages applied by a single reducer against the current
//! root, so no layer ever merges against a stale copy, and no layer can
//! reach a sibling's or ancestor's slice.

use parking_lot::Mutex;
use serde_json::{Map, Value};

/// Key under which a layer's child slice nests
pub const CHILD_CONFIG_KEY: &str = "childConfig";

/// Which slice of a layer a patch addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchScope {
    /// The layer's own fields
    Base,
    /// The layer's child slice
    Child,
}

/// A typed config update message
#[derive(Debug, Clone)]
pub struct ConfigPatch {
    /// Addressed slice
    pub scope: PatchScope,
    /// Fields to shallow-merge into that slice
    pub patch: Value,
}

impl ConfigPatch {
    /// Patch the layer's own fields
    #[inline]
    #[must_use]
    pub fn base(patch: Value) -> Self {
        Self {
            scope: PatchScope::Base,
            patch,
        }
    }

    /// Patch the layer's child slice
    #[inline]
    #[must_use]
    pub fn child(patch: Value) -> Self {
        Self {
            scope: PatchScope::Child,
            patch,
        }
    }
}

/// Split a layer's config into its own fields and its child slice
///
/// `base` is the config minus `childConfig`; `child` defaults to an empty
/// object. Non-object configs have no child slice.
#[must_use]
pub fn split_config(config: &Value) -> (Value, Value) {
    match config {
        Value::Object(map) => {
            let mut base = map.clone();
            let child = base
                .remove(CHILD_CONFIG_KEY)
                .unwrap_or_else(|| Value::Object(Map::new()));
            (Value::Object(base), child)
        }
        other => (other.clone(), Value::Object(Map::new())),
    }
}

/// Shallow-merge `patch` into `base`
///
/// Object fields in `patch` override same-named fields in `base`; nested
/// objects are replaced wholesale, not merged. Non-object operands replace.
#[must_use]
pub fn merge_shallow(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            let mut merged = base.clone();
            for (key, value) in patch {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => patch.clone(),
    }
}

/// Apply a patch addressed to the layer `depth` levels down
///
/// Returns the new root; the input is never mutated. Base patches cannot
/// smuggle a `childConfig` key into their own slice — the child slice is
/// only reachable through [`PatchScope::Child`] of the parent layer, and the
/// current child is always carried over from the live root.
#[must_use]
pub fn apply_patch(root: &Value, depth: usize, patch: &ConfigPatch) -> Value {
    let (base, child) = split_config(root);
    if depth > 0 {
        let new_child = apply_patch(&child, depth - 1, patch);
        return assemble(&base, &new_child);
    }
    match patch.scope {
        PatchScope::Base => {
            let (sanitized, _) = split_config(&patch.patch);
            let merged = merge_shallow(&base, &sanitized);
            assemble(&merged, &child)
        }
        PatchScope::Child => {
            let merged = merge_shallow(&child, &patch.patch);
            assemble(&base, &merged)
        }
    }
}

/// Reattach a child slice to a base slice
///
/// An empty child that was never present is not materialized.
fn assemble(base: &Value, child: &Value) -> Value {
    let child_empty = child.as_object().is_some_and(Map::is_empty);
    if child_empty {
        return base.clone();
    }
    let mut map = match base {
        Value::Object(map) => map.clone(),
        // Layered configs are objects; anything else has nowhere to hang a
        // child, so it is promoted to an object holding only the child.
        _ => Map::new(),
    };
    map.insert(CHILD_CONFIG_KEY.to_string(), child.clone());
    Value::Object(map)
}

/// The single owner of a stack's config root and its adaptive lifecycle
///
/// The lifecycle is a two-state machine: `Adaptive` (no user-committed
/// config exists; leaf panels derive defaults from the live input type) and
/// `Committed`. The only transition is `Adaptive -> Committed`, taken
/// exactly once by the first leaf edit, which persists the full adaptive
/// snapshot plus the user's delta.
#[derive(Debug)]
pub struct ConfigStore {
    state: Mutex<StoreState>,
}

#[derive(Debug)]
struct StoreState {
    root: Value,
    committed: bool,
}

impl ConfigStore {
    /// A store with no user-committed config yet
    #[must_use]
    pub fn new_adaptive() -> Self {
        Self {
            state: Mutex::new(StoreState {
                root: Value::Object(Map::new()),
                committed: false,
            }),
        }
    }

    /// A store rehydrated from persisted config
    #[must_use]
    pub fn from_committed(root: Value) -> Self {
        Self {
            state: Mutex::new(StoreState {
                root,
                committed: true,
            }),
        }
    }

    /// Whether a user-committed config exists
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.state.lock().committed
    }

    /// The current root
    #[must_use]
    pub fn root(&self) -> Value {
        self.state.lock().root.clone()
    }

    /// The base slice owned by the layer `depth` levels down
    #[must_use]
    pub fn slice(&self, depth: usize) -> Value {
        let root = self.root();
        let mut current = root;
        for _ in 0..depth {
            let (_, child) = split_config(&current);
            current = child;
        }
        split_config(&current).0
    }

    /// Apply a patch from the layer `depth` levels down; returns the new root
    ///
    /// This is the one reducer every layer's updates funnel through.
    pub fn update(&self, depth: usize, patch: &ConfigPatch) -> Value {
        let mut state = self.state.lock();
        state.root = apply_patch(&state.root, depth, patch);
        state.root.clone()
    }

    /// A leaf edit, freezing the adaptive default on first use
    ///
    /// While uncommitted, the full `adaptive` snapshot and the `delta` are
    /// persisted together and the store transitions to committed — exactly
    /// once. Once committed, only the delta is merged; the snapshot argument
    /// is ignored, so re-triggering the transition cannot double-apply it.
    pub fn commit_leaf(&self, depth: usize, adaptive: &Value, delta: &Value) -> Value {
        let mut state = self.state.lock();
        let patch = if state.committed {
            ConfigPatch::base(delta.clone())
        } else {
            tracing::debug!(depth, "freezing adaptive config on first edit");
            state.committed = true;
            ConfigPatch::base(merge_shallow(adaptive, delta))
        };
        state.root = apply_patch(&state.root, depth, &patch);
        state.root.clone()
    }

    /// The config a leaf renders with
    ///
    /// Adaptive until first commit (callers recompute `adaptive` from the
    /// live input type each render), committed state afterwards — the
    /// adaptive default is never recomputed into a fresh identity once
    /// committed state exists.
    #[must_use]
    pub fn leaf_config(&self, depth: usize, adaptive: &Value) -> Value {
        if self.is_committed() {
            self.slice(depth)
        } else {
            adaptive.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_separates_base_and_child() {
        let config = json!({"a": 1, "childConfig": {"b": 2}});
        let (base, child) = split_config(&config);
        assert_eq!(base, json!({"a": 1}));
        assert_eq!(child, json!({"b": 2}));
    }

    #[test]
    fn split_of_childless_config_gives_empty_child() {
        let (base, child) = split_config(&json!({"a": 1}));
        assert_eq!(base, json!({"a": 1}));
        assert_eq!(child, json!({}));
    }

    #[test]
    fn merge_is_shallow() {
        let merged = merge_shallow(
            &json!({"keep": 1, "replace": {"deep": true}}),
            &json!({"replace": {"other": 2}, "add": 3}),
        );
        assert_eq!(
            merged,
            json!({"keep": 1, "replace": {"other": 2}, "add": 3})
        );
    }

    #[test]
    fn base_and_child_updates_stay_isolated() {
        let store = ConfigStore::from_committed(json!({}));
        store.update(0, &ConfigPatch::base(json!({"a": 1})));
        let root = store.update(0, &ConfigPatch::child(json!({"b": 2})));
        assert_eq!(root, json!({"a": 1, "childConfig": {"b": 2}}));

        // Same result regardless of order.
        let store = ConfigStore::from_committed(json!({}));
        store.update(0, &ConfigPatch::child(json!({"b": 2})));
        let root = store.update(0, &ConfigPatch::base(json!({"a": 1})));
        assert_eq!(root, json!({"a": 1, "childConfig": {"b": 2}}));
    }

    #[test]
    fn base_patches_cannot_reach_the_child_slice() {
        let store = ConfigStore::from_committed(json!({"childConfig": {"b": 2}}));
        let root = store.update(
            0,
            &ConfigPatch::base(json!({"a": 1, "childConfig": {"stolen": true}})),
        );
        assert_eq!(root, json!({"a": 1, "childConfig": {"b": 2}}));
    }

    #[test]
    fn sequential_updates_merge_without_losing_fields() {
        let store = ConfigStore::from_committed(json!({}));
        store.update(0, &ConfigPatch::base(json!({"x": 1})));
        let root = store.update(0, &ConfigPatch::base(json!({"y": 2})));
        assert_eq!(root, json!({"x": 1, "y": 2}));
    }

    #[test]
    fn deep_layers_write_through_nested_child_configs() {
        let store = ConfigStore::from_committed(json!({}));
        let root = store.update(2, &ConfigPatch::base(json!({"leaf": true})));
        assert_eq!(
            root,
            json!({"childConfig": {"childConfig": {"leaf": true}}})
        );

        // An outer layer's update leaves the deep slice alone.
        let root = store.update(0, &ConfigPatch::base(json!({"outer": 1})));
        assert_eq!(
            root,
            json!({"outer": 1, "childConfig": {"childConfig": {"leaf": true}}})
        );
        assert_eq!(store.slice(2), json!({"leaf": true}));
    }

    #[test]
    fn first_leaf_edit_freezes_snapshot_plus_delta() {
        let store = ConfigStore::new_adaptive();
        let adaptive = json!({"columns": ["a", "b"], "sort": "a"});

        // Before any edit, the leaf renders the live adaptive default.
        assert_eq!(store.leaf_config(0, &adaptive), adaptive);
        assert!(!store.is_committed());

        let root = store.commit_leaf(0, &adaptive, &json!({"sort": "b"}));
        assert!(store.is_committed());
        assert_eq!(root, json!({"columns": ["a", "b"], "sort": "b"}));

        // From now on the committed state is rendered, not the adaptive
        // default, even if the adaptive derivation would differ.
        let changed_adaptive = json!({"columns": ["c"], "sort": "c"});
        assert_eq!(
            store.leaf_config(0, &changed_adaptive),
            json!({"columns": ["a", "b"], "sort": "b"})
        );
    }

    #[test]
    fn refreezing_is_a_no_op_merge() {
        let store = ConfigStore::new_adaptive();
        let adaptive = json!({"columns": ["a", "b"], "sort": "a"});

        store.commit_leaf(0, &adaptive, &json!({"sort": "b"}));
        // A second trigger (same edit replayed before a re-render) must not
        // discard the first edit or re-apply the snapshot.
        let changed_adaptive = json!({"columns": ["z"]});
        let root = store.commit_leaf(0, &changed_adaptive, &json!({"sort": "b"}));
        assert_eq!(root, json!({"columns": ["a", "b"], "sort": "b"}));
    }

    #[test]
    fn two_edits_before_rerender_keep_both() {
        let store = ConfigStore::new_adaptive();
        let adaptive = json!({"columns": ["a"]});

        store.commit_leaf(0, &adaptive, &json!({"sort": "a"}));
        let root = store.commit_leaf(0, &adaptive, &json!({"page": 2}));
        assert_eq!(root, json!({"columns": ["a"], "sort": "a", "page": 2}));
    }

    #[test]
    fn frozen_leaf_config_under_converters_lands_at_its_depth() {
        let store = ConfigStore::new_adaptive();
        let adaptive = json!({"columns": ["a"]});

        let root = store.commit_leaf(1, &adaptive, &json!({"sort": "a"}));
        assert_eq!(
            root,
            json!({"childConfig": {"columns": ["a"], "sort": "a"}})
        );
        assert_eq!(store.leaf_config(1, &adaptive), json!({"columns": ["a"], "sort": "a"}));
    }
}
