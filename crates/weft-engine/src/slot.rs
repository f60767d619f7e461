//! Query slots: one subscription point per mount
//!
//! A slot publishes [`SlotSnapshot`]s over a watch channel. Supersession is
//! a generation counter, not a cancel closure: a completion only commits if
//! its generation still matches the latest issued one for the slot, so the
//! last *issued* request wins even when an earlier one resolves later.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use weft_graph::{resolve_vars, ExprHash, FrameStack, Node, NodeRef, Value};
use weft_types::Type;

use crate::client::EvalClient;
use crate::error::EvalError;
use crate::loadable::Loadable;

/// Identity of a slot's current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotKey {
    expr: ExprHash,
    chunk: Option<usize>,
}

/// What a slot currently shows: the loadable plus any evaluation failure
///
/// A failure empties the loadable rather than poisoning it; the error rides
/// alongside so the host can render an error affordance.
#[derive(Debug)]
pub struct SlotSnapshot<T> {
    /// The `{loading, result}` view
    pub loadable: Loadable<T>,
    /// The failure that produced an empty loadable, if any
    pub error: Option<Arc<EvalError>>,
}

impl<T> SlotSnapshot<T> {
    fn pending() -> Self {
        Self {
            loadable: Loadable::pending(),
            error: None,
        }
    }

    fn ready(result: Arc<T>) -> Self {
        Self {
            loadable: Loadable::ready(result),
            error: None,
        }
    }

    fn partial(result: Arc<T>) -> Self {
        Self {
            loadable: Loadable::partial(result),
            error: None,
        }
    }

    fn failed(error: EvalError) -> Self {
        Self {
            loadable: Loadable::empty(),
            error: Some(Arc::new(error)),
        }
    }
}

impl<T> Clone for SlotSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            loadable: self.loadable.clone(),
            error: self.error.clone(),
        }
    }
}

struct SlotCore<T> {
    key: Mutex<Option<SlotKey>>,
    /// Absolute expression behind the current key, kept for refetches.
    input: Mutex<Option<NodeRef>>,
    generation: AtomicU64,
    tx: watch::Sender<SlotSnapshot<T>>,
}

impl<T> SlotCore<T> {
    fn new() -> Self {
        let (tx, _) = watch::channel(SlotSnapshot::pending());
        Self {
            key: Mutex::new(None),
            input: Mutex::new(None),
            generation: AtomicU64::new(0),
            tx,
        }
    }

    /// Start a request for a new key; `None` means the key is unchanged and
    /// the current snapshot stands (no redundant refetch).
    fn begin(&self, key: SlotKey, absolute: NodeRef) -> Option<u64> {
        let mut current = self.key.lock();
        if *current == Some(key) {
            return None;
        }
        *current = Some(key);
        *self.input.lock() = Some(absolute);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        // A stale result from the previous key must never show through.
        self.tx.send_replace(SlotSnapshot::pending());
        Some(generation)
    }

    /// Re-issue the current key (epoch refresh); `None` if nothing is mounted.
    fn begin_refetch(&self) -> Option<(NodeRef, SlotKey, u64)> {
        let key = (*self.key.lock())?;
        let node = self.input.lock().clone()?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_replace(SlotSnapshot::pending());
        Some((node, key, generation))
    }

    /// Publish a snapshot if this completion is still the current one
    fn publish_if_current(&self, key: SlotKey, generation: u64, snapshot: SlotSnapshot<T>) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation || *self.key.lock() != Some(key) {
            tracing::debug!(expr = %key.expr.short(), generation, "stale completion dropped");
            return false;
        }
        self.tx.send_replace(snapshot);
        true
    }

    fn subscribe(&self) -> watch::Receiver<SlotSnapshot<T>> {
        self.tx.subscribe()
    }

    fn current(&self) -> SlotSnapshot<T> {
        self.tx.borrow().clone()
    }
}

/// Subscription slot for an expression's value
///
/// Create inside a Tokio runtime; fetches run on spawned tasks. Dropping the
/// slot orphans in-flight fetches, which then fail their generation check.
pub struct ValueSlot {
    client: EvalClient,
    core: Arc<SlotCore<Value>>,
}

impl ValueSlot {
    /// Create a slot bound to a client
    #[must_use]
    pub fn new(client: EvalClient) -> Self {
        let core = Arc::new(SlotCore::new());
        spawn_epoch_listener(&client, &core, |client, core, node, key, generation| {
            tokio::spawn(async move {
                match key.chunk {
                    Some(size) => fetch_chunked(client, core, node, key, generation, size).await,
                    None => fetch_value(client, core, node, key, generation).await,
                }
            });
        });
        Self { client, core }
    }

    /// Watch this slot's snapshots
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SlotSnapshot<Value>> {
        self.core.subscribe()
    }

    /// The snapshot right now
    #[must_use]
    pub fn current(&self) -> SlotSnapshot<Value> {
        self.core.current()
    }

    /// Point this slot at an expression
    ///
    /// An unchanged key is a no-op; a changed key publishes `pending` and
    /// issues exactly one request.
    ///
    /// # Errors
    /// Graph errors from variable resolution or hashing; nothing is issued.
    pub fn set_input(&self, node: &NodeRef, stack: &FrameStack) -> Result<(), EvalError> {
        let absolute = resolve_vars(node, stack)?;
        let key = SlotKey {
            expr: ExprHash::of(&absolute)?,
            chunk: None,
        };
        if let Some(generation) = self.core.begin(key, Arc::clone(&absolute)) {
            let client = self.client.clone();
            let core = Arc::clone(&self.core);
            tokio::spawn(async move {
                fetch_value(client, core, absolute, key, generation).await;
            });
        }
        Ok(())
    }

    /// Point this slot at a list expression, delivering results in pages
    ///
    /// Pages of `chunk_size` arrive as partial snapshots (`loading` with a
    /// growing result); a short page completes the loadable. Non-list
    /// expressions degrade to a plain fetch.
    ///
    /// # Errors
    /// Graph errors from variable resolution or hashing; nothing is issued.
    pub fn set_input_chunked(
        &self,
        node: &NodeRef,
        stack: &FrameStack,
        chunk_size: usize,
    ) -> Result<(), EvalError> {
        let absolute = resolve_vars(node, stack)?;
        let key = SlotKey {
            expr: ExprHash::of(&absolute)?,
            chunk: Some(chunk_size.max(1)),
        };
        if let Some(generation) = self.core.begin(key, Arc::clone(&absolute)) {
            let client = self.client.clone();
            let core = Arc::clone(&self.core);
            tokio::spawn(async move {
                fetch_chunked(client, core, absolute, key, generation, chunk_size.max(1)).await;
            });
        }
        Ok(())
    }
}

/// Subscription slot for an expression's refined type
pub struct RefineSlot {
    client: EvalClient,
    core: Arc<SlotCore<Node>>,
}

impl RefineSlot {
    /// Create a slot bound to a client
    #[must_use]
    pub fn new(client: EvalClient) -> Self {
        let core = Arc::new(SlotCore::new());
        spawn_epoch_listener(&client, &core, |client, core, node, key, generation| {
            tokio::spawn(async move {
                fetch_refinement(client, core, node, key, generation).await;
            });
        });
        Self { client, core }
    }

    /// Watch this slot's snapshots
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SlotSnapshot<Node>> {
        self.core.subscribe()
    }

    /// The snapshot right now
    #[must_use]
    pub fn current(&self) -> SlotSnapshot<Node> {
        self.core.current()
    }

    /// Point this slot at an expression
    ///
    /// # Errors
    /// Graph errors from variable resolution or hashing; nothing is issued.
    pub fn set_input(&self, node: &NodeRef, stack: &FrameStack) -> Result<(), EvalError> {
        let absolute = resolve_vars(node, stack)?;
        let key = SlotKey {
            expr: ExprHash::of(&absolute)?,
            chunk: None,
        };
        if let Some(generation) = self.core.begin(key, Arc::clone(&absolute)) {
            let client = self.client.clone();
            let core = Arc::clone(&self.core);
            tokio::spawn(async move {
                fetch_refinement(client, core, absolute, key, generation).await;
            });
        }
        Ok(())
    }
}

/// Re-issue the mounted key whenever the client's refresh epoch moves.
fn spawn_epoch_listener<T, F>(client: &EvalClient, core: &Arc<SlotCore<T>>, launch: F)
where
    T: Send + Sync + 'static,
    F: Fn(EvalClient, Arc<SlotCore<T>>, NodeRef, SlotKey, u64) + Send + 'static,
{
    let mut epoch_rx = client.subscribe_epoch();
    let weak: Weak<SlotCore<T>> = Arc::downgrade(core);
    let client = client.clone();
    tokio::spawn(async move {
        while epoch_rx.changed().await.is_ok() {
            let Some(core) = weak.upgrade() else { break };
            if let Some((node, key, generation)) = core.begin_refetch() {
                launch(client.clone(), core, node, key, generation);
            }
        }
    });
}

async fn fetch_value(
    client: EvalClient,
    core: Arc<SlotCore<Value>>,
    node: NodeRef,
    key: SlotKey,
    generation: u64,
) {
    let snapshot = match client.value(&node, &FrameStack::new()).await {
        Ok(value) => SlotSnapshot::ready(value),
        Err(error) => SlotSnapshot::failed(error),
    };
    core.publish_if_current(key, generation, snapshot);
}

async fn fetch_refinement(
    client: EvalClient,
    core: Arc<SlotCore<Node>>,
    node: NodeRef,
    key: SlotKey,
    generation: u64,
) {
    let snapshot = match client.refined_type(&node, &FrameStack::new()).await {
        Ok(refined) => SlotSnapshot::ready(Arc::clone(&refined)),
        Err(error) => SlotSnapshot::failed(error),
    };
    core.publish_if_current(key, generation, snapshot);
}

async fn fetch_chunked(
    client: EvalClient,
    core: Arc<SlotCore<Value>>,
    node: NodeRef,
    key: SlotKey,
    generation: u64,
    chunk_size: usize,
) {
    // Paging only makes sense for lists; anything else is a plain fetch.
    if !node.ty().is_assignable_to(&Type::list(Type::Any)) {
        fetch_value(client, core, node, key, generation).await;
        return;
    }

    let mut rows: Vec<Value> = Vec::new();
    let mut offset = 0usize;
    loop {
        #[allow(clippy::cast_precision_loss)]
        let page_node = match client
            .ops()
            .op_limit(Arc::clone(&node), chunk_size as f64, offset as f64)
        {
            Ok(page_node) => page_node,
            Err(error) => {
                core.publish_if_current(key, generation, SlotSnapshot::failed(error.into()));
                return;
            }
        };

        match client.value(&page_node, &FrameStack::new()).await {
            Err(error) => {
                core.publish_if_current(key, generation, SlotSnapshot::failed(error));
                return;
            }
            Ok(page) => {
                let Some(page_rows) = page.as_array() else {
                    // Backend answered with a non-list; stop paging.
                    core.publish_if_current(key, generation, SlotSnapshot::ready(page));
                    return;
                };
                rows.extend_from_slice(page_rows);
                let done = page_rows.len() < chunk_size;
                let collected = Arc::new(Value::Array(rows.clone()));
                let snapshot = if done {
                    SlotSnapshot::ready(collected)
                } else {
                    SlotSnapshot::partial(collected)
                };
                if !core.publish_if_current(key, generation, snapshot) || done {
                    return;
                }
                offset += chunk_size;
            }
        }
    }
}
