//! The evaluation client: cached, deduplicated expression evaluation.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;
use weft_graph::{resolve_vars, ExprHash, FrameStack, NodeRef, OpRegistry, Value};

use crate::backend::{BackendError, ExecutionBackend};
use crate::cache::{CacheStats, EvalCache};
use crate::error::EvalError;

/// Cached, deduplicated access to an [`ExecutionBackend`]
///
/// Cheap to clone; clones share the backend, caches, and refresh epoch.
/// Concurrent identical queries coalesce into a single backend call, and a
/// rejected call propagates to every waiter without being cached.
#[derive(Clone)]
pub struct EvalClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    backend: Arc<dyn ExecutionBackend>,
    ops: OpRegistry,
    cache: EvalCache,
    epoch: watch::Sender<u64>,
}

impl EvalClient {
    /// Create a client with default cache sizing
    #[must_use]
    pub fn new(backend: Arc<dyn ExecutionBackend>, ops: OpRegistry) -> Self {
        Self::with_cache(backend, ops, EvalCache::default())
    }

    /// Create a client over a configured cache
    #[must_use]
    pub fn with_cache(
        backend: Arc<dyn ExecutionBackend>,
        ops: OpRegistry,
        cache: EvalCache,
    ) -> Self {
        let (epoch, _) = watch::channel(0);
        Self {
            inner: Arc::new(ClientInner {
                backend,
                ops,
                cache,
                epoch,
            }),
        }
    }

    /// The op registry this client constructs expressions against
    #[inline]
    #[must_use]
    pub fn ops(&self) -> &OpRegistry {
        &self.inner.ops
    }

    /// The underlying backend
    #[inline]
    #[must_use]
    pub fn backend(&self) -> Arc<dyn ExecutionBackend> {
        Arc::clone(&self.inner.backend)
    }

    /// Materialize an expression's value
    ///
    /// Variables are dereferenced against `stack`, the result is keyed by the
    /// absolute expression's hash, and repeated or concurrent lookups for the
    /// same key share one backend call.
    ///
    /// # Errors
    /// Graph errors from variable resolution, or the backend's rejection.
    /// Rejections are not cached; the next lookup retries.
    pub async fn value(&self, node: &NodeRef, stack: &FrameStack) -> Result<Arc<Value>, EvalError> {
        let absolute = resolve_vars(node, stack)?;
        let key = ExprHash::of(&absolute)?;
        let backend = Arc::clone(&self.inner.backend);
        self.inner
            .cache
            .values()
            .try_get_with(key, async move {
                let request = Uuid::new_v4();
                tracing::debug!(%request, expr = %key.short(), "dispatching query");
                backend.query(&absolute).await.map(Arc::new)
            })
            .await
            .map_err(|err: Arc<BackendError>| EvalError::Backend((*err).clone()))
    }

    /// Materialize several expressions concurrently, preserving input order
    pub async fn value_many(
        &self,
        nodes: &[NodeRef],
        stack: &FrameStack,
    ) -> Vec<Result<Arc<Value>, EvalError>> {
        futures::future::join_all(nodes.iter().map(|node| self.value(node, stack))).await
    }

    /// Ask the backend for an expression's concrete output type
    ///
    /// Returns the refined node; refinements are cached like values.
    ///
    /// # Errors
    /// Graph errors from variable resolution, or the backend's rejection.
    pub async fn refined_type(
        &self,
        node: &NodeRef,
        stack: &FrameStack,
    ) -> Result<NodeRef, EvalError> {
        let absolute = resolve_vars(node, stack)?;
        let key = ExprHash::of(&absolute)?;
        let backend = Arc::clone(&self.inner.backend);
        self.inner
            .cache
            .refinements()
            .try_get_with(key, async move {
                tracing::debug!(expr = %key.short(), "dispatching type refinement");
                backend.refine_type(&absolute).await
            })
            .await
            .map_err(|err: Arc<BackendError>| EvalError::Backend((*err).clone()))
    }

    /// Invalidate every cached result and tell live slots to refetch
    ///
    /// Deliberately coarse: a write anywhere refreshes everything.
    pub fn refresh_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.epoch.send_modify(|epoch| *epoch += 1);
        tracing::info!(epoch = self.epoch(), "caches invalidated, refresh propagated");
    }

    /// The current refresh epoch
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        *self.inner.epoch.borrow()
    }

    pub(crate) fn subscribe_epoch(&self) -> watch::Receiver<u64> {
        self.inner.epoch.subscribe()
    }

    /// Current cache statistics
    #[inline]
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }
}

impl fmt::Debug for EvalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalClient")
            .field("ops", &self.inner.ops.len())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}
