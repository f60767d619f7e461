//! The `{loading, result}` view over an in-flight or completed evaluation.

use std::sync::Arc;

/// Snapshot of an asynchronous evaluation
///
/// A `Loadable` is replaced, never mutated: each lifecycle step publishes a
/// fresh snapshot. `loading` with a result present is a valid intermediate
/// state (a partial chunk of a list query).
#[derive(Debug)]
pub struct Loadable<T> {
    /// Whether a request for this key is still in flight
    pub loading: bool,
    /// The latest result, shared by reference
    pub result: Option<Arc<T>>,
}

impl<T> Loadable<T> {
    /// In flight, nothing to show yet
    #[inline]
    #[must_use]
    pub fn pending() -> Self {
        Self {
            loading: true,
            result: None,
        }
    }

    /// Complete with a result
    #[inline]
    #[must_use]
    pub fn ready(result: Arc<T>) -> Self {
        Self {
            loading: false,
            result: Some(result),
        }
    }

    /// Still in flight, with a usable partial result
    #[inline]
    #[must_use]
    pub fn partial(result: Arc<T>) -> Self {
        Self {
            loading: true,
            result: Some(result),
        }
    }

    /// Complete without a result (a failed evaluation)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            loading: false,
            result: None,
        }
    }

    /// Whether the result is final
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.loading && self.result.is_some()
    }
}

impl<T> Clone for Loadable<T> {
    fn clone(&self) -> Self {
        Self {
            loading: self.loading,
            result: self.result.clone(),
        }
    }
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self::pending()
    }
}
