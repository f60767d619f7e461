//! Content addressing for expressions
//!
//! Provides [`ExprHash`], a strongly-typed 32-byte hash over an expression's
//! canonical JSON encoding. Structurally equal expressions hash equally,
//! which is what evaluation caches and in-flight tables key on.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::GraphError;
use crate::node::Node;

/// A 32-byte expression hash (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprHash([u8; 32]);

impl ExprHash {
    /// Create from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from a byte slice
    ///
    /// # Errors
    /// Returns an error if the slice is not exactly 32 bytes.
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != 32 {
            return Err(HashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Hash an expression's canonical JSON encoding
    ///
    /// # Errors
    /// Returns an error if the expression cannot be encoded.
    #[inline]
    pub fn of(node: &Node) -> Result<Self, GraphError> {
        let encoded = serde_json::to_vec(node)?;
        let hash = blake3::hash(&encoded);
        Ok(Self::new(*hash.as_bytes()))
    }

    /// Short form for log lines (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ExprHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ExprHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8; 32]> for ExprHash {
    fn as_ref(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Errors constructing an [`ExprHash`] from external representations
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Byte slice of the wrong length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required byte count
        expected: usize,
        /// Supplied byte count
        actual: usize,
    },

    /// Hex decoding failed
    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
