//! Identifiers for persistent objects and storage namespaces.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fatal;

/// Durable identifier of a persistent object: an opaque byte string of at
/// most [`ObjectId::MAX_LEN`] bytes.
///
/// The length bound is an API contract, not a runtime condition:
/// constructing a longer identifier aborts the task.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(Vec<u8>);

impl ObjectId {
    /// Maximum identifier length in bytes.
    pub const MAX_LEN: usize = 64;

    /// Wrap an identifier byte string.
    ///
    /// Aborts the task if `bytes` exceeds [`ObjectId::MAX_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        if bytes.len() > Self::MAX_LEN {
            fatal::contract_violation("persistent object identifier exceeds the maximum length");
        }
        Self(bytes)
    }

    /// The raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Identifier length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the zero-length identifier.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hex-encoded representation.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A storage namespace.
///
/// Exactly one namespace is supported, [`StorageId::PRIVATE`]; directory
/// and enumerator operations against any other value report "not found"
/// without reaching the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageId(u32);

impl StorageId {
    /// The task's private storage namespace.
    pub const PRIVATE: Self = Self(0x0000_0001);

    /// Wrap a raw namespace value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw namespace value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}
