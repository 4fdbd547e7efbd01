use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recoverable outcomes of secure object and storage operations.
///
/// These are the runtime conditions a caller is expected to branch on.
/// Each operation documents exactly which of them it can report; a backend
/// outcome outside that set is escalated through [`crate::fatal`] instead
/// of being returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum TeeError {
    /// The requested object, attribute, or enumerator entry does not exist.
    #[error("item not found")]
    NotFound,

    /// The caller-supplied output buffer is too small for the payload.
    #[error("output buffer too small")]
    ShortBuffer,

    /// The operation is forbidden by the object's usage permissions or
    /// access mode.
    #[error("access denied")]
    AccessDenied,

    /// A concurrently visible object holds the requested identifier, or
    /// the requested sharing mode clashes with an existing open handle.
    #[error("access conflict")]
    AccessConflict,

    /// The storage quota is exhausted.
    #[error("storage full")]
    StorageFull,

    /// The supplied parameters are malformed or inconsistent.
    #[error("bad parameters")]
    BadParameters,

    /// A stream position computation would pass the maximum position.
    #[error("data position overflow")]
    Overflow,

    /// The requested object type or size is not supported.
    #[error("not supported")]
    NotSupported,

    /// The backend could not allocate the requested resource.
    #[error("out of memory")]
    OutOfMemory,

    /// Unspecified backend failure.
    #[error("generic failure")]
    Generic,
}

/// Result alias used across the workspace.
pub type TeeResult<T = ()> = Result<T, TeeError>;
