use std::fmt;

use serde::{Deserialize, Serialize};

use tess_types::{
    Attribute, AttributeId, DataFlags, ObjectId, ObjectInfo, ObjectType, StorageId, TeeResult,
    Usage, Whence,
};

/// Opaque wire handle to a backend-held object or enumerator.
///
/// Zero is the distinguished null sentinel meaning "no object". The backend
/// allocates non-null values; the client never fabricates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawHandle(u32);

impl RawHandle {
    /// The null handle.
    pub const NULL: Self = Self(0);

    /// Wrap a raw handle value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this is the null sentinel.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The privileged backend behind the call gate.
///
/// One synchronous method per backend operation. All implementations must
/// satisfy these invariants:
/// - Every call blocks until the backend has applied its effects; there is
///   no partial completion visible to the caller.
/// - Handles returned by allocation operations are non-null and stay valid
///   until closed through the same gate.
/// - Durable state changes (create, delete, rename, write, truncate) are
///   applied before the call returns.
/// - The gate reports outcomes through `TeeResult` and never decides which
///   of them are fatal; failure classification belongs to the client layer.
/// - Stream positions and sizes never exceed `DATA_MAX_POSITION`; a call
///   that would push past it reports `Overflow` and changes nothing.
pub trait CallGate: Send + Sync {
    // -- generic object operations ------------------------------------------

    /// Fetch a fresh metadata snapshot of an object.
    fn info(&self, handle: RawHandle) -> TeeResult<ObjectInfo>;

    /// Intersect the object's usage permissions with `usage`.
    ///
    /// Narrowing is monotonic: bits cleared here can never be granted back.
    fn restrict_usage(&self, handle: RawHandle, usage: Usage) -> TeeResult;

    /// Read a reference attribute's payload, bounded by `max_len`.
    ///
    /// Reports `NotFound` for an absent attribute, `ShortBuffer` when the
    /// payload exceeds `max_len`, and `AccessDenied` for a secret attribute
    /// of a non-extractable object.
    fn buffer_attribute(
        &self,
        handle: RawHandle,
        id: AttributeId,
        max_len: usize,
    ) -> TeeResult<Vec<u8>>;

    /// Read a value attribute's raw payload.
    ///
    /// A well-formed payload is exactly eight bytes: the two 32-bit fields
    /// in little-endian order. Reports `NotFound` and `AccessDenied` like
    /// [`CallGate::buffer_attribute`].
    fn value_attribute(&self, handle: RawHandle, id: AttributeId) -> TeeResult<Vec<u8>>;

    /// Release a handle without touching durable state.
    fn close(&self, handle: RawHandle) -> TeeResult;

    // -- transient object lifecycle -----------------------------------------

    /// Allocate an un-initialized transient object sized for `max_size`
    /// bits of key material.
    ///
    /// Reports `NotSupported` for an unknown type or size, `OutOfMemory`
    /// when no slot is available.
    fn allocate_transient(&self, object_type: ObjectType, max_size: u32) -> TeeResult<RawHandle>;

    /// Clear a transient object's attributes and initialization state.
    fn reset_transient(&self, handle: RawHandle) -> TeeResult;

    /// Populate an un-initialized transient object with attributes.
    ///
    /// Reports `BadParameters` for a malformed or inconsistent attribute
    /// set.
    fn populate(&self, handle: RawHandle, attrs: &[Attribute]) -> TeeResult;

    /// Generate a key of `key_size` bits into an un-initialized transient
    /// object.
    fn generate_key(&self, handle: RawHandle, key_size: u32, params: &[Attribute]) -> TeeResult;

    /// Copy the attribute set of `src` into the un-initialized transient
    /// object `dest` and mark it initialized.
    fn copy_attributes(&self, dest: RawHandle, src: RawHandle) -> TeeResult;

    // -- persistent directory operations ------------------------------------

    /// Open a persistent object by identifier.
    ///
    /// Reports `NotFound` for an absent object and `AccessConflict` when
    /// the requested access clashes with a concurrently open handle's
    /// sharing mode.
    fn open(&self, storage: StorageId, id: &ObjectId, flags: DataFlags) -> TeeResult<RawHandle>;

    /// Create a persistent object, seeding attributes from the object
    /// behind `attributes` (null for a pure data object) and the data
    /// stream from `initial_data`.
    ///
    /// Reports `AccessConflict` when the identifier is taken and
    /// `OVERWRITE` was not requested, `StorageFull` when the quota is
    /// exhausted.
    fn create(
        &self,
        storage: StorageId,
        id: &ObjectId,
        flags: DataFlags,
        attributes: RawHandle,
        initial_data: &[u8],
    ) -> TeeResult<RawHandle>;

    /// Durably remove the object behind `handle` and release the handle.
    fn close_and_delete(&self, handle: RawHandle) -> TeeResult;

    /// Change a persistent object's identifier.
    ///
    /// Reports `AccessConflict` when another object already holds
    /// `new_id`.
    fn rename(&self, handle: RawHandle, new_id: &ObjectId) -> TeeResult;

    // -- enumerators ---------------------------------------------------------

    /// Allocate an inert enumerator.
    fn allocate_enumerator(&self) -> TeeResult<RawHandle>;

    /// Release an enumerator.
    fn free_enumerator(&self, handle: RawHandle) -> TeeResult;

    /// Return an enumerator to its inert state.
    fn reset_enumerator(&self, handle: RawHandle) -> TeeResult;

    /// Start an enumerator over the identifiers in `storage`.
    ///
    /// Reports `NotFound` when the namespace holds no objects.
    fn start_enumerator(&self, handle: RawHandle, storage: StorageId) -> TeeResult;

    /// Advance the enumerator and return the next object's metadata and
    /// identifier.
    ///
    /// Reports `NotFound` when the cursor is exhausted; exhaustion is
    /// stable under repeated calls.
    fn next_enumerated(&self, handle: RawHandle) -> TeeResult<(ObjectInfo, ObjectId)>;

    // -- data stream I/O -----------------------------------------------------

    /// Read up to `len` bytes from the current position, advancing it.
    ///
    /// A short or empty result means the position is at or near the end of
    /// the data; it is not an error.
    fn read(&self, handle: RawHandle, len: usize) -> TeeResult<Vec<u8>>;

    /// Write `data` at the current position, advancing it. Writing past
    /// the current end zero-fills the gap.
    ///
    /// Reports `StorageFull` when the quota is exhausted and `Overflow`
    /// when the write would pass the maximum position.
    fn write(&self, handle: RawHandle, data: &[u8]) -> TeeResult;

    /// Resize the data stream to `size` bytes, zero-filling on growth.
    /// The stream position is left unchanged.
    fn truncate(&self, handle: RawHandle, size: u64) -> TeeResult;

    /// Move the stream position.
    ///
    /// Reports `Overflow` when the target falls outside
    /// `0..=DATA_MAX_POSITION`.
    fn seek(&self, handle: RawHandle, offset: i64, whence: Whence) -> TeeResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_is_zero() {
        assert!(RawHandle::NULL.is_null());
        assert_eq!(RawHandle::NULL.raw(), 0);
        assert!(!RawHandle::new(1).is_null());
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(format!("{}", RawHandle::new(0x2A)), "0x0000002a");
    }

    #[test]
    fn serde_round_trip() {
        let handle = RawHandle::new(7);
        let json = serde_json::to_string(&handle).unwrap();
        let parsed: RawHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(handle, parsed);
    }
}
