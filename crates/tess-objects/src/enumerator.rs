//! Cursor over the persistent object identifiers in a storage namespace.

use std::sync::Arc;

use tracing::debug;

use tess_gate::{CallGate, RawHandle};
use tess_types::{fatal, ObjectId, ObjectInfo, StorageId, TeeError, TeeResult};

/// A cursor over the identifiers of persistent objects in one namespace.
///
/// Allocated inert through
/// [`TrustedStorage::allocate_enumerator`](crate::TrustedStorage::allocate_enumerator),
/// started against a namespace, then advanced until exhausted.
/// Independent enumerators over the same namespace do not share position.
/// Dropping the cursor frees it on a best-effort basis.
pub struct ObjectEnumerator {
    gate: Arc<dyn CallGate>,
    handle: RawHandle,
}

impl ObjectEnumerator {
    pub(crate) fn from_raw(gate: Arc<dyn CallGate>, handle: RawHandle) -> Self {
        Self { gate, handle }
    }

    fn take(&mut self) -> RawHandle {
        std::mem::replace(&mut self.handle, RawHandle::NULL)
    }

    /// Release the cursor.
    ///
    /// A no-op on the null handle; aborts on backend failure.
    pub fn free(mut self) {
        let handle = self.take();
        if handle.is_null() {
            return;
        }
        if let Err(err) = self.gate.free_enumerator(handle) {
            fatal::backend_failure("free_enumerator", err);
        }
    }

    /// Return the cursor to its inert state so it can be restarted.
    ///
    /// A no-op on the null handle; aborts on backend failure.
    pub fn reset(&mut self) {
        if self.handle.is_null() {
            return;
        }
        if let Err(err) = self.gate.reset_enumerator(self.handle) {
            fatal::backend_failure("reset_enumerator", err);
        }
    }

    /// Start the cursor over the identifiers in `storage`.
    ///
    /// Any namespace other than the private one reports `NotFound`
    /// without contacting the backend, as does a namespace that holds no
    /// objects; any other backend failure aborts the task.
    pub fn start(&mut self, storage: StorageId) -> TeeResult {
        if self.handle.is_null() {
            fatal::contract_violation("enumerator start on a null handle");
        }
        if storage != StorageId::PRIVATE {
            debug!(storage = storage.raw(), "enumeration of unsupported namespace");
            return Err(TeeError::NotFound);
        }
        match self.gate.start_enumerator(self.handle, storage) {
            Ok(()) => Ok(()),
            Err(TeeError::NotFound) => Err(TeeError::NotFound),
            Err(err) => fatal::backend_failure("start_enumerator", err),
        }
    }

    /// Advance the cursor and return the next object's metadata snapshot
    /// and identifier.
    ///
    /// Exhaustion is reported as `NotFound`, stably across repeated
    /// calls; any other backend failure aborts the task.
    pub fn next(&mut self) -> TeeResult<(ObjectInfo, ObjectId)> {
        if self.handle.is_null() {
            fatal::contract_violation("enumerator advance on a null handle");
        }
        match self.gate.next_enumerated(self.handle) {
            Ok(entry) => Ok(entry),
            Err(TeeError::NotFound) => Err(TeeError::NotFound),
            Err(err) => fatal::backend_failure("next_enumerated", err),
        }
    }
}

impl Drop for ObjectEnumerator {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        if let Err(err) = self.gate.free_enumerator(self.handle) {
            tracing::warn!(handle = %self.handle, %err, "enumerator free failed on drop");
        }
    }
}

impl std::fmt::Debug for ObjectEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectEnumerator")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tess_gate::{InMemoryGate, Op, ScriptedGate};
    use tess_types::DataFlags;

    use crate::storage::TrustedStorage;

    use super::*;

    fn storage_with(ids: &[&[u8]]) -> TrustedStorage {
        let storage = TrustedStorage::new(Arc::new(InMemoryGate::new()));
        for id in ids {
            storage
                .create(
                    StorageId::PRIVATE,
                    &ObjectId::new(id.to_vec()),
                    DataFlags::ACCESS_READ,
                    None,
                    b"contents",
                )
                .unwrap()
                .close();
        }
        storage
    }

    #[test]
    fn walks_every_identifier() {
        let storage = storage_with(&[b"beta", b"alpha"]);
        let mut cursor = storage.allocate_enumerator().unwrap();
        cursor.start(StorageId::PRIVATE).unwrap();

        let mut seen = Vec::new();
        while let Ok((info, id)) = cursor.next() {
            assert!(info.is_persistent());
            assert_eq!(info.data_size, 8);
            seen.push(id.as_bytes().to_vec());
        }
        assert_eq!(seen, vec![b"alpha".to_vec(), b"beta".to_vec()]);
        cursor.free();
    }

    #[test]
    fn empty_namespace_is_recoverable_on_start_and_next() {
        let storage = storage_with(&[]);
        let mut cursor = storage.allocate_enumerator().unwrap();
        assert_eq!(cursor.start(StorageId::PRIVATE), Err(TeeError::NotFound));
        // Exhaustion is stable: every subsequent advance reports the same.
        assert_eq!(cursor.next().unwrap_err(), TeeError::NotFound);
        assert_eq!(cursor.next().unwrap_err(), TeeError::NotFound);
    }

    #[test]
    fn exhaustion_is_stable_after_a_full_walk() {
        let storage = storage_with(&[b"only"]);
        let mut cursor = storage.allocate_enumerator().unwrap();
        cursor.start(StorageId::PRIVATE).unwrap();
        cursor.next().unwrap();
        assert_eq!(cursor.next().unwrap_err(), TeeError::NotFound);
        assert_eq!(cursor.next().unwrap_err(), TeeError::NotFound);
    }

    #[test]
    fn unsupported_namespace_reports_not_found_without_a_backend_call() {
        let gate = Arc::new(ScriptedGate::new());
        let mut cursor = ObjectEnumerator::from_raw(gate.clone(), RawHandle::new(5));
        assert_eq!(
            cursor.start(StorageId::new(0x8000_0000)),
            Err(TeeError::NotFound)
        );
        assert_eq!(gate.call_count(Op::StartEnumerator), 0);
    }

    #[test]
    fn reset_allows_a_restart() {
        let storage = storage_with(&[b"a", b"b"]);
        let mut cursor = storage.allocate_enumerator().unwrap();
        cursor.start(StorageId::PRIVATE).unwrap();
        cursor.next().unwrap();

        cursor.reset();
        cursor.start(StorageId::PRIVATE).unwrap();
        let (_, id) = cursor.next().unwrap();
        assert_eq!(id.as_bytes(), b"a");
    }

    #[test]
    fn freeing_a_null_cursor_is_a_no_op() {
        let gate = Arc::new(ScriptedGate::new());
        let storage = TrustedStorage::new(gate.clone());
        storage.null_enumerator().free();
        let mut null = storage.null_enumerator();
        null.reset();
        assert!(gate.calls().is_empty());
    }

    #[test]
    fn independent_cursors_hold_independent_positions() {
        let storage = storage_with(&[b"x", b"y"]);
        let mut first = storage.allocate_enumerator().unwrap();
        let mut second = storage.allocate_enumerator().unwrap();
        first.start(StorageId::PRIVATE).unwrap();
        second.start(StorageId::PRIVATE).unwrap();

        let (_, id) = first.next().unwrap();
        assert_eq!(id.as_bytes(), b"x");
        // The second cursor has not moved.
        let (_, id) = second.next().unwrap();
        assert_eq!(id.as_bytes(), b"x");
    }

    #[test]
    #[should_panic(expected = "unexpected backend failure in next_enumerated")]
    fn next_backend_failure_outside_the_recoverable_set_is_fatal() {
        let gate = Arc::new(ScriptedGate::new());
        gate.script_err(Op::NextEnumerated, TeeError::AccessDenied);
        let mut cursor = ObjectEnumerator::from_raw(gate, RawHandle::new(5));
        let _ = cursor.next();
    }

    #[test]
    fn drop_frees_the_cursor() {
        let gate = Arc::new(ScriptedGate::new());
        drop(ObjectEnumerator::from_raw(gate.clone(), RawHandle::new(5)));
        assert_eq!(gate.call_count(Op::FreeEnumerator), 1);
    }
}
