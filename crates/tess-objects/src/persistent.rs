//! Persistent secure objects: durably stored, identified by namespace and
//! identifier.

use std::sync::Arc;

use tracing::debug;

use tess_gate::{CallGate, RawHandle};
use tess_types::{fatal, ObjectId, TeeError, TeeResult};

use crate::object::{sealed, ObjectAccess};

/// An owned handle to a persistent secure object.
///
/// Obtained from [`TrustedStorage::open`](crate::TrustedStorage::open) or
/// [`TrustedStorage::create`](crate::TrustedStorage::create). The handle
/// is a session on the durable object: closing it leaves the object in
/// storage, [`PersistentObject::close_and_delete`] removes it. Dropping
/// the handle closes it on a best-effort basis.
///
/// Data stream operations live in [`crate::stream`].
pub struct PersistentObject {
    gate: Arc<dyn CallGate>,
    handle: RawHandle,
}

impl PersistentObject {
    pub(crate) fn from_raw(gate: Arc<dyn CallGate>, handle: RawHandle) -> Self {
        Self { gate, handle }
    }

    fn take(&mut self) -> RawHandle {
        std::mem::replace(&mut self.handle, RawHandle::NULL)
    }

    /// Close the session, leaving the object in storage.
    ///
    /// A no-op on the null handle; aborts on backend failure.
    pub fn close(mut self) {
        let handle = self.take();
        if handle.is_null() {
            return;
        }
        if let Err(err) = self.gate.close(handle) {
            fatal::backend_failure("close", err);
        }
    }

    /// Durably remove the object and invalidate the handle.
    ///
    /// A no-op on the null handle; aborts on any backend failure.
    pub fn close_and_delete(mut self) {
        let handle = self.take();
        if handle.is_null() {
            return;
        }
        debug!(handle = %handle, "deleting persistent object");
        if let Err(err) = self.gate.close_and_delete(handle) {
            fatal::backend_failure("close_and_delete", err);
        }
    }

    /// Change the object's identifier; the object and the handle survive.
    ///
    /// Reports `NotFound` on the null handle and `BadParameters` on an
    /// empty identifier. An identifier collision with a concurrently
    /// visible object is reported as `AccessConflict` and leaves the
    /// current identifier in place; any other backend failure aborts.
    pub fn rename(&mut self, new_id: &ObjectId) -> TeeResult {
        if self.handle.is_null() {
            return Err(TeeError::NotFound);
        }
        if new_id.is_empty() {
            return Err(TeeError::BadParameters);
        }
        debug!(handle = %self.handle, new_id = %new_id, "renaming persistent object");
        match self.gate.rename(self.handle, new_id) {
            Ok(()) => Ok(()),
            Err(TeeError::AccessConflict) => Err(TeeError::AccessConflict),
            Err(err) => fatal::backend_failure("rename", err),
        }
    }
}

impl sealed::Sealed for PersistentObject {}

impl ObjectAccess for PersistentObject {
    fn raw(&self) -> RawHandle {
        self.handle
    }

    fn gate(&self) -> &Arc<dyn CallGate> {
        &self.gate
    }
}

impl Drop for PersistentObject {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        if let Err(err) = self.gate.close(self.handle) {
            tracing::warn!(handle = %self.handle, %err, "persistent object close failed on drop");
        }
    }
}

impl std::fmt::Debug for PersistentObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentObject")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tess_gate::{InMemoryGate, Op, ScriptedGate};
    use tess_types::{DataFlags, StorageId};

    use crate::storage::TrustedStorage;

    use super::*;

    fn oid(bytes: &[u8]) -> ObjectId {
        ObjectId::new(bytes.to_vec())
    }

    fn storage() -> TrustedStorage {
        TrustedStorage::new(Arc::new(InMemoryGate::new()))
    }

    fn create(storage: &TrustedStorage, id: &[u8], flags: DataFlags) -> PersistentObject {
        storage
            .create(StorageId::PRIVATE, &oid(id), flags, None, b"")
            .unwrap()
    }

    #[test]
    fn closing_a_null_handle_is_a_no_op() {
        let gate = Arc::new(ScriptedGate::new());
        let storage = TrustedStorage::new(gate.clone());
        storage.null_persistent().close();
        storage.null_persistent().close_and_delete();
        assert!(gate.calls().is_empty());
    }

    #[test]
    fn renaming_a_null_handle_reports_not_found() {
        let gate = Arc::new(ScriptedGate::new());
        let storage = TrustedStorage::new(gate.clone());
        let mut null = storage.null_persistent();
        assert_eq!(null.rename(&oid(b"anything")), Err(TeeError::NotFound));
        assert!(gate.calls().is_empty());
    }

    #[test]
    fn renaming_to_an_empty_identifier_reports_bad_parameters() {
        let gate = Arc::new(ScriptedGate::new());
        let mut object = PersistentObject::from_raw(gate.clone(), RawHandle::new(4));
        assert_eq!(
            object.rename(&ObjectId::new(Vec::new())),
            Err(TeeError::BadParameters)
        );
        // Rejected client-side, before the gate.
        assert_eq!(gate.call_count(Op::Rename), 0);
        object.take();
    }

    #[test]
    fn rename_moves_the_identifier() {
        let storage = storage();
        let mut object = create(
            &storage,
            b"old-name",
            DataFlags::ACCESS_WRITE_META | DataFlags::ACCESS_READ,
        );
        object.rename(&oid(b"new-name")).unwrap();
        object.close();

        assert_eq!(
            storage
                .open(StorageId::PRIVATE, &oid(b"old-name"), DataFlags::ACCESS_READ)
                .unwrap_err(),
            TeeError::NotFound
        );
        storage
            .open(StorageId::PRIVATE, &oid(b"new-name"), DataFlags::ACCESS_READ)
            .unwrap()
            .close();
    }

    #[test]
    fn rename_collision_is_recoverable_and_keeps_the_identifier() {
        let storage = storage();
        create(&storage, b"taken", DataFlags::ACCESS_READ).close();
        let mut object = create(&storage, b"mover", DataFlags::ACCESS_WRITE_META);

        assert_eq!(
            object.rename(&oid(b"taken")),
            Err(TeeError::AccessConflict)
        );
        object.close();

        // Still reachable under its original identifier.
        storage
            .open(StorageId::PRIVATE, &oid(b"mover"), DataFlags::ACCESS_READ)
            .unwrap()
            .close();
    }

    #[test]
    #[should_panic(expected = "unexpected backend failure in rename")]
    fn rename_backend_failure_outside_the_recoverable_set_is_fatal() {
        let gate = Arc::new(ScriptedGate::new());
        gate.script_err(Op::Rename, TeeError::AccessDenied);
        let mut object = PersistentObject::from_raw(gate, RawHandle::new(4));
        let _ = object.rename(&oid(b"elsewhere"));
    }

    #[test]
    fn close_and_delete_removes_the_object() {
        let storage = storage();
        create(&storage, b"doomed", DataFlags::ACCESS_WRITE_META).close_and_delete();
        assert_eq!(
            storage
                .open(StorageId::PRIVATE, &oid(b"doomed"), DataFlags::ACCESS_READ)
                .unwrap_err(),
            TeeError::NotFound
        );
    }

    #[test]
    #[should_panic(expected = "unexpected backend failure in close_and_delete")]
    fn delete_backend_failure_is_fatal() {
        let storage = storage();
        // Opened without write-meta: the backend refuses the delete and
        // the client escalates.
        create(&storage, b"kept", DataFlags::ACCESS_READ).close_and_delete();
    }

    #[test]
    fn drop_closes_the_session() {
        let gate = Arc::new(ScriptedGate::new());
        drop(PersistentObject::from_raw(gate.clone(), RawHandle::new(4)));
        assert_eq!(gate.call_count(Op::Close), 1);
    }
}
