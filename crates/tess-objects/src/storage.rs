//! The context-scoped entry point to the trusted storage API.

use std::sync::Arc;

use tracing::debug;

use tess_gate::{CallGate, RawHandle};
use tess_types::{DataFlags, ObjectId, ObjectType, StorageId, TeeError, TeeResult};

use crate::enumerator::ObjectEnumerator;
use crate::object::ObjectAccess;
use crate::persistent::PersistentObject;
use crate::transient::TransientObject;

/// The front door of the secure object API.
///
/// Holds the injected call gate and hands out owned handles; all durable
/// state lives behind the gate. Cloning is cheap and shares the gate.
#[derive(Clone)]
pub struct TrustedStorage {
    gate: Arc<dyn CallGate>,
}

impl TrustedStorage {
    /// Create a storage context over `gate`.
    pub fn new(gate: Arc<dyn CallGate>) -> Self {
        Self { gate }
    }

    /// Allocate an un-initialized transient object sized for `max_size`
    /// bits of key material.
    ///
    /// The backend's result is returned verbatim: `NotSupported` for an
    /// unknown type or size, `OutOfMemory` when no slot is available.
    pub fn allocate_transient(
        &self,
        object_type: ObjectType,
        max_size: u32,
    ) -> TeeResult<TransientObject> {
        debug!(?object_type, max_size, "allocating transient object");
        self.gate
            .allocate_transient(object_type, max_size)
            .map(|handle| TransientObject::from_raw(Arc::clone(&self.gate), handle))
    }

    /// Open a persistent object by identifier.
    ///
    /// Any namespace other than the private one reports `NotFound`
    /// without contacting the backend, as does an empty identifier.
    /// Otherwise the backend's result is returned verbatim, including
    /// `AccessConflict` for a sharing-mode clash with a concurrently
    /// open handle.
    pub fn open(
        &self,
        storage: StorageId,
        id: &ObjectId,
        flags: DataFlags,
    ) -> TeeResult<PersistentObject> {
        if storage != StorageId::PRIVATE {
            debug!(storage = storage.raw(), "open in unsupported namespace");
            return Err(TeeError::NotFound);
        }
        if id.is_empty() {
            return Err(TeeError::NotFound);
        }
        debug!(id = %id, "opening persistent object");
        self.gate
            .open(storage, id, flags)
            .map(|handle| PersistentObject::from_raw(Arc::clone(&self.gate), handle))
    }

    /// Create a persistent object, seeding its attributes from
    /// `attributes` (an initialized object of either category, or `None`
    /// for a pure data object) and its data stream from `initial_data`.
    ///
    /// Namespace and identifier validation are as for
    /// [`TrustedStorage::open`]; otherwise the backend's result is
    /// returned verbatim, including `AccessConflict` for a taken
    /// identifier and `StorageFull` for an exhausted quota.
    pub fn create(
        &self,
        storage: StorageId,
        id: &ObjectId,
        flags: DataFlags,
        attributes: Option<&dyn ObjectAccess>,
        initial_data: &[u8],
    ) -> TeeResult<PersistentObject> {
        if storage != StorageId::PRIVATE {
            debug!(storage = storage.raw(), "create in unsupported namespace");
            return Err(TeeError::NotFound);
        }
        if id.is_empty() {
            return Err(TeeError::NotFound);
        }
        let source = attributes.map_or(RawHandle::NULL, |object| object.raw());
        debug!(id = %id, initial_len = initial_data.len(), "creating persistent object");
        self.gate
            .create(storage, id, flags, source, initial_data)
            .map(|handle| PersistentObject::from_raw(Arc::clone(&self.gate), handle))
    }

    /// Allocate an inert enumerator.
    ///
    /// The backend's result is returned verbatim.
    pub fn allocate_enumerator(&self) -> TeeResult<ObjectEnumerator> {
        self.gate
            .allocate_enumerator()
            .map(|handle| ObjectEnumerator::from_raw(Arc::clone(&self.gate), handle))
    }

    /// The null transient handle: every lifecycle operation on it is a
    /// documented no-op.
    pub fn null_transient(&self) -> TransientObject {
        TransientObject::from_raw(Arc::clone(&self.gate), RawHandle::NULL)
    }

    /// The null persistent handle.
    pub fn null_persistent(&self) -> PersistentObject {
        PersistentObject::from_raw(Arc::clone(&self.gate), RawHandle::NULL)
    }

    /// The null enumerator handle.
    pub fn null_enumerator(&self) -> ObjectEnumerator {
        ObjectEnumerator::from_raw(Arc::clone(&self.gate), RawHandle::NULL)
    }
}

impl std::fmt::Debug for TrustedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustedStorage").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tess_gate::{InMemoryGate, Op, ScriptedGate};
    use tess_types::{Attribute, AttributeId};

    use super::*;

    fn oid(bytes: &[u8]) -> ObjectId {
        ObjectId::new(bytes.to_vec())
    }

    const FOREIGN: StorageId = StorageId::new(0x8000_0000);

    #[test]
    fn open_in_unsupported_namespace_skips_the_backend() {
        let gate = Arc::new(ScriptedGate::new());
        let storage = TrustedStorage::new(gate.clone());
        assert_eq!(
            storage
                .open(FOREIGN, &oid(b"anything"), DataFlags::ACCESS_READ)
                .unwrap_err(),
            TeeError::NotFound
        );
        assert_eq!(gate.call_count(Op::Open), 0);
    }

    #[test]
    fn create_in_unsupported_namespace_skips_the_backend() {
        let gate = Arc::new(ScriptedGate::new());
        let storage = TrustedStorage::new(gate.clone());
        assert_eq!(
            storage
                .create(FOREIGN, &oid(b"anything"), DataFlags::ACCESS_WRITE, None, b"")
                .unwrap_err(),
            TeeError::NotFound
        );
        assert_eq!(gate.call_count(Op::Create), 0);
    }

    #[test]
    fn empty_identifier_reports_not_found_client_side() {
        let gate = Arc::new(ScriptedGate::new());
        let storage = TrustedStorage::new(gate.clone());
        let empty = ObjectId::new(Vec::new());
        assert_eq!(
            storage
                .open(StorageId::PRIVATE, &empty, DataFlags::ACCESS_READ)
                .unwrap_err(),
            TeeError::NotFound
        );
        assert_eq!(
            storage
                .create(StorageId::PRIVATE, &empty, DataFlags::ACCESS_WRITE, None, b"")
                .unwrap_err(),
            TeeError::NotFound
        );
        assert!(gate.calls().is_empty());
    }

    #[test]
    fn open_passes_backend_results_through_verbatim() {
        let gate = Arc::new(ScriptedGate::new());
        gate.script_err(Op::Open, TeeError::AccessConflict);
        let storage = TrustedStorage::new(gate);
        assert_eq!(
            storage
                .open(StorageId::PRIVATE, &oid(b"busy"), DataFlags::ACCESS_WRITE)
                .unwrap_err(),
            TeeError::AccessConflict
        );
    }

    #[test]
    fn allocate_transient_passes_backend_results_through_verbatim() {
        let storage = TrustedStorage::new(Arc::new(InMemoryGate::new()));
        assert_eq!(
            storage
                .allocate_transient(ObjectType::DATA, 64)
                .unwrap_err(),
            TeeError::NotSupported
        );
    }

    #[test]
    fn allocate_enumerator_failure_is_returned_verbatim() {
        let gate = Arc::new(ScriptedGate::new());
        gate.script_err(Op::AllocateEnumerator, TeeError::OutOfMemory);
        let storage = TrustedStorage::new(gate);
        assert_eq!(
            storage.allocate_enumerator().unwrap_err(),
            TeeError::OutOfMemory
        );
    }

    #[test]
    fn create_seeds_attributes_from_a_source_object() {
        let storage = TrustedStorage::new(Arc::new(InMemoryGate::new()));
        let mut key = storage.allocate_transient(ObjectType::AES, 256).unwrap();
        key.populate(&[Attribute::new_ref(
            AttributeId::SECRET_VALUE,
            vec![0x42; 16],
        )])
        .unwrap();

        let stored = storage
            .create(
                StorageId::PRIVATE,
                &oid(b"wrapped-key"),
                DataFlags::ACCESS_READ,
                Some(&key),
                b"",
            )
            .unwrap();
        let info = stored.info();
        assert!(info.is_persistent());
        assert!(info.is_initialized());
        assert_eq!(info.object_type, ObjectType::AES);
        assert_eq!(info.object_size, 128);
    }

    #[test]
    fn create_then_reopen_round_trip() {
        let storage = TrustedStorage::new(Arc::new(InMemoryGate::new()));
        storage
            .create(
                StorageId::PRIVATE,
                &oid(b"note"),
                DataFlags::ACCESS_READ | DataFlags::ACCESS_WRITE,
                None,
                b"remember",
            )
            .unwrap()
            .close();

        let mut reopened = storage
            .open(StorageId::PRIVATE, &oid(b"note"), DataFlags::ACCESS_READ)
            .unwrap();
        let mut buf = [0u8; 16];
        let len = reopened.read(&mut buf);
        assert_eq!(&buf[..len], b"remember");
    }

    #[test]
    fn null_constructors_hand_out_null_handles() {
        let storage = TrustedStorage::new(Arc::new(ScriptedGate::new()));
        assert!(storage.null_transient().is_null());
        assert!(storage.null_persistent().is_null());
    }
}
