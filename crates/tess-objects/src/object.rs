//! The capability interface shared by both secure object handle types.

use std::sync::Arc;

use tess_gate::{CallGate, RawHandle};
use tess_types::{fatal, AttributeId, ObjectInfo, TeeError, TeeResult, Usage};

pub(crate) mod sealed {
    /// Implemented only by the two handle types in this crate.
    pub trait Sealed {}
}

/// Operations available on every secure object handle, transient or
/// persistent: metadata snapshots, usage restriction, and attribute reads.
///
/// Implemented by [`TransientObject`](crate::TransientObject) and
/// [`PersistentObject`](crate::PersistentObject) only; the trait is sealed.
pub trait ObjectAccess: sealed::Sealed {
    /// The wire handle behind this object.
    fn raw(&self) -> RawHandle;

    /// The call gate this handle was issued by.
    fn gate(&self) -> &Arc<dyn CallGate>;

    /// Whether this is the null handle.
    fn is_null(&self) -> bool {
        self.raw().is_null()
    }

    /// Fetch a fresh metadata snapshot.
    ///
    /// Handles are assumed valid once obtained: a null handle or any
    /// backend failure here aborts the task.
    fn info(&self) -> ObjectInfo {
        if self.is_null() {
            fatal::contract_violation("object info requested on a null handle");
        }
        match self.gate().info(self.raw()) {
            Ok(info) => info,
            Err(err) => fatal::backend_failure("info", err),
        }
    }

    /// Narrow the object's usage permissions to `usage`.
    ///
    /// Narrowing is monotonic: a cleared permission can never be granted
    /// back. Any backend failure aborts the task.
    fn restrict_usage(&self, usage: Usage) {
        if self.is_null() {
            fatal::contract_violation("usage restriction on a null handle");
        }
        if let Err(err) = self.gate().restrict_usage(self.raw(), usage) {
            fatal::backend_failure("restrict_usage", err);
        }
    }

    /// Read a reference attribute's payload into `out`, returning the
    /// number of bytes written.
    ///
    /// The object must be initialized and `id` must be reference-tagged;
    /// either violation aborts the task. Reports `NotFound` for an absent
    /// attribute and `ShortBuffer` when `out` cannot hold the payload.
    fn buffer_attribute(&self, id: AttributeId, out: &mut [u8]) -> TeeResult<usize> {
        if !self.info().is_initialized() {
            fatal::contract_violation("attribute read from an un-initialized object");
        }
        if !id.is_reference() {
            fatal::contract_violation("buffer accessor used with a value-tagged identifier");
        }
        match self.gate().buffer_attribute(self.raw(), id, out.len()) {
            Ok(bytes) => {
                out[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Err(err @ (TeeError::NotFound | TeeError::ShortBuffer)) => Err(err),
            Err(err) => fatal::backend_failure("buffer_attribute", err),
        }
    }

    /// Read a value attribute's `(a, b)` pair.
    ///
    /// The object must be initialized and `id` must be value-tagged;
    /// either violation aborts the task, as does a backend payload of any
    /// size other than eight bytes. Reports `NotFound` for an absent
    /// attribute and `AccessDenied` for a secret attribute of a
    /// non-extractable object.
    fn value_attribute(&self, id: AttributeId) -> TeeResult<(u32, u32)> {
        if !self.info().is_initialized() {
            fatal::contract_violation("attribute read from an un-initialized object");
        }
        if !id.is_value() {
            fatal::contract_violation("value accessor used with a reference-tagged identifier");
        }
        match self.gate().value_attribute(self.raw(), id) {
            Ok(payload) => {
                if payload.len() != 8 {
                    fatal::contract_violation("value attribute payload has the wrong size");
                }
                let a = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                let b = u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
                Ok((a, b))
            }
            Err(err @ (TeeError::NotFound | TeeError::AccessDenied)) => Err(err),
            Err(err) => fatal::backend_failure("value_attribute", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tess_gate::{InMemoryGate, Op, Payload, ScriptedGate};
    use tess_types::{Attribute, HandleFlags, ObjectType, StorageId, Whence};

    use crate::storage::TrustedStorage;
    use crate::transient::TransientObject;

    use super::*;

    fn storage() -> (TrustedStorage, Arc<InMemoryGate>) {
        let gate = Arc::new(InMemoryGate::new());
        (TrustedStorage::new(gate.clone()), gate)
    }

    fn populated_aes(storage: &TrustedStorage) -> TransientObject {
        let mut key = storage.allocate_transient(ObjectType::AES, 256).unwrap();
        key.populate(&[Attribute::new_ref(
            AttributeId::SECRET_VALUE,
            vec![0xA5; 16],
        )])
        .unwrap();
        key
    }

    fn scripted_info(initialized: bool) -> ObjectInfo {
        let mut flags = HandleFlags::empty();
        if initialized {
            flags |= HandleFlags::INITIALIZED;
        }
        ObjectInfo {
            object_type: ObjectType::AES,
            object_size: 128,
            max_object_size: 256,
            object_usage: Usage::default(),
            data_size: 0,
            data_position: 0,
            handle_flags: flags,
        }
    }

    #[test]
    fn info_reflects_population() {
        let (storage, _) = storage();
        let key = populated_aes(&storage);
        let info = key.info();
        assert!(info.is_initialized());
        assert!(!info.is_persistent());
        assert_eq!(info.object_size, 128);
    }

    #[test]
    fn buffer_attribute_round_trips_through_the_backend() {
        let (storage, _) = storage();
        let key = populated_aes(&storage);
        let mut out = [0u8; 32];
        let len = key
            .buffer_attribute(AttributeId::SECRET_VALUE, &mut out)
            .unwrap();
        assert_eq!(&out[..len], &[0xA5; 16]);
    }

    #[test]
    fn value_attribute_round_trips_through_the_backend() {
        let (storage, _) = storage();
        let mut key = storage
            .allocate_transient(ObjectType::ECDSA_KEYPAIR, 521)
            .unwrap();
        key.populate(&[Attribute::new_value(AttributeId::ECC_CURVE, 3, 7)])
            .unwrap();
        assert_eq!(key.value_attribute(AttributeId::ECC_CURVE), Ok((3, 7)));
    }

    #[test]
    fn missing_attribute_is_recoverable() {
        let (storage, _) = storage();
        let key = populated_aes(&storage);
        let mut out = [0u8; 32];
        assert_eq!(
            key.buffer_attribute(AttributeId::RSA_MODULUS, &mut out),
            Err(TeeError::NotFound)
        );
    }

    #[test]
    fn short_buffer_is_recoverable() {
        let (storage, _) = storage();
        let key = populated_aes(&storage);
        let mut out = [0u8; 4];
        assert_eq!(
            key.buffer_attribute(AttributeId::SECRET_VALUE, &mut out),
            Err(TeeError::ShortBuffer)
        );
    }

    #[test]
    fn denied_value_attribute_is_recoverable() {
        let (storage, _) = storage();
        let mut key = storage
            .allocate_transient(ObjectType::GENERIC_SECRET, 256)
            .unwrap();
        // A secret-tagged value attribute alongside the key material.
        key.populate(&[
            Attribute::new_ref(AttributeId::SECRET_VALUE, vec![0x01; 16]),
            Attribute::new_value(AttributeId::new(0x2000_0777), 9, 9),
        ])
        .unwrap();
        key.restrict_usage(Usage::DERIVE);
        assert_eq!(
            key.value_attribute(AttributeId::new(0x2000_0777)),
            Err(TeeError::AccessDenied)
        );
    }

    #[test]
    #[should_panic(expected = "unexpected backend failure in buffer_attribute")]
    fn denied_buffer_attribute_is_fatal() {
        let (storage, _) = storage();
        let key = populated_aes(&storage);
        key.restrict_usage(Usage::ENCRYPT);
        let mut out = [0u8; 32];
        let _ = key.buffer_attribute(AttributeId::SECRET_VALUE, &mut out);
    }

    #[test]
    #[should_panic(expected = "un-initialized object")]
    fn attribute_read_before_populate_is_fatal() {
        let (storage, _) = storage();
        let key = storage.allocate_transient(ObjectType::AES, 256).unwrap();
        let mut out = [0u8; 32];
        let _ = key.buffer_attribute(AttributeId::SECRET_VALUE, &mut out);
    }

    #[test]
    #[should_panic(expected = "value-tagged identifier")]
    fn buffer_accessor_rejects_value_identifier() {
        let (storage, _) = storage();
        let key = populated_aes(&storage);
        let mut out = [0u8; 32];
        let _ = key.buffer_attribute(AttributeId::ECC_CURVE, &mut out);
    }

    #[test]
    #[should_panic(expected = "reference-tagged identifier")]
    fn value_accessor_rejects_reference_identifier() {
        let (storage, _) = storage();
        let key = populated_aes(&storage);
        let _ = key.value_attribute(AttributeId::SECRET_VALUE);
    }

    #[test]
    #[should_panic(expected = "payload has the wrong size")]
    fn malformed_value_payload_is_fatal() {
        let gate = Arc::new(ScriptedGate::new());
        gate.script_ok(Op::Info, Payload::Info(scripted_info(true)));
        gate.script_ok(Op::ValueAttribute, Payload::Bytes(vec![0u8; 4]));
        let key = TransientObject::from_raw(gate, RawHandle::new(9));
        let _ = key.value_attribute(AttributeId::ECC_CURVE);
    }

    #[test]
    fn restrict_usage_narrows_monotonically() {
        let (storage, _) = storage();
        let key = populated_aes(&storage);
        key.restrict_usage(Usage::ENCRYPT | Usage::DECRYPT | Usage::EXTRACTABLE);
        key.restrict_usage(Usage::ENCRYPT | Usage::SIGN);
        // SIGN was already gone; only the intersection survives.
        assert_eq!(key.info().object_usage, Usage::ENCRYPT);
    }

    #[test]
    #[should_panic(expected = "unexpected backend failure in restrict_usage")]
    fn restrict_usage_backend_failure_is_fatal() {
        let gate = Arc::new(ScriptedGate::new());
        gate.script_err(Op::RestrictUsage, TeeError::BadParameters);
        let key = TransientObject::from_raw(gate, RawHandle::new(9));
        key.restrict_usage(Usage::ENCRYPT);
    }

    #[test]
    #[should_panic(expected = "object info requested on a null handle")]
    fn info_on_null_handle_is_fatal() {
        let gate = Arc::new(ScriptedGate::new());
        let storage = TrustedStorage::new(gate);
        let _ = storage.null_transient().info();
    }

    #[test]
    fn info_is_refetched_on_every_call() {
        let (storage, gate) = storage();
        let handle = storage
            .create(
                StorageId::PRIVATE,
                &tess_types::ObjectId::new(b"fresh".to_vec()),
                tess_types::DataFlags::ACCESS_READ | tess_types::DataFlags::ACCESS_WRITE,
                None,
                b"abcdef",
            )
            .unwrap();
        assert_eq!(handle.info().data_position, 0);
        // Position moves behind the snapshot's back; the next info call
        // must observe it.
        let mut handle = handle;
        handle.seek(4, Whence::Set).unwrap();
        assert_eq!(handle.info().data_position, 4);
        drop(gate);
    }
}
