//! Transient secure objects: in-memory keys with no durable identity.

use std::sync::Arc;

use tracing::debug;

use tess_gate::{CallGate, RawHandle};
use tess_types::{fatal, Attribute, TeeError, TeeResult};

use crate::object::{sealed, ObjectAccess};

/// An owned handle to a transient secure object.
///
/// Allocated un-initialized through
/// [`TrustedStorage::allocate_transient`](crate::TrustedStorage::allocate_transient),
/// then populated with attributes or filled by key generation. Dropping
/// the handle closes it on a best-effort basis; call
/// [`TransientObject::free`] to observe close failures.
pub struct TransientObject {
    gate: Arc<dyn CallGate>,
    handle: RawHandle,
}

impl TransientObject {
    pub(crate) fn from_raw(gate: Arc<dyn CallGate>, handle: RawHandle) -> Self {
        Self { gate, handle }
    }

    /// Take the wire handle out, leaving the null sentinel behind so the
    /// destructor stays quiet.
    fn take(&mut self) -> RawHandle {
        std::mem::replace(&mut self.handle, RawHandle::NULL)
    }

    /// Release the object's slot.
    ///
    /// A no-op on the null handle. Aborts the task if the handle turns
    /// out to carry the persistent flag, or on any backend failure.
    pub fn free(mut self) {
        let handle = self.take();
        if handle.is_null() {
            return;
        }
        let info = match self.gate.info(handle) {
            Ok(info) => info,
            Err(err) => fatal::backend_failure("info", err),
        };
        if info.is_persistent() {
            fatal::contract_violation("transient free on a persistent object handle");
        }
        debug!(handle = %handle, "freeing transient object");
        if let Err(err) = self.gate.close(handle) {
            fatal::backend_failure("free_transient", err);
        }
    }

    /// Release the handle without the category re-verification.
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

    /// Return the object to its un-initialized state, clearing attributes
    /// and restoring the full usage mask.
    ///
    /// A no-op on the null handle. Aborts the task if the handle carries
    /// the persistent flag, or on any backend failure.
    pub fn reset(&mut self) {
        if self.handle.is_null() {
            return;
        }
        if self.info().is_persistent() {
            fatal::contract_violation("transient reset on a persistent object handle");
        }
        if let Err(err) = self.gate.reset_transient(self.handle) {
            fatal::backend_failure("reset_transient", err);
        }
    }

    /// Populate the un-initialized object with `attrs`, marking it
    /// initialized.
    ///
    /// Aborts the task if the handle carries the persistent flag or is
    /// already initialized. A malformed or inconsistent attribute set is
    /// reported as `BadParameters`; any other backend failure aborts.
    pub fn populate(&mut self, attrs: &[Attribute]) -> TeeResult {
        let info = self.info();
        if info.is_persistent() {
            fatal::contract_violation("populate on a persistent object handle");
        }
        if info.is_initialized() {
            fatal::contract_violation("populate on an already initialized object");
        }
        match self.gate.populate(self.handle, attrs) {
            Ok(()) => Ok(()),
            Err(TeeError::BadParameters) => Err(TeeError::BadParameters),
            Err(err) => fatal::backend_failure("populate", err),
        }
    }

    /// Generate a key of `key_size` bits into the object, marking it
    /// initialized.
    ///
    /// Generation parameters are assumed pre-validated; any backend
    /// failure aborts the task.
    pub fn generate_key(&mut self, key_size: u32, params: &[Attribute]) {
        if self.handle.is_null() {
            fatal::contract_violation("key generation on a null handle");
        }
        debug!(handle = %self.handle, key_size, "generating key");
        if let Err(err) = self.gate.generate_key(self.handle, key_size, params) {
            fatal::backend_failure("generate_key", err);
        }
    }

    /// Copy the attribute set of `src` into this un-initialized object
    /// and mark it initialized. `src` may be transient or persistent.
    ///
    /// Aborts the task unless `src` is initialized and this object is
    /// neither persistent-flagged nor initialized, or on any backend
    /// failure.
    pub fn copy_attributes_from(&mut self, src: &dyn ObjectAccess) {
        if !src.info().is_initialized() {
            fatal::contract_violation("attribute copy from an un-initialized object");
        }
        let info = self.info();
        if info.is_persistent() {
            fatal::contract_violation("attribute copy into a persistent object handle");
        }
        if info.is_initialized() {
            fatal::contract_violation("attribute copy into an initialized object");
        }
        if let Err(err) = self.gate.copy_attributes(self.handle, src.raw()) {
            fatal::backend_failure("copy_attributes", err);
        }
    }
}

impl sealed::Sealed for TransientObject {}

impl ObjectAccess for TransientObject {
    fn raw(&self) -> RawHandle {
        self.handle
    }

    fn gate(&self) -> &Arc<dyn CallGate> {
        &self.gate
    }
}

impl Drop for TransientObject {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        // Destructors must not abort the task; close failures are logged.
        if let Err(err) = self.gate.close(self.handle) {
            tracing::warn!(handle = %self.handle, %err, "transient object close failed on drop");
        }
    }
}

impl std::fmt::Debug for TransientObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientObject")
            .field("handle", &self.handle)
            .finish()
    }
}
