//! Data stream I/O over a persistent object's byte stream.
//!
//! Positions and sizes are bounded by
//! [`DATA_MAX_POSITION`](tess_types::DATA_MAX_POSITION). Seek targets are
//! validated client-side before the gate is contacted; the backend
//! re-validates, because its position can move under concurrent access
//! between the two checks.

use tess_types::{fatal, TeeError, TeeResult, Whence, DATA_MAX_POSITION};

use crate::object::ObjectAccess;
use crate::persistent::PersistentObject;

impl PersistentObject {
    /// Read bytes from the current position into `buf`, advancing the
    /// position past what was read.
    ///
    /// Returns the number of bytes read; reaching the end of the data is
    /// expressed through a short (or zero) count, never an error. Aborts
    /// the task on the null handle or any backend failure.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if self.is_null() {
            fatal::contract_violation("data read on a null handle");
        }
        match self.gate().read(self.raw(), buf.len()) {
            Ok(bytes) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                bytes.len()
            }
            Err(err) => fatal::backend_failure("read", err),
        }
    }

    /// Write `data` at the current position, advancing the position past
    /// it. Writing past the current end zero-fills the gap.
    ///
    /// Reports `StorageFull` when the quota is exhausted; aborts the task
    /// on the null handle or any other backend failure.
    pub fn write(&mut self, data: &[u8]) -> TeeResult {
        if self.is_null() {
            fatal::contract_violation("data write on a null handle");
        }
        match self.gate().write(self.raw(), data) {
            Ok(()) => Ok(()),
            Err(TeeError::StorageFull) => Err(TeeError::StorageFull),
            Err(err) => fatal::backend_failure("write", err),
        }
    }

    /// Resize the data stream to `new_size` bytes, zero-filling on
    /// growth. The stream position is left unchanged.
    ///
    /// Reports `StorageFull` when the quota is exhausted; aborts the task
    /// on the null handle or any other backend failure.
    pub fn truncate(&mut self, new_size: u64) -> TeeResult {
        if self.is_null() {
            fatal::contract_violation("data truncate on a null handle");
        }
        match self.gate().truncate(self.raw(), new_size) {
            Ok(()) => Ok(()),
            Err(TeeError::StorageFull) => Err(TeeError::StorageFull),
            Err(err) => fatal::backend_failure("truncate", err),
        }
    }

    /// Move the stream position to `offset` relative to `whence`.
    ///
    /// A positive offset is validated against the maximum position before
    /// the backend is contacted, one check per origin; on overflow the
    /// position is left unchanged and `Overflow` is reported. The backend
    /// applies the same bound to the target it computes, so a position
    /// moved concurrently still cannot escape the limit; its `Overflow`
    /// is reported the same way. Any other backend failure aborts the
    /// task, as does the null handle.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> TeeResult {
        if self.is_null() {
            fatal::contract_violation("data seek on a null handle");
        }
        if offset > 0 {
            let info = self.info();
            let offset = offset as u64;
            let overflows = match whence {
                Whence::Set => offset > DATA_MAX_POSITION,
                Whence::Current => info
                    .data_position
                    .checked_add(offset)
                    .map_or(true, |target| target > DATA_MAX_POSITION),
                Whence::End => info
                    .data_size
                    .checked_add(offset)
                    .map_or(true, |target| target > DATA_MAX_POSITION),
            };
            if overflows {
                return Err(TeeError::Overflow);
            }
        }
        match self.gate().seek(self.raw(), offset, whence) {
            Ok(()) => Ok(()),
            Err(TeeError::Overflow) => Err(TeeError::Overflow),
            Err(err) => fatal::backend_failure("seek", err),
        }
    }
}
