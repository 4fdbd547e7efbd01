use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tess_types::{
    Attribute, AttributeId, DataFlags, ObjectId, ObjectInfo, ObjectType, StorageId, TeeError,
    TeeResult, Usage, Whence,
};

use crate::traits::{CallGate, RawHandle};

/// Backend operations, used to script outcomes and to inspect the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Info,
    RestrictUsage,
    BufferAttribute,
    ValueAttribute,
    Close,
    AllocateTransient,
    ResetTransient,
    Populate,
    GenerateKey,
    CopyAttributes,
    Open,
    Create,
    CloseAndDelete,
    Rename,
    AllocateEnumerator,
    FreeEnumerator,
    ResetEnumerator,
    StartEnumerator,
    NextEnumerated,
    Read,
    Write,
    Truncate,
    Seek,
}

/// Out-parameters of a successfully scripted call.
#[derive(Debug, Clone)]
pub enum Payload {
    /// No out-parameters.
    Unit,
    /// A freshly allocated handle.
    Handle(RawHandle),
    /// A metadata snapshot.
    Info(ObjectInfo),
    /// Attribute payload or read data.
    Bytes(Vec<u8>),
    /// An enumerator entry.
    Entry(ObjectInfo, ObjectId),
}

struct Inner {
    script: HashMap<Op, VecDeque<Result<Payload, TeeError>>>,
    calls: Vec<Op>,
}

/// Test backend that replays canned outcomes.
///
/// Each operation pops the next outcome from its queue; a call with no
/// scripted outcome reports `Generic`. Every call is recorded in order, so
/// tests can assert both what the client forwarded and what it refused to
/// forward.
pub struct ScriptedGate {
    inner: Mutex<Inner>,
}

impl ScriptedGate {
    /// Create a gate with an empty script.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                script: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Queue a successful outcome for `op`.
    pub fn script_ok(&self, op: Op, payload: Payload) {
        self.inner
            .lock()
            .expect("script lock poisoned")
            .script
            .entry(op)
            .or_default()
            .push_back(Ok(payload));
    }

    /// Queue a failure outcome for `op`.
    pub fn script_err(&self, op: Op, err: TeeError) {
        self.inner
            .lock()
            .expect("script lock poisoned")
            .script
            .entry(op)
            .or_default()
            .push_back(Err(err));
    }

    /// Every operation received so far, in call order.
    pub fn calls(&self) -> Vec<Op> {
        self.inner.lock().expect("script lock poisoned").calls.clone()
    }

    /// How many times `op` has been called.
    pub fn call_count(&self, op: Op) -> usize {
        self.inner
            .lock()
            .expect("script lock poisoned")
            .calls
            .iter()
            .filter(|call| **call == op)
            .count()
    }

    fn pop(&self, op: Op) -> Result<Payload, TeeError> {
        let mut inner = self.inner.lock().expect("script lock poisoned");
        inner.calls.push(op);
        inner
            .script
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Err(TeeError::Generic))
    }

    fn pop_unit(&self, op: Op) -> TeeResult {
        self.pop(op).map(|_| ())
    }

    fn pop_handle(&self, op: Op) -> TeeResult<RawHandle> {
        match self.pop(op)? {
            Payload::Handle(handle) => Ok(handle),
            _ => Err(TeeError::Generic),
        }
    }

    fn pop_info(&self, op: Op) -> TeeResult<ObjectInfo> {
        match self.pop(op)? {
            Payload::Info(info) => Ok(info),
            _ => Err(TeeError::Generic),
        }
    }

    fn pop_bytes(&self, op: Op) -> TeeResult<Vec<u8>> {
        match self.pop(op)? {
            Payload::Bytes(bytes) => Ok(bytes),
            _ => Err(TeeError::Generic),
        }
    }
}

impl Default for ScriptedGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptedGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().expect("script lock poisoned");
        f.debug_struct("ScriptedGate")
            .field("calls", &inner.calls.len())
            .finish()
    }
}

impl CallGate for ScriptedGate {
    fn info(&self, _handle: RawHandle) -> TeeResult<ObjectInfo> {
        self.pop_info(Op::Info)
    }

    fn restrict_usage(&self, _handle: RawHandle, _usage: Usage) -> TeeResult {
        self.pop_unit(Op::RestrictUsage)
    }

    fn buffer_attribute(
        &self,
        _handle: RawHandle,
        _id: AttributeId,
        _max_len: usize,
    ) -> TeeResult<Vec<u8>> {
        self.pop_bytes(Op::BufferAttribute)
    }

    fn value_attribute(&self, _handle: RawHandle, _id: AttributeId) -> TeeResult<Vec<u8>> {
        self.pop_bytes(Op::ValueAttribute)
    }

    fn close(&self, _handle: RawHandle) -> TeeResult {
        self.pop_unit(Op::Close)
    }

    fn allocate_transient(&self, _object_type: ObjectType, _max_size: u32) -> TeeResult<RawHandle> {
        self.pop_handle(Op::AllocateTransient)
    }

    fn reset_transient(&self, _handle: RawHandle) -> TeeResult {
        self.pop_unit(Op::ResetTransient)
    }

    fn populate(&self, _handle: RawHandle, _attrs: &[Attribute]) -> TeeResult {
        self.pop_unit(Op::Populate)
    }

    fn generate_key(&self, _handle: RawHandle, _key_size: u32, _params: &[Attribute]) -> TeeResult {
        self.pop_unit(Op::GenerateKey)
    }

    fn copy_attributes(&self, _dest: RawHandle, _src: RawHandle) -> TeeResult {
        self.pop_unit(Op::CopyAttributes)
    }

    fn open(&self, _storage: StorageId, _id: &ObjectId, _flags: DataFlags) -> TeeResult<RawHandle> {
        self.pop_handle(Op::Open)
    }

    fn create(
        &self,
        _storage: StorageId,
        _id: &ObjectId,
        _flags: DataFlags,
        _attributes: RawHandle,
        _initial_data: &[u8],
    ) -> TeeResult<RawHandle> {
        self.pop_handle(Op::Create)
    }

    fn close_and_delete(&self, _handle: RawHandle) -> TeeResult {
        self.pop_unit(Op::CloseAndDelete)
    }

    fn rename(&self, _handle: RawHandle, _new_id: &ObjectId) -> TeeResult {
        self.pop_unit(Op::Rename)
    }

    fn allocate_enumerator(&self) -> TeeResult<RawHandle> {
        self.pop_handle(Op::AllocateEnumerator)
    }

    fn free_enumerator(&self, _handle: RawHandle) -> TeeResult {
        self.pop_unit(Op::FreeEnumerator)
    }

    fn reset_enumerator(&self, _handle: RawHandle) -> TeeResult {
        self.pop_unit(Op::ResetEnumerator)
    }

    fn start_enumerator(&self, _handle: RawHandle, _storage: StorageId) -> TeeResult {
        self.pop_unit(Op::StartEnumerator)
    }

    fn next_enumerated(&self, _handle: RawHandle) -> TeeResult<(ObjectInfo, ObjectId)> {
        match self.pop(Op::NextEnumerated)? {
            Payload::Entry(info, id) => Ok((info, id)),
            _ => Err(TeeError::Generic),
        }
    }

    fn read(&self, _handle: RawHandle, _len: usize) -> TeeResult<Vec<u8>> {
        self.pop_bytes(Op::Read)
    }

    fn write(&self, _handle: RawHandle, _data: &[u8]) -> TeeResult {
        self.pop_unit(Op::Write)
    }

    fn truncate(&self, _handle: RawHandle, _size: u64) -> TeeResult {
        self.pop_unit(Op::Truncate)
    }

    fn seek(&self, _handle: RawHandle, _offset: i64, _whence: Whence) -> TeeResult {
        self.pop_unit(Op::Seek)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_outcomes_in_queue_order() {
        let gate = ScriptedGate::new();
        gate.script_ok(Op::Write, Payload::Unit);
        gate.script_err(Op::Write, TeeError::StorageFull);

        assert_eq!(gate.write(RawHandle::new(1), b"a"), Ok(()));
        assert_eq!(
            gate.write(RawHandle::new(1), b"b"),
            Err(TeeError::StorageFull)
        );
    }

    #[test]
    fn unscripted_call_reports_generic() {
        let gate = ScriptedGate::new();
        assert_eq!(gate.close(RawHandle::new(1)), Err(TeeError::Generic));
    }

    #[test]
    fn mismatched_payload_kind_reports_generic() {
        let gate = ScriptedGate::new();
        gate.script_ok(Op::Open, Payload::Unit);
        assert_eq!(
            gate.open(
                StorageId::PRIVATE,
                &ObjectId::new(b"x".to_vec()),
                DataFlags::ACCESS_READ,
            ),
            Err(TeeError::Generic)
        );
    }

    #[test]
    fn records_calls_in_order() {
        let gate = ScriptedGate::new();
        gate.script_ok(Op::AllocateEnumerator, Payload::Handle(RawHandle::new(3)));
        let _ = gate.allocate_enumerator();
        let _ = gate.seek(RawHandle::new(1), 0, Whence::Set);

        assert_eq!(gate.calls(), vec![Op::AllocateEnumerator, Op::Seek]);
        assert_eq!(gate.call_count(Op::Seek), 1);
        assert_eq!(gate.call_count(Op::Open), 0);
    }
}
