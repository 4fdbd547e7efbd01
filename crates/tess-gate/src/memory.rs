use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use rand::RngCore;

use tess_types::{
    Attribute, AttributeId, DataFlags, HandleFlags, ObjectId, ObjectInfo, ObjectType, StorageId,
    TeeError, TeeResult, Usage, Whence, DATA_MAX_POSITION,
};

use crate::config::GateConfig;
use crate::traits::{CallGate, RawHandle};

/// Attribute set and key metadata shared by transient slots and durable
/// objects.
#[derive(Clone)]
struct ObjectCore {
    object_type: ObjectType,
    max_object_size: u32,
    object_size: u32,
    usage: Usage,
    attrs: Vec<Attribute>,
    initialized: bool,
}

impl ObjectCore {
    fn fresh(object_type: ObjectType, max_object_size: u32) -> Self {
        Self {
            object_type,
            max_object_size,
            object_size: 0,
            usage: Usage::default(),
            attrs: Vec::new(),
            initialized: false,
        }
    }

    /// Core of a pure data object: no key material, always initialized.
    fn data_only() -> Self {
        Self {
            object_type: ObjectType::DATA,
            max_object_size: 0,
            object_size: 0,
            usage: Usage::default(),
            attrs: Vec::new(),
            initialized: true,
        }
    }

    fn find(&self, id: AttributeId) -> Option<&Attribute> {
        self.attrs.iter().find(|attr| attr.id() == id)
    }

    /// Return to the state right after allocation.
    fn reset(&mut self) {
        self.attrs.clear();
        self.object_size = 0;
        self.usage = Usage::default();
        self.initialized = false;
    }
}

/// An open handle: a transient slot or a session on a durable object.
enum Slot {
    Transient(ObjectCore),
    Persistent {
        id: Vec<u8>,
        flags: DataFlags,
        position: u64,
    },
}

/// Enumerator cursor. `None` means inert; a started cursor holds a
/// snapshot of the identifiers taken at start time.
struct EnumState {
    pending: Option<VecDeque<Vec<u8>>>,
}

struct DurableObject {
    core: ObjectCore,
    data: Vec<u8>,
}

struct GateState {
    next_handle: u32,
    slots: HashMap<u32, Slot>,
    enumerators: HashMap<u32, EnumState>,
    durable: BTreeMap<Vec<u8>, DurableObject>,
}

/// In-memory reference backend.
///
/// Intended for tests and embedding. The whole backend state sits behind a
/// single `Mutex`, modelling the serialized call gate: one call at a time,
/// fully applied before it returns. Generated key material is random;
/// symmetric and RSA material only.
pub struct InMemoryGate {
    config: GateConfig,
    state: Mutex<GateState>,
}

impl InMemoryGate {
    /// Create a backend with the default quota.
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    /// Create a backend with an explicit quota configuration.
    pub fn with_config(config: GateConfig) -> Self {
        Self {
            config,
            state: Mutex::new(GateState {
                next_handle: 0,
                slots: HashMap::new(),
                enumerators: HashMap::new(),
                durable: BTreeMap::new(),
            }),
        }
    }

    /// Number of durable objects currently stored.
    pub fn durable_count(&self) -> usize {
        self.state.lock().expect("gate lock poisoned").durable.len()
    }

    /// Total bytes of persistent data currently held.
    pub fn used_bytes(&self) -> u64 {
        let state = self.state.lock().expect("gate lock poisoned");
        state.durable.values().map(|obj| obj.data.len() as u64).sum()
    }
}

impl Default for InMemoryGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("gate lock poisoned");
        f.debug_struct("InMemoryGate")
            .field("open_handles", &state.slots.len())
            .field("durable_objects", &state.durable.len())
            .finish()
    }
}

/// Largest key size in bits accepted for each supported transient type.
fn max_key_bits(object_type: ObjectType) -> Option<u32> {
    Some(match object_type {
        ObjectType::AES => 256,
        ObjectType::DES => 64,
        ObjectType::DES3 => 192,
        ObjectType::HMAC_SHA1 => 512,
        ObjectType::HMAC_SHA256 => 1024,
        ObjectType::GENERIC_SECRET => 4096,
        ObjectType::RSA_KEYPAIR => 4096,
        ObjectType::ECDSA_KEYPAIR => 521,
        _ => return None,
    })
}

fn is_secret_key_type(object_type: ObjectType) -> bool {
    matches!(
        object_type,
        ObjectType::AES
            | ObjectType::DES
            | ObjectType::DES3
            | ObjectType::HMAC_SHA1
            | ObjectType::HMAC_SHA256
            | ObjectType::GENERIC_SECRET
    )
}

/// Attribute identifiers a populate call must supply for the type.
fn required_attrs(object_type: ObjectType) -> &'static [AttributeId] {
    if is_secret_key_type(object_type) {
        &[AttributeId::SECRET_VALUE]
    } else if object_type == ObjectType::RSA_KEYPAIR {
        &[
            AttributeId::RSA_MODULUS,
            AttributeId::RSA_PUBLIC_EXPONENT,
            AttributeId::RSA_PRIVATE_EXPONENT,
        ]
    } else if object_type == ObjectType::ECDSA_KEYPAIR {
        &[AttributeId::ECC_CURVE]
    } else {
        &[]
    }
}

/// Key size in bits implied by a populated attribute set.
fn derived_key_bits(object_type: ObjectType, attrs: &[Attribute]) -> u32 {
    let measured = if is_secret_key_type(object_type) {
        AttributeId::SECRET_VALUE
    } else if object_type == ObjectType::RSA_KEYPAIR {
        AttributeId::RSA_MODULUS
    } else {
        return 0;
    };
    attrs
        .iter()
        .find(|attr| attr.id() == measured)
        .and_then(|attr| attr.as_bytes())
        .map(|bytes| bytes.len() as u32 * 8)
        .unwrap_or(0)
}

/// Whether two open sessions on the same durable object clash.
///
/// Write-meta access is exclusive. Otherwise each side's access modes must
/// be covered by the other side's share modes.
fn share_conflict(a: DataFlags, b: DataFlags) -> bool {
    if a.contains(DataFlags::ACCESS_WRITE_META) || b.contains(DataFlags::ACCESS_WRITE_META) {
        return true;
    }
    let read_clash = (a.contains(DataFlags::ACCESS_READ) && !b.contains(DataFlags::SHARE_READ))
        || (b.contains(DataFlags::ACCESS_READ) && !a.contains(DataFlags::SHARE_READ));
    let write_clash = (a.contains(DataFlags::ACCESS_WRITE) && !b.contains(DataFlags::SHARE_WRITE))
        || (b.contains(DataFlags::ACCESS_WRITE) && !a.contains(DataFlags::SHARE_WRITE));
    read_clash || write_clash
}

impl GateState {
    fn alloc_handle(&mut self) -> RawHandle {
        self.next_handle += 1;
        RawHandle::new(self.next_handle)
    }

    fn used_bytes(&self) -> u64 {
        self.durable.values().map(|obj| obj.data.len() as u64).sum()
    }

    /// Core of the object behind an open handle, either slot kind.
    fn core_of(&self, handle: RawHandle) -> TeeResult<&ObjectCore> {
        match self.slots.get(&handle.raw()) {
            Some(Slot::Transient(core)) => Ok(core),
            Some(Slot::Persistent { id, .. }) => self
                .durable
                .get(id)
                .map(|obj| &obj.core)
                .ok_or(TeeError::Generic),
            None => Err(TeeError::BadParameters),
        }
    }

    fn transient_mut(&mut self, handle: RawHandle) -> TeeResult<&mut ObjectCore> {
        match self.slots.get_mut(&handle.raw()) {
            Some(Slot::Transient(core)) => Ok(core),
            Some(Slot::Persistent { .. }) => Err(TeeError::BadParameters),
            None => Err(TeeError::BadParameters),
        }
    }

    fn session(&self, handle: RawHandle) -> TeeResult<(&Vec<u8>, DataFlags, u64)> {
        match self.slots.get(&handle.raw()) {
            Some(Slot::Persistent {
                id,
                flags,
                position,
            }) => Ok((id, *flags, *position)),
            _ => Err(TeeError::BadParameters),
        }
    }

    /// Flags of every session currently open on `id`.
    fn open_sessions_on(&self, id: &[u8]) -> Vec<DataFlags> {
        self.slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Persistent { id: open_id, flags, .. } if open_id == id => Some(*flags),
                _ => None,
            })
            .collect()
    }
}

impl CallGate for InMemoryGate {
    fn info(&self, handle: RawHandle) -> TeeResult<ObjectInfo> {
        let state = self.state.lock().expect("gate lock poisoned");
        match state.slots.get(&handle.raw()) {
            Some(Slot::Transient(core)) => {
                let mut flags = HandleFlags::empty();
                if core.initialized {
                    flags |= HandleFlags::INITIALIZED;
                }
                Ok(ObjectInfo {
                    object_type: core.object_type,
                    object_size: core.object_size,
                    max_object_size: core.max_object_size,
                    object_usage: core.usage,
                    data_size: 0,
                    data_position: 0,
                    handle_flags: flags,
                })
            }
            Some(Slot::Persistent {
                id,
                flags,
                position,
            }) => {
                let obj = state.durable.get(id).ok_or(TeeError::Generic)?;
                let mut handle_flags =
                    HandleFlags::from_bits_retain(flags.bits()) | HandleFlags::PERSISTENT;
                if obj.core.initialized {
                    handle_flags |= HandleFlags::INITIALIZED;
                }
                Ok(ObjectInfo {
                    object_type: obj.core.object_type,
                    object_size: obj.core.object_size,
                    max_object_size: obj.core.max_object_size,
                    object_usage: obj.core.usage,
                    data_size: obj.data.len() as u64,
                    data_position: *position,
                    handle_flags,
                })
            }
            None => Err(TeeError::BadParameters),
        }
    }

    fn restrict_usage(&self, handle: RawHandle, usage: Usage) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        match state.slots.get(&handle.raw()) {
            Some(Slot::Transient(_)) => {
                let core = state.transient_mut(handle)?;
                core.usage &= usage;
                Ok(())
            }
            Some(Slot::Persistent { id, flags, .. }) => {
                if !flags.contains(DataFlags::ACCESS_WRITE_META) {
                    return Err(TeeError::AccessDenied);
                }
                let id = id.clone();
                let obj = state.durable.get_mut(&id).ok_or(TeeError::Generic)?;
                obj.core.usage &= usage;
                Ok(())
            }
            None => Err(TeeError::BadParameters),
        }
    }

    fn buffer_attribute(
        &self,
        handle: RawHandle,
        id: AttributeId,
        max_len: usize,
    ) -> TeeResult<Vec<u8>> {
        let state = self.state.lock().expect("gate lock poisoned");
        let core = state.core_of(handle)?;
        if !core.initialized {
            return Err(TeeError::BadParameters);
        }
        if !id.is_public() && !core.usage.contains(Usage::EXTRACTABLE) {
            return Err(TeeError::AccessDenied);
        }
        let attr = core.find(id).ok_or(TeeError::NotFound)?;
        let bytes = attr.as_bytes().ok_or(TeeError::BadParameters)?;
        if bytes.len() > max_len {
            return Err(TeeError::ShortBuffer);
        }
        Ok(bytes.to_vec())
    }

    fn value_attribute(&self, handle: RawHandle, id: AttributeId) -> TeeResult<Vec<u8>> {
        let state = self.state.lock().expect("gate lock poisoned");
        let core = state.core_of(handle)?;
        if !core.initialized {
            return Err(TeeError::BadParameters);
        }
        if !id.is_public() && !core.usage.contains(Usage::EXTRACTABLE) {
            return Err(TeeError::AccessDenied);
        }
        let attr = core.find(id).ok_or(TeeError::NotFound)?;
        let (a, b) = attr.as_value().ok_or(TeeError::BadParameters)?;
        let mut payload = Vec::with_capacity(8);
        payload.extend_from_slice(&a.to_le_bytes());
        payload.extend_from_slice(&b.to_le_bytes());
        Ok(payload)
    }

    fn close(&self, handle: RawHandle) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        state
            .slots
            .remove(&handle.raw())
            .map(|_| ())
            .ok_or(TeeError::BadParameters)
    }

    fn allocate_transient(&self, object_type: ObjectType, max_size: u32) -> TeeResult<RawHandle> {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let supported = max_key_bits(object_type).ok_or(TeeError::NotSupported)?;
        if max_size == 0 || max_size > supported {
            return Err(TeeError::NotSupported);
        }
        let transient_count = state
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Transient(_)))
            .count();
        if transient_count >= self.config.max_transient_objects {
            return Err(TeeError::OutOfMemory);
        }
        let handle = state.alloc_handle();
        state
            .slots
            .insert(handle.raw(), Slot::Transient(ObjectCore::fresh(object_type, max_size)));
        Ok(handle)
    }

    fn reset_transient(&self, handle: RawHandle) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        state.transient_mut(handle)?.reset();
        Ok(())
    }

    fn populate(&self, handle: RawHandle, attrs: &[Attribute]) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let core = state.transient_mut(handle)?;
        if core.initialized {
            return Err(TeeError::BadParameters);
        }
        for required in required_attrs(core.object_type) {
            if attrs.iter().all(|attr| attr.id() != *required) {
                return Err(TeeError::BadParameters);
            }
        }
        let key_bits = derived_key_bits(core.object_type, attrs);
        if key_bits > core.max_object_size {
            return Err(TeeError::BadParameters);
        }
        core.attrs = attrs.to_vec();
        core.object_size = key_bits;
        core.initialized = true;
        Ok(())
    }

    fn generate_key(&self, handle: RawHandle, key_size: u32, params: &[Attribute]) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let core = state.transient_mut(handle)?;
        if core.initialized {
            return Err(TeeError::BadParameters);
        }
        if key_size == 0 || key_size > core.max_object_size || key_size % 8 != 0 {
            return Err(TeeError::BadParameters);
        }
        let mut rng = rand::thread_rng();
        let random_bytes = |rng: &mut rand::rngs::ThreadRng, len: usize| {
            let mut bytes = vec![0u8; len];
            rng.fill_bytes(&mut bytes);
            bytes
        };
        let attrs = if is_secret_key_type(core.object_type) {
            vec![Attribute::new_ref(
                AttributeId::SECRET_VALUE,
                random_bytes(&mut rng, key_size as usize / 8),
            )]
        } else if core.object_type == ObjectType::RSA_KEYPAIR {
            vec![
                Attribute::new_ref(
                    AttributeId::RSA_MODULUS,
                    random_bytes(&mut rng, key_size as usize / 8),
                ),
                Attribute::new_ref(AttributeId::RSA_PUBLIC_EXPONENT, vec![0x01, 0x00, 0x01]),
                Attribute::new_ref(
                    AttributeId::RSA_PRIVATE_EXPONENT,
                    random_bytes(&mut rng, key_size as usize / 8),
                ),
            ]
        } else if core.object_type == ObjectType::ECDSA_KEYPAIR {
            // Curve selection must come in through the parameters.
            let curve = params
                .iter()
                .find(|attr| attr.id() == AttributeId::ECC_CURVE)
                .ok_or(TeeError::BadParameters)?;
            vec![curve.clone()]
        } else {
            return Err(TeeError::NotSupported);
        };
        core.attrs = attrs;
        core.object_size = key_size;
        core.initialized = true;
        Ok(())
    }

    fn copy_attributes(&self, dest: RawHandle, src: RawHandle) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let src_core = state.core_of(src)?.clone();
        if !src_core.initialized {
            return Err(TeeError::BadParameters);
        }
        let dest_core = state.transient_mut(dest)?;
        if dest_core.initialized {
            return Err(TeeError::BadParameters);
        }
        if dest_core.object_type != src_core.object_type {
            return Err(TeeError::BadParameters);
        }
        if src_core.object_size > dest_core.max_object_size {
            return Err(TeeError::BadParameters);
        }
        dest_core.attrs = src_core.attrs;
        dest_core.object_size = src_core.object_size;
        dest_core.usage &= src_core.usage;
        dest_core.initialized = true;
        Ok(())
    }

    fn open(&self, storage: StorageId, id: &ObjectId, flags: DataFlags) -> TeeResult<RawHandle> {
        let mut state = self.state.lock().expect("gate lock poisoned");
        if storage != StorageId::PRIVATE {
            return Err(TeeError::NotFound);
        }
        if !state.durable.contains_key(id.as_bytes()) {
            return Err(TeeError::NotFound);
        }
        for open_flags in state.open_sessions_on(id.as_bytes()) {
            if share_conflict(open_flags, flags) {
                return Err(TeeError::AccessConflict);
            }
        }
        let handle = state.alloc_handle();
        state.slots.insert(
            handle.raw(),
            Slot::Persistent {
                id: id.as_bytes().to_vec(),
                flags,
                position: 0,
            },
        );
        Ok(handle)
    }

    fn create(
        &self,
        storage: StorageId,
        id: &ObjectId,
        flags: DataFlags,
        attributes: RawHandle,
        initial_data: &[u8],
    ) -> TeeResult<RawHandle> {
        let mut state = self.state.lock().expect("gate lock poisoned");
        if storage != StorageId::PRIVATE {
            return Err(TeeError::NotFound);
        }
        let mut core = if attributes.is_null() {
            ObjectCore::data_only()
        } else {
            let source = state.core_of(attributes)?.clone();
            if !source.initialized {
                return Err(TeeError::BadParameters);
            }
            source
        };
        core.initialized = true;

        let replaced_bytes = match state.durable.get(id.as_bytes()) {
            Some(existing) => {
                if !state.open_sessions_on(id.as_bytes()).is_empty() {
                    return Err(TeeError::AccessConflict);
                }
                if !flags.contains(DataFlags::OVERWRITE) {
                    return Err(TeeError::AccessConflict);
                }
                existing.data.len() as u64
            }
            None => 0,
        };
        let projected =
            state.used_bytes() - replaced_bytes + initial_data.len() as u64;
        if projected > self.config.capacity_bytes {
            return Err(TeeError::StorageFull);
        }

        state.durable.insert(
            id.as_bytes().to_vec(),
            DurableObject {
                core,
                data: initial_data.to_vec(),
            },
        );
        let handle = state.alloc_handle();
        state.slots.insert(
            handle.raw(),
            Slot::Persistent {
                id: id.as_bytes().to_vec(),
                flags,
                position: 0,
            },
        );
        Ok(handle)
    }

    fn close_and_delete(&self, handle: RawHandle) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let (id, flags, _) = state.session(handle)?;
        if !flags.contains(DataFlags::ACCESS_WRITE_META) {
            return Err(TeeError::AccessDenied);
        }
        let id = id.clone();
        state.durable.remove(&id);
        state.slots.remove(&handle.raw());
        Ok(())
    }

    fn rename(&self, handle: RawHandle, new_id: &ObjectId) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let (id, flags, _) = state.session(handle)?;
        if !flags.contains(DataFlags::ACCESS_WRITE_META) {
            return Err(TeeError::AccessDenied);
        }
        if state.durable.contains_key(new_id.as_bytes()) {
            return Err(TeeError::AccessConflict);
        }
        let old_id = id.clone();
        let obj = state.durable.remove(&old_id).ok_or(TeeError::Generic)?;
        state.durable.insert(new_id.as_bytes().to_vec(), obj);
        if let Some(Slot::Persistent { id, .. }) = state.slots.get_mut(&handle.raw()) {
            *id = new_id.as_bytes().to_vec();
        }
        Ok(())
    }

    fn allocate_enumerator(&self) -> TeeResult<RawHandle> {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let handle = state.alloc_handle();
        state
            .enumerators
            .insert(handle.raw(), EnumState { pending: None });
        Ok(handle)
    }

    fn free_enumerator(&self, handle: RawHandle) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        state
            .enumerators
            .remove(&handle.raw())
            .map(|_| ())
            .ok_or(TeeError::BadParameters)
    }

    fn reset_enumerator(&self, handle: RawHandle) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let cursor = state
            .enumerators
            .get_mut(&handle.raw())
            .ok_or(TeeError::BadParameters)?;
        cursor.pending = None;
        Ok(())
    }

    fn start_enumerator(&self, handle: RawHandle, storage: StorageId) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        if storage != StorageId::PRIVATE {
            return Err(TeeError::NotFound);
        }
        // Snapshot at start time: later creates and deletes in the
        // namespace do not move this cursor.
        let snapshot: VecDeque<Vec<u8>> = state.durable.keys().cloned().collect();
        let empty = snapshot.is_empty();
        let cursor = state
            .enumerators
            .get_mut(&handle.raw())
            .ok_or(TeeError::BadParameters)?;
        cursor.pending = Some(snapshot);
        if empty {
            return Err(TeeError::NotFound);
        }
        Ok(())
    }

    fn next_enumerated(&self, handle: RawHandle) -> TeeResult<(ObjectInfo, ObjectId)> {
        let mut state = self.state.lock().expect("gate lock poisoned");
        loop {
            let cursor = state
                .enumerators
                .get_mut(&handle.raw())
                .ok_or(TeeError::BadParameters)?;
            let id = match cursor.pending.as_mut().and_then(VecDeque::pop_front) {
                Some(id) => id,
                None => return Err(TeeError::NotFound),
            };
            // Objects deleted since the snapshot are skipped.
            let Some(obj) = state.durable.get(&id) else {
                continue;
            };
            let mut handle_flags = HandleFlags::PERSISTENT;
            if obj.core.initialized {
                handle_flags |= HandleFlags::INITIALIZED;
            }
            let info = ObjectInfo {
                object_type: obj.core.object_type,
                object_size: obj.core.object_size,
                max_object_size: obj.core.max_object_size,
                object_usage: obj.core.usage,
                data_size: obj.data.len() as u64,
                data_position: 0,
                handle_flags,
            };
            return Ok((info, ObjectId::new(id)));
        }
    }

    fn read(&self, handle: RawHandle, len: usize) -> TeeResult<Vec<u8>> {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let (id, flags, position) = state.session(handle)?;
        if !flags.contains(DataFlags::ACCESS_READ) {
            return Err(TeeError::AccessDenied);
        }
        let id = id.clone();
        let obj = state.durable.get(&id).ok_or(TeeError::Generic)?;
        let data_len = obj.data.len() as u64;
        let bytes = if position >= data_len {
            Vec::new()
        } else {
            let start = position as usize;
            let end = (position + len as u64).min(data_len) as usize;
            obj.data[start..end].to_vec()
        };
        let advanced = position + bytes.len() as u64;
        if let Some(Slot::Persistent { position, .. }) = state.slots.get_mut(&handle.raw()) {
            *position = advanced;
        }
        Ok(bytes)
    }

    fn write(&self, handle: RawHandle, data: &[u8]) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let (id, flags, position) = state.session(handle)?;
        if !flags.contains(DataFlags::ACCESS_WRITE) {
            return Err(TeeError::AccessDenied);
        }
        let end = position
            .checked_add(data.len() as u64)
            .filter(|end| *end <= DATA_MAX_POSITION)
            .ok_or(TeeError::Overflow)?;
        let id = id.clone();
        let current_len = state
            .durable
            .get(&id)
            .ok_or(TeeError::Generic)?
            .data
            .len() as u64;
        let new_len = end.max(current_len);
        if state.used_bytes() - current_len + new_len > self.config.capacity_bytes {
            return Err(TeeError::StorageFull);
        }
        let obj = state.durable.get_mut(&id).ok_or(TeeError::Generic)?;
        if position > current_len {
            // Seek past the end followed by a write zero-fills the gap.
            obj.data.resize(position as usize, 0);
        }
        if (end as usize) > obj.data.len() {
            obj.data.resize(end as usize, 0);
        }
        obj.data[position as usize..end as usize].copy_from_slice(data);
        if let Some(Slot::Persistent { position, .. }) = state.slots.get_mut(&handle.raw()) {
            *position = end;
        }
        Ok(())
    }

    fn truncate(&self, handle: RawHandle, size: u64) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let (id, flags, _) = state.session(handle)?;
        if !flags.contains(DataFlags::ACCESS_WRITE) {
            return Err(TeeError::AccessDenied);
        }
        if size > DATA_MAX_POSITION {
            return Err(TeeError::Overflow);
        }
        let id = id.clone();
        let current_len = state
            .durable
            .get(&id)
            .ok_or(TeeError::Generic)?
            .data
            .len() as u64;
        if size > current_len && state.used_bytes() - current_len + size > self.config.capacity_bytes
        {
            return Err(TeeError::StorageFull);
        }
        let obj = state.durable.get_mut(&id).ok_or(TeeError::Generic)?;
        obj.data.resize(size as usize, 0);
        Ok(())
    }

    fn seek(&self, handle: RawHandle, offset: i64, whence: Whence) -> TeeResult {
        let mut state = self.state.lock().expect("gate lock poisoned");
        let (id, _, position) = state.session(handle)?;
        let id = id.clone();
        let data_len = state
            .durable
            .get(&id)
            .ok_or(TeeError::Generic)?
            .data
            .len() as u64;
        let base: i128 = match whence {
            Whence::Set => 0,
            Whence::Current => position as i128,
            Whence::End => data_len as i128,
        };
        let target = base + offset as i128;
        if target < 0 || target > DATA_MAX_POSITION as i128 {
            return Err(TeeError::Overflow);
        }
        if let Some(Slot::Persistent { position, .. }) = state.slots.get_mut(&handle.raw()) {
            *position = target as u64;
        }
        Ok(())
    }
}
