//! Object metadata snapshots and stream seek origins.

use serde::{Deserialize, Serialize};

use crate::flags::{HandleFlags, ObjectType, Usage};

/// Highest legal data stream position and size, chosen so that position
/// arithmetic fits 32 bits.
pub const DATA_MAX_POSITION: u64 = 0xFFFF_FFFF;

/// Point-in-time metadata snapshot of a secure object.
///
/// Snapshots are fetched fresh from the backend on demand and are never
/// cached across calls that might invalidate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Declared object type.
    pub object_type: ObjectType,
    /// Current key size in bits; zero while un-initialized.
    pub object_size: u32,
    /// Maximum key size the object was allocated for, in bits.
    pub max_object_size: u32,
    /// Usage-permission bitmask.
    pub object_usage: Usage,
    /// Current size of the data stream in bytes.
    pub data_size: u64,
    /// Current stream position in bytes.
    pub data_position: u64,
    /// Category and state flags.
    pub handle_flags: HandleFlags,
}

impl ObjectInfo {
    /// Whether the object carries a populated attribute set or key.
    pub fn is_initialized(&self) -> bool {
        self.handle_flags.contains(HandleFlags::INITIALIZED)
    }

    /// Whether the handle refers to a durably stored object.
    pub fn is_persistent(&self) -> bool {
        self.handle_flags.contains(HandleFlags::PERSISTENT)
    }
}

/// Origin of a data stream seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Whence {
    /// From the start of the stream.
    Set,
    /// From the current position.
    Current,
    /// From the end of the data.
    End,
}
