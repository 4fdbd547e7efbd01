//! Flag sets and object types.

use std::fmt;

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Category and state flags of an open object handle.
    ///
    /// The low bits of a persistent handle mirror the [`DataFlags`] it was
    /// opened with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HandleFlags: u32 {
        /// The handle refers to a durably stored object.
        const PERSISTENT = 0x0001_0000;
        /// The object carries a populated attribute set or generated key.
        const INITIALIZED = 0x0002_0000;
    }
}

bitflags::bitflags! {
    /// Usage permissions of an object's key material.
    ///
    /// Permissions only ever narrow over an object's lifetime; a cleared
    /// bit can never be granted back.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Usage: u32 {
        /// Key material may be read back through the attribute accessors.
        const EXTRACTABLE = 0x0000_0001;
        /// The object may be used for encryption.
        const ENCRYPT = 0x0000_0002;
        /// The object may be used for decryption.
        const DECRYPT = 0x0000_0004;
        /// The object may be used for MAC computation.
        const MAC = 0x0000_0008;
        /// The object may be used for signing.
        const SIGN = 0x0000_0010;
        /// The object may be used for signature verification.
        const VERIFY = 0x0000_0020;
        /// The object may be used for key derivation.
        const DERIVE = 0x0000_0040;
    }
}

impl Default for Usage {
    /// A fresh object permits every usage; callers narrow from here.
    fn default() -> Self {
        Self::from_bits_retain(u32::MAX)
    }
}

bitflags::bitflags! {
    /// Access and sharing modes of a persistent object's data stream.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DataFlags: u32 {
        /// Read access to the data stream and attributes.
        const ACCESS_READ = 0x0000_0001;
        /// Write access to the data stream.
        const ACCESS_WRITE = 0x0000_0002;
        /// Permission to delete or rename the object. Exclusive.
        const ACCESS_WRITE_META = 0x0000_0004;
        /// Other handles may be granted read access concurrently.
        const SHARE_READ = 0x0000_0010;
        /// Other handles may be granted write access concurrently.
        const SHARE_WRITE = 0x0000_0020;
        /// On creation, replace an existing object with the same
        /// identifier instead of reporting a conflict.
        const OVERWRITE = 0x0000_0400;
    }
}

/// Declared type of a secure object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectType(u32);

impl ObjectType {
    /// AES key.
    pub const AES: Self = Self(0xA000_0010);
    /// Single DES key.
    pub const DES: Self = Self(0xA000_0011);
    /// Triple DES key.
    pub const DES3: Self = Self(0xA000_0013);
    /// HMAC-SHA1 key.
    pub const HMAC_SHA1: Self = Self(0xA000_0002);
    /// HMAC-SHA256 key.
    pub const HMAC_SHA256: Self = Self(0xA000_0004);
    /// Generic secret usable for derivation.
    pub const GENERIC_SECRET: Self = Self(0xA000_0008);
    /// RSA key pair.
    pub const RSA_KEYPAIR: Self = Self(0xA100_0030);
    /// ECDSA key pair.
    pub const ECDSA_KEYPAIR: Self = Self(0xA100_0041);
    /// Pure data object with no key material.
    pub const DATA: Self = Self(0xA100_0033);

    /// Wrap a raw type value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw type value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectType({:#010x})", self.0)
    }
}
