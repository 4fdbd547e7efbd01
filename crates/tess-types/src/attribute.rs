//! Attribute identifiers and the two-kind attribute payload.
//!
//! An attribute identifier carries two load-bearing tag bits: bit 29
//! selects the payload kind (value pair vs. byte buffer) and bit 28 marks
//! the public category (readable regardless of usage permissions). The
//! kind bit is enforced at construction: an [`Attribute`] can only be
//! built through the factory matching its identifier's kind, so a
//! mistagged attribute cannot exist.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fatal;

/// Bit 29: set for value attributes, clear for reference attributes.
const TAG_VALUE: u32 = 1 << 29;

/// Bit 28: set for public attributes. Reserved at the client layer; only
/// the backend branches on it.
const TAG_PUBLIC: u32 = 1 << 28;

/// Identifier of an object attribute.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeId(u32);

impl AttributeId {
    /// Secret key material of a symmetric or generic-secret key
    /// (reference, secret).
    pub const SECRET_VALUE: Self = Self(0xC000_0000);

    /// RSA modulus (reference, public).
    pub const RSA_MODULUS: Self = Self(0xD000_0130);

    /// RSA public exponent (reference, public).
    pub const RSA_PUBLIC_EXPONENT: Self = Self(0xD000_0230);

    /// RSA private exponent (reference, secret).
    pub const RSA_PRIVATE_EXPONENT: Self = Self(0xC000_0330);

    /// Elliptic curve selector (value, public).
    pub const ECC_CURVE: Self = Self(0xF000_0441);

    /// Wrap a raw identifier.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw identifier value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this identifier names a value attribute.
    pub const fn is_value(self) -> bool {
        self.0 & TAG_VALUE != 0
    }

    /// Whether this identifier names a reference attribute.
    pub const fn is_reference(self) -> bool {
        self.0 & TAG_VALUE == 0
    }

    /// Whether the attribute is public, i.e. readable without the
    /// extractable usage permission.
    pub const fn is_public(self) -> bool {
        self.0 & TAG_PUBLIC != 0
    }
}

impl fmt::Debug for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeId({:#010x})", self.0)
    }
}

/// A typed property of a secure object.
///
/// Built only through [`Attribute::new_ref`] and [`Attribute::new_value`];
/// the factories abort the task when the identifier's kind tag does not
/// match the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attribute {
    /// A reference attribute: an identifier plus an owned byte buffer.
    Ref {
        /// The attribute's identifier (reference-tagged).
        id: AttributeId,
        /// The attribute's payload bytes.
        buffer: Vec<u8>,
    },
    /// A value attribute: an identifier plus two 32-bit fields.
    Value {
        /// The attribute's identifier (value-tagged).
        id: AttributeId,
        /// First field.
        a: u32,
        /// Second field.
        b: u32,
    },
}

impl Attribute {
    /// Build a reference attribute.
    ///
    /// Aborts the task if `id` is tagged as a value attribute.
    pub fn new_ref(id: AttributeId, buffer: impl Into<Vec<u8>>) -> Self {
        if id.is_value() {
            fatal::contract_violation("reference attribute built with a value-tagged identifier");
        }
        Self::Ref {
            id,
            buffer: buffer.into(),
        }
    }

    /// Build a value attribute.
    ///
    /// Aborts the task if `id` is tagged as a reference attribute.
    pub fn new_value(id: AttributeId, a: u32, b: u32) -> Self {
        if id.is_reference() {
            fatal::contract_violation("value attribute built with a reference-tagged identifier");
        }
        Self::Value { id, a, b }
    }

    /// The attribute's identifier.
    pub fn id(&self) -> AttributeId {
        match self {
            Self::Ref { id, .. } | Self::Value { id, .. } => *id,
        }
    }

    /// The payload bytes, if this is a reference attribute.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Ref { buffer, .. } => Some(buffer),
            Self::Value { .. } => None,
        }
    }

    /// The `(a, b)` pair, if this is a value attribute.
    pub fn as_value(&self) -> Option<(u32, u32)> {
        match self {
            Self::Ref { .. } => None,
            Self::Value { a, b, .. } => Some((*a, *b)),
        }
    }
}
