//! Foundation types for TESS (Trusted Execution Secure Storage).
//!
//! This crate provides the shared vocabulary of the secure object and
//! trusted storage API. Every other TESS crate depends on `tess-types`.
//!
//! # Key Types
//!
//! - [`Attribute`] -- Typed object property, a value pair or a byte buffer,
//!   built only through its two kind-checked factories
//! - [`AttributeId`] -- Attribute identifier whose high tag bits encode the
//!   payload kind and the public/secret category
//! - [`ObjectId`] -- Durable identifier of a persistent object
//! - [`StorageId`] -- Storage namespace selector
//! - [`ObjectInfo`] -- Point-in-time metadata snapshot of an object
//! - [`HandleFlags`], [`Usage`], [`DataFlags`] -- Flag sets for handle
//!   state, key usage permissions, and data-stream access modes
//! - [`TeeError`] -- The closed set of recoverable operation outcomes
//!
//! # Failure Channels
//!
//! Recoverable runtime conditions are reported through [`TeeError`].
//! Contract violations go through [`fatal`] and terminate the calling
//! task; they are never returned and never caught.

pub mod attribute;
pub mod error;
pub mod fatal;
pub mod flags;
pub mod id;
pub mod info;

pub use attribute::{Attribute, AttributeId};
pub use error::{TeeError, TeeResult};
pub use flags::{DataFlags, HandleFlags, ObjectType, Usage};
pub use id::{ObjectId, StorageId};
pub use info::{ObjectInfo, Whence, DATA_MAX_POSITION};
