//! The TESS contract layer: secure object handles over a call gate.
//!
//! This crate is the client side of the trusted storage and cryptographic
//! object API. It owns no durable state; every operation crosses the
//! injected [`CallGate`](tess_gate::CallGate) as a synchronous call, and
//! this layer's job is to enforce the API contract in front of it:
//! initialization ordering, handle-category exclusivity, attribute-kind
//! typing, identifier bounds, and overflow-safe stream position
//! arithmetic.
//!
//! # Entry Points
//!
//! - [`TrustedStorage`] -- the context-scoped front door: allocates
//!   transient objects, opens and creates persistent objects, allocates
//!   enumerators
//! - [`TransientObject`] / [`PersistentObject`] -- owned handle types; the
//!   split makes the transient/persistent operation families a
//!   compile-time distinction
//! - [`ObjectAccess`] -- the capability interface both handle types share:
//!   info snapshots, usage restriction, attribute reads
//! - [`ObjectEnumerator`] -- cursor over a namespace's persistent object
//!   identifiers
//!
//! # Failure Policy
//!
//! Each operation reports an enumerated set of recoverable outcomes
//! through `TeeResult` and escalates every other backend outcome through
//! `tess_types::fatal`, which terminates the calling task. Contract
//! violations (wrong handle state, wrong attribute kind, oversized
//! identifier) never come back as errors at all.

pub mod enumerator;
pub mod object;
pub mod persistent;
pub mod storage;
pub mod stream;
pub mod transient;

pub use enumerator::ObjectEnumerator;
pub use object::ObjectAccess;
pub use persistent::PersistentObject;
pub use storage::TrustedStorage;
pub use transient::TransientObject;
