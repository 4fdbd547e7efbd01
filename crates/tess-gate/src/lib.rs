//! The synchronous call gate to the privileged TESS backend.
//!
//! The client-side contract layer (`tess-objects`) never touches storage or
//! key material directly; every operation crosses this gate as a blocking
//! call and comes back as a status plus out-parameters. This crate defines
//! that boundary and two complete implementations of it:
//!
//! - [`CallGate`] -- the object-safe trait, one method per backend operation
//! - [`RawHandle`] -- the opaque wire handle, with zero as the null sentinel
//! - [`InMemoryGate`] -- a reference backend for tests and embedding,
//!   configured through [`GateConfig`]
//! - [`ScriptedGate`] -- a test double that replays canned outcomes and
//!   records the calls it receives
//!
//! The gate reports every outcome through `TeeResult`; deciding which
//! outcomes are recoverable and which abort the task is the client layer's
//! job, not the gate's.

pub mod config;
pub mod memory;
pub mod script;
pub mod traits;

pub use config::GateConfig;
pub use memory::InMemoryGate;
pub use script::{Op, Payload, ScriptedGate};
pub use traits::{CallGate, RawHandle};
