//! The non-recoverable failure channel.
//!
//! A contract violation -- wrong attribute kind, wrong handle category, an
//! oversized identifier, a backend outcome that should be structurally
//! impossible -- terminates the calling task. It is never reported through
//! [`TeeError`] and never caught anywhere in the workspace. Release builds
//! abort on panic, so the termination is real; test builds unwind so fatal
//! paths can be asserted with `#[should_panic]`.

use crate::error::TeeError;

/// Terminate the task: the caller violated an API precondition.
#[cold]
#[track_caller]
pub fn contract_violation(context: &'static str) -> ! {
    tracing::error!(context, "secure object contract violation");
    panic!("secure object contract violation: {context}");
}

/// Terminate the task: the backend reported an outcome outside the
/// operation's recoverable set.
#[cold]
#[track_caller]
pub fn backend_failure(op: &'static str, err: TeeError) -> ! {
    tracing::error!(op, %err, "unexpected backend failure");
    panic!("unexpected backend failure in {op}: {err}");
}
