//! Handler dispatch contract.
//!
//! A handler is the executable implementation of an effect's operations
//! for one execution context. Dispatch is continuation-passing: the
//! handler receives the current resource, the operation, and the
//! continuation for the rest of the program, and it alone decides how
//! many times that continuation runs.

use thiserror::Error;

use crate::algebra::{Ctl, Operation};

/// Errors surfaced by running programs and by form dispatch.
#[derive(Debug, Error)]
pub enum EffectError {
    /// An aborting operation propagated to the top of the program.
    #[error("unhandled {effect} abort: {message}")]
    Unhandled {
        /// Effect whose handler aborted.
        effect: &'static str,
        /// Debug rendering of the abort payload.
        message: String,
    },

    /// A resource transition contract was violated at dispatch time.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The backing context failed while performing real I/O for an
    /// operation whose contract has no failure channel.
    #[error("i/o failure in {op}")]
    Io {
        /// Operation that was being dispatched.
        op: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No handler with this name exists in the registry.
    #[error("no handler named {0:?} is registered")]
    UnknownHandler(String),

    /// A handler with this name exists but its registered field types
    /// or capability set differ from the submitted shape.
    #[error("handler {name:?} does not match the submitted shape")]
    HandlerMismatch {
        /// Name of the closest registry entry.
        name: String,
    },

    /// A handler was registered under a name already taken.
    #[error("a handler named {0:?} is already registered")]
    DuplicateHandler(String),

    /// Submission metadata could not be decoded.
    #[error("malformed submission metadata: {0}")]
    Metadata(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EffectError>;

/// Executes one operation against a concrete execution context.
///
/// The contract: given the entry resource, the operation, and a
/// continuation accepting the exit resource and the result value,
/// produce the final answer. The handler owns the decision of how many
/// times the continuation is invoked - exactly once for ordinary
/// operations, zero times for an aborting operation such as raise
/// (return [`Ctl::Aborted`] instead), and more than once only for
/// operations documented as multi-shot.
///
/// One impl exists per (operation, context) pair. Several contexts may
/// handle the same effect kind differently; a running program uses
/// exactly one context.
pub trait Handle<O: Operation> {
    /// Dispatches `op` with resource `res`, resuming through `k`.
    fn handle<A>(
        &mut self,
        res: O::Entry,
        op: O,
        k: &mut dyn FnMut(O::Exit, O::Out) -> Ctl<A>,
    ) -> Ctl<A>;
}
