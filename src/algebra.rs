//! Effect algebra: operations as resource transitions.
//!
//! An effect kind is a closed set of operation types. Each operation
//! commits to a protocol transition: the resource state it requires on
//! entry and the state it produces on exit, together with a result
//! value. Handlers match on these operation types exhaustively; there is
//! no open class hierarchy to extend behind a program's back.

use std::any::Any;
use std::fmt;

use crate::handler::EffectError;

/// One operation of an effect, with its protocol transition.
///
/// `Entry` is the resource state the operation requires, `Exit` the
/// state it produces, and `Out` its result value. The pair
/// (`Entry`, `Exit`) is the transition the whole engine exists to
/// enforce: the exit state of one operation must be exactly the entry
/// state the next operation on the same effect demands.
pub trait Operation: 'static {
    /// Resource state required when the operation is dispatched.
    type Entry: 'static;
    /// Resource state produced when the continuation is resumed.
    type Exit: 'static;
    /// Result value passed to the continuation alongside the exit state.
    type Out: 'static;
    /// Dotted `effect.operation` name, used for tracing and abort provenance.
    const NAME: &'static str;
}

/// Control value threaded through program execution.
///
/// Ordinary operations produce `Done`; an aborting operation (raise)
/// produces `Aborted` and the composition combinators skip everything
/// downstream of it.
pub enum Ctl<A> {
    /// The step completed and the program continues with this value.
    Done(A),
    /// The step aborted; no further operation of the program runs.
    Aborted(Abort),
}

impl<A: fmt::Debug> fmt::Debug for Ctl<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ctl::Done(a) => f.debug_tuple("Done").field(a).finish(),
            Ctl::Aborted(abort) => f.debug_tuple("Aborted").field(abort).finish(),
        }
    }
}

/// Payload carried by an aborting operation to the nearest catch point,
/// or to the caller of [`run`](crate::program::EffM::run) if nothing
/// catches it.
pub struct Abort {
    /// Name of the effect whose handler aborted.
    pub effect: &'static str,
    /// Debug rendering of the payload, captured at the abort site.
    pub message: String,
    payload: Box<dyn Any + Send>,
}

impl Abort {
    /// Wraps a typed payload. The debug rendering is captured eagerly so
    /// the payload can still be described after type erasure.
    pub fn new<X: Any + Send + fmt::Debug>(effect: &'static str, payload: X) -> Self {
        Abort {
            effect,
            message: format!("{payload:?}"),
            payload: Box::new(payload),
        }
    }

    /// Recovers the typed payload, or returns the abort unchanged so it
    /// can keep propagating to an outer catch point.
    pub fn downcast<X: Any>(self) -> Result<X, Abort> {
        let Abort {
            effect,
            message,
            payload,
        } = self;
        match payload.downcast::<X>() {
            Ok(x) => Ok(*x),
            Err(payload) => Err(Abort {
                effect,
                message,
                payload,
            }),
        }
    }

    /// Converts an uncaught abort into the error reported by `run`.
    /// Handlers that abort with an [`EffectError`] payload surface it
    /// as-is; anything else becomes `Unhandled`.
    pub fn into_error(self) -> EffectError {
        match self.downcast::<EffectError>() {
            Ok(err) => err,
            Err(abort) => EffectError::Unhandled {
                effect: abort.effect,
                message: abort.message,
            },
        }
    }

    pub(crate) fn handler_protocol(op: &'static str) -> Abort {
        Abort::new(
            "engine",
            EffectError::Protocol(format!(
                "handler for {op} returned without resuming or aborting"
            )),
        )
    }
}

impl fmt::Debug for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Abort")
            .field("effect", &self.effect)
            .field("message", &self.message)
            .finish()
    }
}
