//! Exception effect. Raising never resumes: handlers return
//! [`Ctl::Aborted`](crate::Ctl) without touching the continuation, and
//! the result type [`Infallible`] makes resumption unrepresentable.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;

use crate::algebra::Operation;
use crate::handler::Handle;
use crate::program::{perform, EffM};
use crate::resource::{Plug, Take};

/// Raises `X` as an exception. The exception effect carries no state of
/// its own, so entry and exit resources are unit; by contract the
/// continuation is never invoked.
pub struct Raise<X>(X);

impl<X> Raise<X> {
    /// Builds a raise operation around the error payload.
    pub fn new(payload: X) -> Self {
        Raise(payload)
    }

    /// Consumes the operation, yielding the payload.
    pub fn into_payload(self) -> X {
        self.0
    }
}

impl<X: Any + Send + fmt::Debug> Operation for Raise<X> {
    type Entry = ();
    type Exit = ();
    type Out = Infallible;
    const NAME: &'static str = "except.raise";
}

/// Raises an exception inside a program, at any result type.
///
/// Dispatches [`Raise`] through the context's handler and eliminates
/// the uninhabited result, so a raise can stand in for a program of any
/// shape-preserving type.
pub fn raise<C, L, X, R, T, I>(label: L, payload: X) -> EffM<C, R, R, T>
where
    C: Handle<Raise<X>> + 'static,
    X: Any + Send + fmt::Debug,
    L: 'static,
    T: 'static,
    R: Take<L, (), I> + 'static,
    <R as Take<L, (), I>>::Gapped: Plug<L, (), I> + 'static,
    <<R as Take<L, (), I>>::Gapped as Plug<L, (), I>>::Plugged: 'static,
{
    perform(label, Raise::new(payload)).and_then(|never: Infallible| match never {})
}
