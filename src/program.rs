//! Effect composition: programs as sequenced resource transitions.
//!
//! A program is an inert description; nothing runs until `run` hands it
//! a resource collection and an execution context. Operations execute in
//! exactly the order they were composed - later operations' entry-state
//! requirements depend on earlier operations' exit states, so no
//! reordering is possible.

use crate::algebra::{Abort, Ctl, Operation};
use crate::handler::{Handle, Result};
use crate::resource::{res, Checked, Cons, Plug, Res, Take};

/// A program over execution context `C`, transforming the resource
/// collection `Rin` into `Rout` and producing a value `T`.
///
/// `EffM` is the general, shape-changing form: an effect may appear,
/// disappear, or change its resource to an unrelated type across the
/// program. The common shape-preserving case is the [`Eff`] alias.
pub struct EffM<C, Rin, Rout, T> {
    step: Box<dyn FnOnce(Rin, &mut C) -> Ctl<(Rout, T)>>,
}

/// A program whose exit resource collection has the same shape as its
/// entry collection. Individual resource states may still change.
pub type Eff<C, R, T> = EffM<C, R, R, T>;

impl<C, Rin, Rout, T> EffM<C, Rin, Rout, T>
where
    C: 'static,
    Rin: 'static,
    Rout: 'static,
    T: 'static,
{
    pub(crate) fn from_fn(f: impl FnOnce(Rin, &mut C) -> Ctl<(Rout, T)> + 'static) -> Self {
        EffM { step: Box::new(f) }
    }

    /// Sequencing: runs `self`, feeds its result into `f`, and runs the
    /// program `f` produces on the updated resources. An abort on the
    /// left skips the right entirely.
    pub fn and_then<Rnext, U, F>(self, f: F) -> EffM<C, Rin, Rnext, U>
    where
        Rnext: 'static,
        U: 'static,
        F: FnOnce(T) -> EffM<C, Rout, Rnext, U> + 'static,
    {
        EffM::from_fn(move |r, ctx| match (self.step)(r, ctx) {
            Ctl::Done((mid, value)) => (f(value).step)(mid, ctx),
            Ctl::Aborted(abort) => Ctl::Aborted(abort),
        })
    }

    /// Applies a pure function to the program's result.
    pub fn map<U, F>(self, f: F) -> EffM<C, Rin, Rout, U>
    where
        U: 'static,
        F: FnOnce(T) -> U + 'static,
    {
        EffM::from_fn(move |r, ctx| match (self.step)(r, ctx) {
            Ctl::Done((out, value)) => Ctl::Done((out, f(value))),
            Ctl::Aborted(abort) => Ctl::Aborted(abort),
        })
    }

    /// Sequencing that discards the first program's result.
    pub fn then<Rnext, U>(self, next: EffM<C, Rout, Rnext, U>) -> EffM<C, Rin, Rnext, U>
    where
        Rnext: 'static,
        U: 'static,
    {
        self.and_then(move |_| next)
    }

    /// Executes the program on a resource collection under one
    /// execution context, yielding the exit resources and the result.
    /// An abort that no catch point intercepted comes back as an error.
    pub fn run(self, resources: Rin, ctx: &mut C) -> Result<(Rout, T)> {
        match (self.step)(resources, ctx) {
            Ctl::Done(pair) => Ok(pair),
            Ctl::Aborted(abort) => {
                tracing::debug!(effect = abort.effect, "program aborted");
                Err(abort.into_error())
            }
        }
    }
}

impl<C, R, T> EffM<C, R, R, T>
where
    C: 'static,
    R: 'static,
    T: 'static,
{
    /// The no-op program: touches no resource, produces `value`.
    /// Identity for [`and_then`](EffM::and_then).
    pub fn pure(value: T) -> Self {
        EffM::from_fn(move |r, _ctx| Ctl::Done((r, value)))
    }
}

/// Performs one operation on the effect labelled `label`.
///
/// The labelled slot must currently hold the operation's entry state;
/// after dispatch it holds the exit state. Both facts are bounds, not
/// runtime checks: a program that performs an operation out of protocol
/// order does not build. All other slots keep their state and position.
pub fn perform<C, L, O, R, I>(
    label: L,
    op: O,
) -> EffM<C, R, <<R as Take<L, O::Entry, I>>::Gapped as Plug<L, O::Exit, I>>::Plugged, O::Out>
where
    O: Operation,
    C: Handle<O> + 'static,
    L: 'static,
    R: Take<L, O::Entry, I> + 'static,
    <R as Take<L, O::Entry, I>>::Gapped: Plug<L, O::Exit, I> + 'static,
    <<R as Take<L, O::Entry, I>>::Gapped as Plug<L, O::Exit, I>>::Plugged: 'static,
{
    let _ = label;
    EffM::from_fn(move |r: R, ctx: &mut C| {
        let (entry, gapped) = r.take();
        let mut exit_slot: Option<O::Exit> = None;
        let mut k = |exit: O::Exit, out: O::Out| {
            exit_slot = Some(exit);
            Ctl::Done(out)
        };
        let outcome = ctx.handle(entry, op, &mut k);
        match outcome {
            Ctl::Done(out) => match exit_slot.take() {
                Some(exit) => Ctl::Done((gapped.plug(exit), out)),
                // A handler completed without resuming; parametricity
                // makes this unreachable for well-typed handlers.
                None => Ctl::Aborted(Abort::handler_protocol(O::NAME)),
            },
            Ctl::Aborted(abort) => Ctl::Aborted(abort),
        }
    })
}

/// Catch point: runs `prog`; if it aborts with a payload of type `X`,
/// runs `recover` instead, on the resource collection as it stood when
/// the catch point was entered. Aborts with any other payload keep
/// propagating.
///
/// The snapshot requires `Clone` resources; effects whose resources
/// cannot be cloned (an open file handle) must be scoped inside the
/// protected region or closed before it, which the bound enforces.
pub fn catch<C, X, R, Rout, T, F>(prog: EffM<C, R, Rout, T>, recover: F) -> EffM<C, R, Rout, T>
where
    C: 'static,
    X: std::any::Any,
    R: Clone + 'static,
    Rout: 'static,
    T: 'static,
    F: FnOnce(X) -> EffM<C, R, Rout, T> + 'static,
{
    EffM::from_fn(move |r: R, ctx| {
        let snapshot = r.clone();
        match (prog.step)(r, ctx) {
            done @ Ctl::Done(_) => done,
            Ctl::Aborted(abort) => match abort.downcast::<X>() {
                Ok(payload) => (recover(payload).step)(snapshot, ctx),
                Err(abort) => Ctl::Aborted(abort),
            },
        }
    })
}

/// Scoped sub-effect: introduces a fresh effect `label` with resource
/// `initial` for the duration of `body`, then discards it.
///
/// The sub-effect's resource exists only inside the nested program and
/// is discarded on every exit path - normal completion and abort alike
/// - so it never leaks into the parent program's collection.
pub fn scoped<C, L, A, B, R, S, T>(
    label: L,
    initial: A,
    body: EffM<C, Cons<Res<L, A>, R>, Cons<Res<L, B>, S>, T>,
) -> EffM<C, R, S, T>
where
    C: 'static,
    L: 'static,
    A: 'static,
    B: 'static,
    R: 'static,
    S: 'static,
    T: 'static,
{
    EffM::from_fn(move |r, ctx| match (body.step)(Cons(res(label, initial), r), ctx) {
        Ctl::Done((Cons(_discarded, rest), value)) => Ctl::Done((rest, value)),
        Ctl::Aborted(abort) => Ctl::Aborted(abort),
    })
}

/// Conditional-resource-check: branches on a [`Checked`] resource.
///
/// The `label` slot must hold `Checked<F, S>`; depending on which
/// branch it carries, the slot is replaced with the failure or success
/// resource and the corresponding program runs. Both programs are
/// required by the signature and must agree on exit shape and result
/// type, so forgetting to handle a fallible transition's failure branch
/// is a build error, not an unchecked value.
pub fn check<C, L, F, S, R, Rout, T, I>(
    label: L,
    on_fail: EffM<C, <<R as Take<L, Checked<F, S>, I>>::Gapped as Plug<L, F, I>>::Plugged, Rout, T>,
    on_ok: EffM<C, <<R as Take<L, Checked<F, S>, I>>::Gapped as Plug<L, S, I>>::Plugged, Rout, T>,
) -> EffM<C, R, Rout, T>
where
    C: 'static,
    L: 'static,
    F: 'static,
    S: 'static,
    Rout: 'static,
    T: 'static,
    R: Take<L, Checked<F, S>, I> + 'static,
    <R as Take<L, Checked<F, S>, I>>::Gapped: Plug<L, F, I> + Plug<L, S, I> + 'static,
    <<R as Take<L, Checked<F, S>, I>>::Gapped as Plug<L, F, I>>::Plugged: 'static,
    <<R as Take<L, Checked<F, S>, I>>::Gapped as Plug<L, S, I>>::Plugged: 'static,
{
    let _ = label;
    EffM::from_fn(move |r: R, ctx| {
        let (checked, gapped) = r.take();
        match checked {
            Checked::Failed(failure) => {
                let env = Plug::<L, F, I>::plug(gapped, failure);
                (on_fail.step)(env, ctx)
            }
            Checked::Succeeded(success) => {
                let env = Plug::<L, S, I>::plug(gapped, success);
                (on_ok.step)(env, ctx)
            }
        }
    })
}
