//! Middleware layers for execution contexts.
//!
//! Composable wrappers forwarding dispatch to an inner context, adding
//! cross-cutting concerns without touching program or handler code.

use std::sync::{Arc, Mutex};

use tracing::{debug, trace, warn};

use crate::algebra::{Ctl, Operation};
use crate::handler::Handle;

/// Tracing middleware: logs every dispatch that flows through it.
pub struct Trace<C> {
    inner: C,
}

impl<C> Trace<C> {
    /// Wraps a context.
    pub fn new(inner: C) -> Self {
        Trace { inner }
    }

    /// Unwraps the inner context.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C, O> Handle<O> for Trace<C>
where
    C: Handle<O>,
    O: Operation,
{
    fn handle<A>(
        &mut self,
        res: O::Entry,
        op: O,
        k: &mut dyn FnMut(O::Exit, O::Out) -> Ctl<A>,
    ) -> Ctl<A> {
        trace!(op = O::NAME, "dispatch: start");
        let result = self.inner.handle(res, op, k);
        match &result {
            Ctl::Done(_) => debug!(op = O::NAME, "dispatch: done"),
            Ctl::Aborted(abort) => {
                warn!(op = O::NAME, effect = abort.effect, "dispatch: aborted")
            }
        }
        result
    }
}

/// Recording middleware: captures the name of every dispatched
/// operation for later verification. The record handle is shareable, so
/// tests can keep one while the program owns the wrapped context.
#[derive(Clone)]
pub struct Record<C> {
    inner: C,
    ops: Arc<Mutex<Vec<&'static str>>>,
}

impl<C> Record<C> {
    /// Wraps a context with an empty record.
    pub fn new(inner: C) -> Self {
        Record {
            inner,
            ops: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A handle to this recorder's log, usable after the context has
    /// been moved into a program run.
    pub fn log(&self) -> RecordLog {
        RecordLog(Arc::clone(&self.ops))
    }

    /// Names of the operations dispatched so far, in order.
    pub fn ops(&self) -> Vec<&'static str> {
        self.ops.lock().unwrap().clone()
    }

    /// Clears the record.
    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }
}

/// Shared view of a [`Record`]'s dispatch log.
#[derive(Clone)]
pub struct RecordLog(Arc<Mutex<Vec<&'static str>>>);

impl RecordLog {
    /// Names of the operations dispatched so far, in order.
    pub fn ops(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

impl<C, O> Handle<O> for Record<C>
where
    C: Handle<O>,
    O: Operation,
{
    fn handle<A>(
        &mut self,
        res: O::Entry,
        op: O,
        k: &mut dyn FnMut(O::Exit, O::Out) -> Ctl<A>,
    ) -> Ctl<A> {
        self.ops.lock().unwrap().push(O::NAME);
        self.inner.handle(res, op, k)
    }
}
