//! Algebraic effects for resource usage protocols.
//!
//! A program declares, in its type, exactly which effects it may
//! perform and how each effect's *resource* - its internal state - is
//! transformed from entry to exit. Protocol violations ("read from a
//! closed file", "submit a form to a handler with the wrong argument
//! types") are rejected when the program is built, not when it runs.
//!
//! The pieces:
//!
//! - [`resource`]: resource slots labelled by effect name, held in an
//!   ordered typed collection ([`Cons`]/[`Nil`]) with compile-time
//!   lookup, plus the [`Checked`] union for fallible transitions.
//! - [`algebra`]: the [`Operation`] trait - entry state, exit state,
//!   result - and the [`Ctl`] control value for short-circuiting.
//! - [`handler`]: the continuation-passing [`Handle`] dispatch
//!   contract; the handler alone decides whether the continuation runs
//!   zero, one, or many times.
//! - [`program`]: [`EffM`]/[`Eff`] composition - [`perform`],
//!   [`catch`], [`scoped`], [`check`], and `run`.
//! - [`effects`]: the concrete protocol effects (state, exceptions,
//!   files, forms).
//! - [`registry`]: the handler compatibility checker used by the form
//!   protocol at construction time and again at submission time.
//! - [`contexts`]: execution contexts, from pure to real file I/O.
//! - [`middleware`]: composable dispatch wrappers (tracing, recording).
//!
//! A counter program, run under the pure context:
//!
//! ```
//! use resourcery::contexts::PureContext;
//! use resourcery::effects::state::{Get, Put};
//! use resourcery::program::perform;
//! use resourcery::resources;
//!
//! #[derive(Clone, Copy)]
//! struct Counter;
//!
//! let program = perform(Counter, Get::<i32>::new())
//!     .and_then(|n| perform(Counter, Put(n + 1)))
//!     .and_then(|_| perform(Counter, Get::<i32>::new()));
//!
//! let (_, value) = program.run(resources![Counter => 1], &mut PureContext::new())?;
//! assert_eq!(value, 2);
//! # Ok::<(), resourcery::EffectError>(())
//! ```

pub mod algebra;
pub mod contexts;
pub mod effects;
pub mod handler;
pub mod middleware;
pub mod program;
pub mod registry;
pub mod resource;

pub use algebra::{Abort, Ctl, Operation};
pub use handler::{EffectError, Handle, Result};
pub use program::{catch, check, perform, scoped, Eff, EffM};
pub use registry::{
    Capability, CapabilitySet, FieldType, FieldValue, HandlerList, HandlerMetadata,
    HandlerRegistration, ResolvedHandler,
};
pub use resource::{res, Checked, Cons, Nil, Res};
