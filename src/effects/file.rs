//! File-access protocol effect.
//!
//! The resource walks a typestate machine: `Closed` until a successful
//! open, `OpenHandle<ReadMode>` or `OpenHandle<WriteMode>` while open.
//! Opening is fallible, so `Open` exits into a
//! [`Checked`](crate::resource::Checked) union that must be branched on
//! with [`check`](crate::program::check) before the handle is usable -
//! failure-checking is a precondition the types enforce, not a
//! convention.
//!
//! | Operation        | Entry                 | Exit                              | Result   |
//! |------------------|-----------------------|-----------------------------------|----------|
//! | `Open(path)`     | `Closed`              | `Checked<Closed, OpenHandle<M>>`  | `()`     |
//! | `Close`          | `OpenHandle<M>`       | `Closed`                          | `()`     |
//! | `ReadLine`       | `OpenHandle<Read>`    | `OpenHandle<Read>`                | `String` |
//! | `WriteLine(s)`   | `OpenHandle<Write>`   | `OpenHandle<Write>`               | `()`     |
//! | `Eof`            | `OpenHandle<Read>`    | `OpenHandle<Read>`                | `bool`   |
//!
//! An accepted protocol chain, run against the in-memory context:
//!
//! ```
//! use resourcery::contexts::MemFsContext;
//! use resourcery::effects::file::{Close, Closed, Eof, Open, ReadLine, ReadMode};
//! use resourcery::program::{check, perform, Eff};
//! use resourcery::resources;
//!
//! #[derive(Clone, Copy)]
//! struct F;
//!
//! let mut ctx = MemFsContext::new();
//! ctx.insert_file("greeting.txt", "hello\nworld");
//!
//! let program = perform(F, Open::<ReadMode>::new("greeting.txt")).and_then(|_| {
//!     check(
//!         F,
//!         Eff::pure(None),
//!         perform(F, ReadLine)
//!             .and_then(|line| perform(F, Close::new()).map(move |_| Some(line))),
//!     )
//! });
//!
//! let (_, first) = program.run(resources![F => Closed], &mut ctx)?;
//! assert_eq!(first.as_deref(), Some("hello"));
//! # Ok::<(), resourcery::EffectError>(())
//! ```
//!
//! Reading without branching on the open result does not build - the
//! resource is still the `Checked` union, not an open handle:
//!
//! ```compile_fail
//! use resourcery::contexts::MemFsContext;
//! use resourcery::effects::file::{Closed, Open, ReadLine, ReadMode};
//! use resourcery::program::perform;
//! use resourcery::resources;
//!
//! #[derive(Clone, Copy)]
//! struct F;
//!
//! let program = perform(F, Open::<ReadMode>::new("greeting.txt"))
//!     .and_then(|_| perform(F, ReadLine));
//! let _ = program.run(resources![F => Closed], &mut MemFsContext::new());
//! ```
//!
//! Using a handle after `Close` does not build either - the resource is
//! `Closed` again:
//!
//! ```compile_fail
//! use resourcery::contexts::MemFsContext;
//! use resourcery::effects::file::{Close, Closed, Open, ReadLine, ReadMode};
//! use resourcery::program::{check, perform, Eff};
//! use resourcery::resources;
//!
//! #[derive(Clone, Copy)]
//! struct F;
//!
//! let program = perform(F, Open::<ReadMode>::new("greeting.txt")).and_then(|_| {
//!     check(
//!         F,
//!         Eff::pure(String::new()),
//!         perform(F, Close::new()).and_then(|_| perform(F, ReadLine)),
//!     )
//! });
//! let _ = program.run(resources![F => Closed], &mut MemFsContext::new());
//! ```

use std::io;
use std::marker::PhantomData;
use std::path::PathBuf;

use crate::algebra::Operation;
use crate::resource::Checked;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::ReadMode {}
    impl Sealed for super::WriteMode {}
}

/// Access mode marker carried by an open handle's type.
pub trait Mode: sealed::Sealed + 'static {
    /// Mode name for tracing.
    const NAME: &'static str;
}

/// Read-access marker.
pub struct ReadMode;

/// Write-access marker.
pub struct WriteMode;

impl Mode for ReadMode {
    const NAME: &'static str = "read";
}

impl Mode for WriteMode {
    const NAME: &'static str = "write";
}

/// Resource state: no file is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Closed;

/// Line-oriented backing object behind an open handle. Contexts choose
/// the implementation: real file descriptors, an in-memory table, or
/// anything else satisfying the same contract.
pub trait FileIo {
    /// Reads the next line, without its terminator. Returns an empty
    /// string at end of input.
    fn read_line(&mut self) -> io::Result<String>;
    /// Appends one line.
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    /// True when no further line is available.
    fn at_eof(&mut self) -> io::Result<bool>;
}

/// Resource state: a file open in mode `M`.
pub struct OpenHandle<M: Mode> {
    io: Box<dyn FileIo>,
    _mode: PhantomData<M>,
}

impl<M: Mode> OpenHandle<M> {
    /// Wraps a backing object as an open handle.
    pub fn new(io: Box<dyn FileIo>) -> Self {
        OpenHandle {
            io,
            _mode: PhantomData,
        }
    }

    /// Access to the backing object, for handler dispatch.
    pub fn io_mut(&mut self) -> &mut dyn FileIo {
        self.io.as_mut()
    }
}

impl<M: Mode> std::fmt::Debug for OpenHandle<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenHandle").field("mode", &M::NAME).finish()
    }
}

/// Opens `path` in mode `M`. Exits into the checked union: `Failed`
/// keeps the resource `Closed`, `Succeeded` carries the open handle.
pub struct Open<M: Mode> {
    /// Path handed to the execution context.
    pub path: PathBuf,
    _mode: PhantomData<M>,
}

impl<M: Mode> Open<M> {
    /// Builds an open operation for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Open {
            path: path.into(),
            _mode: PhantomData,
        }
    }
}

impl<M: Mode> Operation for Open<M> {
    type Entry = Closed;
    type Exit = Checked<Closed, OpenHandle<M>>;
    type Out = ();
    const NAME: &'static str = "file.open";
}

/// Closes the open handle, returning the resource to `Closed`.
pub struct Close<M: Mode>(PhantomData<M>);

impl<M: Mode> Close<M> {
    /// Builds a close operation.
    pub fn new() -> Self {
        Close(PhantomData)
    }
}

impl<M: Mode> Default for Close<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Mode> Operation for Close<M> {
    type Entry = OpenHandle<M>;
    type Exit = Closed;
    type Out = ();
    const NAME: &'static str = "file.close";
}

/// Reads one line from a read-mode handle.
pub struct ReadLine;

impl Operation for ReadLine {
    type Entry = OpenHandle<ReadMode>;
    type Exit = OpenHandle<ReadMode>;
    type Out = String;
    const NAME: &'static str = "file.read_line";
}

/// Writes one line through a write-mode handle.
pub struct WriteLine(pub String);

impl Operation for WriteLine {
    type Entry = OpenHandle<WriteMode>;
    type Exit = OpenHandle<WriteMode>;
    type Out = ();
    const NAME: &'static str = "file.write_line";
}

/// End-of-file test on a read-mode handle.
pub struct Eof;

impl Operation for Eof {
    type Entry = OpenHandle<ReadMode>;
    type Exit = OpenHandle<ReadMode>;
    type Out = bool;
    const NAME: &'static str = "file.eof";
}
