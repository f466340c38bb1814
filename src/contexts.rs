//! Execution contexts: concrete handler implementations.
//!
//! A context is the environment a program runs under. Each context
//! implements `Handle` for the operations it supports; the pure effects
//! (state, exceptions, form building) behave identically everywhere,
//! while the file protocol differs - real descriptors for `FsContext`,
//! a shared in-memory table for `MemFsContext`.

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::algebra::{Abort, Ctl, Operation};
use crate::effects::except::Raise;
use crate::effects::file::{
    Close, Closed, Eof, FileIo, Mode, Open, OpenHandle, ReadLine, ReadMode, WriteLine, WriteMode,
};
use crate::effects::form::{
    AddCheckBoxes, AddRadioGroup, AddSelectionBox, AddTextBox, DeclareEffects, Form, FormBuilder,
    FormDone, ReadyForm, Submit,
};
use crate::effects::state::{Get, Put, PutM};
use crate::handler::{EffectError, Handle};
use crate::resource::Checked;

/// Implements the context-independent effects: state, exceptions, and
/// form construction. Stamped once per context so a context remains
/// free to handle an effect kind its own way.
macro_rules! impl_pure_handlers {
    ($ctx:ty) => {
        impl<T: Clone + 'static> Handle<Get<T>> for $ctx {
            fn handle<A>(
                &mut self,
                res: T,
                _op: Get<T>,
                k: &mut dyn FnMut(T, T) -> Ctl<A>,
            ) -> Ctl<A> {
                let value = res.clone();
                k(res, value)
            }
        }

        impl<T: 'static> Handle<Put<T>> for $ctx {
            fn handle<A>(
                &mut self,
                _res: T,
                op: Put<T>,
                k: &mut dyn FnMut(T, ()) -> Ctl<A>,
            ) -> Ctl<A> {
                k(op.0, ())
            }
        }

        impl<S: 'static, T: 'static> Handle<PutM<S, T>> for $ctx {
            fn handle<A>(
                &mut self,
                _res: S,
                op: PutM<S, T>,
                k: &mut dyn FnMut(T, ()) -> Ctl<A>,
            ) -> Ctl<A> {
                k(op.value, ())
            }
        }

        impl<X: std::any::Any + Send + std::fmt::Debug> Handle<Raise<X>> for $ctx {
            fn handle<A>(
                &mut self,
                _res: (),
                op: Raise<X>,
                _k: &mut dyn FnMut((), std::convert::Infallible) -> Ctl<A>,
            ) -> Ctl<A> {
                // Raise is absorbing: the continuation is never invoked.
                Ctl::Aborted(Abort::new("except", op.into_payload()))
            }
        }

        impl Handle<AddTextBox> for $ctx {
            fn handle<A>(
                &mut self,
                res: FormBuilder,
                op: AddTextBox,
                k: &mut dyn FnMut(FormBuilder, ()) -> Ctl<A>,
            ) -> Ctl<A> {
                k(res.text_box(op.ty, op.initial), ())
            }
        }

        impl Handle<AddSelectionBox> for $ctx {
            fn handle<A>(
                &mut self,
                res: FormBuilder,
                op: AddSelectionBox,
                k: &mut dyn FnMut(FormBuilder, ()) -> Ctl<A>,
            ) -> Ctl<A> {
                k(res.selection_box(op.ty, op.options), ())
            }
        }

        impl Handle<AddRadioGroup> for $ctx {
            fn handle<A>(
                &mut self,
                res: FormBuilder,
                op: AddRadioGroup,
                k: &mut dyn FnMut(FormBuilder, ()) -> Ctl<A>,
            ) -> Ctl<A> {
                k(res.radio_group(op.options, op.default), ())
            }
        }

        impl Handle<AddCheckBoxes> for $ctx {
            fn handle<A>(
                &mut self,
                res: FormBuilder,
                op: AddCheckBoxes,
                k: &mut dyn FnMut(FormBuilder, ()) -> Ctl<A>,
            ) -> Ctl<A> {
                k(res.check_boxes(op.ty, op.options), ())
            }
        }

        impl Handle<DeclareEffects> for $ctx {
            fn handle<A>(
                &mut self,
                res: FormBuilder,
                op: DeclareEffects,
                k: &mut dyn FnMut(ReadyForm, ()) -> Ctl<A>,
            ) -> Ctl<A> {
                k(res.declare(op.caps), ())
            }
        }

        impl Handle<Submit> for $ctx {
            fn handle<A>(
                &mut self,
                res: ReadyForm,
                op: Submit,
                k: &mut dyn FnMut(FormDone, Form) -> Ctl<A>,
            ) -> Ctl<A> {
                match res.submit_resolved(op.handler) {
                    Ok(form) => k(FormDone, form),
                    Err(err) => Ctl::Aborted(Abort::new("form", err)),
                }
            }
        }
    };
}

/// Implements the backing-agnostic file operations, which only talk to
/// the handle's `FileIo` object. `Open` stays per-context.
macro_rules! impl_file_io_handlers {
    ($ctx:ty) => {
        impl<M: Mode> Handle<Close<M>> for $ctx {
            fn handle<A>(
                &mut self,
                res: OpenHandle<M>,
                _op: Close<M>,
                k: &mut dyn FnMut(Closed, ()) -> Ctl<A>,
            ) -> Ctl<A> {
                trace!(mode = M::NAME, "closing file");
                drop(res);
                k(Closed, ())
            }
        }

        impl Handle<ReadLine> for $ctx {
            fn handle<A>(
                &mut self,
                mut res: OpenHandle<ReadMode>,
                _op: ReadLine,
                k: &mut dyn FnMut(OpenHandle<ReadMode>, String) -> Ctl<A>,
            ) -> Ctl<A> {
                match res.io_mut().read_line() {
                    Ok(line) => k(res, line),
                    Err(source) => Ctl::Aborted(Abort::new(
                        "file",
                        EffectError::Io {
                            op: <ReadLine as Operation>::NAME,
                            source,
                        },
                    )),
                }
            }
        }

        impl Handle<WriteLine> for $ctx {
            fn handle<A>(
                &mut self,
                mut res: OpenHandle<WriteMode>,
                op: WriteLine,
                k: &mut dyn FnMut(OpenHandle<WriteMode>, ()) -> Ctl<A>,
            ) -> Ctl<A> {
                match res.io_mut().write_line(&op.0) {
                    Ok(()) => k(res, ()),
                    Err(source) => Ctl::Aborted(Abort::new(
                        "file",
                        EffectError::Io {
                            op: <WriteLine as Operation>::NAME,
                            source,
                        },
                    )),
                }
            }
        }

        impl Handle<Eof> for $ctx {
            fn handle<A>(
                &mut self,
                mut res: OpenHandle<ReadMode>,
                _op: Eof,
                k: &mut dyn FnMut(OpenHandle<ReadMode>, bool) -> Ctl<A>,
            ) -> Ctl<A> {
                match res.io_mut().at_eof() {
                    Ok(eof) => k(res, eof),
                    Err(source) => Ctl::Aborted(Abort::new(
                        "file",
                        EffectError::Io {
                            op: <Eof as Operation>::NAME,
                            source,
                        },
                    )),
                }
            }
        }
    };
}

/// Context for programs that perform no I/O: state, exceptions, and
/// form construction only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PureContext;

impl PureContext {
    /// Builds a pure context.
    pub fn new() -> Self {
        PureContext
    }
}

impl_pure_handlers!(PureContext);

/// Context backed by the real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContext;

impl FsContext {
    /// Builds a file-system context.
    pub fn new() -> Self {
        FsContext
    }
}

impl_pure_handlers!(FsContext);
impl_file_io_handlers!(FsContext);

struct RealReadFile {
    reader: BufReader<File>,
}

impl FileIo for RealReadFile {
    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    fn write_line(&mut self, _line: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "handle is read-only",
        ))
    }

    fn at_eof(&mut self) -> io::Result<bool> {
        Ok(self.reader.fill_buf()?.is_empty())
    }
}

struct RealWriteFile {
    file: File,
}

impl FileIo for RealWriteFile {
    fn read_line(&mut self) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "handle is write-only",
        ))
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.file, "{line}")
    }

    fn at_eof(&mut self) -> io::Result<bool> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "handle is write-only",
        ))
    }
}

impl Handle<Open<ReadMode>> for FsContext {
    fn handle<A>(
        &mut self,
        _res: Closed,
        op: Open<ReadMode>,
        k: &mut dyn FnMut(Checked<Closed, OpenHandle<ReadMode>>, ()) -> Ctl<A>,
    ) -> Ctl<A> {
        match File::open(&op.path) {
            Ok(file) => {
                debug!(path = %op.path.display(), "opened for reading");
                let io = RealReadFile {
                    reader: BufReader::new(file),
                };
                k(Checked::Succeeded(OpenHandle::new(Box::new(io))), ())
            }
            Err(err) => {
                debug!(path = %op.path.display(), error = %err, "open failed");
                k(Checked::Failed(Closed), ())
            }
        }
    }
}

impl Handle<Open<WriteMode>> for FsContext {
    fn handle<A>(
        &mut self,
        _res: Closed,
        op: Open<WriteMode>,
        k: &mut dyn FnMut(Checked<Closed, OpenHandle<WriteMode>>, ()) -> Ctl<A>,
    ) -> Ctl<A> {
        match File::create(&op.path) {
            Ok(file) => {
                debug!(path = %op.path.display(), "opened for writing");
                let io = RealWriteFile { file };
                k(Checked::Succeeded(OpenHandle::new(Box::new(io))), ())
            }
            Err(err) => {
                debug!(path = %op.path.display(), error = %err, "open failed");
                k(Checked::Failed(Closed), ())
            }
        }
    }
}

type FileTable = Arc<Mutex<HashMap<PathBuf, String>>>;

/// In-memory file context for tests: reads come from an internal table,
/// writes land back in it on close, and the next open can be forced to
/// fail to exercise the failure branch.
#[derive(Debug, Clone, Default)]
pub struct MemFsContext {
    files: FileTable,
    fail_next_open: bool,
}

impl MemFsContext {
    /// Builds an empty in-memory context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file with the given contents.
    pub fn insert_file(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), contents.into());
    }

    /// Reads a file's current contents, if present.
    pub fn contents(&self, path: impl Into<PathBuf>) -> Option<String> {
        self.files.lock().unwrap().get(&path.into()).cloned()
    }

    /// Forces the next open to take the failure branch.
    pub fn fail_next_open(&mut self) {
        self.fail_next_open = true;
    }

    fn take_forced_failure(&mut self) -> bool {
        std::mem::take(&mut self.fail_next_open)
    }
}

impl_pure_handlers!(MemFsContext);
impl_file_io_handlers!(MemFsContext);

struct MemReadFile {
    lines: VecDeque<String>,
}

impl FileIo for MemReadFile {
    fn read_line(&mut self) -> io::Result<String> {
        Ok(self.lines.pop_front().unwrap_or_default())
    }

    fn write_line(&mut self, _line: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "handle is read-only",
        ))
    }

    fn at_eof(&mut self) -> io::Result<bool> {
        Ok(self.lines.is_empty())
    }
}

struct MemWriteFile {
    path: PathBuf,
    lines: Vec<String>,
    files: FileTable,
}

impl FileIo for MemWriteFile {
    fn read_line(&mut self) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "handle is write-only",
        ))
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }

    fn at_eof(&mut self) -> io::Result<bool> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "handle is write-only",
        ))
    }
}

impl Drop for MemWriteFile {
    fn drop(&mut self) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(std::mem::take(&mut self.path), self.lines.join("\n"));
        }
    }
}

impl Handle<Open<ReadMode>> for MemFsContext {
    fn handle<A>(
        &mut self,
        _res: Closed,
        op: Open<ReadMode>,
        k: &mut dyn FnMut(Checked<Closed, OpenHandle<ReadMode>>, ()) -> Ctl<A>,
    ) -> Ctl<A> {
        if self.take_forced_failure() {
            return k(Checked::Failed(Closed), ());
        }
        let contents = self.files.lock().unwrap().get(&op.path).cloned();
        match contents {
            Some(contents) => {
                let lines = if contents.is_empty() {
                    VecDeque::new()
                } else {
                    contents.split('\n').map(str::to_string).collect()
                };
                trace!(path = %op.path.display(), "in-memory open for reading");
                let io = MemReadFile { lines };
                k(Checked::Succeeded(OpenHandle::new(Box::new(io))), ())
            }
            None => k(Checked::Failed(Closed), ()),
        }
    }
}

impl Handle<Open<WriteMode>> for MemFsContext {
    fn handle<A>(
        &mut self,
        _res: Closed,
        op: Open<WriteMode>,
        k: &mut dyn FnMut(Checked<Closed, OpenHandle<WriteMode>>, ()) -> Ctl<A>,
    ) -> Ctl<A> {
        if self.take_forced_failure() {
            return k(Checked::Failed(Closed), ());
        }
        trace!(path = %op.path.display(), "in-memory open for writing");
        let io = MemWriteFile {
            path: op.path,
            lines: Vec::new(),
            files: Arc::clone(&self.files),
        };
        k(Checked::Succeeded(OpenHandle::new(Box::new(io))), ())
    }
}
