//! Concrete resource-protocol effects built on the engine:
//! mutable state, exceptions, the file-access protocol, and the
//! form-construction protocol.

pub mod except;
pub mod file;
pub mod form;
pub mod state;
