//! CKB script harness running Rhai programs.
//!
//! The program is the `args` field of the current Script. It sees the
//! transaction only through the `CKB` module (see [`bindings`]), which wraps
//! [`ckb_syscalls::Syscalls`].

pub mod bindings;
pub mod config;
pub mod error;
pub mod reader;
pub mod vm;

pub use config::{Fuel, VmConfig};
pub use error::{Exception, ExitStatus, GuestError};
pub use reader::{ReadOutcome, Reader, ReaderKind};
pub use vm::ScriptVm;
