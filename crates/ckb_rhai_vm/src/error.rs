//! Guest-visible errors, harness exceptions and exit codes.
//!
//! Guest errors cross into the interpreter as thrown maps:
//!
//! ```text
//! #{ kind: "IndexOutOfBound", message: "index out of bound" }
//! #{ kind: "UnmappedHostError", message: "...", status: 7 }
//! ```
//!
//! so scripts can `try { } catch (err) { if err.kind == ... }`.

use ckb_syscalls::{Status, SysError};
use rhai::{Dynamic, EvalAltResult, Map, ParseError, Position, INT};
use std::str::Utf8Error;
use thiserror::Error;

pub mod kind {
    pub const INDEX_OUT_OF_BOUND: &str = "IndexOutOfBound";
    pub const ITEM_MISSING: &str = "ItemMissing";
    pub const HASH_LENGTH_MISMATCH: &str = "HashLengthMismatch";
    pub const UNMAPPED_HOST_ERROR: &str = "UnmappedHostError";
    pub const ARGUMENT_ERROR: &str = "ArgumentError";

    pub const ALL: &[(&str, &str)] = &[
        ("INDEX_OUT_OF_BOUND", INDEX_OUT_OF_BOUND),
        ("ITEM_MISSING", ITEM_MISSING),
        ("HASH_LENGTH_MISMATCH", HASH_LENGTH_MISMATCH),
        ("UNMAPPED_HOST_ERROR", UNMAPPED_HOST_ERROR),
        ("ARGUMENT_ERROR", ARGUMENT_ERROR),
    ];
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuestError {
    #[error("index out of bound")]
    IndexOutOfBound,
    #[error("item missing")]
    ItemMissing,
    #[error("{what}: expected 32 bytes, host reported {actual}")]
    HashLengthMismatch { what: &'static str, actual: u64 },
    #[error("host returned unmapped status {0}")]
    UnmappedHostError(Status),
    #[error("{0}")]
    Argument(String),
}

impl From<SysError> for GuestError {
    fn from(e: SysError) -> Self {
        match e {
            SysError::IndexOutOfBound => GuestError::IndexOutOfBound,
            SysError::ItemMissing => GuestError::ItemMissing,
            SysError::Unknown(status) => GuestError::UnmappedHostError(status),
        }
    }
}

impl GuestError {
    pub fn kind(&self) -> &'static str {
        match self {
            GuestError::IndexOutOfBound => kind::INDEX_OUT_OF_BOUND,
            GuestError::ItemMissing => kind::ITEM_MISSING,
            GuestError::HashLengthMismatch { .. } => kind::HASH_LENGTH_MISMATCH,
            GuestError::UnmappedHostError(_) => kind::UNMAPPED_HOST_ERROR,
            GuestError::Argument(_) => kind::ARGUMENT_ERROR,
        }
    }

    pub fn to_map(&self) -> Map {
        let mut map = Map::new();
        map.insert("kind".into(), Dynamic::from(self.kind().to_string()));
        map.insert("message".into(), Dynamic::from(self.to_string()));
        if let GuestError::UnmappedHostError(status) = self {
            // statuses beyond INT range keep their bit pattern
            map.insert("status".into(), Dynamic::from(*status as INT));
        }
        map
    }

    /// Raises this error into the interpreter.
    pub fn into_exception(self) -> Box<EvalAltResult> {
        Box::new(EvalAltResult::ErrorRuntime(
            Dynamic::from_map(self.to_map()),
            Position::NONE,
        ))
    }
}

/// Anything that ends guest evaluation abnormally.
#[derive(Error, Debug)]
pub enum Exception {
    #[error("program is not valid UTF-8: {0}")]
    Encoding(#[from] Utf8Error),
    #[error("syntax error: {0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Runtime(#[from] Box<EvalAltResult>),
}

fn innermost(err: &EvalAltResult) -> &EvalAltResult {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => innermost(inner),
        other => other,
    }
}

impl Exception {
    /// The value passed to `throw` (or raised by a binding), if any.
    pub fn thrown(&self) -> Option<&Dynamic> {
        match self {
            Exception::Runtime(err) => match innermost(err) {
                EvalAltResult::ErrorRuntime(value, _) => Some(value),
                _ => None,
            },
            _ => None,
        }
    }

    /// Guest error kind when the exception came from a binding.
    pub fn kind(&self) -> Option<String> {
        let map = self.thrown()?.read_lock::<Map>()?;
        map.get("kind").map(|k| k.to_string())
    }

    /// One-line rendering for the diagnostic channel.
    pub fn inspect(&self) -> String {
        let Exception::Runtime(err) = self else {
            return self.to_string();
        };
        let EvalAltResult::ErrorRuntime(value, pos) = innermost(err) else {
            return err.to_string();
        };
        let body = match value.read_lock::<Map>() {
            Some(map) => match (map.get("kind"), map.get("message")) {
                (Some(kind), Some(message)) => format!("{kind}: {message}"),
                _ => value.to_string(),
            },
            None => format!("uncaught exception: {value}"),
        };
        if pos.is_none() {
            body
        } else {
            format!("{body} ({pos})")
        }
    }
}

/// Process exit status of one harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// The Script could not be loaded; guest code never ran.
    LoadFailed,
    /// Guest evaluation ended with an exception.
    Uncaught,
}

impl ExitStatus {
    pub const fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::LoadFailed => -1,
            ExitStatus::Uncaught => -2,
        }
    }
}
