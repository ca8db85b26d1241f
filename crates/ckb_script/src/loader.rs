//! Fail-fast Script loader.
//!
//! Invariants enforced before any guest code exists:
//! - the encoded Script fits the fixed buffer (`SCRIPT_SIZE`)
//! - the encoding verifies as a Script table
//! - the `args` program fits `ARGS_SIZE`

use crate::codec::{verify_script, CodecError, CODE_HASH_SIZE};
use ckb_syscalls::{SysError, Syscalls};
use std::fmt;
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, warn};

pub const SCRIPT_SIZE: usize = 32768;
pub const ARGS_SIZE: usize = 32768;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("load_script: {0}")]
    Syscall(#[from] SysError),
    #[error("script is {len} bytes, buffer holds {capacity}")]
    ScriptTooLarge { len: u64, capacity: usize },
    #[error("malformed script: {0}")]
    MalformedScript(#[from] CodecError),
    #[error("args are {len} bytes, limit is {limit}")]
    ArgsTooLarge { len: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, LoadError>;

/// A verified Script held in its fixed-capacity load buffer.
pub struct Script<const CAP: usize = SCRIPT_SIZE> {
    buf: [u8; CAP],
    len: usize,
    args: Range<usize>,
    code_hash: [u8; CODE_HASH_SIZE],
    hash_type: u8,
}

impl<const CAP: usize> Script<CAP> {
    /// The encoded Script exactly as the host supplied it.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The guest program carried in `args`.
    pub fn args(&self) -> &[u8] {
        &self.buf[self.args.clone()]
    }

    pub fn code_hash(&self) -> &[u8; CODE_HASH_SIZE] {
        &self.code_hash
    }

    pub fn hash_type(&self) -> u8 {
        self.hash_type
    }
}

impl<const CAP: usize> fmt::Debug for Script<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("len", &self.len)
            .field("args_len", &self.args.len())
            .field("hash_type", &self.hash_type)
            .finish()
    }
}

/// Loads the current Script with the default bounds.
pub fn load_and_verify<H: Syscalls + ?Sized>(host: &H) -> Result<Script> {
    load_and_verify_with::<SCRIPT_SIZE, H>(host, ARGS_SIZE)
}

/// Loads the current Script into a `CAP`-byte buffer, accepting at most
/// `max_args` bytes of program.
pub fn load_and_verify_with<const CAP: usize, H: Syscalls + ?Sized>(
    host: &H,
    max_args: usize,
) -> Result<Script<CAP>> {
    let mut buf = [0u8; CAP];
    let len = host.load_script(&mut buf, 0).into_result()?;
    if len > CAP as u64 {
        warn!(len, capacity = CAP, "script exceeds load buffer");
        return Err(LoadError::ScriptTooLarge { len, capacity: CAP });
    }
    let len = len as usize;

    let (args_len, code_hash, hash_type) = {
        let view = verify_script(&buf[..len]).map_err(|e| {
            warn!(error = %e, "script failed verification");
            e
        })?;
        let mut code_hash = [0u8; CODE_HASH_SIZE];
        code_hash.copy_from_slice(view.code_hash);
        (view.args().len(), code_hash, view.hash_type)
    };
    if args_len > max_args {
        warn!(args_len, limit = max_args, "script args exceed limit");
        return Err(LoadError::ArgsTooLarge {
            len: args_len,
            limit: max_args,
        });
    }

    debug!(script_len = len, args_len, "script loaded");
    Ok(Script {
        buf,
        len,
        // args is the last field, so it ends where the Script ends
        args: len - args_len..len,
        code_hash,
        hash_type,
    })
}
