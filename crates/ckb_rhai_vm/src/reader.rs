//! Reader descriptors over transaction resources.
//!
//! A [`Reader`] names one resource, `(kind, source, index[, field])`, and
//! never caches anything: every call goes back to the host. Reads come in
//! two phases:
//!
//! - probe: no buffer, offset 0; answers the full length
//! - transfer: a buffer of the requested size at `offset`; answers the bytes

use crate::error::GuestError;
use ckb_syscalls::{Reply, Syscalls};
use std::fmt;
use tracing::debug;

pub const HASH_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderKind {
    Cell,
    CellData,
    Input,
    Header,
    CellField(u64),
    InputField(u64),
}

impl ReaderKind {
    pub fn name(self) -> &'static str {
        match self {
            ReaderKind::Cell => "Cell",
            ReaderKind::CellData => "CellData",
            ReaderKind::Input => "Input",
            ReaderKind::Header => "Header",
            ReaderKind::CellField(_) => "CellField",
            ReaderKind::InputField(_) => "InputField",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reader {
    pub kind: ReaderKind,
    pub source: u64,
    pub index: u64,
}

/// Result of [`Reader::internal_read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Length(u64),
    Bytes(Vec<u8>),
}

impl Reader {
    pub fn new(kind: ReaderKind, source: u64, index: u64) -> Self {
        Self {
            kind,
            source,
            index,
        }
    }

    pub fn field(&self) -> Option<u64> {
        match self.kind {
            ReaderKind::CellField(f) | ReaderKind::InputField(f) => Some(f),
            _ => None,
        }
    }

    fn query(&self, host: &dyn Syscalls, buf: Option<&mut [u8]>, offset: u64) -> Reply {
        let (index, source) = (self.index, self.source);
        match self.kind {
            ReaderKind::Cell => host.load_cell(buf, offset, index, source),
            ReaderKind::CellData => host.load_cell_data(buf, offset, index, source),
            ReaderKind::Input => host.load_input(buf, offset, index, source),
            ReaderKind::Header => host.load_header(buf, offset, index, source),
            ReaderKind::CellField(field) => {
                host.load_cell_by_field(buf, offset, index, source, field)
            }
            ReaderKind::InputField(field) => {
                host.load_input_by_field(buf, offset, index, source, field)
            }
        }
    }

    /// Probe when `len == 0`, transfer otherwise.
    pub fn internal_read(
        &self,
        host: &dyn Syscalls,
        len: u64,
        offset: u64,
    ) -> Result<ReadOutcome, GuestError> {
        if len == 0 {
            self.length(host).map(ReadOutcome::Length)
        } else {
            self.read(host, offset, len).map(ReadOutcome::Bytes)
        }
    }

    pub fn length(&self, host: &dyn Syscalls) -> Result<u64, GuestError> {
        let len = self.query(host, None, 0).into_result()?;
        debug!(reader = %self, len, "probe");
        Ok(len)
    }

    /// Transfers up to `len` bytes starting at `offset`.
    ///
    /// The result is cut to what the host actually has past `offset`, so it
    /// may be shorter than `len`.
    pub fn read(&self, host: &dyn Syscalls, offset: u64, len: u64) -> Result<Vec<u8>, GuestError> {
        let cap = usize::try_from(len)
            .map_err(|_| GuestError::Argument(format!("read length {len} is too large")))?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(cap)
            .map_err(|_| GuestError::Argument(format!("cannot allocate {len} bytes for read")))?;
        buf.resize(cap, 0);
        let available = self.query(host, Some(&mut buf), offset).into_result()?;
        buf.truncate(cap.min(usize::try_from(available).unwrap_or(usize::MAX)));
        debug!(reader = %self, offset, requested = len, available, "transfer");
        Ok(buf)
    }

    pub fn readall(&self, host: &dyn Syscalls) -> Result<Vec<u8>, GuestError> {
        match self.length(host)? {
            0 => Ok(Vec::new()),
            len => self.read(host, 0, len),
        }
    }

    /// `false` when the host says the resource is absent; other errors raise.
    pub fn exists(&self, host: &dyn Syscalls) -> Result<bool, GuestError> {
        match self.length(host) {
            Ok(_) => Ok(true),
            Err(GuestError::IndexOutOfBound | GuestError::ItemMissing) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl fmt::Display for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(source={:#x}, index={}",
            self.kind.name(),
            self.source,
            self.index
        )?;
        if let Some(field) = self.field() {
            write!(f, ", field={field}")?;
        }
        f.write_str(")")
    }
}

// ── Hash loads ───────────────────────────────────────────────────

fn load_hash(
    what: &'static str,
    load: impl FnOnce(&mut [u8]) -> Reply,
) -> Result<[u8; HASH_SIZE], GuestError> {
    let mut hash = [0u8; HASH_SIZE];
    let len = load(&mut hash).into_result()?;
    if len != HASH_SIZE as u64 {
        return Err(GuestError::HashLengthMismatch { what, actual: len });
    }
    Ok(hash)
}

pub fn load_tx_hash(host: &dyn Syscalls) -> Result<[u8; HASH_SIZE], GuestError> {
    load_hash("tx hash", |buf| host.load_tx_hash(buf, 0))
}

pub fn load_script_hash(host: &dyn Syscalls) -> Result<[u8; HASH_SIZE], GuestError> {
    load_hash("script hash", |buf| host.load_script_hash(buf, 0))
}
