//! CKB host syscall ABI as seen by an embedded script.
//!
//! The chain host is abstracted behind [`Syscalls`]; the script side only ever
//! talks to that trait. Two implementations matter:
//! - the real VM host (outside this workspace), and
//! - [`mock::MockHost`], an in-memory transaction used by the runner and tests.
//!
//! Every load follows the same contract: the host copies at most `buf.len()`
//! bytes of the resource starting at `offset` and reports, through
//! [`Reply::len`], the full number of bytes available past `offset`. Passing
//! no buffer asks for the length only.

pub mod error;
pub mod mock;

pub use error::{check, SysError};
pub use mock::{HexBytes, MockCell, MockHost, MockInput, MockSource, MockTransaction};

/// Raw status code returned by every syscall.
pub type Status = u64;

pub const CKB_SUCCESS: Status = 0;
pub const CKB_INDEX_OUT_OF_BOUND: Status = 1;
pub const CKB_ITEM_MISSING: Status = 2;

/// Resource lists a read can target.
pub mod source {
    pub const INPUT: u64 = 1;
    pub const OUTPUT: u64 = 2;
    pub const CELL_DEP: u64 = 3;
    pub const HEADER_DEP: u64 = 4;
    pub const GROUP_INPUT: u64 = 0x0100_0000_0000_0001;
    pub const GROUP_OUTPUT: u64 = 0x0100_0000_0000_0002;

    pub const ALL: &[(&str, u64)] = &[
        ("INPUT", INPUT),
        ("OUTPUT", OUTPUT),
        ("CELL_DEP", CELL_DEP),
        ("HEADER_DEP", HEADER_DEP),
        ("GROUP_INPUT", GROUP_INPUT),
        ("GROUP_OUTPUT", GROUP_OUTPUT),
    ];
}

/// Field selectors for `load_cell_by_field`.
pub mod cell_field {
    pub const CAPACITY: u64 = 0;
    pub const DATA_HASH: u64 = 1;
    pub const LOCK: u64 = 2;
    pub const LOCK_HASH: u64 = 3;
    pub const TYPE: u64 = 4;
    pub const TYPE_HASH: u64 = 5;
    pub const OCCUPIED_CAPACITY: u64 = 6;

    pub const ALL: &[(&str, u64)] = &[
        ("CAPACITY", CAPACITY),
        ("DATA_HASH", DATA_HASH),
        ("LOCK", LOCK),
        ("LOCK_HASH", LOCK_HASH),
        ("TYPE", TYPE),
        ("TYPE_HASH", TYPE_HASH),
        ("OCCUPIED_CAPACITY", OCCUPIED_CAPACITY),
    ];
}

/// Field selectors for `load_input_by_field`.
pub mod input_field {
    pub const OUT_POINT: u64 = 0;
    pub const SINCE: u64 = 1;

    pub const ALL: &[(&str, u64)] = &[("OUT_POINT", OUT_POINT), ("SINCE", SINCE)];
}

/// Outcome of one syscall: status code plus the full length the host has
/// available past the requested offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub len: u64,
}

impl Reply {
    pub const fn ok(len: u64) -> Self {
        Self { status: CKB_SUCCESS, len }
    }

    pub const fn fail(status: Status) -> Self {
        Self { status, len: 0 }
    }

    /// Runs the status through [`check`] and yields the reported length.
    pub fn into_result(self) -> Result<u64, SysError> {
        check(self.status).map(|_| self.len)
    }
}

/// Host interface: the script harness depends only on this trait.
///
/// Index, source and field arguments are passed through opaquely; validating
/// them is the host's job.
pub trait Syscalls {
    fn load_script(&self, buf: &mut [u8], offset: u64) -> Reply;
    fn load_tx_hash(&self, buf: &mut [u8], offset: u64) -> Reply;
    fn load_script_hash(&self, buf: &mut [u8], offset: u64) -> Reply;

    fn load_cell(&self, buf: Option<&mut [u8]>, offset: u64, index: u64, source: u64) -> Reply;
    fn load_cell_data(&self, buf: Option<&mut [u8]>, offset: u64, index: u64, source: u64)
        -> Reply;
    fn load_input(&self, buf: Option<&mut [u8]>, offset: u64, index: u64, source: u64) -> Reply;
    fn load_header(&self, buf: Option<&mut [u8]>, offset: u64, index: u64, source: u64) -> Reply;

    fn load_cell_by_field(
        &self,
        buf: Option<&mut [u8]>,
        offset: u64,
        index: u64,
        source: u64,
        field: u64,
    ) -> Reply;
    fn load_input_by_field(
        &self,
        buf: Option<&mut [u8]>,
        offset: u64,
        index: u64,
        source: u64,
        field: u64,
    ) -> Reply;

    fn debug(&self, message: &str);
}

/// Copies `data[offset..]` into `buf` the way the VM host does: partial
/// copies are fine, the reply always carries the full remaining length.
pub fn store_data(data: &[u8], buf: Option<&mut [u8]>, offset: u64) -> Reply {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let rest = &data[start..];
    if let Some(buf) = buf {
        let n = buf.len().min(rest.len());
        buf[..n].copy_from_slice(&rest[..n]);
    }
    Reply::ok(rest.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_probe_reports_full_length() {
        let r = store_data(b"hello", None, 0);
        assert_eq!(r, Reply::ok(5));
    }

    #[test]
    fn store_partial_copy() {
        let mut buf = [0u8; 3];
        let r = store_data(b"hello", Some(&mut buf), 1);
        assert_eq!(&buf, b"ell");
        assert_eq!(r.len, 4);
    }

    #[test]
    fn store_offset_past_end() {
        let mut buf = [9u8; 2];
        let r = store_data(b"hi", Some(&mut buf), 10);
        assert_eq!(r.len, 0);
        assert_eq!(buf, [9, 9]);
    }

    #[test]
    fn reply_into_result() {
        assert_eq!(Reply::ok(32).into_result(), Ok(32));
        assert_eq!(
            Reply::fail(CKB_ITEM_MISSING).into_result(),
            Err(SysError::ItemMissing)
        );
    }
}
