use crate::{Status, CKB_INDEX_OUT_OF_BOUND, CKB_ITEM_MISSING, CKB_SUCCESS};
use thiserror::Error;

/// Host-facing syscall error space.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysError {
    #[error("index out of bound")]
    IndexOutOfBound,
    #[error("item missing")]
    ItemMissing,
    /// Any non-success status without a dedicated mapping.
    #[error("unknown syscall status {0}")]
    Unknown(Status),
}

impl SysError {
    pub fn status(&self) -> Status {
        match self {
            SysError::IndexOutOfBound => CKB_INDEX_OUT_OF_BOUND,
            SysError::ItemMissing => CKB_ITEM_MISSING,
            SysError::Unknown(code) => *code,
        }
    }
}

/// Decodes a raw syscall status.
#[inline]
pub fn check(status: Status) -> Result<(), SysError> {
    match status {
        CKB_SUCCESS => Ok(()),
        CKB_INDEX_OUT_OF_BOUND => Err(SysError::IndexOutOfBound),
        CKB_ITEM_MISSING => Err(SysError::ItemMissing),
        other => Err(SysError::Unknown(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_passes() {
        assert_eq!(check(0), Ok(()));
    }

    #[test]
    fn known_codes_map() {
        assert_eq!(check(1), Err(SysError::IndexOutOfBound));
        assert_eq!(check(2), Err(SysError::ItemMissing));
    }

    #[test]
    fn unknown_codes_are_not_success() {
        assert_eq!(check(3), Err(SysError::Unknown(3)));
        assert_eq!(check(u64::MAX), Err(SysError::Unknown(u64::MAX)));
        assert_eq!(SysError::Unknown(42).status(), 42);
    }
}
