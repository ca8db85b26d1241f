//! Script table codec.
//!
//! Layout (all numbers u32 little-endian):
//!
//! ```text
//! total_size | off(code_hash) | off(hash_type) | off(args) | code_hash[32] | hash_type[1] | args
//! args = item_count | bytes[item_count]
//! ```
//!
//! Only the Script table is understood here. Unknown trailing fields are
//! rejected (no compatible mode).

use thiserror::Error;

const NUMBER_SIZE: usize = 4;
const FIELD_COUNT: usize = 3;
const HEADER_SIZE: usize = NUMBER_SIZE * (FIELD_COUNT + 1);
pub const CODE_HASH_SIZE: usize = 32;
const HASH_TYPE_SIZE: usize = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("header too short: {len} bytes")]
    HeaderTooShort { len: usize },
    #[error("total size {declared} does not match buffer length {actual}")]
    TotalSizeMismatch { declared: usize, actual: usize },
    #[error("expected 3 fields, found {found}")]
    FieldCount { found: usize },
    #[error("bad field offset {offset}")]
    BadOffset { offset: usize },
    #[error("field {field}: expected {expected} bytes, found {found}")]
    FieldSize {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("args: declared {declared} bytes, segment holds {actual}")]
    BytesLength { declared: usize, actual: usize },
    #[error("script of {len} bytes does not fit a u32 size header")]
    TooLarge { len: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Borrowed, verified view over an encoded Script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptView<'a> {
    pub code_hash: &'a [u8],
    pub hash_type: u8,
    args: &'a [u8],
}

impl<'a> ScriptView<'a> {
    /// Raw bytes of the `args` field, without the length prefix.
    pub fn args(&self) -> &'a [u8] {
        self.args
    }
}

fn read_number(buf: &[u8], at: usize) -> usize {
    let mut n = [0u8; NUMBER_SIZE];
    n.copy_from_slice(&buf[at..at + NUMBER_SIZE]);
    u32::from_le_bytes(n) as usize
}

fn verify_bytes(seg: &[u8]) -> Result<&[u8]> {
    if seg.len() < NUMBER_SIZE {
        return Err(CodecError::HeaderTooShort { len: seg.len() });
    }
    let declared = read_number(seg, 0);
    let actual = seg.len() - NUMBER_SIZE;
    if declared != actual {
        return Err(CodecError::BytesLength { declared, actual });
    }
    Ok(&seg[NUMBER_SIZE..])
}

fn expect_size(field: &'static str, seg: &[u8], expected: usize) -> Result<()> {
    if seg.len() != expected {
        return Err(CodecError::FieldSize {
            field,
            expected,
            found: seg.len(),
        });
    }
    Ok(())
}

/// Structural verification. Nothing is read from `buf` outside this function
/// before it succeeds.
pub fn verify_script(buf: &[u8]) -> Result<ScriptView<'_>> {
    if buf.len() < NUMBER_SIZE {
        return Err(CodecError::HeaderTooShort { len: buf.len() });
    }
    let total = read_number(buf, 0);
    if total != buf.len() {
        return Err(CodecError::TotalSizeMismatch {
            declared: total,
            actual: buf.len(),
        });
    }
    if total == NUMBER_SIZE {
        return Err(CodecError::FieldCount { found: 0 });
    }
    if total < NUMBER_SIZE * 2 {
        return Err(CodecError::HeaderTooShort { len: total });
    }
    let first = read_number(buf, NUMBER_SIZE);
    if first % NUMBER_SIZE != 0 || first < NUMBER_SIZE * 2 {
        return Err(CodecError::BadOffset { offset: first });
    }
    let found = first / NUMBER_SIZE - 1;
    if found != FIELD_COUNT {
        return Err(CodecError::FieldCount { found });
    }
    if total < HEADER_SIZE {
        return Err(CodecError::HeaderTooShort { len: total });
    }

    let mut offsets = [0usize; FIELD_COUNT + 1];
    for (i, slot) in offsets.iter_mut().take(FIELD_COUNT).enumerate() {
        *slot = read_number(buf, NUMBER_SIZE * (i + 1));
    }
    offsets[FIELD_COUNT] = total;
    for pair in offsets.windows(2) {
        if pair[0] > pair[1] {
            return Err(CodecError::BadOffset { offset: pair[0] });
        }
    }

    let code_hash = &buf[offsets[0]..offsets[1]];
    expect_size("code_hash", code_hash, CODE_HASH_SIZE)?;
    let hash_type = &buf[offsets[1]..offsets[2]];
    expect_size("hash_type", hash_type, HASH_TYPE_SIZE)?;
    let args = verify_bytes(&buf[offsets[2]..offsets[3]])?;

    Ok(ScriptView {
        code_hash,
        hash_type: hash_type[0],
        args,
    })
}

/// Verifies `buf` and returns the raw `args` bytes.
pub fn script_args(buf: &[u8]) -> Result<&[u8]> {
    verify_script(buf).map(|v| v.args())
}

/// Encodes a Script table.
pub fn encode_script(
    code_hash: &[u8; CODE_HASH_SIZE],
    hash_type: u8,
    args: &[u8],
) -> Result<Vec<u8>> {
    let code_hash_at = HEADER_SIZE;
    let hash_type_at = code_hash_at + CODE_HASH_SIZE;
    let args_at = hash_type_at + HASH_TYPE_SIZE;
    let total = args_at + NUMBER_SIZE + args.len();
    let total32 = u32::try_from(total).map_err(|_| CodecError::TooLarge { len: total })?;

    let mut out = Vec::with_capacity(total);
    for n in [total32, code_hash_at as u32, hash_type_at as u32, args_at as u32] {
        out.extend_from_slice(&n.to_le_bytes());
    }
    out.extend_from_slice(code_hash);
    out.push(hash_type);
    out.extend_from_slice(&(args.len() as u32).to_le_bytes());
    out.extend_from_slice(args);
    Ok(out)
}
