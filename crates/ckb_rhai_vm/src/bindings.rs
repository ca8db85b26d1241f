//! The `CKB` module seen by guest programs.
//!
//! ```text
//! let r = CKB::CellData(CKB::Source::INPUT, 0);
//! let n = r.internal_read(0);          // probe
//! let head = r.internal_read(8, 0);    // transfer
//! try { CKB::Header(CKB::Source::HEADER_DEP, 3).readall() }
//! catch (err) { if err.kind == CKB::Error::ITEM_MISSING { ... } }
//! CKB::log(`read ${n} bytes`);       // host debug syscall
//! ```
//!
//! `debug` is a Rhai keyword and cannot be a qualified function name, so the
//! host debug syscall is exposed as `CKB::log`.

use crate::error::{kind, GuestError};
use crate::reader::{self, ReadOutcome, Reader, ReaderKind};
use ckb_syscalls::{cell_field, input_field, source, Syscalls};
use rhai::{Blob, Dynamic, Engine, EvalAltResult, Module, INT};
use std::rc::Rc;

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

fn raise<T>(r: Result<T, GuestError>) -> RhaiResult<T> {
    r.map_err(GuestError::into_exception)
}

fn unsigned(what: &str, v: INT) -> Result<u64, GuestError> {
    u64::try_from(v).map_err(|_| GuestError::Argument(format!("{what} must not be negative, got {v}")))
}

fn to_int(n: u64) -> Result<INT, GuestError> {
    INT::try_from(n).map_err(|_| GuestError::Argument(format!("length {n} exceeds integer range")))
}

/// `limit == 0` means unbounded.
fn check_read_size(len: u64, limit: usize) -> Result<(), GuestError> {
    if limit != 0 && len > limit as u64 {
        return Err(GuestError::Argument(format!(
            "read of {len} bytes exceeds the {limit}-byte blob limit"
        )));
    }
    Ok(())
}

fn descriptor(kind: ReaderKind, source: INT, index: INT) -> RhaiResult<Reader> {
    let source = raise(unsigned("source", source))?;
    let index = raise(unsigned("index", index))?;
    Ok(Reader::new(kind, source, index))
}

fn field_kind(make: fn(u64) -> ReaderKind, field: INT) -> RhaiResult<ReaderKind> {
    raise(unsigned("field", field).map(make))
}

fn constants(table: &[(&str, u64)]) -> Module {
    let mut m = Module::new();
    for &(name, value) in table {
        m.set_var(name, value as INT);
    }
    m
}

// ── Module ───────────────────────────────────────────────────────

fn ckb_module(host: &Rc<dyn Syscalls>) -> Module {
    let mut module = Module::new();

    module.set_sub_module("Source", constants(source::ALL));
    module.set_sub_module("CellField", constants(cell_field::ALL));
    module.set_sub_module("InputField", constants(input_field::ALL));
    let mut errors = Module::new();
    for &(name, kind) in kind::ALL {
        errors.set_var(name, kind.to_string());
    }
    module.set_sub_module("Error", errors);

    module.set_native_fn("Cell", |source: INT, index: INT| -> RhaiResult<Reader> {
        descriptor(ReaderKind::Cell, source, index)
    });
    module.set_native_fn("CellData", |source: INT, index: INT| -> RhaiResult<Reader> {
        descriptor(ReaderKind::CellData, source, index)
    });
    module.set_native_fn("Input", |source: INT, index: INT| -> RhaiResult<Reader> {
        descriptor(ReaderKind::Input, source, index)
    });
    module.set_native_fn("Header", |source: INT, index: INT| -> RhaiResult<Reader> {
        descriptor(ReaderKind::Header, source, index)
    });
    module.set_native_fn(
        "CellField",
        |source: INT, index: INT, field: INT| -> RhaiResult<Reader> {
            descriptor(field_kind(ReaderKind::CellField, field)?, source, index)
        },
    );
    module.set_native_fn(
        "InputField",
        |source: INT, index: INT, field: INT| -> RhaiResult<Reader> {
            descriptor(field_kind(ReaderKind::InputField, field)?, source, index)
        },
    );

    let h = host.clone();
    module.set_native_fn("load_tx_hash", move || -> RhaiResult<Blob> {
        raise(reader::load_tx_hash(h.as_ref())).map(|hash| hash.to_vec())
    });
    let h = host.clone();
    module.set_native_fn("load_script_hash", move || -> RhaiResult<Blob> {
        raise(reader::load_script_hash(h.as_ref())).map(|hash| hash.to_vec())
    });
    let h = host.clone();
    module.set_native_fn("log", move |message: Dynamic| -> RhaiResult<()> {
        h.debug(&message.to_string());
        Ok(())
    });

    module
}

// ── Reader methods ───────────────────────────────────────────────

fn internal_read(
    host: &dyn Syscalls,
    r: &Reader,
    len: INT,
    offset: INT,
    limit: usize,
) -> Result<Dynamic, GuestError> {
    let len = unsigned("length", len)?;
    let offset = unsigned("offset", offset)?;
    check_read_size(len, limit)?;
    Ok(match r.internal_read(host, len, offset)? {
        ReadOutcome::Length(n) => Dynamic::from_int(to_int(n)?),
        ReadOutcome::Bytes(b) => Dynamic::from_blob(b),
    })
}

fn read(
    host: &dyn Syscalls,
    r: &Reader,
    offset: INT,
    len: INT,
    limit: usize,
) -> Result<Blob, GuestError> {
    let offset = unsigned("offset", offset)?;
    let len = unsigned("length", len)?;
    check_read_size(len, limit)?;
    r.read(host, offset, len)
}

fn readall(host: &dyn Syscalls, r: &Reader, limit: usize) -> Result<Blob, GuestError> {
    let len = r.length(host)?;
    check_read_size(len, limit)?;
    match len {
        0 => Ok(Blob::new()),
        len => r.read(host, 0, len),
    }
}

fn register_reader(engine: &mut Engine, host: &Rc<dyn Syscalls>, limit: usize) {
    engine
        .register_type_with_name::<Reader>("Reader")
        .register_get("kind", |r: &mut Reader| r.kind.name().to_string())
        .register_get("source", |r: &mut Reader| r.source as INT)
        .register_get("index", |r: &mut Reader| r.index as INT)
        .register_get("field", |r: &mut Reader| {
            r.field().map_or(Dynamic::UNIT, |f| Dynamic::from_int(f as INT))
        })
        .register_fn("to_string", |r: &mut Reader| r.to_string())
        .register_fn("to_debug", |r: &mut Reader| r.to_string());

    let h = host.clone();
    engine.register_fn(
        "internal_read",
        move |r: &mut Reader, len: INT| -> RhaiResult<Dynamic> {
            raise(internal_read(h.as_ref(), r, len, 0, limit))
        },
    );
    let h = host.clone();
    engine.register_fn(
        "internal_read",
        move |r: &mut Reader, len: INT, offset: INT| -> RhaiResult<Dynamic> {
            raise(internal_read(h.as_ref(), r, len, offset, limit))
        },
    );
    let h = host.clone();
    engine.register_fn("length", move |r: &mut Reader| -> RhaiResult<INT> {
        raise(r.length(h.as_ref()).and_then(to_int))
    });
    let h = host.clone();
    engine.register_fn(
        "read",
        move |r: &mut Reader, offset: INT, len: INT| -> RhaiResult<Blob> {
            raise(read(h.as_ref(), r, offset, len, limit))
        },
    );
    let h = host.clone();
    engine.register_fn("readall", move |r: &mut Reader| -> RhaiResult<Blob> {
        raise(readall(h.as_ref(), r, limit))
    });
    let h = host.clone();
    engine.register_fn("exists", move |r: &mut Reader| -> RhaiResult<bool> {
        raise(r.exists(h.as_ref()))
    });
}

/// Installs the `CKB` static module and the `Reader` type.
///
/// `read_limit` caps a single transfer (0 = unbounded); it should match the
/// engine's blob size limit.
pub fn register(engine: &mut Engine, host: Rc<dyn Syscalls>, read_limit: usize) {
    register_reader(engine, &host, read_limit);
    engine.register_static_module("CKB", ckb_module(&host).into());
}
