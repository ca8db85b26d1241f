use ckb_rhai_vm::{Exception, ExitStatus, ScriptVm, VmConfig};
use ckb_script::{encode_script, ARGS_SIZE};
use ckb_syscalls::{
    cell_field, input_field, source, MockCell, MockHost, MockInput, MockTransaction,
};
use rhai::{Blob, Dynamic, Map, INT};
use std::rc::Rc;

fn script(program: &[u8]) -> Vec<u8> {
    encode_script(&[0x5a; 32], 1, program).unwrap()
}

fn fixture() -> MockTransaction {
    MockTransaction::new(script(b""))
        .with_cell(
            source::INPUT,
            MockCell::new(b"input-cell".to_vec())
                .with_data(b"hello world".to_vec())
                .with_field(cell_field::CAPACITY, 6100u64.to_le_bytes().to_vec()),
        )
        .with_cell(source::OUTPUT, MockCell::new(b"output-cell".to_vec()))
        .with_input(
            source::INPUT,
            MockInput::new(vec![0x11u8; 44]).with_field(input_field::SINCE, vec![0u8; 8]),
        )
        .with_header(source::HEADER_DEP, None)
        .with_header(source::HEADER_DEP, Some(vec![0x22u8; 208]))
}

fn vm(tx: MockTransaction) -> (ScriptVm, Rc<MockHost>) {
    let host = Rc::new(MockHost::new(tx));
    (ScriptVm::new(VmConfig::default(), host.clone()), host)
}

fn eval(program: &str) -> Dynamic {
    let (vm, _) = vm(fixture());
    vm.evaluate(program.as_bytes()).unwrap()
}

fn eval_err(tx: MockTransaction, program: &str) -> Exception {
    let (vm, _) = vm(tx);
    vm.evaluate(program.as_bytes()).unwrap_err()
}

/// Runs `program` and returns the value caught by the surrounding `try`.
fn caught(tx: MockTransaction, program: &str) -> Map {
    let wrapped = format!("let caught = (); try {{ {program}; }} catch (e) {{ caught = e; }} caught");
    let (vm, _) = vm(tx);
    vm.evaluate(wrapped.as_bytes())
        .unwrap()
        .try_cast::<Map>()
        .expect("nothing was thrown")
}

fn kind_of(map: &Map) -> String {
    map.get("kind").unwrap().to_string()
}

// ── Harness scenarios ────────────────────────────────────────────

#[test]
fn noop_program_exits_zero() {
    let (vm, host) = vm(MockTransaction::new(script(b"")));
    assert_eq!(vm.run(), ExitStatus::Success);
    assert_eq!(vm.run().code(), 0);
    assert!(host.debug_messages().is_empty());
}

#[test]
fn uncaught_throw_exits_minus_two() {
    let (vm, _) = vm(MockTransaction::new(script(b"throw \"boom\";")));
    assert_eq!(vm.run().code(), -2);
}

#[test]
fn four_byte_script_exits_minus_one() {
    // any guest code would fail loudly if it ran
    let (vm, host) = vm(MockTransaction::new(vec![0x01, 0x02, 0x03, 0x04]));
    assert_eq!(vm.run(), ExitStatus::LoadFailed);
    assert_eq!(vm.run().code(), -1);
    assert!(host.debug_messages().is_empty());
}

#[test]
fn oversize_args_exit_minus_one() {
    let mut program = b"print(\"ran\");".to_vec();
    program.resize(ARGS_SIZE + 1, b' ');
    let (vm, host) = vm(MockTransaction::new(script(&program)));
    // default buffer cannot even hold the Script
    assert_eq!(vm.run(), ExitStatus::LoadFailed);
    // a larger buffer still enforces the args bound
    assert_eq!(vm.run_with::<65536>(ARGS_SIZE), ExitStatus::LoadFailed);
    assert!(host.debug_messages().is_empty());
    // and with the bound lifted the program is fine
    assert_eq!(vm.run_with::<65536>(ARGS_SIZE + 1), ExitStatus::Success);
    assert_eq!(host.debug_messages(), vec!["ran"]);
}

#[test]
fn non_utf8_and_syntax_errors_are_uncaught() {
    let (bad_utf8, _) = vm(MockTransaction::new(script(&[0xff, 0xfe])));
    assert_eq!(bad_utf8.run(), ExitStatus::Uncaught);
    let (bad_syntax, _) = vm(MockTransaction::new(script(b"let = ;")));
    assert_eq!(bad_syntax.run(), ExitStatus::Uncaught);

    assert!(matches!(eval_err(fixture(), "let = ;"), Exception::Parse(_)));
}

#[test]
fn uncaught_guest_error_is_inspectable() {
    let exc = eval_err(fixture(), "CKB::Cell(CKB::Source::INPUT, 99).length()");
    assert_eq!(exc.kind().as_deref(), Some("IndexOutOfBound"));
    assert!(exc.inspect().starts_with("IndexOutOfBound: index out of bound"));
}

// ── Reader behaviour ─────────────────────────────────────────────

#[test]
fn probe_returns_full_length_every_time() {
    let v = eval(
        "let r = CKB::CellData(CKB::Source::INPUT, 0);
         [r.internal_read(0), r.internal_read(0), r.length()]",
    );
    let lens: Vec<INT> = v
        .into_array()
        .unwrap()
        .into_iter()
        .map(|x| x.as_int().unwrap())
        .collect();
    assert_eq!(lens, vec![11, 11, 11]);
}

#[test]
fn transfer_returns_bytes_at_offset() {
    let v = eval("CKB::CellData(CKB::Source::INPUT, 0).internal_read(5, 6)");
    assert_eq!(v.cast::<Blob>(), b"world".to_vec());
    let v = eval("CKB::CellData(CKB::Source::INPUT, 0).read(0, 5)");
    assert_eq!(v.cast::<Blob>(), b"hello".to_vec());
    let v = eval("CKB::CellData(CKB::Source::INPUT, 0).internal_read(3)");
    assert_eq!(v.cast::<Blob>(), b"hel".to_vec());
}

#[test]
fn readall_per_kind() {
    assert_eq!(
        eval("CKB::Cell(CKB::Source::OUTPUT, 0).readall()").cast::<Blob>(),
        b"output-cell".to_vec()
    );
    assert_eq!(
        eval("CKB::Input(CKB::Source::INPUT, 0).readall()").cast::<Blob>(),
        vec![0x11u8; 44]
    );
    assert_eq!(
        eval("CKB::Header(CKB::Source::HEADER_DEP, 1).readall()")
            .cast::<Blob>()
            .len(),
        208
    );
    assert_eq!(
        eval("CKB::CellField(CKB::Source::INPUT, 0, CKB::CellField::CAPACITY).readall()")
            .cast::<Blob>(),
        6100u64.to_le_bytes().to_vec()
    );
    assert_eq!(
        eval("CKB::InputField(CKB::Source::INPUT, 0, CKB::InputField::SINCE).length()")
            .as_int()
            .unwrap(),
        8
    );
}

#[test]
fn exists_answers_absence() {
    let v = eval(
        "[CKB::Cell(CKB::Source::INPUT, 0).exists(),
          CKB::Cell(CKB::Source::INPUT, 7).exists(),
          CKB::Header(CKB::Source::HEADER_DEP, 0).exists(),
          CKB::Header(CKB::Source::HEADER_DEP, 1).exists()]",
    );
    let flags: Vec<bool> = v
        .into_array()
        .unwrap()
        .into_iter()
        .map(|x| x.as_bool().unwrap())
        .collect();
    assert_eq!(flags, vec![true, false, false, true]);
}

#[test]
fn reader_properties() {
    let v = eval(
        "let r = CKB::CellField(CKB::Source::GROUP_INPUT, 2, CKB::CellField::LOCK_HASH);
         `${r.kind}/${r.source}/${r.index}/${r.field}`",
    );
    assert_eq!(
        v.to_string(),
        format!("CellField/{}/2/3", source::GROUP_INPUT)
    );
    assert!(eval("CKB::Cell(CKB::Source::INPUT, 0).field").is_unit());
}

// ── Guest errors ─────────────────────────────────────────────────

#[test]
fn index_out_of_bound_is_catchable() {
    let e = caught(fixture(), "CKB::Cell(CKB::Source::OUTPUT, 5).readall()");
    assert_eq!(kind_of(&e), "IndexOutOfBound");
}

#[test]
fn item_missing_is_catchable() {
    let e = caught(fixture(), "CKB::Header(CKB::Source::HEADER_DEP, 0).length()");
    assert_eq!(kind_of(&e), "ItemMissing");
    let e = caught(
        fixture(),
        "CKB::CellField(CKB::Source::INPUT, 0, CKB::CellField::TYPE).readall()",
    );
    assert_eq!(kind_of(&e), "ItemMissing");
}

#[test]
fn error_kinds_are_exposed_as_constants() {
    let v = eval(
        "let hit = false;
         try { CKB::Header(CKB::Source::HEADER_DEP, 0).length(); }
         catch (e) { hit = e.kind == CKB::Error::ITEM_MISSING; }
         hit",
    );
    assert!(v.as_bool().unwrap());
}

#[test]
fn unmapped_status_raises() {
    let host = Rc::new(MockHost::new(fixture()).with_fault(7));
    let vm = ScriptVm::new(VmConfig::default(), host);
    let v = vm
        .evaluate(
            b"let c = (); try { CKB::Cell(CKB::Source::INPUT, 0).length(); } catch (e) { c = e; } c",
        )
        .unwrap()
        .try_cast::<Map>()
        .unwrap();
    assert_eq!(kind_of(&v), "UnmappedHostError");
    assert_eq!(v.get("status").unwrap().as_int().unwrap(), 7);
}

#[test]
fn negative_arguments_raise_argument_error() {
    let e = caught(fixture(), "CKB::Cell(CKB::Source::INPUT, -1)");
    assert_eq!(kind_of(&e), "ArgumentError");
    let e = caught(fixture(), "CKB::CellData(CKB::Source::INPUT, 0).read(-4, 2)");
    assert_eq!(kind_of(&e), "ArgumentError");
}

#[test]
fn reads_beyond_blob_limit_are_refused() {
    let host = Rc::new(MockHost::new(fixture()));
    let cfg = VmConfig {
        max_array_size: 4,
        ..VmConfig::default()
    };
    let vm = ScriptVm::new(cfg, host);
    let exc = vm
        .evaluate(b"CKB::CellData(CKB::Source::INPUT, 0).readall()")
        .unwrap_err();
    assert_eq!(exc.kind().as_deref(), Some("ArgumentError"));
}

#[test]
fn unbounded_huge_read_raises_argument_error() {
    let host = Rc::new(MockHost::new(fixture()));
    let cfg = VmConfig {
        max_array_size: 0,
        ..VmConfig::default()
    };
    let vm = ScriptVm::new(cfg, host);
    let v = vm
        .evaluate(
            b"let c = (); try { CKB::CellData(CKB::Source::INPUT, 0).internal_read(9223372036854775807); } catch (e) { c = e; } c",
        )
        .unwrap()
        .try_cast::<Map>()
        .unwrap();
    assert_eq!(kind_of(&v), "ArgumentError");
}

// ── Hashes and debug ─────────────────────────────────────────────

#[test]
fn hashes_are_32_bytes() {
    let v = eval("[CKB::load_tx_hash().len(), CKB::load_script_hash().len()]");
    let lens: Vec<INT> = v
        .into_array()
        .unwrap()
        .into_iter()
        .map(|x| x.as_int().unwrap())
        .collect();
    assert_eq!(lens, vec![32, 32]);

    let hash = eval("CKB::load_script_hash()").cast::<Blob>();
    assert_eq!(hash, blake3::hash(&script(b"")).as_bytes().to_vec());
}

#[test]
fn short_hash_raises() {
    let mut tx = fixture();
    tx.script_hash = Some(vec![0u8; 31].into());
    let e = caught(tx, "CKB::load_script_hash()");
    assert_eq!(kind_of(&e), "HashLengthMismatch");
}

#[test]
fn debug_reaches_host() {
    let (vm, host) = vm(fixture());
    let _ = vm
        .evaluate(b"CKB::log(\"checkpoint\"); CKB::log(42); print(\"done\"); debug(\"raw\");")
        .unwrap();
    assert_eq!(host.debug_messages(), vec!["checkpoint", "42", "done", "raw"]);
}
