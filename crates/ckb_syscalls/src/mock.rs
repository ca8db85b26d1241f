//! In-memory host backed by a JSON transaction fixture.
//!
//! Deterministic, no filesystem: everything the script can observe lives in
//! [`MockTransaction`]. Bytes are written as hex strings (`0x` prefix optional).

use crate::{store_data, Reply, Status, Syscalls, CKB_INDEX_OUT_OF_BOUND, CKB_ITEM_MISSING};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::Deref;

// ── Hex-encoded bytes ────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl Deref for HexBytes {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<&[u8]> for HexBytes {
    fn from(v: &[u8]) -> Self {
        Self(v.to_vec())
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(digits)
            .map(HexBytes)
            .map_err(|e| serde::de::Error::custom(format!("hex: {e}")))
    }
}

// ── Fixture model ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockCell {
    /// Serialized cell output
    pub cell: HexBytes,
    #[serde(default)]
    pub data: HexBytes,
    /// Field selector -> serialized field
    #[serde(default)]
    pub fields: BTreeMap<u64, HexBytes>,
}

impl MockCell {
    pub fn new(cell: impl Into<Vec<u8>>) -> Self {
        Self {
            cell: HexBytes(cell.into()),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = HexBytes(data.into());
        self
    }

    pub fn with_field(mut self, field: u64, bytes: impl Into<Vec<u8>>) -> Self {
        self.fields.insert(field, HexBytes(bytes.into()));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockInput {
    /// Serialized cell input
    pub input: HexBytes,
    #[serde(default)]
    pub fields: BTreeMap<u64, HexBytes>,
}

impl MockInput {
    pub fn new(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: HexBytes(input.into()),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: u64, bytes: impl Into<Vec<u8>>) -> Self {
        self.fields.insert(field, HexBytes(bytes.into()));
        self
    }
}

/// Everything addressable under one source tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockSource {
    #[serde(default)]
    pub cells: Vec<MockCell>,
    #[serde(default)]
    pub inputs: Vec<MockInput>,
    /// `null` entries model a header that is not loaded for that index
    #[serde(default)]
    pub headers: Vec<Option<HexBytes>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockTransaction {
    /// Encoded Script handed to `load_script`
    #[serde(default)]
    pub script: HexBytes,
    /// Derived with BLAKE3 over the fixture when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<HexBytes>,
    /// Derived with BLAKE3 over `script` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_hash: Option<HexBytes>,
    /// Source tag -> resources
    #[serde(default)]
    pub sources: BTreeMap<u64, MockSource>,
}

impl MockTransaction {
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        Self {
            script: HexBytes(script.into()),
            ..Default::default()
        }
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn with_cell(mut self, source: u64, cell: MockCell) -> Self {
        self.sources.entry(source).or_default().cells.push(cell);
        self
    }

    pub fn with_input(mut self, source: u64, input: MockInput) -> Self {
        self.sources.entry(source).or_default().inputs.push(input);
        self
    }

    pub fn with_header(mut self, source: u64, header: Option<Vec<u8>>) -> Self {
        self.sources
            .entry(source)
            .or_default()
            .headers
            .push(header.map(HexBytes));
        self
    }

    pub fn tx_hash(&self) -> Vec<u8> {
        if let Some(h) = &self.tx_hash {
            return h.0.clone();
        }
        let unhashed = Self {
            tx_hash: None,
            ..self.clone()
        };
        let bytes = serde_json::to_vec(&unhashed).unwrap_or_default();
        blake3::hash(&bytes).as_bytes().to_vec()
    }

    pub fn script_hash(&self) -> Vec<u8> {
        match &self.script_hash {
            Some(h) => h.0.clone(),
            None => blake3::hash(&self.script).as_bytes().to_vec(),
        }
    }
}

// ── Host ─────────────────────────────────────────────────────────

pub struct MockHost {
    tx: MockTransaction,
    tx_hash: Vec<u8>,
    script_hash: Vec<u8>,
    fault: Option<Status>,
    debug_log: RefCell<Vec<String>>,
}

impl MockHost {
    pub fn new(tx: MockTransaction) -> Self {
        let tx_hash = tx.tx_hash();
        let script_hash = tx.script_hash();
        Self {
            tx,
            tx_hash,
            script_hash,
            fault: None,
            debug_log: RefCell::new(Vec::new()),
        }
    }

    /// Makes every resource query (not the script or hash loads) answer
    /// with `status`.
    pub fn with_fault(mut self, status: Status) -> Self {
        self.fault = Some(status);
        self
    }

    pub fn transaction(&self) -> &MockTransaction {
        &self.tx
    }

    /// Messages received through the `debug` syscall, oldest first.
    pub fn debug_messages(&self) -> Vec<String> {
        self.debug_log.borrow().clone()
    }

    fn lookup<'a, T>(
        &'a self,
        index: u64,
        source: u64,
        pick: impl FnOnce(&'a MockSource) -> &'a [T],
    ) -> Result<&'a T, Reply> {
        if let Some(status) = self.fault {
            return Err(Reply::fail(status));
        }
        let idx = usize::try_from(index).map_err(|_| Reply::fail(CKB_INDEX_OUT_OF_BOUND))?;
        self.tx
            .sources
            .get(&source)
            .and_then(|s| pick(s).get(idx))
            .ok_or(Reply::fail(CKB_INDEX_OUT_OF_BOUND))
    }
}

fn field_or_missing(fields: &BTreeMap<u64, HexBytes>, field: u64) -> Result<&[u8], Reply> {
    fields
        .get(&field)
        .map(|b| &b.0[..])
        .ok_or(Reply::fail(CKB_ITEM_MISSING))
}

impl Syscalls for MockHost {
    fn load_script(&self, buf: &mut [u8], offset: u64) -> Reply {
        store_data(&self.tx.script, Some(buf), offset)
    }

    fn load_tx_hash(&self, buf: &mut [u8], offset: u64) -> Reply {
        store_data(&self.tx_hash, Some(buf), offset)
    }

    fn load_script_hash(&self, buf: &mut [u8], offset: u64) -> Reply {
        store_data(&self.script_hash, Some(buf), offset)
    }

    fn load_cell(&self, buf: Option<&mut [u8]>, offset: u64, index: u64, source: u64) -> Reply {
        match self.lookup(index, source, |s| s.cells.as_slice()) {
            Ok(c) => store_data(&c.cell, buf, offset),
            Err(r) => r,
        }
    }

    fn load_cell_data(
        &self,
        buf: Option<&mut [u8]>,
        offset: u64,
        index: u64,
        source: u64,
    ) -> Reply {
        match self.lookup(index, source, |s| s.cells.as_slice()) {
            Ok(c) => store_data(&c.data, buf, offset),
            Err(r) => r,
        }
    }

    fn load_input(&self, buf: Option<&mut [u8]>, offset: u64, index: u64, source: u64) -> Reply {
        match self.lookup(index, source, |s| s.inputs.as_slice()) {
            Ok(i) => store_data(&i.input, buf, offset),
            Err(r) => r,
        }
    }

    fn load_header(&self, buf: Option<&mut [u8]>, offset: u64, index: u64, source: u64) -> Reply {
        match self.lookup(index, source, |s| s.headers.as_slice()) {
            Ok(Some(h)) => store_data(h, buf, offset),
            Ok(None) => Reply::fail(CKB_ITEM_MISSING),
            Err(r) => r,
        }
    }

    fn load_cell_by_field(
        &self,
        buf: Option<&mut [u8]>,
        offset: u64,
        index: u64,
        source: u64,
        field: u64,
    ) -> Reply {
        let bytes = self
            .lookup(index, source, |s| s.cells.as_slice())
            .and_then(|c| field_or_missing(&c.fields, field));
        match bytes {
            Ok(b) => store_data(b, buf, offset),
            Err(r) => r,
        }
    }

    fn load_input_by_field(
        &self,
        buf: Option<&mut [u8]>,
        offset: u64,
        index: u64,
        source: u64,
        field: u64,
    ) -> Reply {
        let bytes = self
            .lookup(index, source, |s| s.inputs.as_slice())
            .and_then(|i| field_or_missing(&i.fields, field));
        match bytes {
            Ok(b) => store_data(b, buf, offset),
            Err(r) => r,
        }
    }

    fn debug(&self, message: &str) {
        tracing::info!(target: "ckb_debug", "{message}");
        self.debug_log.borrow_mut().push(message.to_string());
    }
}
