use crate::Limits;
use anyhow::{bail, Context, Result};
use ckb_rhai_vm::{ScriptVm, VmConfig};
use ckb_script::{encode_script, load_and_verify, verify_script};
use ckb_syscalls::{MockHost, MockTransaction};
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tracing::info;

const DEFAULT_HASH_TYPE: u8 = 1;

// ── config ──────────────────────────────────────────────────────

pub fn vm_config(limits: &Limits) -> Result<VmConfig> {
    let mut cfg = match &limits.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parse config {}", path.display()))?
        }
        None => VmConfig::default(),
    };
    if let Some(v) = limits.fuel_limit {
        cfg.fuel_limit = v;
    }
    if let Some(v) = limits.max_call_levels {
        cfg.max_call_levels = v;
    }
    if let Some(v) = limits.max_expr_depth {
        cfg.max_expr_depth = v;
    }
    if let Some(v) = limits.max_string_size {
        cfg.max_string_size = v;
    }
    if let Some(v) = limits.max_array_size {
        cfg.max_array_size = v;
    }
    if let Some(v) = limits.max_map_size {
        cfg.max_map_size = v;
    }
    Ok(cfg)
}

fn parse_code_hash(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str.strip_prefix("0x").unwrap_or(hex_str))
        .context("parse code hash")?;
    match <[u8; 32]>::try_from(bytes.as_slice()) {
        Ok(hash) => Ok(hash),
        Err(_) => bail!("code hash must be 32 bytes, got {}", bytes.len()),
    }
}

// ── run ─────────────────────────────────────────────────────────

/// Swaps the fixture's Script for one carrying `program`, keeping its
/// code hash and hash type when the old Script verifies.
fn repack(tx: &mut MockTransaction, program: &[u8]) -> Result<()> {
    let (code_hash, hash_type) = match verify_script(&tx.script) {
        Ok(view) => {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(view.code_hash);
            (hash, view.hash_type)
        }
        Err(_) => ([0u8; 32], DEFAULT_HASH_TYPE),
    };
    tx.script = encode_script(&code_hash, hash_type, program)
        .context("encode script")?
        .into();
    Ok(())
}

pub fn run(tx_path: &Path, program: Option<&Path>, limits: &Limits) -> Result<i32> {
    let text = fs::read_to_string(tx_path)
        .with_context(|| format!("read fixture {}", tx_path.display()))?;
    let mut tx = MockTransaction::from_json(&text)
        .with_context(|| format!("parse fixture {}", tx_path.display()))?;
    if let Some(path) = program {
        let source = fs::read(path).with_context(|| format!("read program {}", path.display()))?;
        repack(&mut tx, &source)?;
    }
    let cfg = vm_config(limits)?;
    info!(fuel_limit = cfg.fuel_limit, "starting script");

    let host = Rc::new(MockHost::new(tx));
    let status = ScriptVm::new(cfg, host).run();
    let code = status.code();
    let badge = match code {
        0 => "OK".green().bold(),
        _ => format!("{status:?}").as_str().red().bold(),
    };
    eprintln!("{} {} (exit {})", "script:".dimmed(), badge, code);
    Ok(code)
}

// ── pack ────────────────────────────────────────────────────────

pub fn pack(program: &Path, out: Option<&Path>, code_hash: Option<&str>, hash_type: u8) -> Result<()> {
    let source = fs::read(program).with_context(|| format!("read program {}", program.display()))?;
    let code_hash = match code_hash {
        Some(h) => parse_code_hash(h)?,
        None => [0u8; 32],
    };
    let bytes = encode_script(&code_hash, hash_type, &source).context("encode script")?;
    match out {
        Some(path) => {
            fs::write(path, &bytes).with_context(|| format!("write {}", path.display()))?;
            eprintln!(
                "{} {} ({} bytes)",
                "wrote".green(),
                path.display(),
                bytes.len()
            );
        }
        None => println!("0x{}", hex::encode(&bytes)),
    }
    Ok(())
}

// ── check ───────────────────────────────────────────────────────

pub fn check(script: &Path) -> Result<i32> {
    let bytes = fs::read(script).with_context(|| format!("read script {}", script.display()))?;
    let host = MockHost::new(MockTransaction::new(bytes));
    match load_and_verify(&host) {
        Ok(script) => {
            println!("{} {}", "Size:     ".dimmed(), script.as_bytes().len());
            println!("{} {}", "Args:     ".dimmed(), script.args().len());
            println!("{} {}", "HashType: ".dimmed(), script.hash_type());
            println!(
                "{} 0x{}",
                "CodeHash: ".dimmed(),
                hex::encode(script.code_hash()).as_str().cyan()
            );
            println!("{}", "valid".green().bold());
            Ok(0)
        }
        Err(e) => {
            println!("{} {}", "invalid:".red().bold(), e);
            Ok(ckb_rhai_vm::ExitStatus::LoadFailed.code())
        }
    }
}
