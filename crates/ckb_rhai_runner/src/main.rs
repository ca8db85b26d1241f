use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use tracing::Level;

mod commands;

/// Exit codes outside the script's own 0 / -1 / -2 contract.
const EXIT_INPUT: i32 = 2;

#[derive(Parser)]
#[command(name = "ckb-rhai", version, about = "Run Rhai programs as CKB scripts against a mock transaction")]
struct Cli {
    /// Log level for stderr output (error, warn, info, debug, trace)
    #[arg(long, env = "CKB_RHAI_LOG", default_value = "info", global = true)]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

/// Interpreter limits; flags override the config file.
#[derive(Args, Debug, Default)]
pub struct Limits {
    /// JSON file with VM limits
    #[arg(long, env = "CKB_RHAI_CONFIG")]
    config: Option<PathBuf>,
    /// Maximum interpreter operations (0 = unlimited)
    #[arg(long, env = "CKB_RHAI_FUEL_LIMIT")]
    fuel_limit: Option<u64>,
    #[arg(long, env = "CKB_RHAI_MAX_CALL_LEVELS")]
    max_call_levels: Option<usize>,
    #[arg(long, env = "CKB_RHAI_MAX_EXPR_DEPTH")]
    max_expr_depth: Option<usize>,
    #[arg(long, env = "CKB_RHAI_MAX_STRING_SIZE")]
    max_string_size: Option<usize>,
    /// Also bounds blobs and single host reads
    #[arg(long, env = "CKB_RHAI_MAX_ARRAY_SIZE")]
    max_array_size: Option<usize>,
    #[arg(long, env = "CKB_RHAI_MAX_MAP_SIZE")]
    max_map_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the script of a transaction fixture
    Run {
        /// Path to the transaction fixture JSON
        tx: PathBuf,
        /// Rhai program to pack into the fixture's Script
        #[arg(long)]
        program: Option<PathBuf>,
        #[command(flatten)]
        limits: Limits,
    },
    /// Encode a Rhai program as a Script binary
    Pack {
        /// Path to the Rhai program
        program: PathBuf,
        /// Output file (prints hex when absent)
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// 32-byte code hash as hex
        #[arg(long)]
        code_hash: Option<String>,
        #[arg(long, default_value_t = 1)]
        hash_type: u8,
    },
    /// Verify a Script binary the way the loader does
    Check {
        /// Path to the Script binary
        script: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let result = match cli.command {
        Commands::Run {
            tx,
            program,
            limits,
        } => commands::run(&tx, program.as_deref(), &limits),
        Commands::Pack {
            program,
            out,
            code_hash,
            hash_type,
        } => commands::pack(&program, out.as_deref(), code_hash.as_deref(), hash_type).map(|_| 0),
        Commands::Check { script } => commands::check(&script),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            process::exit(EXIT_INPUT);
        }
    }
}
