//! imgfuse compiler CLI.
//!
//! Provides the `imgfuse` binary with a `compile` subcommand that reads an
//! op-list JSON document and emits a fused C/CUDA preprocessing kernel.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use imgfuse_codegen::Target;

/// imgfuse kernel fuser and compiler.
#[derive(Parser)]
#[command(name = "imgfuse", about = "Fuses an image preprocessing op list into a single C/CUDA kernel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compile an op-list JSON document into a translation unit.
    Compile {
        /// Path to the op-list JSON document.
        #[arg(long)]
        ops: PathBuf,

        /// Compilation target.
        #[arg(long, default_value = "cpu")]
        target: String,

        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// CUDA thread block side length (ignored for `cpu`).
        #[arg(long, default_value_t = 16)]
        block_size: u32,

        /// Source image height/width/channel shape, e.g. "224,224,3".
        #[arg(long, default_value = "224,224,3")]
        input_shape: String,

        /// Raise logging to debug.
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            ops,
            target,
            out,
            block_size,
            input_shape,
            verbose,
        } => {
            init_tracing(verbose);
            let exit_code = run_compile(&ops, &target, out.as_deref(), block_size, &input_shape);
            process::exit(exit_code);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn parse_target(s: &str) -> Result<Target, String> {
    match s {
        "cpu" => Ok(Target::Cpu),
        "cuda" => Ok(Target::Cuda),
        other => Err(format!("invalid target '{other}', expected cpu/cuda")),
    }
}

fn parse_input_shape(s: &str) -> Result<Vec<u32>, String> {
    s.split(',')
        .map(|part| part.trim().parse::<u32>().map_err(|e| format!("invalid input shape '{s}': {e}")))
        .collect()
}

fn input_tensor(shape: &[u32]) -> std::rc::Rc<imgfuse_ir::TensorVar> {
    use imgfuse_ir::builders::const_i32;
    std::rc::Rc::new(imgfuse_ir::TensorVar {
        name: "input".into(),
        shape: shape.iter().map(|&d| const_i32(d as i32)).collect(),
        element_type: imgfuse_ir::ScalarType::UInt8,
    })
}

/// Executes the compile subcommand.
///
/// Exit codes: 0 = success, 1 = compile error, 3 = I/O error.
fn run_compile(ops_path: &PathBuf, target_str: &str, out: Option<&std::path::Path>, block_size: u32, input_shape: &str) -> i32 {
    let target = match parse_target(target_str) {
        Ok(t) => t,
        Err(msg) => {
            eprintln!("Error: {msg}");
            return 1;
        }
    };

    let shape = match parse_input_shape(input_shape) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Error: {msg}");
            return 1;
        }
    };

    let json = match fs::read_to_string(ops_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {e}", ops_path.display());
            return 3;
        }
    };

    let op_list = match imgfuse_lower::parse_op_list(&json) {
        Ok(ops) => ops,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let program = match imgfuse_lower::assemble(input_tensor(&shape), &op_list) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let source = match imgfuse_codegen::compile(&program, target, block_size) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    match out {
        Some(path) => match fs::write(path, source) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Error: failed to write '{}': {e}", path.display());
                3
            }
        },
        None => {
            println!("{source}");
            0
        }
    }
}
