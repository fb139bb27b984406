//! Debug CLI: runs guard → validate → transform → pretty-print against a
//! named module-level function in a `.py` file, with no Python runtime
//! involved. Exists so the core engine's behavior can be inspected and
//! scripted without building the PyO3 extension.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rustpython_ast::Stmt;
use rustpython_parser::{parse, Mode};
use tco_core::Config;

#[derive(Parser)]
#[command(
    name = "tco-dev",
    about = "Validate and pretty-print a tail-call rewrite without a Python runtime"
)]
struct Cli {
    /// Path to a .py source file containing the target function at module scope.
    file: PathBuf,

    /// Name of the function to validate and rewrite.
    function: String,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Include reconstructed source in NOT_TAIL_RECURSIVE diagnostics.
    #[arg(long)]
    verbose_errors: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_source =
        fs::read_to_string(&cli.file).with_context(|| format!("reading {}", cli.file.display()))?;
    let function_source = extract_function_source(&file_source, &cli.function)?;

    let config = Config::new().with_verbose_errors(cli.verbose_errors);
    match tco_core::decorate(&function_source, &cli.function, "optimize", &config) {
        Ok(decorated) => {
            println!("{}", decorated.pretty_print());
            Ok(())
        }
        Err(err) => bail!("{}: {err}", err.kind()),
    }
}

fn extract_function_source(file_source: &str, function: &str) -> Result<String> {
    let module = parse(file_source, Mode::Module, "<tco-dev>").context("parsing input file")?;
    let body = module.module().context("expected a module")?.body;

    for stmt in &body {
        let (name, range) = match stmt {
            Stmt::FunctionDef(f) => (f.name.as_str(), f.range),
            Stmt::AsyncFunctionDef(f) => (f.name.as_str(), f.range),
            _ => continue,
        };
        if name == function {
            let start: usize = range.start().into();
            let end: usize = range.end().into();
            return Ok(file_source[start..end].to_string());
        }
    }

    bail!("no top-level function named `{function}` in the input file")
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "tco=info",
        1 => "tco=debug",
        _ => "tco=trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .try_init();
}
