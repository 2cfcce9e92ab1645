// src/lib.rs

pub mod cli;
pub mod config;
pub mod directive;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate, load_or_default, KernelConfig};
use crate::directive::Directives;
use crate::engine::{compile_args, Session};
use crate::exec::ConsoleSink;

/// High-level entry point used by `main.rs`.
///
/// Loads the toolchain config, then executes every source in one session
/// and shuts the session down, removing its temp files. Program failures
/// only show up as text on stderr; an `Err` here means the backend failed.
pub async fn run(args: CliArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_and_validate(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => load_or_default(default_config_path())?,
    };

    if args.dry_run {
        for path in &args.sources {
            let source = read_source(path)?;
            print_dry_run(&config, path, &directive::parse(&source));
        }
        return Ok(());
    }

    let mut session = Session::new(config);
    let mut sink = ConsoleSink;

    let mut outcome = Ok(());
    for path in &args.sources {
        let source = match read_source(path) {
            Ok(source) => source,
            Err(e) => {
                outcome = Err(e);
                break;
            }
        };
        info!(source = %path.display(), "executing source");
        if let Err(e) = session
            .execute(&source, &mut sink)
            .await
            .with_context(|| format!("executing {}", path.display()))
        {
            outcome = Err(e);
            break;
        }
    }

    let shutdown = session.shutdown().context("cleaning up temp files");
    outcome.and(shutdown)
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("reading source from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Print parsed directives and the compiler invocation for one source.
fn print_dry_run(config: &KernelConfig, path: &Path, directives: &Directives) {
    let dir = config.temp_dir();
    let source = dir.join("<source>.c");
    let binary = dir.join("<binary>.out");

    println!("ckernel dry-run: {}", path.display());
    println!(
        "  compile: {} {}",
        config.toolchain.compiler,
        compile_args(config, directives, &source, &binary).join(" ")
    );
    if !directives.program_args.is_empty() {
        println!("  args: {:?}", directives.program_args);
    }
    if !directives.stdin.is_empty() {
        println!("  stdin: {:?}", directives.stdin);
    }
    if !directives.expected_stdout.is_empty() {
        println!("  expected stdout: {:?}", directives.expected_stdout);
    }
    for hint in directives.memory_hints.iter() {
        print!("  hint: {hint}");
    }
    for script in &directives.test_scripts {
        println!("  test_script: {}", script.trim());
    }
}
