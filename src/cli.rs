// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `ckernel`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ckernel",
    version,
    about = "Compile and run C sources, streaming their output as it is produced.",
    long_about = None
)]
pub struct CliArgs {
    /// C source files to execute, in order, within one session.
    ///
    /// Use `-` to read a source from standard input.
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Path to the toolchain config file (TOML).
    ///
    /// Default: `Ckernel.toml` in the current working directory; built-in
    /// defaults are used when that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CKERNEL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse directives and print the compiler command, but run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
