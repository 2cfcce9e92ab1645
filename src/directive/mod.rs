// src/directive/mod.rs

//! Directives embedded in C source as `//%key: value` comment lines.
//!
//! A source cell can carry its own compile and link flags, text to feed on
//! standard input, expected output, memory hints and test scripts:
//!
//! ```c
//! //%cflags: -Wall -Werror
//! //%ldflags: -lm
//! //%stdin: "5" "3"
//! //%args: "--verbose", foo
//! //%test_script: check.sh
//! #include <stdio.h>
//! ```
//!
//! [`parse`] turns the source text into a [`Directives`] value. Parsing
//! never fails: lines that are not well-formed directives are skipped.

pub mod parser;

pub use parser::{parse, DIRECTIVE_PREFIX};

/// Configuration gathered from the directive lines of one source text.
///
/// Built once per request and not modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// Extra compiler flags, placed after the baseline flags and before the
    /// source file.
    pub compile_flags: Vec<String>,

    /// Extra linker flags, placed after the output file.
    pub link_flags: Vec<String>,

    /// Text written to the program's standard input. Each quoted string of
    /// a `stdin` directive contributes one newline-terminated line.
    pub stdin: String,

    /// Output the program is expected to produce.
    ///
    /// Only echoed as guidance; nothing is compared against it.
    pub expected_stdout: String,

    pub memory_hints: MemoryHints,

    /// Scripts run after the program, each receiving the binary path.
    /// Values are kept exactly as written after the colon.
    pub test_scripts: Vec<String>,

    /// Positional arguments for the compiled program.
    pub program_args: Vec<String>,
}

impl Directives {
    /// Whether any guidance text (input, expected output, memory hints)
    /// should be shown before the program runs.
    pub fn has_guidance(&self) -> bool {
        !self.stdin.is_empty() || !self.expected_stdout.is_empty() || !self.memory_hints.is_empty()
    }
}

/// Human-readable memory hints, one accumulator per directive key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryHints {
    /// From `memtotalnoterm`.
    pub no_terminator: String,
    /// From `memtotal`.
    pub total: String,
    /// From `memaux`.
    pub auxiliary: String,
    /// From `memexpect`.
    pub expected: String,
}

impl MemoryHints {
    pub fn is_empty(&self) -> bool {
        self.no_terminator.is_empty()
            && self.total.is_empty()
            && self.auxiliary.is_empty()
            && self.expected.is_empty()
    }

    /// Non-empty accumulators in display order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.no_terminator.as_str(),
            self.total.as_str(),
            self.auxiliary.as_str(),
            self.expected.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
    }
}
