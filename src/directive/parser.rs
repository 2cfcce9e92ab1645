// src/directive/parser.rs

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::Directives;

/// Marker a line must start with to be read as a directive.
pub const DIRECTIVE_PREFIX: &str = "//%";

/// Quoted strings in `stdin` / `stdout` values.
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s*"([^"]*)""#).expect("valid quoted-string regex"));

/// Arguments in `args` values: runs of characters other than whitespace,
/// commas and quotes, or quoted segments (which may contain `\"`).
static ARGUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:[^\s,"]|"(?:\\.|[^"])*")+"#).expect("valid argument regex")
});

/// Parse every directive line of `source` into a [`Directives`] value.
///
/// Lines are considered in order; each recognised directive appends to the
/// matching field. A directive line whose remainder does not contain
/// exactly one `:` is ignored, as are unknown keys.
pub fn parse(source: &str) -> Directives {
    let mut directives = Directives::default();

    for line in source.lines() {
        let Some(rest) = line.strip_prefix(DIRECTIVE_PREFIX) else {
            continue;
        };

        let Some((key, value)) = split_key_value(rest) else {
            trace!(line, "ignoring directive without exactly one ':'");
            continue;
        };

        apply(&mut directives, &key.trim().to_lowercase(), value);
    }

    directives
}

/// Split `key: value`, rejecting remainders with zero or several colons.
fn split_key_value(rest: &str) -> Option<(&str, &str)> {
    let (key, value) = rest.split_once(':')?;
    if value.contains(':') {
        return None;
    }
    Some((key, value))
}

fn apply(directives: &mut Directives, key: &str, value: &str) {
    match key {
        "cflags" => directives
            .compile_flags
            .extend(value.split_whitespace().map(str::to_string)),
        "ldflags" => directives
            .link_flags
            .extend(value.split_whitespace().map(str::to_string)),
        "stdin" => push_quoted_lines(&mut directives.stdin, value),
        "stdout" => push_quoted_lines(&mut directives.expected_stdout, value),
        "test_script" => directives.test_scripts.push(value.to_string()),
        "memtotalnoterm" => directives.memory_hints.no_terminator.push_str(&format!(
            "If you only allocated {value} bytes, you have likely left off space for string termination.\n"
        )),
        "memtotal" => directives.memory_hints.total.push_str(&format!(
            "If you only allocated {value} bytes, you may not have allocated space for the array, \
             which may or may not be what you wanted to do.\n"
        )),
        "memaux" => directives.memory_hints.auxiliary.push_str(&format!(
            "If you only allocated {value} bytes, you may not have allocated space for each string \
             in the array, only the pointers to each string.\n"
        )),
        "memexpect" => directives.memory_hints.expected.push_str(&format!(
            "You should expect to use about {value} bytes, you can use valgrind and gdb to check \
             that you've got this right in next week's workshop.\n"
        )),
        "args" => directives.program_args.extend(split_arguments(value)),
        other => trace!(key = other, "ignoring unknown directive"),
    }
}

fn push_quoted_lines(target: &mut String, value: &str) {
    for caps in QUOTED.captures_iter(value) {
        target.push_str(&caps[1]);
        target.push('\n');
    }
}

/// Tokenize an `args` value.
///
/// Separators are whitespace and commas outside quotes. Surrounding quote
/// characters are stripped from each token; anything inside is kept as
/// written, including `\"`.
pub fn split_arguments(value: &str) -> Vec<String> {
    ARGUMENT
        .find_iter(value)
        .map(|m| m.as_str().trim_matches('"').to_string())
        .collect()
}
