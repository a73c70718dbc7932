//! Engine log parsing.
//!
//! Two things are pulled out of a failing engine log: the names of packages or
//! classes the engine could not find, and `-file-line-error` style
//! `file:line: message` diagnostics.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// ``File `foo.sty' not found`` as printed by LaTeX for a missing package or
/// class.
static MISSING_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"File `([^'`\s]+)\.(sty|cls)' not found").expect("valid missing-file pattern")
});

/// Column at which TeX breaks terminal and log lines (`max_print_line`).
const MAX_PRINT_LINE: usize = 79;

/// `./main.tex:12: Undefined control sequence.`
static FILE_LINE_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:\./)?([^:\r\n]+\.[A-Za-z]+):(\d+): (.+?)\r?$")
        .expect("valid file-line-error pattern")
});

/// A `file:line: message` diagnostic from the engine log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogDiagnostic {
    /// File the engine was reading, relative to the workspace.
    pub file: String,

    /// Line number (1-indexed)
    pub line: usize,

    /// Message as printed by the engine.
    pub message: String,
}

/// Extract missing package/class names from an engine log.
///
/// Names keep their case, lose their `.sty`/`.cls` suffix, and appear once
/// each in first-seen order.
pub fn missing_dependencies(log: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let log = unwrap_lines(log);

    for captures in MISSING_FILE.captures_iter(&log) {
        let name = &captures[1];
        if !names.iter().any(|seen| seen == name) {
            names.push(name.to_string());
        }
    }

    names
}

/// Join lines TeX broke at [`MAX_PRINT_LINE`] back onto their continuation.
///
/// A line that is exactly that wide is taken to continue on the next one.
fn unwrap_lines(log: &str) -> Cow<'_, str> {
    let is_full =
        |line: &str| line.len() == MAX_PRINT_LINE || line.chars().count() == MAX_PRINT_LINE;
    if !log.lines().any(is_full) {
        return Cow::Borrowed(log);
    }

    let mut joined = String::with_capacity(log.len());
    for line in log.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        if is_full(content) {
            joined.push_str(content);
        } else {
            joined.push_str(line);
        }
    }
    Cow::Owned(joined)
}

/// Extract `file:line: message` diagnostics from an engine log.
pub fn parse_diagnostics(log: &str) -> Vec<LogDiagnostic> {
    FILE_LINE_ERROR
        .captures_iter(log)
        .filter_map(|captures| {
            let line = match captures[2].parse::<usize>() {
                Ok(line) => line,
                Err(e) => {
                    tracing::debug!("Skipping diagnostic with bad line number: {}", e);
                    return None;
                }
            };
            Some(LogDiagnostic {
                file: captures[1].to_string(),
                line,
                message: captures[3].trim().to_string(),
            })
        })
        .collect()
}
