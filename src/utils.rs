//! Common utility functions shared across the codebase.

use colored::Colorize;

/// Escape a string for embedding in XML/HTML text content.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Print a non-fatal diagnostic to stderr.
///
/// Used for conditions that degrade the result (a skipped package, a
/// malformed index record) without stopping the run.
pub fn warn(msg: &str) {
    eprintln!("{} {}", "warning:".bold().yellow(), msg);
}

/// Print an error diagnostic to stderr without aborting the pipeline.
pub fn error(msg: &str) {
    eprintln!("{} {}", "error:".bold().red(), msg);
}
