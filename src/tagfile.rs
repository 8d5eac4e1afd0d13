//! Reader for RFC-822-style tag files (`Packages`, `Translation-*`).
//!
//! Records are separated by blank lines; fields look like `Key: value`, and
//! continuation lines starting with whitespace extend the previous field. A
//! continuation line consisting of a single `.` marks a paragraph break and
//! is preserved verbatim in the stored value.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use anyhow::Result;

use crate::fetcher::open_compressed;
use crate::utils;

/// Single-pass, forward-only reader over the sections of a tag file.
///
/// The first section is available immediately after construction; call
/// [`TagFileReader::next_section`] to advance. Malformed lines are skipped
/// with a warning and never abort parsing.
pub struct TagFileReader {
    lines: std::io::Lines<Box<dyn BufRead>>,
    section: HashMap<String, String>,
    exhausted: bool,
}

impl TagFileReader {
    /// Open a tag file, decompressing by extension when needed.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_reader(open_compressed(path)?))
    }

    pub fn from_reader(reader: Box<dyn BufRead>) -> Self {
        let mut tf = Self {
            lines: reader.lines(),
            section: HashMap::new(),
            exhausted: false,
        };
        tf.advance();
        tf
    }

    /// Value of a field in the current section.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.section.get(name).map(String::as_str)
    }

    /// Move to the next section. Returns false once the input is exhausted;
    /// the current section is cleared in that case.
    pub fn next_section(&mut self) -> bool {
        if self.exhausted {
            self.section.clear();
            return false;
        }
        self.advance()
    }

    /// Read fields until a blank line or end of input. Returns whether any
    /// content line was consumed.
    fn advance(&mut self) -> bool {
        self.section.clear();
        let mut last_key: Option<String> = None;
        let mut seen_content = false;

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => {
                    utils::warn(&format!("read error in tag file: {err}"));
                    self.exhausted = true;
                    break;
                }
                None => {
                    self.exhausted = true;
                    break;
                }
            };

            if line.trim().is_empty() {
                if seen_content {
                    break;
                }
                // Tolerate leading blank lines before a section.
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                let value = last_key.as_ref().and_then(|key| self.section.get_mut(key));
                let Some(value) = value else {
                    utils::warn(&format!("continuation line without a field: {line:?}"));
                    continue;
                };
                value.push('\n');
                value.push_str(line.trim());
                seen_content = true;
            } else if let Some((key, value)) = line.split_once(':') {
                let key = key.trim().to_string();
                self.section.insert(key.clone(), value.trim().to_string());
                last_key = Some(key);
                seen_content = true;
            } else {
                utils::warn(&format!("malformed tag file line skipped: {line:?}"));
            }
        }

        seen_content
    }
}
