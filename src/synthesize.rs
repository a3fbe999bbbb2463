//! Lays entries out as an indentation-based document, streamed through [`std::io::Read`].

use std::{
    cmp::Ordering,
    collections::HashSet,
    fmt::Write as _,
    io::{self, Read},
};

use crate::{Entry, Segment};

/// Sorts `entries`, drops all but the last of each identical path and returns a reader
/// that renders them line by line.
pub fn synthesize(entries: Vec<Entry>) -> DocumentReader {
    DocumentReader::new(entries)
}

/// Lazily renders a document from entries.
///
/// Each entry becomes one line per path prefix not yet written, followed by its value
/// line. Mapping keys are written as `"key":`, list positions as `-`, and the value as
/// `"key": value` or `- value`, indented two spaces per level.
pub struct DocumentReader {
    entries: std::vec::IntoIter<Entry>,
    written: HashSet<Vec<Segment>>,
    buffer: Vec<u8>,
    position: usize,
}

impl DocumentReader {
    fn new(mut entries: Vec<Entry>) -> Self {
        // Stable, so equal paths keep command-line order and the last one survives below.
        entries.sort_by(|a, b| compare_paths(&a.path, &b.path));
        let mut deduped: Vec<Entry> = Vec::with_capacity(entries.len());
        for entry in entries {
            match deduped.last_mut() {
                Some(last) if compare_paths(&last.path, &entry.path) == Ordering::Equal => {
                    *last = entry
                }
                _ => deduped.push(entry),
            }
        }

        Self {
            entries: deduped.into_iter(),
            written: HashSet::new(),
            buffer: Vec::new(),
            position: 0,
        }
    }

    /// Renders the next entry into the buffer. Returns `false` once entries run out.
    fn fill(&mut self) -> bool {
        let Some(entry) = self.entries.next() else {
            return false;
        };

        self.buffer.clear();
        self.position = 0;
        let Some(last) = entry.path.len().checked_sub(1) else {
            log::debug!("Skipping entry without a path");
            return true;
        };

        let mut text = String::new();
        for (depth, segment) in entry.path.iter().enumerate() {
            let indent = "  ".repeat(depth);
            if depth == last {
                let value = quote(&entry.value);
                let _ = match segment {
                    s if s.is_index() => write!(text, "{indent}- {value}"),
                    s => write!(text, "{indent}{}: {value}", quote_key(s.text())),
                };
                if let Some(comment) = &entry.comment {
                    let comment = comment.replace(['\n', '\r'], " ");
                    let _ = write!(text, " # {comment}");
                }
                text.push('\n');
                break;
            }

            if !self.written.insert(entry.path[..=depth].to_vec()) {
                continue;
            }
            let _ = if segment.is_index() {
                writeln!(text, "{indent}-")
            } else {
                writeln!(text, "{indent}{}:", quote_key(segment.text()))
            };
        }

        log::trace!("Synthesized {}", text.trim_end());
        self.buffer = text.into_bytes();
        true
    }

    /// Renders everything that is left into a string.
    pub fn into_string(mut self) -> String {
        let mut out = String::from_utf8_lossy(&self.buffer[self.position..]).into_owned();
        while self.fill() {
            out.push_str(&String::from_utf8_lossy(&self.buffer));
        }
        out
    }
}

impl Read for DocumentReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.position >= self.buffer.len() {
            if !self.fill() {
                return Ok(0);
            }
        }

        let remaining = &self.buffer[self.position..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        Ok(count)
    }
}

/// Orders paths segment by segment, comparing index brackets numerically.
pub(crate) fn compare_paths(a: &[Segment], b: &[Segment]) -> Ordering {
    for (left, right) in a.iter().zip(b) {
        let ordering = match (left.is_index(), right.is_index()) {
            (true, true) => compare_numeric(left.text(), right.text()),
            _ => left.to_string().cmp(&right.to_string()),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Words YAML would read as something other than a string.
const RESERVED: &[&str] = &["true", "false", "null", "yes", "no", "on", "off", "y", "n"];

/// Digits of the longest integer written bare; longer ones may not fit a YAML integer.
const MAX_BARE_DIGITS: usize = 18;

/// Text that YAML reads back unchanged: a word starting with a letter or `_` made of
/// `[A-Za-z0-9_-]`, or a canonical integer. Reserved words are plain only in their
/// lower-case `true`/`false`/`null` spelling.
fn is_plain(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return false;
    };

    if first.is_ascii_alphabetic() || first == '_' {
        let word = text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        let reserved = RESERVED.iter().any(|r| r.eq_ignore_ascii_case(text));
        return word && (!reserved || matches!(text, "true" | "false" | "null"));
    }

    let digits = text.strip_prefix('-').unwrap_or(text);
    text == "0"
        || (digits.len() <= MAX_BARE_DIGITS
            && digits.starts_with(|c: char| ('1'..='9').contains(&c))
            && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Writes `value` bare when it is plain text and double-quoted otherwise.
pub(crate) fn quote(value: &str) -> String {
    if is_plain(value) {
        value.to_string()
    } else {
        quote_key(value)
    }
}

/// Always double-quotes, escaping quotes, backslashes and control characters.
pub(crate) fn quote_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 2);
    out.push('"');
    for c in key.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
