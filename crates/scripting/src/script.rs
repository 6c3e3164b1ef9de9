//! Script source
//!
//! Scripts are kept as text and executed through a cursor; there is no
//! parse tree. Loading only indexes where event handlers (`on <event>`)
//! and labels (`>>name`) start so that dispatch and jumps do not rescan
//! the text.

use crate::error::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Byte separating words (newlines end statements and are handled apart)
pub(crate) fn is_separator(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'(' | b')' | b',')
}

/// A loaded script
#[derive(Debug, Clone)]
pub struct Script {
    /// Script name (usually the file name)
    name: String,

    text: String,

    /// Handler name -> position after `on <name>`
    events: HashMap<String, usize>,

    /// Label name -> position after `>>name`
    labels: HashMap<String, usize>,
}

impl Script {
    /// Create a script from source text
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        let text = text.into();
        let (events, labels) = index(&name, &text);
        Self {
            name,
            text,
            events,
            labels,
        }
    }

    /// Create a script from Latin-1 encoded bytes
    ///
    /// Local variable sigils `§` and `£` are single bytes (0xA7, 0xA3) in
    /// script files.
    pub fn from_latin1(name: impl Into<String>, bytes: &[u8]) -> Self {
        let text: String = bytes.iter().map(|&b| b as char).collect();
        Self::new(name, text)
    }

    /// Load a Latin-1 script file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_latin1(name, &bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Position right after the `on <event>` header
    pub fn find_event(&self, event: &str) -> Option<usize> {
        self.events.get(&event.to_lowercase()).copied()
    }

    /// Position right after the `>>label` marker
    pub fn find_label(&self, label: &str) -> Option<usize> {
        let label = label.strip_prefix(">>").unwrap_or(label);
        self.labels.get(&label.to_lowercase()).copied()
    }

    /// Names of all event handlers
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }
}

/// Byte range of the next word on a line, starting at `pos`
fn next_word(line: &[u8], mut pos: usize) -> Option<(usize, usize)> {
    while pos < line.len() && is_separator(line[pos]) {
        pos += 1;
    }
    let start = pos;
    while pos < line.len() && !is_separator(line[pos]) {
        pos += 1;
    }
    (pos > start).then_some((start, pos))
}

fn index(name: &str, text: &str) -> (HashMap<String, usize>, HashMap<String, usize>) {
    let mut events = HashMap::new();
    let mut labels = HashMap::new();
    let mut depth: i64 = 0;
    let mut line_start = 0;

    for line in text.split('\n') {
        let bytes = line.as_bytes();

        if let Some((start, end)) = next_word(bytes, 0) {
            let first = &line[start..end];
            if let Some(label) = first.strip_prefix(">>") {
                let label = label.to_lowercase();
                if labels.contains_key(&label) {
                    tracing::warn!(script = name, "duplicate label \">>{}\"", label);
                } else {
                    labels.insert(label, line_start + end);
                }
            } else if first.eq_ignore_ascii_case("on") {
                if let Some((start, end)) = next_word(bytes, end) {
                    let event = line[start..end].to_lowercase();
                    events.entry(event).or_insert(line_start + end);
                }
            }
        }

        // Brace balance is only checked to warn early; execution tolerates it
        let code = line.split("//").next().unwrap_or("");
        depth += code.matches('{').count() as i64;
        depth -= code.matches('}').count() as i64;

        line_start += line.len() + 1;
    }

    if depth != 0 {
        tracing::warn!(script = name, "unbalanced braces ({:+})", depth);
    }

    (events, labels)
}
