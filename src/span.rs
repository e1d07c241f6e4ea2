//! Spans over raw markup text and the read-only snapshot abstraction
//!
//! All offsets are byte offsets into the UTF-8 source. Line numbers handed to
//! callers are 1-based, matching the diagnostics the rest of the crate emits.

use serde::{Deserialize, Serialize};
use std::fmt;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// A `(start, length)` region of source text
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Span {
    pub start: usize,
    pub length: usize,
}

impl Span {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Build a span from a half-open `[start, end)` range
    pub fn from_range(start: usize, end: usize) -> Self {
        Self {
            start,
            length: end.saturating_sub(start),
        }
    }

    /// Exclusive end offset
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether `offset` falls inside the half-open range
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }

    /// Whether `other` lies entirely within this span
    pub fn encloses(&self, other: &Span) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Move the span by `delta` bytes
    pub fn shifted(&self, delta: usize) -> Self {
        Self {
            start: self.start + delta,
            length: self.length,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end())
    }
}

/// Read access to a document snapshot
pub trait TextSnapshot {
    /// Full text of the snapshot
    fn text(&self) -> &str;

    /// Text covered by `span`, or `None` when the span is out of bounds
    fn substring(&self, span: Span) -> Option<&str> {
        self.text().get(span.start..span.end())
    }

    /// 1-based line number containing `offset` and the offset that line starts at
    fn line_from_offset(&self, offset: usize) -> (usize, usize);
}

/// An immutable text snapshot with a precomputed line index
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line and column for `offset`
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let (line, start) = self.line_from_offset(offset);
        (line, offset.saturating_sub(start) + 1)
    }

    /// Text of a 1-based line without its terminator
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.text.len());
        self.text
            .get(start..end)
            .map(|l| l.trim_end_matches(['\n', '\r']))
    }

    /// Leading whitespace of the line containing `offset`
    pub fn line_padding(&self, offset: usize) -> &str {
        let (_, start) = self.line_from_offset(offset);
        leading_whitespace(&self.text[start..])
    }
}

impl TextSnapshot for SourceText {
    fn text(&self) -> &str {
        &self.text
    }

    fn line_from_offset(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self
            .line_starts
            .get(line.saturating_sub(1))
            .copied()
            .unwrap_or(0);
        (line.max(1), start)
    }
}

/// The run of spaces and tabs at the start of `line`
pub fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// Line terminator used by `text` (CRLF if any CRLF is present)
pub fn newline_for(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Whether `offset` lies inside a `<!-- ... -->` comment
///
/// An unterminated comment extends to the end of the text.
pub fn in_comment(text: &str, offset: usize) -> bool {
    let Some(before) = text.get(..offset.min(text.len())) else {
        return false;
    };

    match before.rfind(COMMENT_OPEN) {
        // A close between the opener and `offset` means the comment already ended
        Some(open) => !before[open + COMMENT_OPEN.len()..].contains(COMMENT_CLOSE),
        None => false,
    }
}

/// Every comment span in `text`, in order
pub fn comment_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find(COMMENT_OPEN) {
        let start = pos + found;
        let body = start + COMMENT_OPEN.len();
        let end = match text[body..].find(COMMENT_CLOSE) {
            Some(close) => body + close + COMMENT_CLOSE.len(),
            None => text.len(),
        };
        spans.push(Span::from_range(start, end));
        pos = end;
    }

    spans
}

/// Whether the markup element in `text` is written as a self-closing tag
pub fn is_self_closing(text: &str) -> bool {
    match tag_end(text, 0) {
        Some(end) => text[..end].trim_end().ends_with('/'),
        None => false,
    }
}

/// Offset of the `>` that closes the tag opened at `start`, honouring quoted values
pub fn tag_end(text: &str, start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;

    for (i, b) in text.as_bytes().iter().enumerate().skip(start) {
        match (quote, *b) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(*b),
            (None, b'>') => return Some(i),
            (None, _) => {}
        }
    }

    None
}
