//! Exclusion regions: nested same-type elements and comments
//!
//! Textual matching inside an element must not see text that belongs to a
//! nested element of the same type (it has its own coordinate space) or text
//! that is commented out. An [`ExclusionMap`] records those regions as
//! inclusive `start -> end` offsets relative to the text it was built from.

use crate::span::{comment_spans, tag_end, Span};
use std::collections::BTreeMap;

/// Inclusive `[start, end]` regions that find/replace must skip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionMap {
    regions: BTreeMap<usize, usize>,
}

impl ExclusionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a region; an existing region with the same start keeps the larger end
    pub fn insert(&mut self, start: usize, end: usize) {
        let entry = self.regions.entry(start).or_insert(end);
        if end > *entry {
            *entry = end;
        }
    }

    /// Whether `offset` falls within any region (ends inclusive)
    pub fn contains(&self, offset: usize) -> bool {
        self.regions
            .range(..=offset)
            .any(|(_, &end)| offset <= end)
    }

    /// Whether any part of `span` is excluded
    pub fn intersects(&self, span: Span) -> bool {
        if span.is_empty() {
            return self.contains(span.start);
        }
        self.regions
            .range(..span.end())
            .any(|(_, &end)| end >= span.start)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.regions.iter().map(|(&s, &e)| (s, e))
    }

    /// Account for an edit at `at` that changed the text length by `delta`
    ///
    /// Regions starting after the edit move; a region containing it grows or shrinks.
    pub fn shift(&mut self, at: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        let moved = |v: usize| v.saturating_add_signed(delta);
        self.regions = self
            .regions
            .iter()
            .map(|(&start, &end)| {
                if start > at {
                    (moved(start), moved(end))
                } else if end >= at {
                    (start, moved(end).max(start))
                } else {
                    (start, end)
                }
            })
            .collect();
    }

    /// The same regions offset by `base`, for moving between local and absolute coordinates
    pub fn offset_by(&self, base: usize) -> Self {
        Self {
            regions: self.iter().map(|(s, e)| (s + base, e + base)).collect(),
        }
    }
}

impl FromIterator<(usize, usize)> for ExclusionMap {
    fn from_iter<T: IntoIterator<Item = (usize, usize)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (start, end) in iter {
            map.insert(start, end);
        }
        map
    }
}

#[derive(Debug, Clone, Copy)]
enum TagEvent {
    Open { at: usize },
    Close { at: usize },
}

/// Exclusion regions for the element in `text` whose tag name is `own_tag`
///
/// Every comment is excluded, as is every element named `own_tag` nested
/// inside the outer element (balanced by open/close scanning, self-closing
/// tags counted as complete).
pub fn exclusions(text: &str, own_tag: &str) -> ExclusionMap {
    let comments = comment_spans(text);
    let mut map: ExclusionMap = comments
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| (c.start, c.end() - 1))
        .collect();

    let in_comment = |offset: usize| comments.iter().any(|c| c.contains(offset));
    let own_start = text.len() - text.trim_start().len();

    let open = format!("<{}", own_tag);
    let close = format!("</{}", own_tag);

    let events: Vec<TagEvent> = text
        .match_indices('<')
        .map(|(i, _)| i)
        .filter(|&i| !in_comment(i))
        .filter_map(|i| {
            let rest = &text[i..];
            if has_tag_prefix(rest, &close) {
                Some(TagEvent::Close { at: i })
            } else if has_tag_prefix(rest, &open) {
                Some(TagEvent::Open { at: i })
            } else {
                None
            }
        })
        .collect();

    let last = text.len().saturating_sub(1);
    let mut depth = 0usize;
    let mut nested_start = 0usize;

    for event in events {
        match event {
            TagEvent::Open { at } if at == own_start => {}
            TagEvent::Open { at } => {
                let gt = tag_end(text, at);
                let self_closing = gt.is_some_and(|gt| text[at..gt].trim_end().ends_with('/'));

                if depth == 0 {
                    if self_closing {
                        map.insert(at, gt.unwrap_or(last));
                    } else {
                        nested_start = at;
                        depth = 1;
                    }
                } else if !self_closing {
                    depth += 1;
                }
            }
            TagEvent::Close { at } => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        map.insert(nested_start, tag_end(text, at).unwrap_or(last));
                    }
                }
            }
        }
    }

    if depth > 0 {
        map.insert(nested_start, last);
    }

    map
}

/// `rest` starts with `prefix` followed by a tag-name boundary
fn has_tag_prefix(rest: &str, prefix: &str) -> bool {
    rest.starts_with(prefix)
        && rest[prefix.len()..]
            .chars()
            .next()
            .map_or(true, |c| c.is_whitespace() || c == '>' || c == '/')
}
