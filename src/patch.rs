//! Exclusion-aware find/replace and line-aware insertion
//!
//! Everything here is a pure function of its inputs. Offsets are relative to
//! the text passed in, and so is the [`ExclusionMap`].

use crate::exclusions::ExclusionMap;
use crate::span::{leading_whitespace, newline_for};

/// One literal find/replace pair
pub type Replacement = (String, String);

/// Text to splice in at an offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// Offset in the text before any replacement ran
    pub offset: usize,
    pub fragment: String,
}

impl Insertion {
    pub fn new(offset: usize, fragment: impl Into<String>) -> Self {
        Self {
            offset,
            fragment: fragment.into(),
        }
    }
}

/// Outcome of [`apply_replacements`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchResult {
    pub text: String,
    /// Substitutions made, across all pairs
    pub matched: usize,
    /// `(offset, length change)` of every substitution, in the order made
    pub edits: Vec<(usize, isize)>,
}

impl PatchResult {
    /// Where `offset` in the unpatched text ended up
    pub fn map_offset(&self, offset: usize) -> usize {
        self.edits.iter().fold(offset, |current, &(at, delta)| {
            if at < current {
                current.saturating_add_signed(delta).max(at)
            } else {
                current
            }
        })
    }
}

/// Apply `replacements` in order, skipping matches that start inside `exclusions`
///
/// Each pair scans left to right and continues after its own replacement, so a
/// pair never rewrites its own output; a later pair may match text an earlier
/// pair produced. A pair whose `find` is absent is a no-op.
pub fn apply_replacements(
    text: &str,
    replacements: &[Replacement],
    exclusions: &ExclusionMap,
) -> PatchResult {
    let mut result = text.to_string();
    let mut excluded = exclusions.clone();
    let mut matched = 0;
    let mut edits = Vec::new();

    for (find, replace) in replacements {
        if find.is_empty() {
            continue;
        }

        let mut pos = 0;
        while let Some(found) = result.get(pos..).and_then(|rest| rest.find(find.as_str())) {
            let at = pos + found;

            if excluded.contains(at) {
                pos = at + find.len();
                continue;
            }

            result.replace_range(at..at + find.len(), replace);
            let delta = replace.len() as isize - find.len() as isize;
            excluded.shift(at, delta);
            edits.push((at, delta));
            matched += 1;
            pos = at + replace.len();
        }
    }

    PatchResult {
        text: result,
        matched,
        edits,
    }
}

/// Insert `fragment` at `offset`, aligned with the line it lands on
///
/// When only whitespace precedes `offset` on its line, the fragment goes in
/// followed by a line break and that same indentation, so whatever was at
/// `offset` keeps its alignment. Otherwise the fragment is spliced in as is.
/// Offsets past the end clamp to the end.
pub fn insert_at(text: &str, offset: usize, fragment: &str) -> String {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }

    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let before = &text[line_start..offset];

    let mut result = String::with_capacity(text.len() + fragment.len() + before.len() + 2);
    result.push_str(&text[..offset]);
    result.push_str(fragment);
    if leading_whitespace(before).len() == before.len() {
        result.push_str(newline_for(text));
        result.push_str(before);
    }
    result.push_str(&text[offset..]);
    result
}

/// Whether only whitespace precedes `offset` on its line
pub fn at_line_start(text: &str, offset: usize) -> bool {
    let offset = offset.min(text.len());
    let Some(before) = text.get(..offset) else {
        return false;
    };
    let line = &before[before.rfind('\n').map_or(0, |i| i + 1)..];
    leading_whitespace(line).len() == line.len()
}

/// Replacements then insertion, without touching `original`
///
/// Returns the patched text and the number of substitutions made.
pub fn render(
    original: &str,
    replacements: &[Replacement],
    exclusions: &ExclusionMap,
    insertion: Option<&Insertion>,
) -> (String, usize) {
    let patched = apply_replacements(original, replacements, exclusions);
    let text = match insertion {
        Some(insertion) => insert_at(&patched.text, patched.map_offset(insertion.offset), &insertion.fragment),
        None => patched.text,
    };
    (text, patched.matched)
}

/// Text the edit would produce, for display before committing it
pub fn render_preview(
    original: &str,
    replacements: &[Replacement],
    exclusions: &ExclusionMap,
    insertion: Option<&Insertion>,
) -> String {
    render(original, replacements, exclusions, insertion).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusions::exclusions;
    use pretty_assertions::assert_eq;

    fn pairs(items: &[(&str, &str)]) -> Vec<Replacement> {
        items
            .iter()
            .map(|(f, r)| (f.to_string(), r.to_string()))
            .collect()
    }

    #[test]
    fn test_excluded_occurrence_untouched() {
        let text = r#"<Grid><TextBlock Grid.Row="1" /><Grid><TextBlock Grid.Row="1" /></Grid></Grid>"#;
        let excluded = exclusions(text, "Grid");
        let result = apply_replacements(text, &pairs(&[(r#"Grid.Row="1""#, r#"Grid.Row="2""#)]), &excluded);

        assert_eq!(
            result.text,
            r#"<Grid><TextBlock Grid.Row="2" /><Grid><TextBlock Grid.Row="1" /></Grid></Grid>"#
        );
        assert_eq!(result.matched, 1);
    }

    #[test]
    fn test_pair_does_not_rematch_its_output() {
        let result = apply_replacements("a a", &pairs(&[("a", "aa")]), &ExclusionMap::new());
        assert_eq!(result.text, "aa aa");
        assert_eq!(result.matched, 2);
    }

    #[test]
    fn test_later_pair_sees_earlier_output() {
        // Ascending order cascades; descending order does not
        let ascending = pairs(&[(r#"Row="1""#, r#"Row="2""#), (r#"Row="2""#, r#"Row="3""#)]);
        let descending = pairs(&[(r#"Row="2""#, r#"Row="3""#), (r#"Row="1""#, r#"Row="2""#)]);
        let text = r#"<a Row="1"/><b Row="2"/>"#;

        let up = apply_replacements(text, &ascending, &ExclusionMap::new());
        assert_eq!(up.text, r#"<a Row="3"/><b Row="3"/>"#);

        let down = apply_replacements(text, &descending, &ExclusionMap::new());
        assert_eq!(down.text, r#"<a Row="2"/><b Row="3"/>"#);
    }

    #[test]
    fn test_missing_find_is_noop() {
        let result = apply_replacements("<Grid />", &pairs(&[("Grid.Row", "x")]), &ExclusionMap::new());
        assert_eq!(result.text, "<Grid />");
        assert_eq!(result.matched, 0);
    }

    #[test]
    fn test_exclusions_follow_edits() {
        // The first edit lengthens the text; the excluded region must move with it
        let text = "x1 <!-- x1 --> x1";
        let excluded = exclusions(text, "Grid");
        let result = apply_replacements(text, &pairs(&[("x1", "x100")]), &excluded);
        assert_eq!(result.text, "x100 <!-- x1 --> x100");
    }

    #[test]
    fn test_insert_aligned() {
        let text = "<Grid.RowDefinitions>\n    <RowDefinition />\n</Grid.RowDefinitions>";
        let at = text.find("<RowDefinition").unwrap();
        let result = insert_at(text, at, r#"<RowDefinition Height="Auto" />"#);
        assert_eq!(
            result,
            "<Grid.RowDefinitions>\n    <RowDefinition Height=\"Auto\" />\n    <RowDefinition />\n</Grid.RowDefinitions>"
        );
    }

    #[test]
    fn test_insert_inline_and_crlf() {
        assert_eq!(insert_at("<a><b/></a>", 3, "<c/>"), "<a><c/><b/></a>");
        assert_eq!(insert_at("<a>\r\n  <b/>\r\n</a>", 7, "<c/>"), "<a>\r\n  <c/>\r\n  <b/>\r\n</a>");
        assert_eq!(insert_at("<a/>", 99, "!"), "<a/>!");
    }

    #[test]
    fn test_map_offset() {
        let result = apply_replacements("ab ab ab", &pairs(&[("ab", "abc")]), &ExclusionMap::new());
        assert_eq!(result.text, "abc abc abc");
        assert_eq!(result.map_offset(0), 0);
        assert_eq!(result.map_offset(3), 4);
        assert_eq!(result.map_offset(6), 8);
    }

    #[test]
    fn test_preview_is_pure() {
        let text = String::from(r#"<Grid><TextBlock Grid.Row="1" /></Grid>"#);
        let replacements = pairs(&[(r#" Grid.Row="1""#, r#" Grid.Row="2""#)]);
        let insertion = Insertion::new(6, "<Border />");
        let excluded = exclusions(&text, "Grid");

        let first = render_preview(&text, &replacements, &excluded, Some(&insertion));
        let second = render_preview(&text, &replacements, &excluded, Some(&insertion));

        assert_eq!(first, second);
        assert_eq!(first, r#"<Grid><Border /><TextBlock Grid.Row="2" /></Grid>"#);
        assert_eq!(text, r#"<Grid><TextBlock Grid.Row="1" /></Grid>"#);
    }
}
