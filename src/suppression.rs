//! Suppression lists and inline suppression pragmas
//!
//! Suppressions come from two places: the configuration file and comments in
//! the markup itself.
//! - `<!-- xaml-analyzer-disable RXT101 -->` - disable rules for the next line
//! - `<!-- xaml-analyzer-disable-next-line RXT101, RXT102 -->` - same, explicit
//! - `<Grid /> <!-- xaml-analyzer-disable-line RXT105 -->` - disable on this line
//! - `<!-- xaml-analyzer-disable-file RXT200 -->` - disable for the whole file
//! - `<!-- xaml-analyzer-disable -->` ... `<!-- xaml-analyzer-enable -->` - block
//!
//! `all` in place of a code disables every rule.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static DISABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*xaml-analyzer-disable(-next-line|-line|-file)?\b\s*([\w\-,\s]*?)\s*-->")
        .expect("disable pattern is valid")
});

static ENABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*xaml-analyzer-enable\s*-->").expect("enable pattern is valid")
});

/// One suppression entry
///
/// Every present field must match; absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    /// Rule code; `None` (or `all`) suppresses every rule
    #[serde(default, deserialize_with = "deserialize_code")]
    pub code: Option<String>,
    /// Restrict to files whose path ends with this one
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Inclusive 1-based line range
    #[serde(default)]
    pub lines: Option<(usize, usize)>,
}

fn deserialize_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let code: Option<String> = Option::deserialize(deserializer)?;
    Ok(code.and_then(normalize_code))
}

fn normalize_code(code: String) -> Option<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() || code == "ALL" {
        None
    } else {
        Some(code)
    }
}

impl Suppression {
    /// Suppress `code` on a single line
    pub fn line(code: &str, line: usize) -> Self {
        Self::lines(code, line, line)
    }

    /// Suppress `code` on an inclusive range of lines
    pub fn lines(code: &str, start: usize, end: usize) -> Self {
        Self {
            code: normalize_code(code.to_string()),
            file: None,
            lines: Some((start, end)),
        }
    }

    /// Suppress `code` everywhere in the analyzed file
    pub fn whole_file(code: &str) -> Self {
        Self {
            code: normalize_code(code.to_string()),
            ..Self::default()
        }
    }

    pub fn for_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn matches(&self, code: &str, file: Option<&Path>, line: usize) -> bool {
        let code_matches = self
            .code
            .as_deref()
            .map_or(true, |c| c.eq_ignore_ascii_case(code));
        let file_matches = match (&self.file, file) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => actual.ends_with(wanted),
            (Some(_), None) => false,
        };
        let line_matches = self
            .lines
            .map_or(true, |(start, end)| line >= start && line <= end);

        code_matches && file_matches && line_matches
    }
}

/// Ordered set of suppressions consulted before diagnostics are surfaced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuppressionList {
    entries: Vec<Suppression>,
}

impl SuppressionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, suppression: Suppression) {
        self.entries.push(suppression);
    }

    pub fn extend(&mut self, suppressions: impl IntoIterator<Item = Suppression>) {
        self.entries.extend(suppressions);
    }

    pub fn is_suppressed(&self, code: &str, file: Option<&Path>, line: usize) -> bool {
        self.entries.iter().any(|s| s.matches(code, file, line))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Suppression> {
        self.entries.iter()
    }
}

impl FromIterator<Suppression> for SuppressionList {
    fn from_iter<T: IntoIterator<Item = Suppression>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Suppression>> for SuppressionList {
    fn from(entries: Vec<Suppression>) -> Self {
        Self { entries }
    }
}

/// Suppressions declared by pragma comments in `source`
pub fn parse_inline(source: &str) -> SuppressionList {
    let mut list = SuppressionList::new();
    let mut block_start: Option<usize> = None;
    let line_count = source.lines().count();

    for (idx, line) in source.lines().enumerate() {
        let line_num = idx + 1;

        if ENABLE_PATTERN.is_match(line) {
            if let Some(start) = block_start.take() {
                list.push(Suppression::lines("all", start, line_num));
            }
            continue;
        }

        for caps in DISABLE_PATTERN.captures_iter(line) {
            let variant = caps.get(1).map_or("", |m| m.as_str());
            let codes = parse_codes(caps.get(2).map_or("", |m| m.as_str()));

            match (variant, codes.is_empty()) {
                ("", true) => {
                    block_start.get_or_insert(line_num + 1);
                }
                ("-line", true) => list.push(Suppression::line("all", line_num)),
                ("-file", true) => list.push(Suppression::whole_file("all")),
                (_, true) => list.push(Suppression::line("all", line_num + 1)),
                ("-line", false) => list.extend(codes.iter().map(|c| Suppression::line(c, line_num))),
                ("-file", false) => list.extend(codes.iter().map(|c| Suppression::whole_file(c))),
                (_, false) => list.extend(codes.iter().map(|c| Suppression::line(c, line_num + 1))),
            }
        }
    }

    if let Some(start) = block_start {
        list.push(Suppression::lines("all", start, line_count.max(start)));
    }

    list
}

fn parse_codes(s: &str) -> Vec<String> {
    s.split(',')
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_line() {
        let source = "<Grid>\n<!-- xaml-analyzer-disable RXT101 -->\n<TextBlock Grid.Row=\"3\" />\n<TextBlock Grid.Row=\"4\" />\n</Grid>";
        let list = parse_inline(source);

        assert!(list.is_suppressed("RXT101", None, 3));
        assert!(!list.is_suppressed("RXT101", None, 4));
        assert!(!list.is_suppressed("RXT102", None, 3));
    }

    #[test]
    fn test_multiple_codes_and_explicit_next_line() {
        let source = "<!-- xaml-analyzer-disable-next-line rxt101, RXT103 -->\n<TextBlock />";
        let list = parse_inline(source);
        assert!(list.is_suppressed("RXT101", None, 2));
        assert!(list.is_suppressed("RXT103", None, 2));
        assert!(!list.is_suppressed("RXT101", None, 1));
    }

    #[test]
    fn test_same_line() {
        let source = "<Grid>\n<MediaElement /> <!-- xaml-analyzer-disable-line RXT402 -->\n</Grid>";
        let list = parse_inline(source);
        assert!(list.is_suppressed("RXT402", None, 2));
        assert!(!list.is_suppressed("RXT402", None, 3));
    }

    #[test]
    fn test_whole_file_and_all() {
        let list = parse_inline("<!-- xaml-analyzer-disable-file RXT200 -->\n<Page />");
        assert!(list.is_suppressed("RXT200", None, 99));
        assert!(!list.is_suppressed("RXT101", None, 99));

        let list = parse_inline("<!-- xaml-analyzer-disable-file all -->");
        assert!(list.is_suppressed("RXT101", None, 1));
    }

    #[test]
    fn test_block() {
        let source = "a\n<!-- xaml-analyzer-disable -->\nb\nc\n<!-- xaml-analyzer-enable -->\nd";
        let list = parse_inline(source);
        assert!(!list.is_suppressed("RXT101", None, 1));
        assert!(list.is_suppressed("RXT101", None, 3));
        assert!(list.is_suppressed("RXT200", None, 4));
        assert!(!list.is_suppressed("RXT101", None, 6));
    }

    #[test]
    fn test_unclosed_block_runs_to_end() {
        let list = parse_inline("<!-- xaml-analyzer-disable -->\na\nb");
        assert!(list.is_suppressed("RXT101", None, 3));
    }

    #[test]
    fn test_file_scoped_entry() {
        let entry = Suppression::line("RXT101", 4).for_file("Views/MainPage.xaml");
        assert!(entry.matches("RXT101", Some(Path::new("/src/app/Views/MainPage.xaml")), 4));
        assert!(!entry.matches("RXT101", Some(Path::new("/src/app/Views/Other.xaml")), 4));
        assert!(!entry.matches("RXT101", None, 4));
    }

    #[test]
    fn test_deserialize_entries() {
        let yaml = "- code: rxt200\n  file: Main.xaml\n- code: all\n  lines: [3, 5]\n";
        let list: SuppressionList = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(list.len(), 2);
        let entries: Vec<_> = list.iter().collect();
        assert_eq!(entries[0].code.as_deref(), Some("RXT200"));
        assert_eq!(entries[1].code, None);
        assert_eq!(entries[1].lines, Some((3, 5)));
    }
}
