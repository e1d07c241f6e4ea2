//! Positioned diagnostics materialized from analysis actions

use crate::action::{ActionKind, AnalysisAction};
use crate::span::{SourceText, Span};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, usually an offered refactoring
    Info,
    /// Warning - potential issue
    #[default]
    Warning,
    /// Error - definite problem
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "suggestion" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// Source code location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path
    pub file: PathBuf,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Length of the highlighted region
    pub length: usize,
}

impl Location {
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            length: 0,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }
}

/// An analysis action bound to a span of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule code that triggered this diagnostic
    pub code: String,
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    pub location: Location,
    /// Absolute span in the analyzed text
    pub span: Span,
    /// Span of the element the rule ran on
    pub element: Span,
    /// The source line (for display)
    pub source_line: Option<String>,
    /// Extra explanation from the rule
    pub help: Option<String>,
    /// The action this diagnostic was built from, used to materialize its fix
    pub action: AnalysisAction,
}

impl Diagnostic {
    /// Anchor `action` in `source`, falling back to `default_span` when it has no anchor of its own
    pub fn from_action(
        action: AnalysisAction,
        default_span: Span,
        file: PathBuf,
        source: &SourceText,
    ) -> Self {
        let span = action.anchor.unwrap_or(default_span);
        let (line, column) = source.line_col(span.start);
        let location = Location::new(file, line, column).with_length(span.length);

        Self {
            code: action.code.clone(),
            severity: action.severity,
            message: action.description.clone(),
            location,
            span,
            element: default_span,
            source_line: source.line_text(line).map(str::to_string),
            help: action.extended_message.clone(),
            action,
        }
    }

    pub fn with_element(mut self, element: Span) -> Self {
        self.element = element;
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind
    }

    /// Check if this diagnostic has a fix
    pub fn has_fix(&self) -> bool {
        self.action.kind.has_fix()
    }

    /// Label for the fix, or the message when the rule gave none
    pub fn fix_description(&self) -> &str {
        if self.action.action_text.is_empty() {
            &self.message
        } else {
            &self.action.action_text
        }
    }

    pub fn line(&self) -> usize {
        self.location.line
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Keep the first diagnostic for every `(code, span)` pair, preserving order
pub fn dedup(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen: HashSet<(String, Span)> = HashSet::new();
    diagnostics
        .into_iter()
        .filter(|d| seen.insert((d.code.clone(), d.span)))
        .collect()
}

/// Sort by position, then code
pub fn sort(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then_with(|| a.code.cmp(&b.code))
            .then_with(|| a.span.length.cmp(&b.span.length))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(code: &str) -> AnalysisAction {
        AnalysisAction::highlight_only(code, Severity::Warning, "message")
    }

    #[test]
    fn test_severity_parsing() {
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("ERROR".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("hint".parse::<Severity>(), Ok(Severity::Info));
        assert!("fatal".parse::<Severity>().is_err());
        assert!(Severity::Error > Severity::Warning);
    }

    #[test]
    fn test_from_action_uses_anchor() {
        let source = SourceText::new("<Grid>\n  <TextBlock Grid.Row=\"1\" />\n</Grid>");
        let anchor = Span::new(20, 12);
        let diagnostic = Diagnostic::from_action(
            action("RXT101").with_anchor(anchor),
            Span::new(0, 6),
            PathBuf::from("Main.xaml"),
            &source,
        );

        assert_eq!(diagnostic.span, anchor);
        assert_eq!(diagnostic.location.line, 2);
        assert_eq!(diagnostic.location.column, 14);
        assert_eq!(diagnostic.location.length, 12);
        assert_eq!(diagnostic.source_line.as_deref(), Some("  <TextBlock Grid.Row=\"1\" />"));
    }

    #[test]
    fn test_from_action_default_span() {
        let source = SourceText::new("<MediaElement />");
        let diagnostic = Diagnostic::from_action(
            action("RXT402"),
            Span::new(0, 16),
            PathBuf::new(),
            &source,
        );
        assert_eq!(diagnostic.span, Span::new(0, 16));
        assert_eq!((diagnostic.location.line, diagnostic.location.column), (1, 1));
        assert!(!diagnostic.has_fix());
        assert_eq!(diagnostic.fix_description(), "message");
    }

    #[test]
    fn test_dedup_by_code_and_span() {
        let source = SourceText::new("<Grid></Grid>");
        let make = |code: &str, span: Span| {
            Diagnostic::from_action(action(code), span, PathBuf::new(), &source)
        };
        let diagnostics = vec![
            make("RXT101", Span::new(0, 6)),
            make("RXT101", Span::new(0, 6)),
            make("RXT102", Span::new(0, 6)),
            make("RXT101", Span::new(6, 7)),
        ];
        let deduped = dedup(diagnostics);
        assert_eq!(deduped.len(), 3);
    }

    #[test]
    fn test_sort_by_position_then_code() {
        let source = SourceText::new("<Grid></Grid>");
        let make = |code: &str, span: Span| {
            Diagnostic::from_action(action(code), span, PathBuf::new(), &source)
        };
        let mut diagnostics = vec![
            make("RXT102", Span::new(6, 1)),
            make("RXT200", Span::new(0, 6)),
            make("RXT101", Span::new(6, 1)),
        ];
        sort(&mut diagnostics);
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["RXT200", "RXT101", "RXT102"]);
    }
}
