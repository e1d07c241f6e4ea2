//! Human-readable text output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, Severity};
use crate::engine::LintResult;
use colored::*;
use std::collections::BTreeMap;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show the source line with the span underlined
    pub show_source: bool,

    /// Show help text
    pub show_help: bool,

    /// Show the fix each diagnostic offers
    pub show_fixes: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_source: true,
            show_help: false,
            show_fixes: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    /// Include help text
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.show_help = verbose;
        self
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.colored {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn severity_str(&self, severity: Severity) -> ColoredString {
        let s = format!("{}", severity);
        if !self.colored {
            return s.normal();
        }
        match severity {
            Severity::Error => s.red().bold(),
            Severity::Warning => s.yellow().bold(),
            Severity::Info => s.blue(),
        }
    }

    fn format_location(&self, diag: &Diagnostic) -> String {
        format!(
            "{}:{}:{}",
            diag.location.file.display(),
            diag.location.line,
            diag.location.column
        )
    }

    fn count(&self, n: usize, singular: &str, plural: &str, style: fn(&str) -> ColoredString) -> Option<String> {
        (n > 0).then(|| self.paint(&format!("{} {}", n, if n == 1 { singular } else { plural }), style))
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &LintResult) -> String {
        let mut output = String::new();

        // Group diagnostics by file
        let mut by_file: BTreeMap<_, Vec<_>> = BTreeMap::new();
        for diag in &result.diagnostics {
            by_file.entry(&diag.location.file).or_default().push(diag);
        }

        for (file, diagnostics) in &by_file {
            output.push_str(&self.paint(&file.display().to_string(), |s| s.underline()));
            output.push('\n');

            for diag in diagnostics {
                output.push_str(&self.format_diagnostic(diag));
                output.push('\n');
            }
        }

        if self.show_stats {
            output.push_str(&format!(
                "{} {} analyzed",
                result.files_processed,
                if result.files_processed == 1 {
                    "file"
                } else {
                    "files"
                }
            ));

            let counts: Vec<String> = [
                self.count(result.error_count, "error", "errors", |s| s.red()),
                self.count(result.warning_count, "warning", "warnings", |s| s.yellow()),
                self.count(result.info_count, "info", "infos", |s| s.blue()),
            ]
            .into_iter()
            .flatten()
            .collect();

            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');

            output.push_str(&format!(
                "Finished in {:.2}s\n",
                result.duration.as_secs_f64()
            ));
        }

        output
    }

    fn format_diagnostic(&self, diag: &Diagnostic) -> String {
        let mut output = String::new();
        let bar = self.paint("|", |s| s.blue());

        output.push_str(&format!(
            "{}: {}[{}]: {}\n",
            self.format_location(diag),
            self.severity_str(diag.severity),
            self.paint(&diag.code, |s| s.cyan()),
            diag.message
        ));

        if self.show_source {
            if let Some(source) = &diag.source_line {
                let line_num = format!("{:>4}", diag.location.line);
                output.push_str(&format!("{} {} {}\n", self.paint(&line_num, |s| s.blue()), bar, source));

                // Underline to the end of the line at most
                if diag.location.column > 0 {
                    let padding = " ".repeat(diag.location.column - 1);
                    let room = source
                        .chars()
                        .count()
                        .saturating_sub(diag.location.column - 1)
                        .max(1);
                    let underline = "^".repeat(diag.location.length.clamp(1, room));
                    output.push_str(&format!(
                        "     {} {}{}\n",
                        bar,
                        padding,
                        self.paint(&underline, |s| s.red())
                    ));
                }
            }
        }

        if self.show_help {
            if let Some(help) = &diag.help {
                output.push_str(&format!("     {} help: {}\n", self.paint("=", |s| s.blue()), help));
            }
        }

        if self.show_fixes && diag.has_fix() {
            output.push_str(&format!(
                "     {} fix: {}\n",
                self.paint("=", |s| s.green()),
                diag.fix_description()
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::AnalysisAction;
    use crate::span::{SourceText, Span};
    use std::path::PathBuf;

    fn media_element() -> Diagnostic {
        let source = SourceText::new("<Grid>\n    <MediaElement />\n</Grid>");
        Diagnostic::from_action(
            AnalysisAction::rename_element(
                "RXT402",
                Severity::Warning,
                "Use MediaPlayerElement",
                "Replace with MediaPlayerElement",
                "MediaPlayerElement",
            )
            .with_extended_message("MediaElement is deprecated"),
            Span::new(11, 16),
            PathBuf::from("Main.xaml"),
            &source,
        )
    }

    #[test]
    fn test_format_diagnostic() {
        let formatter = TextFormatter::new().without_color().verbose(true);
        let output = formatter.format_diagnostic(&media_element());

        assert!(output.contains("Main.xaml:2:5"));
        assert!(output.contains("warning[RXT402]"));
        assert!(output.contains("<MediaElement />"));
        assert!(output.contains("    ^^^^^^^^^^^^^^^^"));
        assert!(output.contains("help: MediaElement is deprecated"));
        assert!(output.contains("fix:"));
    }

    #[test]
    fn test_help_hidden_unless_verbose() {
        let output = TextFormatter::new().without_color().format_diagnostic(&media_element());
        assert!(!output.contains("help:"));
    }

    #[test]
    fn test_format_result() {
        let formatter = TextFormatter::new().without_color();
        let result = LintResult {
            diagnostics: vec![media_element()],
            files_processed: 1,
            warning_count: 1,
            ..Default::default()
        };

        let output = formatter.format(&result);
        assert!(output.starts_with("Main.xaml\n"));
        assert!(output.contains("1 file analyzed: 1 warning"));
    }
}
