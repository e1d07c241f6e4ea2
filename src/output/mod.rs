//! Output formatters for analysis results

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::{ColorMode, OutputConfig, OutputFormat};
use crate::diagnostic::Diagnostic;
use crate::engine::LintResult;
use std::io::IsTerminal;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire result
    fn format(&self, result: &LintResult) -> String;

    /// Format a single diagnostic
    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String;
}

/// Formatter selected by the output configuration
pub fn formatter_for(output: &OutputConfig) -> Box<dyn OutputFormatter> {
    match output.format {
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
        OutputFormat::Text => {
            let colored = match output.color {
                ColorMode::Always => true,
                ColorMode::Never => false,
                ColorMode::Auto => std::io::stdout().is_terminal(),
            };
            let formatter = TextFormatter::new().verbose(output.verbose);
            Box::new(if colored { formatter } else { formatter.without_color() })
        }
    }
}
