//! Built-in analyzers

pub mod grid;
pub mod hardcoded;
pub mod media_element;
pub mod selected_item;

pub use grid::{GridDefinitionsAnalyzer, GridPlacementAnalyzer};
pub use hardcoded::{Applicability, HardCodedStringAnalyzer};
pub use media_element::MediaElementAnalyzer;
pub use selected_item::SelectedItemBindingAnalyzer;

use crate::analyzer::Analyzer;
use crate::diagnostic::Severity;
use std::sync::Arc;

/// Catalogue entry for a rule code
#[derive(Debug, Clone, Copy)]
pub struct RuleInfo {
    pub code: &'static str,
    pub severity: Severity,
    pub summary: &'static str,
}

/// Every rule code the built-in analyzers emit
pub const CATALOGUE: &[RuleInfo] = &[
    RuleInfo {
        code: grid::MISSING_ROW_DEFINITION,
        severity: Severity::Warning,
        summary: "Grid.Row refers to a row with no definition",
    },
    RuleInfo {
        code: grid::MISSING_COLUMN_DEFINITION,
        severity: Severity::Warning,
        summary: "Grid.Column refers to a column with no definition",
    },
    RuleInfo {
        code: grid::ROW_SPAN_OVERFLOW,
        severity: Severity::Warning,
        summary: "Grid.RowSpan extends past the defined rows",
    },
    RuleInfo {
        code: grid::COLUMN_SPAN_OVERFLOW,
        severity: Severity::Warning,
        summary: "Grid.ColumnSpan extends past the defined columns",
    },
    RuleInfo {
        code: grid::UNDEFINED_ROWS,
        severity: Severity::Warning,
        summary: "Grid declares fewer rows than its children use",
    },
    RuleInfo {
        code: grid::UNDEFINED_COLUMNS,
        severity: Severity::Warning,
        summary: "Grid declares fewer columns than its children use",
    },
    RuleInfo {
        code: selected_item::SELECTED_ITEM_BINDING_MODE,
        severity: Severity::Warning,
        summary: "SelectedItem binding is not TwoWay",
    },
    RuleInfo {
        code: grid::INSERT_ROW_DEFINITION,
        severity: Severity::Info,
        summary: "Insert a row definition and renumber later rows",
    },
    RuleInfo {
        code: grid::INSERT_COLUMN_DEFINITION,
        severity: Severity::Info,
        summary: "Insert a column definition and renumber later columns",
    },
    RuleInfo {
        code: hardcoded::HARDCODED_STRING,
        severity: Severity::Warning,
        summary: "Hard-coded user-facing string",
    },
    RuleInfo {
        code: media_element::USE_MEDIA_PLAYER_ELEMENT,
        severity: Severity::Warning,
        summary: "MediaElement should be MediaPlayerElement",
    },
];

/// Look up a rule code in the catalogue
pub fn info(code: &str) -> Option<&'static RuleInfo> {
    CATALOGUE.iter().find(|r| r.code.eq_ignore_ascii_case(code))
}

/// One instance of every built-in analyzer
pub fn builtin() -> Vec<Arc<dyn Analyzer>> {
    let mut analyzers: Vec<Arc<dyn Analyzer>> = vec![
        Arc::new(GridDefinitionsAnalyzer::new()),
        Arc::new(GridPlacementAnalyzer::new()),
        Arc::new(MediaElementAnalyzer::new()),
    ];
    analyzers.extend(
        HardCodedStringAnalyzer::builtin()
            .into_iter()
            .map(|a| Arc::new(a) as Arc<dyn Analyzer>),
    );
    analyzers.extend(
        SelectedItemBindingAnalyzer::builtin()
            .into_iter()
            .map(|a| Arc::new(a) as Arc<dyn Analyzer>),
    );
    analyzers
}
