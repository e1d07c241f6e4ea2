//! XAML Analyzer - static analysis and auto-fix for XAML markup
//!
//! Finds problems in XAML documents that the compiler does not: children
//! placed in grid rows or columns that were never declared, spans that run
//! past the last definition, hard-coded user-facing strings, `SelectedItem`
//! bindings that cannot write back, and deprecated elements. Most findings
//! come with a fix that is computed only when asked for.
//!
//! # Architecture
//!
//! ```text
//! text -> Extractor -> Element tree -> AnalyzerRegistry -> AnalysisAction
//!      -> Diagnostic (anchored, deduplicated, suppressions applied)
//!      -> build_fix -> FixPlan -> preview_fix / apply_fix
//! ```
//!
//! Everything from extraction to fix rendering is a pure function of the text
//! it is given. [`engine::Engine`] adds configuration, inline suppression
//! pragmas, a per-document cache and parallel multi-file runs.
//!
//! # Example
//!
//! ```
//! use xaml_analyzer::{analyze_fragment, fix, AnalysisContext, AnalysisOptions, SuppressionList};
//!
//! let text = r#"<Grid><TextBlock Grid.Row="1" /></Grid>"#;
//! let diagnostics = analyze_fragment(
//!     text,
//!     0,
//!     &AnalysisContext::new(),
//!     &SuppressionList::new(),
//!     &AnalysisOptions::default(),
//! );
//!
//! let grid = diagnostics.iter().find(|d| d.code == "RXT105").unwrap();
//! let fixed = fix(grid, text).unwrap();
//! assert_eq!(fixed.text, r#"<Grid RowDefinitions="*,*"><TextBlock Grid.Row="1" /></Grid>"#);
//! ```

pub mod action;
pub mod analyzer;
pub mod attributes;
pub mod cache;
pub mod config;
pub mod diagnostic;
pub mod element;
pub mod engine;
pub mod exclusions;
pub mod extractor;
pub mod fixer;
pub mod output;
pub mod patch;
pub mod rules;
pub mod span;
pub mod suppression;

pub use action::{ActionKind, AnalysisAction, Axis, DefinitionDetails};
pub use analyzer::{
    AnalysisContext, Analyzer, AnalyzerRegistry, ElementUidAllocator, ProjectFramework,
    ProjectKind, UidAllocator,
};
pub use attributes::{resolve_attribute, AttributeForm};
pub use cache::DocumentCache;
pub use config::{Config, ConfigError};
pub use diagnostic::{Diagnostic, Location, Severity};
pub use element::{Attribute, AttributeValue, Element};
pub use engine::{analyze_fragment, AnalysisOptions, Engine, LintResult};
pub use exclusions::{exclusions, ExclusionMap};
pub use extractor::{extract, try_extract, ExtractError, Extractor};
pub use fixer::{
    apply_fix, build_fix, fix, preview_fix, unified_diff, FixError, FixOutcome, FixPlan, Fixer,
};
pub use patch::{apply_replacements, insert_at, render_preview, Insertion, Replacement};
pub use span::{SourceText, Span, TextSnapshot};
pub use suppression::{parse_inline, Suppression, SuppressionList};
