//! Declarative analysis actions produced by rules

use crate::diagnostic::Severity;
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of fix shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AddAttribute,
    ReplaceAttributeValue,
    RemoveAttribute,
    /// Change the element's tag name in both start and end tag
    RenameElement,
    /// Add the missing row/column definitions a child refers to
    AddDefinitions,
    /// Insert a copy of an existing definition, shifting later rows/columns
    InsertDefinition,
    /// Report only, nothing to fix
    HighlightOnly,
}

impl ActionKind {
    pub fn has_fix(self) -> bool {
        self != ActionKind::HighlightOnly
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::AddAttribute => "add-attribute",
            ActionKind::ReplaceAttributeValue => "replace-attribute-value",
            ActionKind::RemoveAttribute => "remove-attribute",
            ActionKind::RenameElement => "rename-element",
            ActionKind::AddDefinitions => "add-definitions",
            ActionKind::InsertDefinition => "insert-definition",
            ActionKind::HighlightOnly => "highlight-only",
        };
        write!(f, "{}", name)
    }
}

/// Grid axis a definition diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Row,
    Column,
}

impl Axis {
    /// `RowDefinitions` / `ColumnDefinitions`
    pub fn definitions_property(self) -> &'static str {
        match self {
            Axis::Row => "RowDefinitions",
            Axis::Column => "ColumnDefinitions",
        }
    }

    /// `RowDefinition` / `ColumnDefinition`
    pub fn definition_tag(self) -> &'static str {
        match self {
            Axis::Row => "RowDefinition",
            Axis::Column => "ColumnDefinition",
        }
    }

    /// `Grid.Row` / `Grid.Column`
    pub fn attached_property(self) -> &'static str {
        match self {
            Axis::Row => "Grid.Row",
            Axis::Column => "Grid.Column",
        }
    }

    /// `Grid.RowSpan` / `Grid.ColumnSpan`
    pub fn span_property(self) -> &'static str {
        match self {
            Axis::Row => "Grid.RowSpan",
            Axis::Column => "Grid.ColumnSpan",
        }
    }

    /// `Height` / `Width`
    pub fn size_property(self) -> &'static str {
        match self {
            Axis::Row => "Height",
            Axis::Column => "Width",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Row => write!(f, "row"),
            Axis::Column => write!(f, "column"),
        }
    }
}

/// Positional data a grid definition fix needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionDetails {
    pub axis: Axis,
    /// Row/column assigned by the child, or the definition position for inserts
    pub index: usize,
    /// Definitions declared on the grid
    pub existing_count: usize,
    /// Definitions needed for every reference to resolve
    pub total_required: usize,
    pub has_some_definitions: bool,
    /// Definitions written as `RowDefinitions="*,Auto"`
    pub uses_short_syntax: bool,
    /// Absolute offset new markup goes in at
    pub insert_position: usize,
    /// Indentation for generated definition lines
    pub left_pad: String,
    /// The grid the diagnostic belongs to
    pub grid: Span,
    /// Existing definition tag copied by inserts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
}

/// A diagnostic with an optional fix, before it is bound to a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisAction {
    pub severity: Severity,
    /// Stable rule identifier (`RXT101`)
    pub code: String,
    pub description: String,
    /// Label for the fix
    pub action_text: String,
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_message: Option<String>,
    /// Span to report at; the element's start tag when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<DefinitionDetails>,
}

impl AnalysisAction {
    pub fn new(code: &str, severity: Severity, kind: ActionKind, description: &str) -> Self {
        Self {
            severity,
            code: code.to_string(),
            description: description.to_string(),
            action_text: String::new(),
            kind,
            target_attribute: None,
            new_value: None,
            extended_message: None,
            anchor: None,
            details: None,
        }
    }

    /// Add `name="value"` to the element
    pub fn add_attribute(
        code: &str,
        severity: Severity,
        description: &str,
        action_text: &str,
        name: &str,
        value: &str,
    ) -> Self {
        Self::new(code, severity, ActionKind::AddAttribute, description)
            .with_action_text(action_text)
            .with_attribute(name, Some(value))
    }

    /// Set the existing `name` attribute to `value`
    pub fn replace_attribute_value(
        code: &str,
        severity: Severity,
        description: &str,
        action_text: &str,
        name: &str,
        value: &str,
    ) -> Self {
        Self::new(code, severity, ActionKind::ReplaceAttributeValue, description)
            .with_action_text(action_text)
            .with_attribute(name, Some(value))
    }

    pub fn remove_attribute(
        code: &str,
        severity: Severity,
        description: &str,
        action_text: &str,
        name: &str,
    ) -> Self {
        Self::new(code, severity, ActionKind::RemoveAttribute, description)
            .with_action_text(action_text)
            .with_attribute(name, None)
    }

    /// Rename the element to `new_name`
    pub fn rename_element(
        code: &str,
        severity: Severity,
        description: &str,
        action_text: &str,
        new_name: &str,
    ) -> Self {
        let mut action = Self::new(code, severity, ActionKind::RenameElement, description)
            .with_action_text(action_text);
        action.new_value = Some(new_name.to_string());
        action
    }

    pub fn highlight_only(code: &str, severity: Severity, description: &str) -> Self {
        Self::new(code, severity, ActionKind::HighlightOnly, description)
    }

    pub fn with_action_text(mut self, text: &str) -> Self {
        self.action_text = text.to_string();
        self
    }

    pub fn with_attribute(mut self, name: &str, value: Option<&str>) -> Self {
        self.target_attribute = Some(name.to_string());
        self.new_value = value.map(str::to_string);
        self
    }

    pub fn with_extended_message(mut self, message: &str) -> Self {
        self.extended_message = Some(message.to_string());
        self
    }

    pub fn with_anchor(mut self, span: Span) -> Self {
        self.anchor = Some(span);
        self
    }

    pub fn with_details(mut self, details: DefinitionDetails) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_attribute_constructor() {
        let action = AnalysisAction::add_attribute(
            "RXT105",
            Severity::Error,
            "Missing row definitions",
            "Add RowDefinitions",
            "RowDefinitions",
            "*,*",
        );
        assert_eq!(action.kind, ActionKind::AddAttribute);
        assert_eq!(action.target_attribute.as_deref(), Some("RowDefinitions"));
        assert_eq!(action.new_value.as_deref(), Some("*,*"));
        assert!(action.kind.has_fix());
    }

    #[test]
    fn test_highlight_only_has_no_fix() {
        let action = AnalysisAction::highlight_only("RXT200", Severity::Warning, "Hard-coded string");
        assert!(!action.kind.has_fix());
        assert!(action.target_attribute.is_none());
    }

    #[test]
    fn test_axis_names() {
        assert_eq!(Axis::Row.definitions_property(), "RowDefinitions");
        assert_eq!(Axis::Column.span_property(), "Grid.ColumnSpan");
        assert_eq!(Axis::Column.size_property(), "Width");
        assert_eq!(ActionKind::AddDefinitions.to_string(), "add-definitions");
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let action = AnalysisAction::rename_element(
            "RXT402",
            Severity::Warning,
            "Use MediaPlayerElement",
            "Replace MediaElement",
            "MediaPlayerElement",
        );
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains(r#""kind":"rename_element""#));
        assert!(!json.contains("details"));
    }
}
