//! Grid row/column definition checks

use crate::action::{ActionKind, AnalysisAction, Axis, DefinitionDetails};
use crate::analyzer::{AnalysisContext, Analyzer};
use crate::attributes::{collection_len, integer_attribute, resolve_attribute, AttributeForm};
use crate::diagnostic::Severity;
use crate::element::{Attribute, Element};
use crate::exclusions::{exclusions, ExclusionMap};
use crate::span::{in_comment, Span, TextSnapshot};
use log::debug;

pub const MISSING_ROW_DEFINITION: &str = "RXT101";
pub const MISSING_COLUMN_DEFINITION: &str = "RXT102";
pub const ROW_SPAN_OVERFLOW: &str = "RXT103";
pub const COLUMN_SPAN_OVERFLOW: &str = "RXT104";
pub const UNDEFINED_ROWS: &str = "RXT105";
pub const UNDEFINED_COLUMNS: &str = "RXT106";
pub const INSERT_ROW_DEFINITION: &str = "RXT190";
pub const INSERT_COLUMN_DEFINITION: &str = "RXT191";

const GRID: &str = "Grid";

/// Largest row or column index or span the grid rules act on
///
/// Placements beyond it are left alone rather than answered with thousands of
/// generated definitions.
pub const MAX_GRID_INDEX: usize = 1000;

fn within_bounds(axis: Axis, value: usize) -> Option<usize> {
    if value > MAX_GRID_INDEX {
        debug!("Ignoring {} placement {} above {}", axis, value, MAX_GRID_INDEX);
        return None;
    }
    Some(value)
}

/// How a grid declares its definitions along one axis
#[derive(Debug, Clone)]
struct Definitions<'a> {
    axis: Axis,
    count: usize,
    /// Written as `<Grid.RowDefinitions>` with child elements
    collection: Option<&'a Attribute>,
    /// Written as `RowDefinitions="*,Auto"`
    inline: Option<(&'a Attribute, &'a str)>,
}

impl<'a> Definitions<'a> {
    fn of(grid: &'a Element, axis: Axis) -> Self {
        let mut definitions = Self {
            axis,
            count: 0,
            collection: None,
            inline: None,
        };

        let Some(found) = resolve_attribute(grid, axis.definitions_property(), AttributeForm::InlineOrElement)
        else {
            return definitions;
        };

        match (found.value, found.attribute) {
            (Some(value), Some(attribute)) if attribute.is_inline(grid) => {
                definitions.count = value.split(',').count();
                definitions.inline = Some((attribute, value));
            }
            (_, Some(attribute)) => {
                definitions.count = collection_len(attribute);
                definitions.collection = Some(attribute);
            }
            _ => {}
        }

        definitions
    }

    fn has_some(&self) -> bool {
        self.collection.is_some() || self.inline.is_some()
    }

    fn uses_short_syntax(&self) -> bool {
        self.inline.is_some()
    }

    /// Where generated definition markup goes
    ///
    /// Before `</Grid.RowDefinitions>` when the collection exists, otherwise
    /// straight after the grid's start tag.
    fn insert_position(&self, grid: &Element) -> usize {
        match self.collection {
            Some(collection) => {
                let closing = format!("</{}.{}>", grid.name, self.axis.definitions_property());
                collection.span.end().saturating_sub(closing.len())
            }
            None => grid.start_tag.end(),
        }
    }

    fn details(&self, grid: &Element, index: usize, total_required: usize, left_pad: &str) -> DefinitionDetails {
        DefinitionDetails {
            axis: self.axis,
            index,
            existing_count: self.count,
            total_required,
            has_some_definitions: self.has_some(),
            uses_short_syntax: self.uses_short_syntax(),
            insert_position: self.insert_position(grid),
            left_pad: left_pad.to_string(),
            grid: grid.span,
            markup: None,
        }
    }
}

/// Grid-level check: every row and column a direct child uses must be declared
#[derive(Debug, Default)]
pub struct GridDefinitionsAnalyzer;

impl GridDefinitionsAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn check_axis(&self, grid: &Element, axis: Axis, code: &str, left_pad: &str) -> Option<AnalysisAction> {
        let definitions = Definitions::of(grid, axis);

        let highest = grid
            .children
            .iter()
            .filter_map(|child| {
                let index = within_bounds(axis, integer_attribute(child, axis.attached_property()).unwrap_or(0))?;
                let span = within_bounds(axis, integer_attribute(child, axis.span_property()).unwrap_or(1))?.max(1);
                let last = index + span - 1;
                (last > 0).then_some(last)
            })
            .max()?;

        if highest < definitions.count {
            return None;
        }

        let missing = highest - definitions.count + 1;
        let description = format!(
            "Grid uses {} {} but declares {} {} definition(s)",
            axis,
            highest,
            definitions.count,
            axis
        );
        let action_text = format!("Add missing {} definitions", axis);
        let extended = format!(
            "Elements placed in an undefined {} are drawn in the last defined one.",
            axis
        );

        let action = match (definitions.inline, definitions.collection) {
            (Some((_, existing)), _) => AnalysisAction::replace_attribute_value(
                code,
                Severity::Warning,
                &description,
                &action_text,
                axis.definitions_property(),
                &format!("{}{}", existing, ",*".repeat(missing)),
            ),
            (None, Some(_)) => AnalysisAction::new(code, Severity::Warning, ActionKind::AddDefinitions, &description)
                .with_action_text(&action_text)
                .with_details(definitions.details(grid, highest, highest + 1, left_pad)),
            (None, None) => AnalysisAction::add_attribute(
                code,
                Severity::Warning,
                &description,
                &action_text,
                axis.definitions_property(),
                &vec!["*"; missing].join(","),
            ),
        };

        Some(action.with_extended_message(&extended))
    }
}

impl Analyzer for GridDefinitionsAnalyzer {
    fn target_type(&self) -> &str {
        GRID
    }

    fn id(&self) -> &str {
        "grid-definitions"
    }

    fn analyze(&self, element: &Element, context: &AnalysisContext<'_>) -> Vec<AnalysisAction> {
        let left_pad = left_pad(element, context);
        [
            self.check_axis(element, Axis::Row, UNDEFINED_ROWS, &left_pad),
            self.check_axis(element, Axis::Column, UNDEFINED_COLUMNS, &left_pad),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Per-usage checks on `Grid.Row`/`Grid.Column` and their spans, plus the
/// "insert definition here" refactoring on every declared definition
#[derive(Debug, Default)]
pub struct GridPlacementAnalyzer;

/// Region filter for one grid: nested same-type grids and comments
struct Scope<'a> {
    grid_start: usize,
    text: Option<&'a str>,
    excluded: ExclusionMap,
}

impl Scope<'_> {
    fn allows(&self, span: Span) -> bool {
        let Some(text) = self.text else {
            return true;
        };
        let local = Span::new(span.start.saturating_sub(self.grid_start), span.length);
        !self.excluded.intersects(local) && !in_comment(text, local.start)
    }
}

impl GridPlacementAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn usage_actions(
        &self,
        grid: &Element,
        definitions: &Definitions<'_>,
        scope: &Scope<'_>,
        left_pad: &str,
    ) -> Vec<AnalysisAction> {
        let axis = definitions.axis;
        let (missing_code, overflow_code) = match axis {
            Axis::Row => (MISSING_ROW_DEFINITION, ROW_SPAN_OVERFLOW),
            Axis::Column => (MISSING_COLUMN_DEFINITION, COLUMN_SPAN_OVERFLOW),
        };

        let mut missing = Vec::new();
        let mut actions = Vec::new();
        let mut highest_assigned = 0usize;

        for placed in placed_elements(grid) {
            let assigned = resolve_attribute(placed, axis.attached_property(), AttributeForm::InlineOrElement)
                .filter(|found| scope.allows(found.span))
                .and_then(|found| Some((found.span, found.value?.trim().parse::<usize>().ok()?)));
            if assigned.is_some_and(|(_, index)| within_bounds(axis, index).is_none()) {
                continue;
            }

            if let Some((span, index)) = assigned {
                highest_assigned = highest_assigned.max(index);
                if index > 0 && index >= definitions.count {
                    missing.push((span, index));
                }
            }

            let spanned = resolve_attribute(placed, axis.span_property(), AttributeForm::InlineOrElement)
                .filter(|found| scope.allows(found.span))
                .and_then(|found| Some((found.span, found.value?.trim().parse::<usize>().ok()?)))
                .and_then(|(span, count)| Some((span, within_bounds(axis, count)?)));

            if let Some((span, count)) = spanned {
                let index = assigned.map_or(0, |(_, i)| i);
                if count > 1 && index + count - 1 >= definitions.count {
                    let description = format!(
                        "{} of {} extends beyond the {} declared {} definition(s)",
                        axis.span_property(),
                        count,
                        definitions.count,
                        axis
                    );
                    actions.push(
                        AnalysisAction::new(overflow_code, Severity::Warning, ActionKind::AddDefinitions, &description)
                            .with_action_text(&format!("Add missing {} definitions", axis))
                            .with_anchor(span)
                            .with_details(definitions.details(grid, index, index + count, left_pad)),
                    );
                }
            }
        }

        let mut result: Vec<AnalysisAction> = missing
            .into_iter()
            .map(|(span, index)| {
                let description = format!("{}=\"{}\" refers to an undefined {}", axis.attached_property(), index, axis);
                AnalysisAction::new(missing_code, Severity::Warning, ActionKind::AddDefinitions, &description)
                    .with_action_text(&format!("Add missing {} definitions", axis))
                    .with_anchor(span)
                    .with_details(definitions.details(grid, index, highest_assigned + 1, left_pad))
            })
            .collect();
        result.extend(actions);
        result
    }

    fn insert_actions(
        &self,
        grid: &Element,
        definitions: &Definitions<'_>,
        context: &AnalysisContext<'_>,
        left_pad: &str,
    ) -> Vec<AnalysisAction> {
        let Some(collection) = definitions.collection else {
            return Vec::new();
        };
        let axis = definitions.axis;
        let code = match axis {
            Axis::Row => INSERT_ROW_DEFINITION,
            Axis::Column => INSERT_COLUMN_DEFINITION,
        };

        collection
            .elements()
            .iter()
            .filter(|definition| definition.local_name() == axis.definition_tag())
            .enumerate()
            .map(|(position, definition)| {
                let markup = context
                    .source
                    .and_then(|source| source.substring(definition.span))
                    .map(str::to_string);
                let mut details = definitions.details(grid, position, definitions.count + 1, left_pad);
                details.insert_position = definition.span.start;
                details.markup = markup;

                AnalysisAction::new(
                    code,
                    Severity::Info,
                    ActionKind::InsertDefinition,
                    &format!("Insert new {} definition", axis),
                )
                .with_action_text(&format!("Insert new definition for {} {}", axis, position))
                .with_anchor(definition.start_tag)
                .with_details(details)
            })
            .collect()
    }
}

impl Analyzer for GridPlacementAnalyzer {
    fn target_type(&self) -> &str {
        GRID
    }

    fn id(&self) -> &str {
        "grid-placement"
    }

    fn analyze(&self, element: &Element, context: &AnalysisContext<'_>) -> Vec<AnalysisAction> {
        let text = context.element_text(element);
        let scope = Scope {
            grid_start: element.span.start,
            text,
            excluded: text.map(|t| exclusions(t, &element.name)).unwrap_or_default(),
        };

        let left_pad = left_pad(element, context);

        let mut actions = Vec::new();
        for axis in [Axis::Row, Axis::Column] {
            let definitions = Definitions::of(element, axis);
            actions.extend(self.insert_actions(element, &definitions, context, &left_pad));
            actions.extend(self.usage_actions(element, &definitions, &scope, &left_pad));
        }
        actions
    }
}

/// Indentation for markup generated one level inside `grid`
fn left_pad(grid: &Element, context: &AnalysisContext<'_>) -> String {
    let line_padding = context
        .source
        .map(|source| source.line_padding(grid.span.start))
        .unwrap_or("");
    format!("{}{}", line_padding, indent_unit(line_padding))
}

/// One level of indentation in the style `padding` already uses
pub fn indent_unit(padding: &str) -> &'static str {
    if padding.contains('\t') {
        "\t"
    } else {
        "    "
    }
}

/// Elements whose placement belongs to `grid`
///
/// Walks structural children and element-valued properties, stopping at nested
/// grids since they define their own rows and columns.
fn placed_elements(grid: &Element) -> Vec<&Element> {
    let mut placed = Vec::new();
    let mut stack: Vec<&Element> = grid.children.iter().rev().collect();

    while let Some(element) = stack.pop() {
        if element.local_name() == grid.local_name() {
            continue;
        }
        placed.push(element);
        let nested = element
            .attributes
            .iter()
            .flat_map(|a| a.elements())
            .chain(element.children.iter());
        let mut next: Vec<&Element> = nested.collect();
        next.sort_by_key(|e| e.span.start);
        stack.extend(next.into_iter().rev());
    }

    placed
}
