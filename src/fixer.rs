//! Fix materialization for diagnostics
//!
//! A fix is computed lazily from a diagnostic and the text as it is *now*:
//! [`build_fix`] re-reads the element the diagnostic points at and turns the
//! action into a [`FixPlan`] of literal replacements, exclusion regions and an
//! optional insertion over one region of the text. [`preview_fix`] and
//! [`apply_fix`] are pure transforms of that plan; writing the result back is
//! the caller's business.

use crate::action::{ActionKind, Axis, DefinitionDetails};
use crate::attributes::{collection_len, resolve_attribute, AttributeForm};
use crate::diagnostic::{Diagnostic, Severity};
use crate::element::{Attribute, Element};
use crate::engine::Engine;
use crate::exclusions::{exclusions, ExclusionMap};
use crate::extractor::try_extract;
use crate::patch::{at_line_start, render, render_preview, Insertion, Replacement};
use crate::rules::grid::indent_unit;
use crate::span::{newline_for, tag_end, Span};
use log::{debug, warn};
use quick_xml::escape::escape;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Why a fix could not be produced or applied
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FixError {
    #[error("the document changed since the diagnostic was reported; nothing to change")]
    Stale,
    #[error("fix region {start}..{end} lies outside the {len}-byte document")]
    RegionOutOfBounds { start: usize, end: usize, len: usize },
    #[error("{code} has no automatic fix")]
    NoFix { code: String },
}

/// Everything needed to rewrite one region of the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixPlan {
    /// Absolute region the edit is confined to
    pub region: Span,
    /// Applied in order, offsets relative to `region`
    pub replacements: Vec<Replacement>,
    /// Region-relative ranges the replacements must skip
    pub exclusions: ExclusionMap,
    /// Region-relative insertion made after the replacements
    pub insertion: Option<Insertion>,
}

impl FixPlan {
    fn new(region: Span) -> Self {
        Self {
            region,
            replacements: Vec::new(),
            exclusions: ExclusionMap::new(),
            insertion: None,
        }
    }

    fn replace(mut self, find: impl Into<String>, replace: impl Into<String>) -> Self {
        self.replacements.push((find.into(), replace.into()));
        self
    }

    fn insert(mut self, offset: usize, fragment: impl Into<String>) -> Self {
        self.insertion = Some(Insertion::new(offset, fragment));
        self
    }

    fn excluding(mut self, exclusions: ExclusionMap) -> Self {
        self.exclusions = exclusions;
        self
    }
}

/// Result of applying a plan to the whole text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    pub text: String,
    /// Whether the text differs from the input
    pub changed: bool,
    pub replacements_matched: usize,
}

/// Turn `diagnostic` into a plan against `current_text`
pub fn build_fix(diagnostic: &Diagnostic, current_text: &str) -> Result<FixPlan, FixError> {
    let action = &diagnostic.action;
    let no_fix = || FixError::NoFix {
        code: diagnostic.code.clone(),
    };

    match action.kind {
        ActionKind::HighlightOnly => Err(no_fix()),
        ActionKind::AddAttribute => {
            let name = action.target_attribute.as_deref().ok_or_else(no_fix)?;
            let value = action.new_value.as_deref().unwrap_or_default();
            add_attribute(current_text, diagnostic.element, name, value)
        }
        ActionKind::ReplaceAttributeValue => {
            let name = action.target_attribute.as_deref().ok_or_else(no_fix)?;
            let value = action.new_value.as_deref().unwrap_or_default();
            let element = element_at(current_text, diagnostic.element)?;
            let attribute = inline_attribute(&element, name)?;
            let literal = text_of(current_text, attribute.span)?;
            Ok(FixPlan::new(element.start_tag).replace(literal, format!("{}=\"{}\"", name, escape(value))))
        }
        ActionKind::RemoveAttribute => {
            let name = action.target_attribute.as_deref().ok_or_else(no_fix)?;
            let element = element_at(current_text, diagnostic.element)?;
            let attribute = inline_attribute(&element, name)?;
            // Take the whitespace in front of the attribute with it
            let before = text_of(current_text, Span::from_range(element.start_tag.start, attribute.span.start))?;
            let start = attribute.span.start - (before.len() - before.trim_end().len());
            let literal = text_of(current_text, Span::from_range(start, attribute.span.end()))?;
            Ok(FixPlan::new(element.start_tag).replace(literal, ""))
        }
        ActionKind::RenameElement => {
            let new_name = action.new_value.as_deref().ok_or_else(no_fix)?;
            let element = element_at(current_text, diagnostic.element)?;
            let region_text = text_of(current_text, element.span)?;
            Ok(FixPlan::new(element.span)
                .replace(format!("</{}", element.name), format!("</{}", new_name))
                .replace(format!("<{}", element.name), format!("<{}", new_name))
                .excluding(exclusions(region_text, &element.name)))
        }
        ActionKind::InsertDefinition => {
            let details = action.details.as_ref().ok_or_else(no_fix)?;
            insert_definition(current_text, details)
        }
        ActionKind::AddDefinitions => {
            let details = action.details.as_ref().ok_or_else(no_fix)?;
            add_definitions(current_text, details)
        }
    }
}

/// The region after `plan` is applied to it
pub fn preview_fix(plan: &FixPlan, current_text: &str) -> Result<String, FixError> {
    let region = text_of(current_text, plan.region)?;
    Ok(render_preview(
        region,
        &plan.replacements,
        &plan.exclusions,
        plan.insertion.as_ref(),
    ))
}

/// `current_text` with `plan` applied
///
/// Fails with [`FixError::Stale`] when no replacement matched and there is
/// nothing to insert.
pub fn apply_fix(plan: &FixPlan, current_text: &str) -> Result<FixOutcome, FixError> {
    let region = text_of(current_text, plan.region)?;
    let (patched, matched) = render(region, &plan.replacements, &plan.exclusions, plan.insertion.as_ref());

    if matched == 0 && plan.insertion.is_none() {
        debug!("no replacement matched in {}", plan.region);
        return Err(FixError::Stale);
    }

    let mut text = String::with_capacity(current_text.len() + patched.len());
    text.push_str(&current_text[..plan.region.start]);
    text.push_str(&patched);
    text.push_str(&current_text[plan.region.end()..]);

    Ok(FixOutcome {
        changed: text != current_text,
        text,
        replacements_matched: matched,
    })
}

/// Build and apply the fix for `diagnostic` in one step
pub fn fix(diagnostic: &Diagnostic, current_text: &str) -> Result<FixOutcome, FixError> {
    let plan = build_fix(diagnostic, current_text)?;
    apply_fix(&plan, current_text)
}

fn text_of(text: &str, span: Span) -> Result<&str, FixError> {
    text.get(span.start..span.end())
        .ok_or(FixError::RegionOutOfBounds {
            start: span.start,
            end: span.end(),
            len: text.len(),
        })
}

/// The element that starts `region`, read from the current text
fn element_at(text: &str, region: Span) -> Result<Element, FixError> {
    let region_text = text_of(text, region)?;
    try_extract(region_text, region.start).map_err(|err| {
        debug!("element at {} no longer parses: {}", region, err);
        FixError::Stale
    })
}

fn inline_attribute<'a>(element: &'a Element, name: &str) -> Result<&'a Attribute, FixError> {
    element
        .attributes_named(name)
        .find(|a| a.is_inline(element))
        .ok_or(FixError::Stale)
}

fn add_attribute(text: &str, region: Span, name: &str, value: &str) -> Result<FixPlan, FixError> {
    let element = element_at(text, region)?;
    if element.attributes_named(name).any(|a| a.is_inline(&element)) {
        return Err(FixError::Stale);
    }

    let head = format!("<{}", element.name);
    let mut plan = FixPlan::new(element.span).replace(
        head.as_str(),
        format!("<{} {}=\"{}\"", element.name, name, escape(value)),
    );
    if element.span.length > head.len() {
        plan.exclusions.insert(head.len(), element.span.length - 1);
    }
    Ok(plan)
}

/// Shift every later row (or column) down by one and copy the definition in
fn insert_definition(text: &str, details: &DefinitionDetails) -> Result<FixPlan, FixError> {
    let grid = element_at(text, details.grid)?;
    let region_text = text_of(text, grid.span)?;
    let offset = local_offset(&grid, details.insert_position)?;

    let property = details.axis.attached_property();
    let markup = details
        .markup
        .clone()
        .unwrap_or_else(|| default_definition(details.axis));

    let mut plan = FixPlan::new(grid.span)
        .excluding(placement_exclusions(region_text, &grid.name))
        .insert(offset, markup);
    // Highest first, so no pair can match what an earlier one wrote
    for i in (details.index..details.existing_count).rev() {
        plan = plan.replace(
            format!(" {}=\"{}\"", property, i),
            format!(" {}=\"{}\"", property, i + 1),
        );
    }
    Ok(plan)
}

/// Declare enough definitions for `details.total_required` to resolve
fn add_definitions(text: &str, details: &DefinitionDetails) -> Result<FixPlan, FixError> {
    let grid = element_at(text, details.grid)?;
    let axis = details.axis;
    let property = axis.definitions_property();
    let unit = indent_unit(&details.left_pad);

    let current = resolve_attribute(&grid, property, AttributeForm::InlineOrElement);

    match current.and_then(|found| found.attribute) {
        Some(attribute) if attribute.is_inline(&grid) => {
            let existing = attribute.string_value().unwrap_or_default();
            let count = existing.split(',').count();
            let missing = details.total_required.saturating_sub(count);
            if missing == 0 {
                return Err(FixError::Stale);
            }
            let literal = text_of(text, attribute.span)?;
            let extended = format!("{}{}", existing, ",*".repeat(missing));
            Ok(FixPlan::new(grid.start_tag).replace(literal, format!("{}=\"{}\"", property, extended)))
        }
        Some(collection) => {
            let missing = details.total_required.saturating_sub(collection_len(collection));
            if missing == 0 {
                return Err(FixError::Stale);
            }
            let literal = text_of(text, collection.span)?;
            let definitions = vec![default_definition(axis); missing];

            if literal.ends_with("/>") {
                // `<Grid.RowDefinitions />` has nowhere to insert into
                let block = definitions_block(&grid.name, property, &definitions, &details.left_pad, unit, newline_for(text));
                return Ok(FixPlan::new(grid.span).replace(literal, block.trim_start()));
            }

            let closing = format!("</{}.{}", grid.name, property);
            let at = literal.rfind(&closing).ok_or(FixError::Stale)?;
            let absolute = collection.span.start + at;
            let fragment = if at_line_start(text, absolute) {
                let line_start = text[..absolute].rfind('\n').map_or(0, |i| i + 1);
                let separator = format!("{}{}{}", newline_for(text), &text[line_start..absolute], unit);
                format!("{}{}", unit, definitions.join(separator.as_str()))
            } else {
                definitions.concat()
            };
            Ok(FixPlan::new(grid.span).insert(local_offset(&grid, absolute)?, fragment))
        }
        None => {
            if grid.is_self_closing() {
                return Err(FixError::Stale);
            }
            let definitions = vec![default_definition(axis); details.total_required];
            let block = definitions_block(&grid.name, property, &definitions, &details.left_pad, unit, newline_for(text));
            Ok(FixPlan::new(grid.span).insert(grid.start_tag.length, block))
        }
    }
}

fn default_definition(axis: Axis) -> String {
    format!("<{} {}=\"*\" />", axis.definition_tag(), axis.size_property())
}

/// A line break followed by a whole `<Grid.RowDefinitions>` element
fn definitions_block(
    owner: &str,
    property: &str,
    definitions: &[String],
    left_pad: &str,
    unit: &str,
    newline: &str,
) -> String {
    let mut block = format!("{}{}<{}.{}>", newline, left_pad, owner, property);
    for definition in definitions {
        block.push_str(&format!("{}{}{}{}", newline, left_pad, unit, definition));
    }
    block.push_str(&format!("{}{}</{}.{}>", newline, left_pad, owner, property));
    block
}

fn local_offset(grid: &Element, absolute: usize) -> Result<usize, FixError> {
    if absolute < grid.span.start || absolute > grid.span.end() {
        return Err(FixError::RegionOutOfBounds {
            start: absolute,
            end: absolute,
            len: grid.span.end(),
        });
    }
    Ok(absolute - grid.span.start)
}

/// Exclusions for renumbering placements inside a grid
///
/// A nested grid's own start tag stays editable, since its `Grid.Row`
/// belongs to the outer grid.
fn placement_exclusions(region_text: &str, grid_name: &str) -> ExclusionMap {
    exclusions(region_text, grid_name)
        .iter()
        .filter_map(|(start, end)| {
            if region_text[start..].starts_with("<!--") {
                return Some((start, end));
            }
            let body = tag_end(region_text, start)? + 1;
            (body <= end).then_some((body, end))
        })
        .collect()
}

/// How many fixes `Fixer::fix_text` applied, and which it gave up on
#[derive(Debug, Clone, Default)]
pub struct FixReport {
    pub text: String,
    pub applied: usize,
    /// Diagnostics whose fix was stale or out of range
    pub failed: Vec<String>,
}

impl FixReport {
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

/// Applies fixes to a document one at a time, re-analyzing after each
pub struct Fixer<'e> {
    engine: &'e Engine,
    max_passes: usize,
    include_info: bool,
    codes: Option<HashSet<String>>,
}

impl<'e> Fixer<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            max_passes: 100,
            include_info: false,
            codes: None,
        }
    }

    /// Stop after this many applied fixes
    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }

    /// Also apply info-level refactorings such as definition inserts
    pub fn with_info_fixes(mut self, include: bool) -> Self {
        self.include_info = include;
        self
    }

    /// Only fix these codes
    pub fn with_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.codes = Some(codes.into_iter().map(|c| c.as_ref().to_uppercase()).collect());
        self
    }

    fn wants(&self, diagnostic: &Diagnostic) -> bool {
        diagnostic.has_fix()
            && (self.include_info || diagnostic.severity > Severity::Info)
            && self
                .codes
                .as_ref()
                .map_or(true, |codes| codes.contains(&diagnostic.code))
    }

    /// Fix `text` until no wanted diagnostic has a working fix
    pub fn fix_text(&self, path: &Path, text: &str) -> FixReport {
        let mut report = FixReport {
            text: text.to_string(),
            ..FixReport::default()
        };
        let mut given_up: HashSet<(String, Span)> = HashSet::new();

        while report.applied < self.max_passes {
            let diagnostics = self.engine.analyze_document(path, &report.text);
            let mut next = None;

            for diagnostic in diagnostics.iter().filter(|d| self.wants(d)) {
                let key = (diagnostic.code.clone(), diagnostic.span);
                if given_up.contains(&key) {
                    continue;
                }
                match fix(diagnostic, &report.text) {
                    Ok(outcome) if outcome.changed => {
                        next = Some(outcome);
                        break;
                    }
                    Ok(_) => {
                        given_up.insert(key);
                    }
                    Err(err) => {
                        warn!(
                            "{}:{}: {} fix skipped: {}",
                            path.display(),
                            diagnostic.line(),
                            diagnostic.code,
                            err
                        );
                        report.failed.push(format!("{}:{} {}", diagnostic.code, diagnostic.line(), err));
                        given_up.insert(key);
                    }
                }
            }

            match next {
                Some(outcome) => {
                    report.text = outcome.text;
                    report.applied += 1;
                }
                None => break,
            }
        }

        report
    }
}

/// Unified diff of `before` against `after` with three lines of context
pub fn unified_diff(path: &Path, before: &str, after: &str) -> String {
    const CONTEXT: usize = 3;

    let old: Vec<&str> = before.lines().collect();
    let new: Vec<&str> = after.lines().collect();
    if old == new {
        return String::new();
    }

    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let start = prefix.saturating_sub(CONTEXT);
    let old_end = (old.len() - suffix + CONTEXT).min(old.len());
    let new_end = (new.len() - suffix + CONTEXT).min(new.len());

    let mut diff = format!("--- a/{}\n+++ b/{}\n", path.display(), path.display());
    diff.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        start + 1,
        old_end - start,
        start + 1,
        new_end - start
    ));
    for line in &old[start..prefix] {
        diff.push_str(&format!(" {}\n", line));
    }
    for line in &old[prefix..old.len() - suffix] {
        diff.push_str(&format!("-{}\n", line));
    }
    for line in &new[prefix..new.len() - suffix] {
        diff.push_str(&format!("+{}\n", line));
    }
    for line in &old[old.len() - suffix..old_end] {
        diff.push_str(&format!(" {}\n", line));
    }

    diff
}
