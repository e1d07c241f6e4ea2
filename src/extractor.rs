//! Tolerant element extraction
//!
//! Turns the first element in a piece of markup into an [`Element`] tree with
//! absolute offsets. Documents being edited are often not well formed, so the
//! extractor closes children implicitly when an ancestor's end tag arrives and
//! stops reading as soon as the root element is complete.

use crate::element::{local_name, Attribute, AttributeValue, Element};
use crate::span::{comment_spans, Span};
use log::debug;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w:.\-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern is valid")
});

/// Reasons a fragment could not be turned into an element
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no root element found")]
    NoRootElement,

    #[error("element <{name}> is not terminated")]
    Unterminated { name: String },

    #[error("closing tag </{name}> at offset {offset} has no matching start tag")]
    UnmatchedClose { name: String, offset: usize },

    #[error("malformed markup at offset {offset}: {message}")]
    Malformed { offset: usize, message: String },

    #[error("element budget of {limit} exceeded")]
    BudgetExceeded { limit: usize },
}

/// Configurable extractor
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    max_elements: Option<usize>,
}

/// An element whose end tag has not been seen yet
struct Frame {
    name: String,
    start: usize,
    start_tag_end: usize,
    attributes: Vec<Attribute>,
    children: Vec<Element>,
    properties: Vec<Element>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up once more than `limit` elements have been read
    pub fn with_max_elements(mut self, limit: usize) -> Self {
        self.max_elements = Some(limit);
        self
    }

    /// Extract the first element in `text`, offsetting every span by `base_offset`
    pub fn extract(&self, text: &str, base_offset: usize) -> Result<Element, ExtractError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = false;
        reader.config_mut().allow_unmatched_ends = true;

        let mut stack: Vec<Frame> = Vec::new();
        let mut seen = 0usize;

        loop {
            let event = reader.read_event().map_err(|e| ExtractError::Malformed {
                offset: base_offset + reader.error_position() as usize,
                message: e.to_string(),
            })?;
            let end = reader.buffer_position() as usize;

            match event {
                Event::Start(e) => {
                    self.count(&mut seen)?;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let start = tag_start(text, end, &format!("<{}", name));
                    let attributes = inline_attributes(text, start, end, &name, base_offset);
                    stack.push(Frame {
                        name,
                        start,
                        start_tag_end: end,
                        attributes,
                        children: Vec::new(),
                        properties: Vec::new(),
                    });
                }
                Event::Empty(e) => {
                    self.count(&mut seen)?;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let start = tag_start(text, end, &format!("<{}", name));
                    let attributes = inline_attributes(text, start, end, &name, base_offset);
                    let span = Span::from_range(base_offset + start, base_offset + end);
                    let element = Element {
                        name,
                        span,
                        start_tag: span,
                        attributes,
                        children: Vec::new(),
                        content: String::new(),
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.adopt(element),
                        None => return Ok(element),
                    }
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let close_start = tag_start(text, end, "</");

                    let Some(depth) = stack.iter().rposition(|f| f.name == name) else {
                        return Err(ExtractError::UnmatchedClose {
                            name,
                            offset: base_offset + close_start,
                        });
                    };

                    // Children left open are closed where the ancestor's end tag begins
                    while stack.len() > depth + 1 {
                        let Some(frame) = stack.pop() else { break };
                        debug!("implicitly closing <{}> at {}", frame.name, base_offset + close_start);
                        let element = frame.finish(text, close_start, close_start, base_offset);
                        if let Some(parent) = stack.last_mut() {
                            parent.adopt(element);
                        }
                    }

                    let Some(frame) = stack.pop() else {
                        return Err(ExtractError::NoRootElement);
                    };
                    let element = frame.finish(text, close_start, end, base_offset);
                    match stack.last_mut() {
                        Some(parent) => parent.adopt(element),
                        None => return Ok(element),
                    }
                }
                Event::Eof => {
                    return Err(match stack.into_iter().next() {
                        Some(root) => ExtractError::Unterminated { name: root.name },
                        None => ExtractError::NoRootElement,
                    });
                }
                _ => {}
            }
        }
    }

    fn count(&self, seen: &mut usize) -> Result<(), ExtractError> {
        *seen += 1;
        match self.max_elements {
            Some(limit) if *seen > limit => Err(ExtractError::BudgetExceeded { limit }),
            _ => Ok(()),
        }
    }
}

impl Frame {
    /// Property elements fold into attributes, everything else is a structural child
    fn adopt(&mut self, element: Element) {
        if element.name.contains('.') {
            self.properties.push(element);
        } else {
            self.children.push(element);
        }
    }

    fn finish(self, text: &str, inner_end: usize, end: usize, base: usize) -> Element {
        let inner = Span::from_range(self.start_tag_end, inner_end.max(self.start_tag_end));
        let mut removed: Vec<Span> = self
            .children
            .iter()
            .chain(self.properties.iter())
            .map(|e| Span::new(e.span.start - base, e.span.length))
            .collect();
        removed.extend(
            comment_spans(&text[inner.start..inner.end()])
                .into_iter()
                .map(|c| c.shifted(inner.start)),
        );
        let content = residual(text, inner, removed);

        let owner_prefix = format!("{}.", local_name(&self.name));
        let mut attributes = self.attributes;
        attributes.extend(
            self.properties
                .into_iter()
                .map(|property| fold_property(property, &owner_prefix)),
        );

        Element {
            name: self.name,
            span: Span::from_range(base + self.start, base + end),
            start_tag: Span::from_range(base + self.start, base + self.start_tag_end),
            attributes,
            children: self.children,
            content,
        }
    }
}

/// Turn `<Owner.Property>` into an attribute named `Property`
///
/// Attached properties of other owners (`<Grid.Row>` inside a `TextBlock`)
/// keep their qualified name.
fn fold_property(property: Element, owner_prefix: &str) -> Attribute {
    let local = local_name(&property.name);
    let name = local
        .strip_prefix(owner_prefix)
        .unwrap_or(local)
        .to_string();
    let span = property.span;

    let mut elements = property.children;
    // Nested property elements inside a property element are values too
    elements.extend(property.attributes.into_iter().flat_map(|a| match a.value {
        AttributeValue::Element(e) => vec![*e],
        AttributeValue::Children(c) => c,
        AttributeValue::Text(_) => Vec::new(),
    }));
    elements.sort_by_key(|e| e.span.start);

    let value = match elements.len() {
        0 => AttributeValue::Text(property.content),
        1 => AttributeValue::Element(Box::new(elements.remove(0))),
        _ => AttributeValue::Children(elements),
    };

    Attribute { name, value, span }
}

/// Text of `inner` with the `removed` regions cut out, trimmed
fn residual(text: &str, inner: Span, mut removed: Vec<Span>) -> String {
    removed.sort();
    let mut content = String::new();
    let mut pos = inner.start;

    for span in removed {
        if span.start > pos {
            content.push_str(&text[pos..span.start.min(inner.end())]);
        }
        pos = pos.max(span.end());
    }
    if pos < inner.end() {
        content.push_str(&text[pos..inner.end()]);
    }

    content.trim().to_string()
}

/// Offset of the `prefix` that opens the tag ending at `end`
fn tag_start(text: &str, end: usize, prefix: &str) -> usize {
    text[..end].rfind(prefix).unwrap_or(0)
}

/// Inline attributes of the start tag at `[start, end)`, duplicates retained
fn inline_attributes(text: &str, start: usize, end: usize, name: &str, base: usize) -> Vec<Attribute> {
    let head = (start + 1 + name.len()).min(end);
    let region = &text[head..end];

    ATTRIBUTE_RE
        .captures_iter(region)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let raw = cap.get(2).or_else(|| cap.get(3)).map_or("", |m| m.as_str());
            let value = unescape(raw).map_or_else(|_| raw.to_string(), |v| v.into_owned());
            Some(Attribute::inline(
                &cap[1],
                value,
                Span::new(base + head + whole.start(), whole.len()),
            ))
        })
        .collect()
}

/// Extract the first element in `text`, reporting why it failed
pub fn try_extract(text: &str, base_offset: usize) -> Result<Element, ExtractError> {
    Extractor::new().extract(text, base_offset)
}

/// Extract the first element in `text`, or `None` when the markup is incomplete
pub fn extract(text: &str, base_offset: usize) -> Option<Element> {
    match try_extract(text, base_offset) {
        Ok(element) => Some(element),
        Err(err) => {
            debug!("skipping fragment at {}: {}", base_offset, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_element() {
        let text = r#"<TextBlock Text="Hello" Grid.Row="1" />"#;
        let element = try_extract(text, 0).unwrap();

        assert_eq!(element.name, "TextBlock");
        assert_eq!(element.span, Span::new(0, text.len()));
        assert!(element.is_self_closing());
        assert_eq!(element.attributes.len(), 2);
        assert_eq!(element.attributes[0].name, "Text");
        assert_eq!(element.attributes[0].string_value(), Some("Hello"));
        let row = &element.attributes[1];
        assert_eq!(&text[row.span.start..row.span.end()], r#"Grid.Row="1""#);
    }

    #[test]
    fn test_base_offset_applies_to_every_span() {
        let text = r#"<Grid><Button Content="Go" /></Grid>"#;
        let element = try_extract(text, 100).unwrap();

        assert_eq!(element.span, Span::new(100, text.len()));
        assert_eq!(element.start_tag, Span::new(100, 6));
        let button = &element.children[0];
        assert_eq!(button.span.start, 106);
        assert_eq!(button.attributes[0].span.start, 100 + text.find("Content").unwrap());
    }

    #[test]
    fn test_children_and_content() {
        let text = "<StackPanel>\n  <TextBlock>Hi &amp; bye</TextBlock>\n  <!-- note -->\n  tail\n</StackPanel>";
        let element = try_extract(text, 0).unwrap();

        assert_eq!(element.children.len(), 1);
        assert_eq!(element.children[0].content, "Hi &amp; bye");
        assert_eq!(element.content, "tail");
    }

    #[test]
    fn test_property_element_collection() {
        let text = r#"<Grid><Grid.RowDefinitions><RowDefinition Height="*" /><RowDefinition /></Grid.RowDefinitions><Button /></Grid>"#;
        let element = try_extract(text, 0).unwrap();

        assert_eq!(element.children.len(), 1);
        let rows = element.attribute("RowDefinitions").unwrap();
        assert!(matches!(rows.value, AttributeValue::Children(ref c) if c.len() == 2));
        assert!(!rows.is_inline(&element));
        assert_eq!(element.content, "");
    }

    #[test]
    fn test_property_element_single_and_text() {
        let text = "<Button><Button.Content><TextBlock /></Button.Content><Button.Tag>plain</Button.Tag></Button>";
        let element = try_extract(text, 0).unwrap();

        assert_eq!(
            element.attribute("Content").and_then(|a| a.element_value()).map(|e| e.name.as_str()),
            Some("TextBlock")
        );
        assert_eq!(element.attribute("Tag").and_then(|a| a.string_value()), Some("plain"));
        assert!(element.children.is_empty());
    }

    #[test]
    fn test_attached_property_element_keeps_qualified_name() {
        let text = "<TextBlock><Grid.Row>2</Grid.Row></TextBlock>";
        let element = try_extract(text, 0).unwrap();
        assert_eq!(element.attribute("Grid.Row").and_then(|a| a.string_value()), Some("2"));
    }

    #[test]
    fn test_duplicate_attributes_retained() {
        let text = r#"<TextBlock Text="a" Text="b" />"#;
        let element = try_extract(text, 0).unwrap();
        assert_eq!(element.attributes_named("Text").count(), 2);
        assert_eq!(element.attribute("Text").and_then(|a| a.string_value()), Some("a"));
    }

    #[test]
    fn test_unclosed_child_closed_by_parent_end_tag() {
        let text = r#"<Grid><TextBlock Grid.Row="1"></Grid>"#;
        let element = try_extract(text, 0).unwrap();

        assert_eq!(element.span, Span::new(0, text.len()));
        assert_eq!(element.children.len(), 1);
        let child = &element.children[0];
        assert_eq!(child.name, "TextBlock");
        assert_eq!(child.span.end(), text.find("</Grid>").unwrap());
    }

    #[test]
    fn test_stops_after_root() {
        let text = "<Button /></Oops><Other>";
        let element = try_extract(text, 0).unwrap();
        assert_eq!(element.name, "Button");
    }

    #[test]
    fn test_leading_prolog_and_comments_skipped() {
        let text = "<?xml version=\"1.0\"?>\n<!-- header -->\n<Page></Page>";
        let element = try_extract(text, 0).unwrap();
        assert_eq!(element.name, "Page");
        assert_eq!(element.span.start, text.find("<Page").unwrap());
    }

    #[test]
    fn test_errors() {
        assert_eq!(try_extract("", 0), Err(ExtractError::NoRootElement));
        assert_eq!(try_extract("just text", 0), Err(ExtractError::NoRootElement));
        assert_eq!(
            try_extract("<Grid><Button />", 0),
            Err(ExtractError::Unterminated { name: "Grid".to_string() })
        );
        assert!(matches!(
            try_extract("</Grid>", 5),
            Err(ExtractError::UnmatchedClose { offset: 5, .. })
        ));
        assert!(extract("<Grid><Button />", 0).is_none());
    }

    #[test]
    fn test_budget() {
        let text = "<Grid><Button /><Button /><Button /></Grid>";
        let limited = Extractor::new().with_max_elements(2);
        assert_eq!(limited.extract(text, 0), Err(ExtractError::BudgetExceeded { limit: 2 }));
        assert!(Extractor::new().with_max_elements(4).extract(text, 0).is_ok());
    }

    #[test]
    fn test_child_reextraction_matches_tree() {
        let text = r#"<Grid>
    <StackPanel Grid.Row="1">
        <TextBlock Text="a" />
        <Button><Button.Content>Go</Button.Content></Button>
    </StackPanel>
</Grid>"#;
        let parent = try_extract(text, 0).unwrap();

        for child in parent.descendants().skip(1) {
            let local = &text[child.span.start..child.span.end()];
            let again = try_extract(local, child.span.start).unwrap();
            assert_eq!(&again, child);
        }
    }
}
