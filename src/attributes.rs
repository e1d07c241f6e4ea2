//! Attribute resolution across inline, property-element and content forms

use crate::element::{Attribute, AttributeValue, Element};
use crate::span::Span;

/// Where a caller is willing to look for an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeForm {
    /// `Attr="value"` in the start tag
    Inline,
    /// `<Owner.Attr>...</Owner.Attr>`
    Element,
    InlineOrElement,
    /// Inline, property element, or the element's own text content
    Any,
}

impl AttributeForm {
    fn allows_inline(self) -> bool {
        matches!(self, Self::Inline | Self::InlineOrElement | Self::Any)
    }

    fn allows_element(self) -> bool {
        matches!(self, Self::Element | Self::InlineOrElement | Self::Any)
    }
}

/// How a resolved value was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSource {
    Inline,
    PropertyElement,
    Content,
}

/// A located attribute value
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAttribute<'a> {
    pub source: AttributeSource,
    /// The attribute as written, or the whole element for content values
    pub span: Span,
    /// Present when the value is plain text
    pub value: Option<&'a str>,
    /// Absent for content values
    pub attribute: Option<&'a Attribute>,
}

impl<'a> ResolvedAttribute<'a> {
    /// Elements held by a property-element value
    pub fn elements(&self) -> &'a [Element] {
        self.attribute.map(|a| a.elements()).unwrap_or(&[])
    }
}

/// Locate `name` on `element` in any of the forms `form` allows
///
/// Inline wins over a property element; content is only consulted for
/// [`AttributeForm::Any`] and only when it is not empty.
pub fn resolve_attribute<'a>(
    element: &'a Element,
    name: &str,
    form: AttributeForm,
) -> Option<ResolvedAttribute<'a>> {
    let mut found: Option<ResolvedAttribute<'a>> = None;

    for attribute in element.attributes_named(name) {
        let inline = attribute.is_inline(element);
        let source = if inline {
            AttributeSource::Inline
        } else {
            AttributeSource::PropertyElement
        };
        let allowed = if inline {
            form.allows_inline()
        } else {
            form.allows_element()
        };
        if !allowed {
            continue;
        }

        let resolved = ResolvedAttribute {
            source,
            span: attribute.span,
            value: attribute.string_value(),
            attribute: Some(attribute),
        };
        if inline {
            return Some(resolved);
        }
        found.get_or_insert(resolved);
    }

    if found.is_none() && form == AttributeForm::Any && !element.content.is_empty() {
        found = Some(ResolvedAttribute {
            source: AttributeSource::Content,
            span: element.span,
            value: Some(&element.content),
            attribute: None,
        });
    }

    found
}

/// Plain-text value of `name`, inline or as a property element
pub fn string_attribute<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    resolve_attribute(element, name, AttributeForm::InlineOrElement).and_then(|r| r.value)
}

/// Non-negative integer value of `name`, ignoring surrounding whitespace
pub fn integer_attribute(element: &Element, name: &str) -> Option<usize> {
    string_attribute(element, name).and_then(|v| v.trim().parse().ok())
}

/// Whether any of `names` is set on `element` in any attribute form
pub fn has_any_attribute(element: &Element, names: &[&str]) -> bool {
    names.iter().any(|n| element.has_attribute(n))
}

/// `{Binding ...}`, `{x:Bind ...}`, `{StaticResource ...}` and other markup extensions
///
/// `{}` is the escape sequence for a literal that starts with a brace.
pub fn is_markup_extension(value: &str) -> bool {
    let value = value.trim_start();
    value.starts_with('{') && !value.starts_with("{}")
}

/// Localization identifier set on the element, if any
pub fn uid(element: &Element) -> Option<&str> {
    string_attribute(element, "x:Uid").or_else(|| string_attribute(element, "Uid"))
}

/// Number of definition elements in a property-element collection value
pub fn collection_len(attribute: &Attribute) -> usize {
    match &attribute.value {
        AttributeValue::Text(_) => 0,
        AttributeValue::Element(_) => 1,
        AttributeValue::Children(children) => children.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::try_extract;

    #[test]
    fn test_inline_form() {
        let element = try_extract(r#"<TextBlock Text="Hi" />"#, 0).unwrap();
        let found = resolve_attribute(&element, "Text", AttributeForm::Inline).unwrap();
        assert_eq!(found.source, AttributeSource::Inline);
        assert_eq!(found.value, Some("Hi"));
        assert!(resolve_attribute(&element, "Text", AttributeForm::Element).is_none());
    }

    #[test]
    fn test_property_element_form() {
        let element =
            try_extract("<TextBlock><TextBlock.Text>Hi</TextBlock.Text></TextBlock>", 0).unwrap();
        assert!(resolve_attribute(&element, "Text", AttributeForm::Inline).is_none());
        let found = resolve_attribute(&element, "Text", AttributeForm::InlineOrElement).unwrap();
        assert_eq!(found.source, AttributeSource::PropertyElement);
        assert_eq!(found.value, Some("Hi"));
        assert_eq!(string_attribute(&element, "Text"), Some("Hi"));
    }

    #[test]
    fn test_inline_preferred_over_property_element() {
        let mut element = try_extract(
            r#"<TextBlock><TextBlock.Text>Late</TextBlock.Text></TextBlock>"#,
            0,
        )
        .unwrap();
        let start_tag = element.start_tag;
        element
            .attributes
            .push(Attribute::inline("Text", "Early", start_tag));
        let found = resolve_attribute(&element, "Text", AttributeForm::Any).unwrap();
        assert_eq!(found.value, Some("Early"));
    }

    #[test]
    fn test_content_form() {
        let element = try_extract("<TextBlock>Hello world</TextBlock>", 0).unwrap();
        assert!(resolve_attribute(&element, "Text", AttributeForm::InlineOrElement).is_none());
        let found = resolve_attribute(&element, "Text", AttributeForm::Any).unwrap();
        assert_eq!(found.source, AttributeSource::Content);
        assert_eq!(found.value, Some("Hello world"));
        assert!(found.attribute.is_none());

        let empty = try_extract("<TextBlock></TextBlock>", 0).unwrap();
        assert!(resolve_attribute(&empty, "Text", AttributeForm::Any).is_none());
    }

    #[test]
    fn test_collection_value() {
        let element = try_extract(
            "<Grid><Grid.ColumnDefinitions><ColumnDefinition /><ColumnDefinition /></Grid.ColumnDefinitions></Grid>",
            0,
        )
        .unwrap();
        let found = resolve_attribute(&element, "ColumnDefinitions", AttributeForm::Element).unwrap();
        assert_eq!(found.value, None);
        assert_eq!(found.elements().len(), 2);
        assert_eq!(found.attribute.map(collection_len), Some(2));
    }

    #[test]
    fn test_integer_attribute() {
        let element = try_extract(r#"<Button Grid.Row=" 3 " Grid.Column="x" />"#, 0).unwrap();
        assert_eq!(integer_attribute(&element, "Grid.Row"), Some(3));
        assert_eq!(integer_attribute(&element, "Grid.Column"), None);
        assert_eq!(integer_attribute(&element, "Grid.RowSpan"), None);
        assert!(has_any_attribute(&element, &["Grid.RowSpan", "Grid.Row"]));
    }

    #[test]
    fn test_markup_extension() {
        assert!(is_markup_extension("{Binding Name}"));
        assert!(is_markup_extension(" {x:Bind Title}"));
        assert!(!is_markup_extension("{}{literal}"));
        assert!(!is_markup_extension("Plain"));
    }

    #[test]
    fn test_uid() {
        let element = try_extract(r#"<TextBlock x:Uid="Title" Text="Hi" />"#, 0).unwrap();
        assert_eq!(uid(&element), Some("Title"));
    }
}
