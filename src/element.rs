//! Element tree produced by the extractor

use crate::span::Span;
use serde::Serialize;

/// One markup tag instance with absolute source offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    /// Tag name as written, possibly namespace-qualified (`controls:Grid`)
    pub name: String,
    /// Whole element, start tag through end tag
    pub span: Span,
    /// Just the start tag (`<Name ... >` or `<Name ... />`)
    pub start_tag: Span,
    /// Inline attributes in source order, then folded property elements
    pub attributes: Vec<Attribute>,
    /// Structural children (property elements excluded)
    pub children: Vec<Element>,
    /// Residual text once children, property elements and comments are removed
    pub content: String,
}

impl Element {
    /// Tag name without any namespace prefix
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn is_self_closing(&self) -> bool {
        self.span == self.start_tag
    }

    /// First attribute with the given name (inline or property element)
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Every attribute with the given name, duplicates included
    pub fn attributes_named<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Attribute> + 'n
    where
        'a: 'n,
    {
        self.attributes.iter().filter(move |a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Depth-first iterator over this element and every structural descendant
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order walk over an element tree
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// One property assignment on an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    /// `Name="value"` for inline attributes, the whole property element otherwise
    pub span: Span,
}

impl Attribute {
    pub fn inline(name: impl Into<String>, value: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Text(value.into()),
            span,
        }
    }

    pub fn has_string_value(&self) -> bool {
        matches!(self.value, AttributeValue::Text(_))
    }

    pub fn string_value(&self) -> Option<&str> {
        match &self.value {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn element_value(&self) -> Option<&Element> {
        match &self.value {
            AttributeValue::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Elements held by the value, whether a single element or a collection
    pub fn elements(&self) -> &[Element] {
        match &self.value {
            AttributeValue::Text(_) => &[],
            AttributeValue::Element(element) => std::slice::from_ref(element.as_ref()),
            AttributeValue::Children(children) => children,
        }
    }

    /// Whether the attribute was written inline rather than as a property element
    pub fn is_inline(&self, owner: &Element) -> bool {
        owner.start_tag.encloses(&self.span)
    }
}

/// The three shapes an attribute value can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// `Attr="value"`, or a property element with a plain-text body
    Text(String),
    /// A property element holding exactly one element
    Element(Box<Element>),
    /// A property element holding several elements (`RowDefinitions`)
    Children(Vec<Element>),
}

/// Strip a namespace prefix from a tag or attribute name
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, start: usize, length: usize) -> Element {
        Element {
            name: name.to_string(),
            span: Span::new(start, length),
            start_tag: Span::new(start, length),
            attributes: Vec::new(),
            children: Vec::new(),
            content: String::new(),
        }
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("controls:Grid"), "Grid");
        assert_eq!(local_name("Grid"), "Grid");
        assert_eq!(leaf("muxc:TextBlock", 0, 5).local_name(), "TextBlock");
    }

    #[test]
    fn test_attribute_value_forms() {
        let text = Attribute::inline("Text", "Hello", Span::new(10, 12));
        assert!(text.has_string_value());
        assert_eq!(text.string_value(), Some("Hello"));
        assert!(text.elements().is_empty());

        let single = Attribute {
            name: "Content".to_string(),
            value: AttributeValue::Element(Box::new(leaf("Button", 5, 10))),
            span: Span::new(0, 30),
        };
        assert!(!single.has_string_value());
        assert_eq!(single.string_value(), None);
        assert_eq!(single.elements().len(), 1);
        assert_eq!(single.element_value().map(|e| e.name.as_str()), Some("Button"));

        let many = Attribute {
            name: "RowDefinitions".to_string(),
            value: AttributeValue::Children(vec![leaf("RowDefinition", 1, 5), leaf("RowDefinition", 7, 5)]),
            span: Span::new(0, 20),
        };
        assert_eq!(many.elements().len(), 2);
        assert!(many.element_value().is_none());
    }

    #[test]
    fn test_first_match_lookup_keeps_duplicates() {
        let mut element = leaf("TextBlock", 0, 40);
        element.attributes.push(Attribute::inline("Text", "one", Span::new(11, 10)));
        element.attributes.push(Attribute::inline("Text", "two", Span::new(22, 10)));

        assert_eq!(element.attribute("Text").and_then(|a| a.string_value()), Some("one"));
        assert_eq!(element.attributes_named("Text").count(), 2);
        assert!(!element.has_attribute("Header"));
    }

    #[test]
    fn test_named_attributes_outlive_lookup_name() {
        fn named<'a>(element: &'a Element, name: &str) -> Vec<&'a Attribute> {
            element.attributes_named(name).collect()
        }

        let mut element = leaf("Grid", 0, 40);
        element.attributes.push(Attribute::inline("Grid.Row", "1", Span::new(6, 12)));

        let found = {
            let name = format!("Grid.{}", "Row");
            named(&element, &name)
        };
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span, Span::new(6, 12));
    }

    #[test]
    fn test_descendants_pre_order() {
        let mut root = leaf("Grid", 0, 100);
        let mut panel = leaf("StackPanel", 10, 50);
        panel.children.push(leaf("Button", 20, 5));
        root.children.push(panel);
        root.children.push(leaf("TextBlock", 70, 5));

        let names: Vec<_> = root.descendants().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Grid", "StackPanel", "Button", "TextBlock"]);
    }
}
