//! Namespace-aware XML element tree.
//!
//! WS-Management messages are small documents that get built up, searched
//! by tag + namespace, and grafted into one another (enumeration pages are
//! appended to the first response's `Items`). A plain owned tree is enough
//! for that; parsing and serialization are delegated to `quick-xml`.

mod reader;
mod writer;

pub use reader::parse;
pub use writer::write;

/// Matches any namespace in the search helpers.
pub const ANY_NAMESPACE: &str = "*";

/// The reserved `xml:` namespace.
pub const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";

/// An attribute, optionally namespace-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Local name
    pub name: String,
    /// Namespace URI, empty when unqualified
    pub namespace: String,
    /// Unescaped value
    pub value: String,
}

/// An XML element with its text content and children.
///
/// Mixed content is not modelled: `text` is the concatenation of every text
/// chunk directly inside the element, and the writer emits it before the
/// children. WS-Management payloads never interleave the two.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    name: String,
    namespace: String,
    attributes: Vec<Attribute>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Create an empty element.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Local name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace URI (empty when unqualified).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text content.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Builder form of [`Element::set_text`].
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Set an attribute, replacing one with the same name and namespace.
    pub fn set_attr(
        &mut self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        value: impl Into<String>,
    ) {
        let (name, namespace, value) = (name.into(), namespace.into(), value.into());
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name == name && a.namespace == namespace)
        {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name,
                namespace,
                value,
            }),
        }
    }

    /// Builder form of [`Element::set_attr`] for an unqualified attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, "", value);
        self
    }

    /// Builder form of [`Element::set_attr`] for a qualified attribute.
    pub fn with_ns_attr(
        mut self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set_attr(name, namespace, value);
        self
    }

    /// Value of the first attribute with this local name, whatever its namespace.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Append a child.
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Builder form of [`Element::push`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// Append several children, preserving their order.
    pub fn extend(&mut self, children: impl IntoIterator<Item = Element>) {
        self.children.extend(children);
    }

    /// Direct children.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Mutable access to the direct children.
    pub fn children_mut(&mut self) -> &mut Vec<Element> {
        &mut self.children
    }

    /// Remove and return every child.
    pub fn take_children(&mut self) -> Vec<Element> {
        std::mem::take(&mut self.children)
    }

    /// Whether this element has the given tag. `namespace` may be [`ANY_NAMESPACE`].
    pub fn is(&self, name: &str, namespace: &str) -> bool {
        self.name == name && (namespace == ANY_NAMESPACE || self.namespace == namespace)
    }

    /// First direct child with the given tag.
    pub fn child(&self, name: &str, namespace: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(name, namespace))
    }

    /// Mutable form of [`Element::child`].
    pub fn child_mut(&mut self, name: &str, namespace: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.is(name, namespace))
    }

    /// Depth-first search, starting with this element.
    pub fn find(&self, name: &str, namespace: &str) -> Option<&Element> {
        if self.is(name, namespace) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name, namespace))
    }

    /// Mutable form of [`Element::find`].
    pub fn find_mut(&mut self, name: &str, namespace: &str) -> Option<&mut Element> {
        if self.is(name, namespace) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_mut(name, namespace))
    }
}

/// Depth-first search over a list of sibling trees.
pub fn find_in<'a>(elements: &'a [Element], name: &str, namespace: &str) -> Option<&'a Element> {
    elements.iter().find_map(|e| e.find(name, namespace))
}

/// Mutable form of [`find_in`].
pub fn find_in_mut<'a>(
    elements: &'a mut [Element],
    name: &str,
    namespace: &str,
) -> Option<&'a mut Element> {
    elements.iter_mut().find_map(|e| e.find_mut(name, namespace))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("Root", "urn:a")
            .with_child(
                Element::new("Items", "urn:b")
                    .with_child(Element::new("Item", "urn:c").with_text("one"))
                    .with_child(Element::new("Item", "urn:c").with_text("two")),
            )
            .with_child(Element::new("Items", "urn:a"))
    }

    #[test]
    fn test_find_respects_namespace() {
        let root = sample();
        assert!(root.find("Items", "urn:b").is_some());
        assert!(root.find("Items", "urn:zzz").is_none());
        assert_eq!(root.find("Item", "urn:c").map(Element::text), Some("one"));
    }

    #[test]
    fn test_find_any_namespace_returns_first_in_document_order() {
        let root = sample();
        let items = root.find("Items", ANY_NAMESPACE).unwrap();
        assert_eq!(items.namespace(), "urn:b");
        assert_eq!(items.children().len(), 2);
    }

    #[test]
    fn test_set_attr_replaces_same_name() {
        let mut el = Element::new("Option", "urn:w").with_attr("Name", "A");
        el.set_attr("Name", "", "B");
        assert_eq!(el.attributes().len(), 1);
        assert_eq!(el.attr("Name"), Some("B"));
    }

    #[test]
    fn test_find_in_mut_allows_grafting() {
        let mut list = vec![sample()];
        let items = find_in_mut(&mut list, "Items", "urn:b").unwrap();
        items.push(Element::new("Item", "urn:c").with_text("three"));
        let texts: Vec<_> = find_in(&list, "Items", "urn:b")
            .unwrap()
            .children()
            .iter()
            .map(Element::text)
            .collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }
}
