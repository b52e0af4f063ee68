//! Component trait - what an element is and how it renders.
//!
//! A component decides the host node type, default options, the child
//! list produced on each redraw, extra node attributes, and mount/unmount
//! hooks. Built-in components: [`Tag`] (plain host element) and
//! [`TextLeaf`] (text node).

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use super::attributes::NodeAttributes;
use super::options::{Children, Options};
use super::Element;

/// Host node an element owns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Element node with the given lowercase tag name.
    Tag(Cow<'static, str>),
    /// Text node.
    Text,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Tag(name) => f.write_str(name),
            NodeType::Text => f.write_str("#text"),
        }
    }
}

/// Behaviour of a kind of element.
///
/// Every hook receives the live [`Element`] handle; state lives in the
/// component value (use `Cell`/`RefCell` or signals for mutable state).
/// Hooks must not hold borrows of the element registry across calls back
/// into the element API.
pub trait Component: 'static {
    /// Downcast support; implement as `self`.
    fn as_any(&self) -> &dyn Any;

    /// Host node to create. Defaults to `div`.
    fn node_type(&self) -> NodeType {
        NodeType::Tag(Cow::Borrowed("div"))
    }

    /// Options every description of this component starts from.
    fn default_options(&self) -> Options {
        Options::default()
    }

    /// Child list for this redraw. Returning the same `Rc` as the previous
    /// redraw redraws existing children without re-matching them.
    fn render(&self, element: Element, options: &Options) -> Children {
        let _ = element;
        options.children.clone()
    }

    /// Adjust attributes derived from the options before they are written.
    fn extra_node_attributes(&self, element: Element, attributes: &mut NodeAttributes) {
        let _ = (element, attributes);
    }

    /// Text written into a text node on each redraw.
    fn text_value(&self) -> Option<String> {
        None
    }

    /// Called once, after the host node has been created and inserted.
    fn on_mount(&self, element: Element) {
        let _ = element;
    }

    /// Called first when the element is destroyed.
    fn on_unmount(&self, element: Element) {
        let _ = element;
    }
}

/// Whether an element built from `existing` may take over options built for `candidate`.
pub(crate) fn same_kind(existing: &Rc<dyn Component>, candidate: &Rc<dyn Component>) -> bool {
    Any::type_id(existing.as_any()) == Any::type_id(candidate.as_any())
        && existing.node_type() == candidate.node_type()
}

// =============================================================================
// Built-in Components
// =============================================================================

/// Plain host element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: Cow<'static, str>,
}

impl Tag {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        let name = if name.chars().any(|c| c.is_ascii_uppercase()) {
            Cow::Owned(name.to_ascii_lowercase())
        } else {
            name
        };
        Self { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Component for Tag {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn node_type(&self) -> NodeType {
        NodeType::Tag(self.name.clone())
    }
}

/// Text node holding a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLeaf {
    value: String,
}

impl TextLeaf {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Component for TextLeaf {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn node_type(&self) -> NodeType {
        NodeType::Text
    }

    fn text_value(&self) -> Option<String> {
        Some(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panel;

    impl Component for Panel {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_same_kind() {
        let div: Rc<dyn Component> = Rc::new(Tag::new("div"));
        let other_div: Rc<dyn Component> = Rc::new(Tag::new("DIV"));
        let span: Rc<dyn Component> = Rc::new(Tag::new("span"));
        let panel: Rc<dyn Component> = Rc::new(Panel);
        let text: Rc<dyn Component> = Rc::new(TextLeaf::new("a"));
        let other_text: Rc<dyn Component> = Rc::new(TextLeaf::new("b"));

        assert!(same_kind(&div, &other_div));
        assert!(!same_kind(&div, &span));
        // same node type, different component type
        assert!(!same_kind(&div, &panel));
        assert!(same_kind(&text, &other_text));
        assert!(!same_kind(&text, &div));
    }
}
