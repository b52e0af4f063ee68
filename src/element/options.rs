//! Element options - the declarative description of an element.
//!
//! An [`ElementDesc`] pairs a component with its [`Options`]: key, ref,
//! classes, inline style, attributes, event handlers and children.
//! Descriptions are plain values; they become live [`Element`]s only when
//! the reconciler mounts them (or transplants them onto an existing
//! element with the same key).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::DomEvent;

use super::component::{Component, Tag, TextLeaf};
use super::registry::current_owner;
use super::Element;

// =============================================================================
// Key
// =============================================================================

/// Identity used to match old and new children across a redraw.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Positional fallback key.
    pub(crate) fn positional(prefix: &str, index: usize) -> Self {
        Self(format!("{prefix}{index}"))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value)
    }
}

macro_rules! key_from_integer {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Key {
            fn from(value: $ty) -> Self {
                Self(value.to_string())
            }
        })*
    };
}

key_from_integer!(i32, i64, u32, u64, usize);

// =============================================================================
// Attribute and Style Values
// =============================================================================

/// Attribute value. `Lazy` values are computed each time attributes are applied.
#[derive(Clone)]
pub enum AttrValue {
    Str(String),
    Number(f64),
    Bool(bool),
    Lazy(Rc<dyn Fn() -> String>),
}

impl AttrValue {
    /// String form written for value attributes.
    pub fn to_attribute_string(&self) -> String {
        match self {
            AttrValue::Str(s) => s.clone(),
            AttrValue::Number(n) => n.to_string(),
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Lazy(f) => f(),
        }
    }

    /// Truthiness used for presence-only attributes.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Str(s) => !s.is_empty(),
            AttrValue::Number(n) => *n != 0.0 && !n.is_nan(),
            AttrValue::Bool(b) => *b,
            AttrValue::Lazy(f) => !f().is_empty(),
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            AttrValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            AttrValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            AttrValue::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Number(value as f64)
    }
}

/// CSS properties whose numeric values carry no unit.
const UNITLESS_PROPERTIES: &[&str] = &[
    "flex", "flex-grow", "flex-shrink", "font-weight", "line-height", "opacity", "order",
    "z-index", "zoom",
];

/// Inline style value. Numbers get `px` unless the property is unitless.
#[derive(Clone)]
pub enum StyleValue {
    Str(String),
    Number(f64),
    Lazy(Rc<dyn Fn() -> String>),
}

impl StyleValue {
    fn resolve(&self, property: &str) -> String {
        match self {
            StyleValue::Str(s) => s.clone(),
            StyleValue::Number(n) if UNITLESS_PROPERTIES.contains(&property) => n.to_string(),
            StyleValue::Number(n) => format!("{n}px"),
            StyleValue::Lazy(f) => f(),
        }
    }
}

impl fmt::Debug for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            StyleValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            StyleValue::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Str(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Str(value)
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        StyleValue::Number(value)
    }
}

impl From<i32> for StyleValue {
    fn from(value: i32) -> Self {
        StyleValue::Number(value as f64)
    }
}

/// Ordered inline style declarations.
#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    entries: Vec<(String, StyleValue)>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace in place) a property.
    pub fn set(&mut self, property: &str, value: impl Into<StyleValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == property) {
            Some((_, current)) => *current = value,
            None => self.entries.push((property.to_string(), value)),
        }
    }

    pub fn remove(&mut self, property: &str) {
        self.entries.retain(|(k, _)| k != property);
    }

    pub fn get(&self, property: &str) -> Option<&StyleValue> {
        self.entries.iter().find(|(k, _)| k == property).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` on top of this map.
    pub fn extend(&mut self, other: &StyleMap) {
        for (k, v) in &other.entries {
            self.set(k, v.clone());
        }
    }

    /// Evaluate every value (lazy ones included).
    pub fn resolve(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.resolve(k)))
            .collect()
    }
}

// =============================================================================
// Class Set
// =============================================================================

/// Ordered set of CSS class names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSet {
    names: Vec<String>,
}

impl ClassSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one or more whitespace separated classes.
    pub fn add(&mut self, classes: &str) {
        for name in classes.split_whitespace() {
            if !self.contains(name) {
                self.names.push(name.to_string());
            }
        }
    }

    /// Remove one or more whitespace separated classes.
    pub fn remove(&mut self, classes: &str) {
        for name in classes.split_whitespace() {
            self.names.retain(|n| n != name);
        }
    }

    /// Add when absent, remove when present.
    pub fn toggle(&mut self, name: &str) {
        if self.contains(name) {
            self.remove(name);
        } else {
            self.add(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn union(&mut self, other: &ClassSet) {
        for name in &other.names {
            self.add(name);
        }
    }

    /// Value for the `class` attribute.
    pub fn to_class_string(&self) -> String {
        self.names.join(" ")
    }
}

impl From<&str> for ClassSet {
    fn from(value: &str) -> Self {
        let mut set = ClassSet::new();
        set.add(value);
        set
    }
}

// =============================================================================
// Ref Target
// =============================================================================

/// Where a mounted element registers itself: `owner.get_ref(name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefTarget {
    pub owner: Option<Element>,
    pub name: String,
}

// =============================================================================
// Options
// =============================================================================

/// Declarative event handler.
pub type Handler = Rc<dyn Fn(&DomEvent)>;

/// Ordered children of an element. The `Rc` identity matters: returning the
/// same `Rc` from `render()` as last time skips key matching entirely.
pub type Children = Rc<Vec<Child>>;

/// Everything an element is declared with.
#[derive(Clone, Default)]
pub struct Options {
    pub key: Option<Key>,
    pub ref_target: Option<RefTarget>,
    pub class_name: ClassSet,
    pub style: StyleMap,
    pub attributes: BTreeMap<String, AttrValue>,
    pub handlers: Vec<(String, Handler)>,
    pub children: Children,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the handler for an event type.
    pub fn set_handler(&mut self, event_type: &str, handler: Handler) {
        match self.handlers.iter_mut().find(|(name, _)| name == event_type) {
            Some((_, current)) => *current = handler,
            None => self.handlers.push((event_type.to_string(), handler)),
        }
    }

    pub fn handler(&self, event_type: &str) -> Option<Handler> {
        self.handlers
            .iter()
            .find(|(name, _)| name == event_type)
            .map(|(_, h)| h.clone())
    }

    /// Overlay `other` on top of these options.
    ///
    /// Key, ref and children are replaced when `other` has them; classes
    /// are unioned; style, attributes and handlers are overridden per name.
    pub fn merge(&mut self, other: Options) {
        if other.key.is_some() {
            self.key = other.key;
        }
        if other.ref_target.is_some() {
            self.ref_target = other.ref_target;
        }
        self.class_name.union(&other.class_name);
        self.style.extend(&other.style);
        self.attributes.extend(other.attributes);
        for (name, handler) in other.handlers {
            self.set_handler(&name, handler);
        }
        if !other.children.is_empty() {
            self.children = other.children;
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("key", &self.key)
            .field("ref_target", &self.ref_target)
            .field("class_name", &self.class_name)
            .field("style", &self.style)
            .field("attributes", &self.attributes)
            .field("handlers", &self.handlers.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("children", &self.children.len())
            .finish()
    }
}

// =============================================================================
// Child / ElementDesc
// =============================================================================

/// One entry of a child list.
#[derive(Clone, Debug)]
pub enum Child {
    Element(ElementDesc),
    /// Raw text; wrapped into a text leaf when reconciled.
    Text(String),
}

impl From<ElementDesc> for Child {
    fn from(desc: ElementDesc) -> Self {
        Child::Element(desc)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.to_string())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value)
    }
}

/// A component together with its options, not yet mounted.
#[derive(Clone)]
pub struct ElementDesc {
    pub(crate) component: Rc<dyn Component>,
    pub(crate) options: Options,
}

impl fmt::Debug for ElementDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementDesc")
            .field("node_type", &self.component.node_type())
            .field("options", &self.options)
            .finish()
    }
}

impl ElementDesc {
    /// Describe `component` with its default options.
    pub fn new(component: impl Component) -> Self {
        Self::from_rc(Rc::new(component))
    }

    /// Describe a shared component.
    pub fn from_rc(component: Rc<dyn Component>) -> Self {
        let options = component.default_options();
        Self { component, options }
    }

    pub(crate) fn text_leaf(value: &str) -> Self {
        Self::new(TextLeaf::new(value))
    }

    pub fn component(&self) -> &Rc<dyn Component> {
        &self.component
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Edit the options directly.
    pub fn options_mut(mut self, f: impl FnOnce(&mut Options)) -> Self {
        f(&mut self.options);
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.options.key = Some(key.into());
        self
    }

    /// Register under `name` on the element currently rendering (if any).
    pub fn with_ref(mut self, name: impl Into<String>) -> Self {
        self.options.ref_target = Some(RefTarget {
            owner: current_owner(),
            name: name.into(),
        });
        self
    }

    /// Register under `name` on an explicit owner.
    pub fn with_ref_in(mut self, owner: Element, name: impl Into<String>) -> Self {
        self.options.ref_target = Some(RefTarget {
            owner: Some(owner),
            name: name.into(),
        });
        self
    }

    pub fn class(mut self, classes: &str) -> Self {
        self.options.class_name.add(classes);
        self
    }

    pub fn style(mut self, property: &str, value: impl Into<StyleValue>) -> Self {
        self.options.style.set(property, value);
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.options.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Declare a handler, attached when the element mounts.
    pub fn on(mut self, event_type: &str, handler: impl Fn(&DomEvent) + 'static) -> Self {
        self.options.set_handler(event_type, Rc::new(handler));
        self
    }

    pub fn on_click(self, handler: impl Fn(&DomEvent) + 'static) -> Self {
        self.on("click", handler)
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        Rc::make_mut(&mut self.options.children).push(child.into());
        self
    }

    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        Rc::make_mut(&mut self.options.children).extend(children.into_iter().map(Into::into));
        self
    }
}

// =============================================================================
// Factories
// =============================================================================

/// Declarative construction: component, options on top of its defaults, children.
pub fn create<C, I, K>(component: C, options: Options, children: I) -> ElementDesc
where
    C: Component,
    I: IntoIterator<Item = K>,
    K: Into<Child>,
{
    let mut desc = ElementDesc::new(component);
    desc.options.merge(options);
    desc.children(children)
}

/// Generic DOM tag element.
pub fn tag(name: impl Into<Cow<'static, str>>) -> ElementDesc {
    ElementDesc::new(Tag::new(name))
}

/// Text child.
pub fn text(value: impl Into<String>) -> Child {
    Child::Text(value.into())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_set() {
        let mut classes = ClassSet::from("btn  btn-primary");
        classes.add("btn active");
        assert_eq!(classes.to_class_string(), "btn btn-primary active");
        classes.remove("btn-primary");
        classes.toggle("active");
        classes.toggle("big");
        assert_eq!(classes.to_class_string(), "btn big");
        assert!(classes.contains("big"));
    }

    #[test]
    fn test_style_resolution() {
        let mut style = StyleMap::new();
        style.set("width", 40);
        style.set("opacity", 0.5);
        style.set("color", "red");
        style.set("height", StyleValue::Lazy(Rc::new(|| "3em".to_string())));
        style.set("width", 41);
        assert_eq!(
            style.resolve(),
            vec![
                ("width".to_string(), "41px".to_string()),
                ("opacity".to_string(), "0.5".to_string()),
                ("color".to_string(), "red".to_string()),
                ("height".to_string(), "3em".to_string()),
            ]
        );
    }

    #[test]
    fn test_attr_truthiness() {
        assert!(AttrValue::from(true).is_truthy());
        assert!(!AttrValue::from(false).is_truthy());
        assert!(!AttrValue::from("").is_truthy());
        assert!(AttrValue::from(1).is_truthy());
        assert!(!AttrValue::from(0).is_truthy());
        assert_eq!(AttrValue::from(3).to_attribute_string(), "3");
    }

    #[test]
    fn test_create_merges_defaults() {
        let desc = create(
            Tag::new("button"),
            Options {
                key: Some(Key::from(7)),
                ..Options::default()
            },
            ["Click me!"],
        )
        .class("btn");
        assert_eq!(desc.options().key, Some(Key::from("7")));
        assert_eq!(desc.options().children.len(), 1);
        assert!(desc.options().class_name.contains("btn"));
    }

    #[test]
    fn test_merge_overrides_per_name() {
        let mut base = Options::default();
        base.attributes.insert("title".into(), "a".into());
        base.class_name.add("x");
        let mut top = Options::default();
        top.attributes.insert("title".into(), "b".into());
        top.class_name.add("y");
        base.merge(top);
        assert_eq!(base.attributes["title"].to_attribute_string(), "b");
        assert_eq!(base.class_name.to_class_string(), "x y");
    }
}
