//! Attribute Projector - writes an element's attribute bag onto its node.
//!
//! Only allow-listed names reach the host node; everything else stays a
//! logical option. The allow-list is the default HTML set below, extended
//! by [`Config::extra_allowed_attributes`](crate::config::Config), any
//! `data-*`/`aria-*` name, and the element's own whitelist.
//!
//! A full apply:
//! 1. removes node attributes that are no longer derived (except `class`/`style`)
//! 2. writes every allowed attribute whose value changed
//! 3. replaces `class` from the class set (removed when empty)
//! 4. replaces the whole inline style
//!
//! Applying twice with unchanged state touches nothing.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::with_config;
use crate::dom::{self, NodeId};
use crate::error::Result;

use super::options::{AttrValue, ClassSet, Options, StyleMap, StyleValue};

// =============================================================================
// Allow-list
// =============================================================================

/// Value attributes written through by default.
pub const DEFAULT_ALLOWED_ATTRIBUTES: &[&str] = &[
    "accept", "action", "alt", "autocomplete", "cols", "colspan", "content", "dir", "download",
    "draggable", "enctype", "for", "form", "height", "href", "id", "lang", "list", "max",
    "maxlength", "method", "min", "minlength", "name", "pattern", "placeholder", "rel", "role",
    "rows", "rowspan", "scope", "size", "span", "src", "srcset", "start", "step", "tabindex",
    "target", "title", "type", "value", "width", "wrap",
];

/// Presence-only attributes: `""` when truthy, removed when falsy.
pub const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen", "autofocus", "autoplay", "checked", "contenteditable", "controls",
    "default", "defer", "disabled", "formnovalidate", "hidden", "loop", "multiple", "muted",
    "novalidate", "open", "readonly", "required", "reversed", "selected",
];

/// Names handled by the class set and style map, never by the attribute bag.
const RESERVED: &[&str] = &["class", "style"];

/// Whether `name` can be used as an attribute name at all.
pub fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control() && !matches!(c, '"' | '\'' | '>' | '/' | '='))
}

pub fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES.contains(&name)
}

/// Whether `name` passes the allow-list, given an element's whitelist.
pub fn is_allowed(name: &str, whitelist: &BTreeSet<String>) -> bool {
    DEFAULT_ALLOWED_ATTRIBUTES.contains(&name)
        || is_boolean_attribute(name)
        || name.starts_with("data-")
        || name.starts_with("aria-")
        || whitelist.contains(name)
        || with_config(|c| c.extra_allowed_attributes.contains(name))
}

// =============================================================================
// Node Attributes
// =============================================================================

/// Attributes about to be written to a node.
///
/// Built from the element's options, then handed to
/// [`Component::extra_node_attributes`](super::Component::extra_node_attributes)
/// for adjustment.
#[derive(Debug, Clone, Default)]
pub struct NodeAttributes {
    pub attributes: BTreeMap<String, AttrValue>,
    pub class_name: ClassSet,
    pub style: StyleMap,
}

impl NodeAttributes {
    pub fn from_options(options: &Options) -> Self {
        Self {
            attributes: options.attributes.clone(),
            class_name: options.class_name.clone(),
            style: options.style.clone(),
        }
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn add_class(&mut self, classes: &str) {
        self.class_name.add(classes);
    }

    pub fn set_style(&mut self, property: &str, value: impl Into<StyleValue>) {
        self.style.set(property, value);
    }

    /// Attribute values to write; `None` means the attribute must be absent.
    fn resolve(&self, whitelist: &BTreeSet<String>) -> BTreeMap<String, Option<String>> {
        let mut resolved = BTreeMap::new();
        for (name, value) in &self.attributes {
            if RESERVED.contains(&name.as_str()) {
                tracing::warn!(name = %name, "class and style are set through class_name and style, not attributes");
                continue;
            }
            if !is_valid_attribute_name(name) {
                tracing::warn!(name = %name, "skipping invalid attribute name");
                continue;
            }
            if !is_allowed(name, whitelist) {
                continue;
            }
            let value = if is_boolean_attribute(name) {
                value.is_truthy().then(String::new)
            } else {
                Some(value.to_attribute_string())
            };
            resolved.insert(name.clone(), value);
        }
        resolved
    }

    /// Project onto `node`.
    pub(crate) fn apply(&self, node: NodeId, whitelist: &BTreeSet<String>) -> Result<()> {
        let resolved = self.resolve(whitelist);

        for existing in dom::attribute_names(node) {
            if RESERVED.contains(&existing.as_str()) {
                continue;
            }
            if !matches!(resolved.get(&existing), Some(Some(_))) {
                dom::remove_attribute(node, &existing)?;
            }
        }

        for (name, value) in &resolved {
            if let Some(value) = value {
                dom::set_attribute(node, name, value)?;
            }
        }

        if self.class_name.is_empty() {
            dom::remove_attribute(node, "class")?;
        } else {
            dom::set_attribute(node, "class", &self.class_name.to_class_string())?;
        }

        dom::set_style(node, self.style.resolve())?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{reset_config, update_config};
    use crate::dom::{clear_mutations, create_element, mutation_count, reset_document};
    use std::rc::Rc;

    fn setup() {
        reset_document();
        reset_config();
    }

    #[test]
    fn test_allow_list() {
        setup();
        let none = BTreeSet::new();
        assert!(is_allowed("title", &none));
        assert!(is_allowed("data-row", &none));
        assert!(is_allowed("aria-label", &none));
        assert!(!is_allowed("foo", &none));

        let whitelist: BTreeSet<String> = ["foo".to_string()].into();
        assert!(is_allowed("foo", &whitelist));

        update_config(|c| {
            c.extra_allowed_attributes.insert("bar".into());
        });
        assert!(is_allowed("bar", &none));
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_attribute_name("data-x"));
        assert!(!is_valid_attribute_name(""));
        assert!(!is_valid_attribute_name("a b"));
        assert!(!is_valid_attribute_name("a=b"));
        assert!(!is_valid_attribute_name("\"x"));
    }

    #[test]
    fn test_apply_projects_and_cleans_up() {
        setup();
        let node = create_element("input");
        let none = BTreeSet::new();

        let mut attrs = NodeAttributes::default();
        attrs.set_attribute("title", "hello");
        attrs.set_attribute("disabled", true);
        attrs.set_attribute("foo", "bar");
        attrs.add_class("a b");
        attrs.set_style("width", 10);
        attrs.apply(node, &none).unwrap();

        assert_eq!(dom::get_attribute(node, "title").as_deref(), Some("hello"));
        assert_eq!(dom::get_attribute(node, "disabled").as_deref(), Some(""));
        assert!(!dom::has_attribute(node, "foo"));
        assert_eq!(dom::get_attribute(node, "class").as_deref(), Some("a b"));
        assert_eq!(dom::style_property(node, "width").as_deref(), Some("10px"));

        // Stray attribute set behind our back is removed on the next apply.
        dom::set_attribute(node, "name", "stray").unwrap();
        let mut next = NodeAttributes::default();
        next.set_attribute("disabled", false);
        next.apply(node, &none).unwrap();

        assert!(!dom::has_attribute(node, "name"));
        assert!(!dom::has_attribute(node, "title"));
        assert!(!dom::has_attribute(node, "disabled"));
        assert!(!dom::has_attribute(node, "class"));
        assert!(dom::style(node).is_empty());
    }

    #[test]
    fn test_apply_is_idempotent() {
        setup();
        let node = create_element("div");
        let none = BTreeSet::new();
        let mut attrs = NodeAttributes::default();
        attrs.set_attribute("id", "x");
        attrs.set_attribute("data-n", 3);
        attrs.add_class("c");
        attrs.set_style("height", StyleValue::Lazy(Rc::new(|| "2em".to_string())));

        attrs.apply(node, &none).unwrap();
        clear_mutations();
        attrs.apply(node, &none).unwrap();
        assert_eq!(mutation_count(), 0);
    }
}
