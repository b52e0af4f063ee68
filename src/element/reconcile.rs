//! Reconciler - redraws an element and patches its children by key.
//!
//! ```text
//! redraw(el)
//!   ├── render()  ──► Children (Rc)
//!   ├── same Rc as last time?  ──► redraw each live child in place
//!   └── otherwise, for each new child, left to right:
//!         key matches an old child of the same kind ──► transplant + move
//!         else                                      ──► instantiate + mount
//!       then destroy every old child not reused
//! ```
//!
//! Keys are the explicit `key`, else the ref name, else a positional
//! autokey. Duplicate keys resolve last-wins on both sides.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{error, trace, warn};

use crate::config::with_config;
use crate::dom::{self, NodeId};

use super::component::{same_kind, NodeType};
use super::lifecycle::{self, apply_node_attributes, attach_declared_listeners, refresh_ref};
use super::options::{Child, Children, ElementDesc, Key, Options};
use super::registry::{with_data, with_data_mut, OwnerGuard};
use super::Element;

/// Explicit key and ref name of a description that carries both.
///
/// The explicit key is used for matching; the ref name is only registered.
pub(crate) fn shadowed_ref(options: &Options) -> Option<(&Key, &str)> {
    let key = options.key.as_ref()?;
    let target = options.ref_target.as_ref()?;
    (key.as_str() != target.name).then_some((key, target.name.as_str()))
}

/// Key a new child is matched by.
pub(crate) fn resolve_key(child: &Child, index: usize, prefix: &str) -> Key {
    if let Child::Element(desc) = child {
        if let Some((key, ref_name)) = shadowed_ref(&desc.options) {
            warn!(key = %key, ref_name, "explicit key shadows the ref name as diff key");
        }
    }
    match child {
        Child::Element(desc) => desc
            .options
            .key
            .clone()
            .or_else(|| desc.options.ref_target.as_ref().map(|r| Key::from(r.name.as_str())))
            .unwrap_or_else(|| Key::positional(prefix, index)),
        Child::Text(_) => Key::positional(prefix, index),
    }
}

pub(crate) fn to_desc(child: &Child) -> ElementDesc {
    match child {
        Child::Element(desc) => desc.clone(),
        Child::Text(value) => ElementDesc::text_leaf(value),
    }
}

fn node_of(element: Element) -> Option<NodeId> {
    with_data(element, |d| d.node).flatten()
}

// =============================================================================
// Redraw
// =============================================================================

/// Redraw `element`. Returns `false` (after logging) when it has no node.
pub(crate) fn redraw(element: Element) -> bool {
    let Some((component, options, node)) =
        with_data(element, |d| (d.component.clone(), d.options.clone(), d.node))
    else {
        error!(?element, "redraw on a destroyed element");
        return false;
    };
    let Some(node) = node else {
        error!(?element, "element is not mounted, redraw aborted");
        return false;
    };

    if component.node_type() == NodeType::Text {
        let value = component.text_value().unwrap_or_default();
        if let Err(err) = dom::set_text(node, &value) {
            warn!(?element, error = %err, "failed to write text node");
        }
        refresh_ref(element);
        return true;
    }

    let rendered = {
        let _owner = OwnerGuard::enter(element);
        component.render(element, &options)
    };

    let unchanged = with_data(element, |d| {
        d.rendered.as_ref().is_some_and(|last| Rc::ptr_eq(last, &rendered))
    })
    .unwrap_or(false);

    if unchanged {
        let children = with_data(element, |d| d.children.clone()).unwrap_or_default();
        for child in children {
            if with_data(child, |_| ()).is_some() {
                redraw(child);
            }
        }
    } else {
        reconcile_children(element, node, &rendered);
    }
    with_data_mut(element, |d| d.rendered = Some(rendered));

    if let Err(err) = apply_node_attributes(element) {
        warn!(?element, error = %err, "failed to apply node attributes");
    }
    attach_declared_listeners(element);
    refresh_ref(element);
    true
}

// =============================================================================
// Keyed Child Patching
// =============================================================================

fn reconcile_children(element: Element, parent_node: NodeId, new_children: &Children) {
    let prefix = with_config(|c| c.autokey_prefix.clone());
    let old_children = with_data(element, |d| d.children.clone()).unwrap_or_default();

    let mut by_key: HashMap<Key, Element> = HashMap::with_capacity(old_children.len());
    for &old in &old_children {
        let Some(key) = with_data(old, |d| d.key.clone()).flatten() else {
            continue;
        };
        if let Some(shadowed) = by_key.insert(key.clone(), old) {
            warn!(?element, key = %key, ?shadowed, "duplicate key among existing children, last one wins");
        }
    }

    let keys: Vec<Key> = new_children
        .iter()
        .enumerate()
        .map(|(i, child)| resolve_key(child, i, &prefix))
        .collect();
    let mut last_index: HashMap<&Key, usize> = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if last_index.insert(key, i).is_some() {
            warn!(?element, key = %key, "duplicate key among new children, last one wins");
        }
    }

    let mut live = Vec::with_capacity(new_children.len());
    let mut previous: Option<NodeId> = None;
    let (mut reused, mut mounted) = (0usize, 0usize);

    for (i, child) in new_children.iter().enumerate() {
        let current = match previous {
            Some(prev) => dom::next_sibling(prev),
            None => dom::first_child(parent_node),
        };
        let desc = to_desc(child);
        let key = &keys[i];

        let claimable = if last_index.get(key) == Some(&i) {
            by_key.remove(key)
        } else {
            None
        };
        let reusable = claimable.filter(|&existing| {
            with_data(existing, |d| same_kind(&d.component, &desc.component)).unwrap_or(false)
        });

        let child_element = match reusable {
            Some(existing) => {
                let ElementDesc { component, options } = desc;
                with_data_mut(existing, |d| {
                    d.component = component;
                    d.options = options;
                    d.key = Some(key.clone());
                    d.parent = Some(element);
                });
                redraw(existing);
                if let Some(node) = node_of(existing) {
                    if Some(node) != current {
                        if let Err(err) = dom::insert_before(parent_node, node, current) {
                            warn!(?element, error = %err, "failed to move reused child");
                        }
                    }
                }
                reused += 1;
                existing
            }
            None => {
                let fresh = lifecycle::instantiate(desc);
                with_data_mut(fresh, |d| d.key = Some(key.clone()));
                if let Err(err) = lifecycle::mount_into(fresh, Some(element), parent_node, current) {
                    warn!(?element, error = %err, "failed to mount child");
                }
                mounted += 1;
                fresh
            }
        };

        if let Some(node) = node_of(child_element) {
            previous = Some(node);
        }
        live.push(child_element);
    }

    let survivors: HashSet<Element> = live.iter().copied().collect();
    let mut destroyed = 0usize;
    for old in old_children {
        if !survivors.contains(&old) {
            lifecycle::destroy(old);
            destroyed += 1;
        }
    }

    trace!(?element, reused, mounted, destroyed, "children reconciled");
    with_data_mut(element, |d| d.children = live);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::tag;

    #[test]
    fn test_explicit_key_wins_over_ref() {
        let child: Child = tag("input").key("field-key").with_ref("field").into();
        assert_eq!(resolve_key(&child, 0, "autokey").as_str(), "field-key");
        let Child::Element(desc) = &child else { unreachable!() };
        let (key, ref_name) = shadowed_ref(&desc.options).unwrap();
        assert_eq!((key.as_str(), ref_name), ("field-key", "field"));
    }

    #[test]
    fn test_ref_alone_is_not_a_collision() {
        let child: Child = tag("input").with_ref("field").into();
        assert_eq!(resolve_key(&child, 3, "autokey").as_str(), "field");
        let Child::Element(desc) = &child else { unreachable!() };
        assert!(shadowed_ref(&desc.options).is_none());

        // Same name on both sides is not a collision either.
        let same: Child = tag("input").key("field").with_ref("field").into();
        let Child::Element(desc) = &same else { unreachable!() };
        assert!(shadowed_ref(&desc.options).is_none());
    }

    #[test]
    fn test_positional_fallback() {
        let child: Child = tag("span").into();
        assert_eq!(resolve_key(&child, 2, "autokey").as_str(), "autokey2");
        assert_eq!(resolve_key(&Child::from("x"), 5, "k").as_str(), "k5");
    }
}
