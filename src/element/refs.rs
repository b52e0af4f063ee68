//! Named refs: `owner -> name -> element`.
//!
//! An element whose options carry a ref target registers itself on the
//! owner when it is drawn and clears the slot when destroyed, but only if
//! the slot still points at it (a newer element may have claimed the name).

use std::cell::RefCell;
use std::collections::HashMap;

use super::registry;
use super::Element;

thread_local! {
    static REFS: RefCell<HashMap<Element, HashMap<String, Element>>> = RefCell::new(HashMap::new());
}

/// Point `owner`'s slot `name` at `element`.
pub(crate) fn assign(owner: Element, name: &str, element: Element) {
    let previous = REFS.with(|refs| {
        refs.borrow_mut()
            .entry(owner)
            .or_default()
            .insert(name.to_string(), element)
    });
    if let Some(previous) = previous.filter(|p| *p != element && registry::is_alive(*p)) {
        tracing::debug!(?owner, name, ?previous, ?element, "ref slot reassigned");
    }
}

/// Clear `owner`'s slot `name` if it still points at `element`.
pub(crate) fn clear(owner: Element, name: &str, element: Element) {
    REFS.with(|refs| {
        let mut refs = refs.borrow_mut();
        let Some(slots) = refs.get_mut(&owner) else { return };
        if slots.get(name) == Some(&element) {
            slots.remove(name);
        }
        if slots.is_empty() {
            refs.remove(&owner);
        }
    });
}

/// Forget every slot of a destroyed owner.
pub(crate) fn drop_owner(owner: Element) {
    REFS.with(|refs| {
        refs.borrow_mut().remove(&owner);
    });
}

/// Element registered under `name` on `owner`, if it is still alive.
pub(crate) fn lookup(owner: Element, name: &str) -> Option<Element> {
    let found = REFS.with(|refs| refs.borrow().get(&owner).and_then(|slots| slots.get(name).copied()))?;
    registry::is_alive(found).then_some(found)
}

/// All live refs of `owner`, sorted by name.
pub(crate) fn all(owner: Element) -> Vec<(String, Element)> {
    let mut entries: Vec<(String, Element)> = REFS.with(|refs| {
        refs.borrow()
            .get(&owner)
            .map(|slots| slots.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default()
    });
    entries.retain(|(_, el)| registry::is_alive(*el));
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

pub(crate) fn reset_refs() {
    REFS.with(|refs| refs.borrow_mut().clear());
}
