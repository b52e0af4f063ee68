//! Host event listeners and bubbling dispatch.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::Result;

use super::document::{with_document, with_document_mut};
use super::node::{Listener, ListenerId, NodeId};

// =============================================================================
// Event
// =============================================================================

/// An event travelling from its target up through its ancestors.
#[derive(Debug)]
pub struct DomEvent {
    pub event_type: String,
    pub target: NodeId,
    current_target: Cell<NodeId>,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

impl DomEvent {
    /// Create an event aimed at `target`.
    pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            current_target: Cell::new(target),
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
        }
    }

    /// Node whose listeners are currently running.
    pub fn current_target(&self) -> NodeId {
        self.current_target.get()
    }

    /// Stop bubbling after the current node's listeners.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

// =============================================================================
// Listener Registry
// =============================================================================

/// Register `listener` for `event_type` on `node`.
pub fn add_event_listener(
    node: NodeId,
    event_type: &str,
    listener: impl Fn(&DomEvent) + 'static,
) -> Result<ListenerId> {
    add_event_listener_rc(node, event_type, Rc::new(listener))
}

/// Register a shared listener.
pub fn add_event_listener_rc(node: NodeId, event_type: &str, listener: Listener) -> Result<ListenerId> {
    with_document_mut(|doc| {
        doc.get(node)?;
        let id = doc.next_listener_id();
        doc.get_mut(node)?
            .listeners
            .push((id, event_type.to_string(), listener));
        Ok(id)
    })
}

/// Remove a listener. Returns whether it was registered.
pub fn remove_event_listener(node: NodeId, id: ListenerId) -> bool {
    with_document_mut(|doc| {
        let Ok(data) = doc.get_mut(node) else {
            return false;
        };
        let before = data.listeners.len();
        data.listeners.retain(|(lid, _, _)| *lid != id);
        data.listeners.len() != before
    })
}

/// Number of listeners on `node` (all event types).
pub fn listener_count(node: NodeId) -> usize {
    with_document(|doc| doc.get(node).map(|n| n.listeners.len()).unwrap_or(0))
}

// =============================================================================
// Dispatch
// =============================================================================

/// Dispatch `event` at its target and bubble it to the root.
///
/// Listeners are snapshotted per node before running, so a listener may add
/// or remove listeners (or mutate the tree) freely. Returns `false` if a
/// listener called `prevent_default`.
pub fn dispatch_event(event: &DomEvent) -> bool {
    let mut current = Some(event.target);
    while let Some(node) = current {
        event.current_target.set(node);

        let listeners: Vec<Listener> = with_document(|doc| {
            doc.get(node)
                .map(|n| {
                    n.listeners
                        .iter()
                        .filter(|(_, ty, _)| *ty == event.event_type)
                        .map(|(_, _, l)| l.clone())
                        .collect()
                })
                .unwrap_or_default()
        });
        for listener in listeners {
            listener(event);
        }

        if event.is_propagation_stopped() {
            break;
        }
        current = with_document(|doc| doc.get(node).ok().and_then(|n| n.parent));
    }
    !event.is_default_prevented()
}

/// Convenience: dispatch a new event of `event_type` at `target`.
pub fn fire(target: NodeId, event_type: &str) -> bool {
    dispatch_event(&DomEvent::new(event_type, target))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::document::{append_child, create_element, release_node, reset_document};
    use std::cell::RefCell;

    fn setup() {
        reset_document();
    }

    #[test]
    fn test_bubbling_order() {
        setup();
        let outer = create_element("div");
        let inner = create_element("button");
        append_child(outer, inner).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let log_inner = log.clone();
        let log_outer = log.clone();
        add_event_listener(inner, "click", move |e| {
            log_inner.borrow_mut().push(("inner", e.current_target()));
        })
        .unwrap();
        add_event_listener(outer, "click", move |e| {
            log_outer.borrow_mut().push(("outer", e.current_target()));
        })
        .unwrap();

        assert!(fire(inner, "click"));
        assert_eq!(*log.borrow(), vec![("inner", inner), ("outer", outer)]);
    }

    #[test]
    fn test_stop_propagation_and_prevent_default() {
        setup();
        let outer = create_element("div");
        let inner = create_element("a");
        append_child(outer, inner).unwrap();

        let reached = Rc::new(Cell::new(false));
        let reached_clone = reached.clone();
        add_event_listener(inner, "click", |e| {
            e.stop_propagation();
            e.prevent_default();
        })
        .unwrap();
        add_event_listener(outer, "click", move |_| reached_clone.set(true)).unwrap();

        assert!(!fire(inner, "click"));
        assert!(!reached.get());
    }

    #[test]
    fn test_remove_listener() {
        setup();
        let node = create_element("div");
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let id = add_event_listener(node, "mousedown", move |_| {
            count_clone.set(count_clone.get() + 1)
        })
        .unwrap();

        fire(node, "mousedown");
        fire(node, "mouseup");
        assert_eq!(count.get(), 1);

        assert!(remove_event_listener(node, id));
        assert!(!remove_event_listener(node, id));
        fire(node, "mousedown");
        assert_eq!(count.get(), 1);
        assert_eq!(listener_count(node), 0);
    }

    #[test]
    fn test_listener_may_release_its_node() {
        setup();
        let node = create_element("div");
        add_event_listener(node, "click", move |e| {
            release_node(e.current_target()).unwrap();
        })
        .unwrap();
        assert!(fire(node, "click"));
    }
}
