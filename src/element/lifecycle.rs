//! Element lifecycle: node creation, mounting, destruction, attribute
//! projection, declared listeners and ref registration.

use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::dom::{self, DomEvent, ListenerId, NodeId};
use crate::error::{Result, UiError};

use super::component::NodeType;
use super::options::ElementDesc;
use super::reconcile;
use super::registry::{self, with_data, with_data_mut};
use super::{refs, Element};

// =============================================================================
// Instantiate / Mount
// =============================================================================

/// Register a description as a live (unmounted) element.
pub(crate) fn instantiate(desc: ElementDesc) -> Element {
    let ElementDesc { component, options } = desc;
    let key = options.key.clone();
    let element = registry::register(component, options);
    if key.is_some() {
        with_data_mut(element, |d| d.key = key);
    }
    element
}

fn create_node(element: Element) -> Result<NodeId> {
    let component = with_data(element, |d| d.component.clone()).ok_or(UiError::DeadElement(element))?;
    let node = match component.node_type() {
        NodeType::Tag(name) => dom::create_element(&name),
        NodeType::Text => dom::create_text(&component.text_value().unwrap_or_default()),
    };
    with_data_mut(element, |d| d.node = Some(node));
    Ok(node)
}

/// Mount `element` into `parent_node` before `next` (append when `None`).
///
/// Creates the node and draws it the first time; afterwards only redraws
/// and moves it.
pub(crate) fn mount_into(
    element: Element,
    parent: Option<Element>,
    parent_node: NodeId,
    next: Option<NodeId>,
) -> Result<()> {
    if !dom::exists(parent_node) {
        error!(?element, ?parent_node, "cannot mount into a node that does not exist");
        return Err(UiError::UnknownNode(parent_node));
    }
    let existing = with_data(element, |d| d.node).ok_or(UiError::DeadElement(element))?;
    with_data_mut(element, |d| d.parent = parent);

    let (node, created) = match existing {
        Some(node) => (node, false),
        None => (create_node(element)?, true),
    };
    reconcile::redraw(element);

    if let Err(err) = dom::insert_before(parent_node, node, next) {
        error!(?element, error = %err, "failed to insert element node");
        return Err(err);
    }

    if created {
        debug!(?element, ?node, "mounted");
        let component = with_data(element, |d| d.component.clone());
        if let Some(component) = component {
            component.on_mount(element);
        }
    }
    Ok(())
}

/// Mount `element` as a child of `parent`'s node.
pub(crate) fn mount(element: Element, parent: Element, next: Option<NodeId>) -> Result<()> {
    let parent_node = match with_data(parent, |d| d.node) {
        None => {
            error!(?element, ?parent, "cannot mount into a destroyed element");
            return Err(UiError::DeadElement(parent));
        }
        Some(None) => {
            error!(?element, ?parent, "cannot mount into an element without a node");
            return Err(UiError::NotMounted(parent));
        }
        Some(Some(node)) => node,
    };
    mount_into(element, Some(parent), parent_node, next)
}

// =============================================================================
// Destroy
// =============================================================================

/// Tear down `element` and its subtree. No-op for a dead handle.
pub(crate) fn destroy(element: Element) {
    let Some(component) = with_data(element, |d| d.component.clone()) else {
        return;
    };
    component.on_unmount(element);

    for job in registry::take_cleanup_jobs(element) {
        job();
    }

    let taken = with_data_mut(element, |d| {
        (
            d.node,
            std::mem::take(&mut d.attached_events),
            std::mem::take(&mut d.children),
            d.registered_ref.take(),
        )
    });
    let Some((node, events, children, registered_ref)) = taken else {
        return;
    };

    if let Some(node) = node {
        for (_, id) in events {
            dom::remove_event_listener(node, id);
        }
    }
    for child in children {
        destroy(child);
    }
    if let Some((owner, name)) = registered_ref {
        refs::clear(owner, &name, element);
    }
    refs::drop_owner(element);

    if let Some(node) = node {
        if let Err(err) = dom::release_node(node) {
            warn!(?element, error = %err, "element node was already gone");
        }
    }
    registry::release(element);
    debug!(?element, "destroyed");
}

// =============================================================================
// Attributes / Listeners / Refs
// =============================================================================

/// Project options (plus component extras) onto the node.
pub(crate) fn apply_node_attributes(element: Element) -> Result<()> {
    let Some((component, attributes, node, whitelist)) = with_data(element, |d| {
        (
            d.component.clone(),
            super::NodeAttributes::from_options(&d.options),
            d.node,
            d.whitelist.clone(),
        )
    }) else {
        return Err(UiError::DeadElement(element));
    };
    let Some(node) = node else {
        return Ok(());
    };
    if component.node_type() == NodeType::Text {
        return Ok(());
    }
    let mut attributes = attributes;
    component.extra_node_attributes(element, &mut attributes);
    attributes.apply(node, &whitelist)
}

/// Attach a trampoline listener for every declared handler not yet attached.
///
/// The trampoline looks the handler up at dispatch time, so handlers
/// replaced by a later transplant take effect without re-attaching.
pub(crate) fn attach_declared_listeners(element: Element) {
    let Some((node, pending)) = with_data(element, |d| {
        let pending: Vec<String> = d
            .options
            .handlers
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| !d.attached_events.contains_key(name))
            .collect();
        (d.node, pending)
    }) else {
        return;
    };
    let Some(node) = node else { return };

    for event_type in pending {
        let lookup = event_type.clone();
        let trampoline = move |event: &DomEvent| {
            let handler = with_data(element, |d| d.options.handler(&lookup)).flatten();
            if let Some(handler) = handler {
                handler(event);
            }
        };
        match dom::add_event_listener(node, &event_type, trampoline) {
            Ok(id) => {
                with_data_mut(element, |d| d.attached_events.insert(event_type, id));
            }
            Err(err) => warn!(?element, error = %err, "failed to attach declared listener"),
        }
    }
}

/// Register `element` in the ref slot its options name, clearing a
/// previous registration under a different slot.
pub(crate) fn refresh_ref(element: Element) {
    let Some((target, registered)) =
        with_data(element, |d| (d.options.ref_target.clone(), d.registered_ref.clone()))
    else {
        return;
    };
    let wanted = match target {
        Some(target) => match target.owner {
            Some(owner) => Some((owner, target.name)),
            None => {
                if registered.is_none() {
                    warn!(?element, name = %target.name, "ref declared outside of render() without an owner");
                }
                None
            }
        },
        None => None,
    };
    if registered == wanted {
        if let Some((owner, name)) = &wanted {
            refs::assign(*owner, name, element);
        }
        return;
    }
    if let Some((owner, name)) = &registered {
        refs::clear(*owner, name, element);
    }
    if let Some((owner, name)) = &wanted {
        refs::assign(*owner, name, element);
    }
    with_data_mut(element, |d| d.registered_ref = wanted);
}

// =============================================================================
// Node Listeners
// =============================================================================

/// A listener added with [`Element::add_node_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerHandle {
    node: NodeId,
    id: ListenerId,
}

impl ListenerHandle {
    /// Detach now. Returns whether it was still attached.
    pub fn remove(self) -> bool {
        dom::remove_event_listener(self.node, self.id)
    }
}

pub(crate) fn add_node_listener(
    element: Element,
    event_type: &str,
    listener: Rc<dyn Fn(&DomEvent)>,
) -> Result<ListenerHandle> {
    let node = match with_data(element, |d| d.node) {
        None => return Err(UiError::DeadElement(element)),
        Some(None) => {
            error!(?element, event_type, "cannot listen on an element without a node");
            return Err(UiError::NotMounted(element));
        }
        Some(Some(node)) => node,
    };
    let id = dom::add_event_listener_rc(node, event_type, listener)?;
    let handle = ListenerHandle { node, id };
    registry::push_cleanup(
        element,
        Box::new(move || {
            handle.remove();
        }),
    );
    Ok(handle)
}
