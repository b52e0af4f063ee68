//! Elements - live, keyed UI elements over host nodes.
//!
//! An [`Element`] is a `Copy` handle into a thread-local registry. It owns
//! at most one host node, an ordered list of live children, and the
//! options it was last drawn with. Elements are created from
//! [`ElementDesc`] values (see [`create`], [`tag`], [`text`]) and are
//! patched in place by [`Element::redraw`].
//!
//! # Lifecycle
//!
//! ```text
//! instantiate ──► Unmounted ──mount──► Mounted ──destroy_node──► Destroyed
//!                                        │  ▲
//!                                        └──┘ redraw / set_options / ...
//! ```
//!
//! A destroyed handle stays `Copy` but every operation on it fails with
//! [`UiError::DeadElement`] (or returns `false`/`None`).

mod attributes;
mod component;
mod lifecycle;
mod options;
mod reconcile;
mod refs;
mod registry;

use std::any::Any;
use std::rc::Rc;

use tracing::{error, warn};

use crate::dom::{self, DomEvent, NodeId};
use crate::error::{Result, UiError};

pub use attributes::{
    is_allowed, is_boolean_attribute, is_valid_attribute_name, NodeAttributes,
    BOOLEAN_ATTRIBUTES, DEFAULT_ALLOWED_ATTRIBUTES,
};
pub use component::{Component, NodeType, Tag, TextLeaf};
pub use lifecycle::ListenerHandle;
pub use options::{
    create, tag, text, AttrValue, Child, Children, ClassSet, ElementDesc, Handler, Key, Options,
    RefTarget, StyleMap, StyleValue,
};
pub use registry::{current_owner, live_count, with_owner, Cleanup};

use registry::{with_data, with_data_mut};

/// Handle to a live (or destroyed) element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

// =============================================================================
// Construction / Mounting
// =============================================================================

/// Instantiate `desc` and mount it as the last child of `container`.
pub fn mount_root(desc: ElementDesc, container: NodeId) -> Result<Element> {
    let element = lifecycle::instantiate(desc);
    match lifecycle::mount_into(element, None, container, None) {
        Ok(()) => Ok(element),
        Err(err) => {
            lifecycle::destroy(element);
            Err(err)
        }
    }
}

impl Element {
    /// Register `desc` without mounting it.
    pub fn instantiate(desc: ElementDesc) -> Element {
        lifecycle::instantiate(desc)
    }

    /// Mount under `parent`'s node, before `next_sibling` (append when `None`).
    ///
    /// Does not add `self` to `parent`'s child list; use
    /// [`append_child`](Self::append_child) for that.
    pub fn mount(self, parent: Element, next_sibling: Option<NodeId>) -> Result<()> {
        lifecycle::mount(self, parent, next_sibling)
    }

    /// Mount directly into a host node.
    pub fn mount_into_node(self, container: NodeId, next_sibling: Option<NodeId>) -> Result<()> {
        lifecycle::mount_into(self, None, container, next_sibling)
    }

    /// Destroy this element and its subtree.
    ///
    /// When the parent draws `options.children`, the matching entry is
    /// dropped from it too, so the parent's child list stays editable.
    pub fn destroy_node(self) {
        let parent = with_data(self, |d| d.parent).flatten();
        if let Some(parent) = parent {
            let authoritative = parent.children_authoritative().unwrap_or(false);
            with_data_mut(parent, |d| {
                let Some(index) = d.children.iter().position(|c| *c == self) else {
                    return;
                };
                d.children.remove(index);
                if authoritative && d.rendered.is_some() {
                    Rc::make_mut(&mut d.options.children).remove(index);
                    d.rendered = Some(d.options.children.clone());
                }
            });
        }
        lifecycle::destroy(self);
    }

    /// Redraw and reconcile children. `false` if there is no node yet.
    pub fn redraw(self) -> bool {
        reconcile::redraw(self)
    }

    /// Whether this element may take over `candidate`'s options during a redraw.
    pub fn can_overwrite(self, candidate: &ElementDesc) -> bool {
        with_data(self, |d| component::same_kind(&d.component, &candidate.component)).unwrap_or(false)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_alive(self) -> bool {
        registry::is_alive(self)
    }

    pub fn is_mounted(self) -> bool {
        self.node().is_some()
    }

    pub fn node(self) -> Option<NodeId> {
        with_data(self, |d| d.node).flatten()
    }

    pub fn parent(self) -> Option<Element> {
        with_data(self, |d| d.parent).flatten()
    }

    /// Live children in document order.
    pub fn children(self) -> Vec<Element> {
        with_data(self, |d| d.children.clone()).unwrap_or_default()
    }

    /// Key this element was matched by.
    pub fn key(self) -> Option<Key> {
        with_data(self, |d| d.key.clone()).flatten()
    }

    pub fn options(self) -> Option<Options> {
        with_data(self, |d| d.options.clone())
    }

    pub fn node_type(self) -> Option<NodeType> {
        with_data(self, |d| d.component.clone()).map(|c| c.node_type())
    }

    /// Element registered under `name` by descriptions built in this element's `render()`.
    pub fn get_ref(self, name: &str) -> Option<Element> {
        refs::lookup(self, name)
    }

    /// All live refs, sorted by name.
    pub fn refs(self) -> Vec<(String, Element)> {
        refs::all(self)
    }

    /// Run `f` with the concrete component, if it is a `T`.
    pub fn with_component<T: Component, R>(self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let component = with_data(self, |d| d.component.clone())?;
        let any: &dyn Any = component.as_any();
        any.downcast_ref::<T>().map(f)
    }

    // =========================================================================
    // Options
    // =========================================================================

    /// Edit options, then redraw when mounted.
    pub fn update_options(self, f: impl FnOnce(&mut Options)) -> Result<()> {
        with_data_mut(self, |d| f(&mut d.options)).ok_or(UiError::DeadElement(self))?;
        self.redraw_if_mounted();
        Ok(())
    }

    /// Replace options, then redraw when mounted.
    pub fn set_options(self, options: Options) -> Result<()> {
        self.update_options(|current| *current = options)
    }

    /// Replace the child list, then redraw when mounted.
    pub fn set_children<I, C>(self, children: I) -> Result<()>
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        let children: Vec<Child> = children.into_iter().map(Into::into).collect();
        self.update_options(|o| o.children = Rc::new(children))
    }

    fn redraw_if_mounted(self) {
        if self.is_mounted() {
            reconcile::redraw(self);
        }
    }

    // =========================================================================
    // Child List Mutators
    // =========================================================================

    /// Whether the live children are exactly `options.children`.
    fn children_authoritative(self) -> Result<bool> {
        with_data(self, |d| match &d.rendered {
            Some(rendered) => {
                Rc::ptr_eq(rendered, &d.options.children) && d.children.len() == rendered.len()
            }
            None => true,
        })
        .ok_or(UiError::DeadElement(self))
    }

    fn check_authoritative(self) -> Result<()> {
        if self.children_authoritative()? {
            Ok(())
        } else {
            warn!(element = ?self, "child list is produced by render(), not options.children");
            Err(UiError::ChildrenNotAuthoritative(self))
        }
    }

    /// Append a child. Returns the live child when mounted.
    pub fn append_child(self, child: impl Into<Child>) -> Result<Option<Element>> {
        let len = with_data(self, |d| d.options.children.len()).ok_or(UiError::DeadElement(self))?;
        self.insert_child(child, len)
    }

    /// Insert a child at `position`. Returns the live child when mounted.
    pub fn insert_child(self, child: impl Into<Child>, position: usize) -> Result<Option<Element>> {
        let child = child.into();
        let (node, len) = with_data(self, |d| (d.node, d.options.children.len()))
            .ok_or(UiError::DeadElement(self))?;
        if position > len {
            return Err(UiError::ChildIndexOutOfRange { index: position, len });
        }

        let Some(node) = node else {
            with_data_mut(self, |d| Rc::make_mut(&mut d.options.children).insert(position, child));
            return Ok(None);
        };
        self.check_authoritative()?;

        let prefix = crate::config::with_config(|c| c.autokey_prefix.clone());
        let key = reconcile::resolve_key(&child, position, &prefix);
        let fresh = lifecycle::instantiate(reconcile::to_desc(&child));
        with_data_mut(fresh, |d| d.key = Some(key));

        let next_element = with_data(self, |d| d.children.get(position).copied()).flatten();
        let next = next_element.and_then(|e| e.node());
        if let Err(err) = lifecycle::mount_into(fresh, Some(self), node, next) {
            lifecycle::destroy(fresh);
            return Err(err);
        }

        with_data_mut(self, |d| {
            Rc::make_mut(&mut d.options.children).insert(position, child);
            d.children.insert(position, fresh);
            d.rendered = Some(d.options.children.clone());
        });
        Ok(Some(fresh))
    }

    /// Remove `child` from this element. Destroys it when `destroy` is set,
    /// otherwise only detaches its node.
    pub fn erase_child(self, child: Element, destroy: bool) -> Result<()> {
        let index = with_data(self, |d| d.children.iter().position(|c| *c == child))
            .ok_or(UiError::DeadElement(self))?
            .ok_or(UiError::NotAChild { parent: self, child })?;
        self.erase_child_at(index, destroy).map(|_| ())
    }

    /// Remove the child at `index`. Returns the removed child.
    pub fn erase_child_at(self, index: usize, destroy: bool) -> Result<Option<Element>> {
        let (mounted, len) = with_data(self, |d| (d.node.is_some(), d.options.children.len()))
            .ok_or(UiError::DeadElement(self))?;
        if index >= len {
            return Err(UiError::ChildIndexOutOfRange { index, len });
        }
        if !mounted {
            with_data_mut(self, |d| {
                Rc::make_mut(&mut d.options.children).remove(index);
            });
            return Ok(None);
        }
        self.check_authoritative()?;

        let removed = with_data_mut(self, |d| {
            Rc::make_mut(&mut d.options.children).remove(index);
            let removed = d.children.remove(index);
            d.rendered = Some(d.options.children.clone());
            removed
        })
        .ok_or(UiError::DeadElement(self))?;

        if destroy {
            lifecycle::destroy(removed);
        } else {
            if let Some(node) = removed.node() {
                dom::remove_node(node)?;
            }
            with_data_mut(removed, |d| d.parent = None);
        }
        Ok(Some(removed))
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn reapply_attributes(self) -> Result<()> {
        if self.is_mounted() {
            lifecycle::apply_node_attributes(self)?;
        }
        Ok(())
    }

    pub fn add_class(self, classes: &str) -> Result<()> {
        with_data_mut(self, |d| d.options.class_name.add(classes)).ok_or(UiError::DeadElement(self))?;
        self.reapply_attributes()
    }

    pub fn remove_class(self, classes: &str) -> Result<()> {
        with_data_mut(self, |d| d.options.class_name.remove(classes))
            .ok_or(UiError::DeadElement(self))?;
        self.reapply_attributes()
    }

    pub fn has_class(self, name: &str) -> bool {
        with_data(self, |d| d.options.class_name.contains(name)).unwrap_or(false)
    }

    pub fn set_style(self, property: &str, value: impl Into<StyleValue>) -> Result<()> {
        let value = value.into();
        with_data_mut(self, |d| d.options.style.set(property, value))
            .ok_or(UiError::DeadElement(self))?;
        self.reapply_attributes()
    }

    /// Set a logical attribute; it reaches the node only if allowed.
    pub fn set_attribute(self, name: &str, value: impl Into<AttrValue>) -> Result<()> {
        if !is_valid_attribute_name(name) {
            warn!(element = ?self, name, "invalid attribute name");
            return Err(UiError::InvalidAttributeName(name.to_string()));
        }
        let value = value.into();
        with_data_mut(self, |d| d.options.attributes.insert(name.to_string(), value))
            .ok_or(UiError::DeadElement(self))?;
        self.reapply_attributes()
    }

    pub fn remove_attribute(self, name: &str) -> Result<()> {
        with_data_mut(self, |d| d.options.attributes.remove(name)).ok_or(UiError::DeadElement(self))?;
        self.reapply_attributes()
    }

    /// Let `name` through the allow-list for this element only.
    pub fn whitelist_attribute(self, name: &str) -> Result<()> {
        if !is_valid_attribute_name(name) {
            warn!(element = ?self, name, "invalid attribute name");
            return Err(UiError::InvalidAttributeName(name.to_string()));
        }
        with_data_mut(self, |d| d.whitelist.insert(name.to_string()))
            .ok_or(UiError::DeadElement(self))?;
        self.reapply_attributes()
    }

    // =========================================================================
    // Listeners / Cleanup
    // =========================================================================

    /// Listen on this element's node. Removed automatically on destroy.
    pub fn add_node_listener(
        self,
        event_type: &str,
        listener: impl Fn(&DomEvent) + 'static,
    ) -> Result<ListenerHandle> {
        lifecycle::add_node_listener(self, event_type, Rc::new(listener))
    }

    pub fn add_click_listener(self, listener: impl Fn(&DomEvent) + 'static) -> Result<ListenerHandle> {
        self.add_node_listener("click", listener)
    }

    /// Run `job` when this element is destroyed.
    pub fn add_cleanup_job(self, job: impl FnOnce() + 'static) -> Result<()> {
        if registry::push_cleanup(self, Box::new(job)) {
            Ok(())
        } else {
            Err(UiError::DeadElement(self))
        }
    }

    // =========================================================================
    // Layout
    // =========================================================================

    fn measured(self) -> Result<dom::LayoutSize> {
        match with_data(self, |d| d.node) {
            None => Err(UiError::DeadElement(self)),
            Some(None) => {
                error!(element = ?self, "cannot measure an element without a node");
                Err(UiError::NotMounted(self))
            }
            Some(Some(node)) => dom::measure(node),
        }
    }

    /// Laid-out width of the node in pixels.
    pub fn get_width(self) -> Result<f32> {
        self.measured().map(|s| s.width)
    }

    /// Laid-out height of the node in pixels.
    pub fn get_height(self) -> Result<f32> {
        self.measured().map(|s| s.height)
    }
}

/// Drop every element and ref (for testing). Does not touch the document.
pub fn reset_elements() {
    refs::reset_refs();
    registry::reset_registry();
}
