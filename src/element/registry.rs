//! Element Registry - generational slots for live elements.
//!
//! Manages the lifecycle of element handles:
//! - Slot allocation with a free pool for O(1) reuse
//! - Generation counters so stale handles never alias a new element
//! - Owner context stack for ref capture during `render()`
//!
//! Data is borrowed only inside short closures. Never call component hooks
//! or other element operations from inside `with_data`/`with_data_mut`.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::dom::{ListenerId, NodeId};

use super::component::Component;
use super::options::{Children, Key, Options};
use super::Element;

/// Deferred teardown work.
pub type Cleanup = Box<dyn FnOnce()>;

/// Per-element state.
pub(crate) struct ElementData {
    pub component: Rc<dyn Component>,
    pub options: Options,
    pub node: Option<NodeId>,
    /// Live children, in document order.
    pub children: Vec<Element>,
    /// Child list used by the last redraw.
    pub rendered: Option<Children>,
    pub parent: Option<Element>,
    pub key: Option<Key>,
    /// Extra attribute names allowed on this element's node.
    pub whitelist: BTreeSet<String>,
    /// Trampoline listeners for declared handlers, by event type.
    pub attached_events: HashMap<String, ListenerId>,
    pub cleanup_jobs: Vec<Cleanup>,
    /// Ref slot this element is currently registered in.
    pub registered_ref: Option<(Element, String)>,
}

impl ElementData {
    fn new(component: Rc<dyn Component>, options: Options) -> Self {
        Self {
            component,
            options,
            node: None,
            children: Vec::new(),
            rendered: None,
            parent: None,
            key: None,
            whitelist: BTreeSet::new(),
            attached_events: HashMap::new(),
            cleanup_jobs: Vec::new(),
            registered_ref: None,
        }
    }
}

struct Slot {
    generation: u32,
    data: Option<ElementData>,
}

// =============================================================================
// Registry State
// =============================================================================

thread_local! {
    static SLOTS: RefCell<Vec<Slot>> = const { RefCell::new(Vec::new()) };

    /// Pool of freed slot indices for reuse.
    static FREE_SLOTS: RefCell<Vec<u32>> = const { RefCell::new(Vec::new()) };

    /// Elements whose `render()` is currently running, innermost last.
    static OWNER_STACK: RefCell<Vec<Element>> = const { RefCell::new(Vec::new()) };
}

// =============================================================================
// Owner Context Stack
// =============================================================================

/// Element whose `render()` is running, if any.
pub fn current_owner() -> Option<Element> {
    OWNER_STACK.with(|stack| stack.borrow().last().copied())
}

pub(crate) fn push_owner(element: Element) {
    OWNER_STACK.with(|stack| stack.borrow_mut().push(element));
}

pub(crate) fn pop_owner() {
    OWNER_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// Pops the owner stack when dropped, so a panicking `render()` does not
/// leave a stale owner behind.
pub(crate) struct OwnerGuard(());

impl OwnerGuard {
    pub(crate) fn enter(element: Element) -> Self {
        push_owner(element);
        OwnerGuard(())
    }
}

impl Drop for OwnerGuard {
    fn drop(&mut self) {
        pop_owner();
    }
}

/// Run `f` with `owner` as the current owner; descriptions built inside
/// register their refs on it.
pub fn with_owner<R>(owner: Element, f: impl FnOnce() -> R) -> R {
    let _guard = OwnerGuard::enter(owner);
    f()
}

// =============================================================================
// Allocation
// =============================================================================

pub(crate) fn register(component: Rc<dyn Component>, options: Options) -> Element {
    let data = ElementData::new(component, options);
    let free = FREE_SLOTS.with(|free| free.borrow_mut().pop());
    SLOTS.with(|slots| {
        let mut slots = slots.borrow_mut();
        match free {
            Some(index) => {
                let slot = &mut slots[index as usize];
                slot.data = Some(data);
                Element {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = slots.len() as u32;
                slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                Element {
                    index,
                    generation: 0,
                }
            }
        }
    })
}

/// Free the slot; the handle (and any copy of it) becomes dead.
pub(crate) fn release(element: Element) -> Option<ElementData> {
    let data = SLOTS.with(|slots| {
        let mut slots = slots.borrow_mut();
        let slot = slots.get_mut(element.index as usize)?;
        if slot.generation != element.generation {
            return None;
        }
        let data = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        Some(data)
    })?;
    FREE_SLOTS.with(|free| free.borrow_mut().push(element.index));
    Some(data)
}

// =============================================================================
// Access
// =============================================================================

pub(crate) fn with_data<R>(element: Element, f: impl FnOnce(&ElementData) -> R) -> Option<R> {
    SLOTS.with(|slots| {
        let slots = slots.borrow();
        let slot = slots.get(element.index as usize)?;
        if slot.generation != element.generation {
            return None;
        }
        slot.data.as_ref().map(f)
    })
}

pub(crate) fn with_data_mut<R>(
    element: Element,
    f: impl FnOnce(&mut ElementData) -> R,
) -> Option<R> {
    SLOTS.with(|slots| {
        let mut slots = slots.borrow_mut();
        let slot = slots.get_mut(element.index as usize)?;
        if slot.generation != element.generation {
            return None;
        }
        slot.data.as_mut().map(f)
    })
}

pub(crate) fn is_alive(element: Element) -> bool {
    with_data(element, |_| ()).is_some()
}

/// Number of live elements.
pub fn live_count() -> usize {
    SLOTS.with(|slots| slots.borrow().iter().filter(|s| s.data.is_some()).count())
}

// =============================================================================
// Cleanup Jobs
// =============================================================================

pub(crate) fn push_cleanup(element: Element, job: Cleanup) -> bool {
    with_data_mut(element, move |data| data.cleanup_jobs.push(job)).is_some()
}

pub(crate) fn take_cleanup_jobs(element: Element) -> Vec<Cleanup> {
    with_data_mut(element, |data| std::mem::take(&mut data.cleanup_jobs)).unwrap_or_default()
}

/// Drop every slot. Handles from before the reset are dead afterwards.
pub fn reset_registry() {
    // Generations survive the reset so old handles stay dead.
    let dropped: Vec<ElementData> = SLOTS.with(|slots| {
        let mut slots = slots.borrow_mut();
        slots
            .iter_mut()
            .filter_map(|slot| {
                let data = slot.data.take();
                if data.is_some() {
                    slot.generation = slot.generation.wrapping_add(1);
                }
                data
            })
            .collect()
    });
    let count = SLOTS.with(|slots| slots.borrow().len() as u32);
    FREE_SLOTS.with(|free| {
        let mut free = free.borrow_mut();
        free.clear();
        free.extend((0..count).rev());
    });
    OWNER_STACK.with(|stack| stack.borrow_mut().clear());
    // Dropped outside the borrow: options may own closures with their own drops.
    drop(dropped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::component::Tag;

    fn setup() {
        reset_registry();
    }

    fn make() -> Element {
        register(Rc::new(Tag::new("div")), Options::default())
    }

    #[test]
    fn test_release_invalidates_handle() {
        setup();
        let a = make();
        assert!(is_alive(a));
        assert!(release(a).is_some());
        assert!(!is_alive(a));
        assert!(release(a).is_none());

        // Slot is reused with a new generation.
        let b = make();
        assert_eq!(a.index, b.index);
        assert_ne!(a, b);
        assert!(!is_alive(a));
        assert!(is_alive(b));
    }

    #[test]
    fn test_owner_stack() {
        setup();
        let a = make();
        let b = make();
        assert_eq!(current_owner(), None);
        with_owner(a, || {
            assert_eq!(current_owner(), Some(a));
            with_owner(b, || assert_eq!(current_owner(), Some(b)));
            assert_eq!(current_owner(), Some(a));
        });
        assert_eq!(current_owner(), None);
    }

    #[test]
    fn test_cleanup_jobs_taken_once() {
        setup();
        let a = make();
        assert!(push_cleanup(a, Box::new(|| {})));
        assert_eq!(take_cleanup_jobs(a).len(), 1);
        assert!(take_cleanup_jobs(a).is_empty());
    }
}
