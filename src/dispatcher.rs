//! Dispatchers - ordered listener lists outside the document.
//!
//! - [`Dispatcher`]: one listener list for one event type
//! - [`Dispatchable`]: named channels, one dispatcher each
//! - [`SingleActiveElementDispatcher`]: tracks which item is "active" and
//!   notifies the previous holder when it loses that status
//!
//! Listeners may add or remove listeners (themselves included) while a
//! dispatch is running. A listener added during a dispatch runs in the
//! same dispatch if it lands after the current position.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::warn;

/// Shared listener.
pub type EventListener<E> = Rc<dyn Fn(&E)>;

struct Entry<E> {
    id: usize,
    listener: EventListener<E>,
    once: bool,
}

struct Listeners<E> {
    entries: Vec<Entry<E>>,
    next_id: usize,
}

impl<E> Listeners<E> {
    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn remove(&mut self, id: usize) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Ordered listener list. Cloning shares the list.
pub struct Dispatcher<E> {
    inner: Rc<RefCell<Listeners<E>>>,
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: 'static> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration returned by [`Dispatcher::add_listener`].
pub struct DispatcherHandle<E> {
    inner: Weak<RefCell<Listeners<E>>>,
    id: usize,
}

impl<E> Clone for DispatcherHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            id: self.id,
        }
    }
}

impl<E> std::fmt::Debug for DispatcherHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherHandle").field("id", &self.id).finish()
    }
}

impl<E> DispatcherHandle<E> {
    /// Unregister. Returns whether the listener was still registered.
    pub fn remove(&self) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.borrow_mut().remove(self.id),
            None => false,
        }
    }
}

impl<E: 'static> Dispatcher<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Listeners {
                entries: Vec::new(),
                next_id: 0,
            })),
        }
    }

    fn push(&self, listener: EventListener<E>, once: bool) -> DispatcherHandle<E> {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id();
            inner.entries.push(Entry { id, listener, once });
            id
        };
        DispatcherHandle {
            inner: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Append a listener.
    pub fn add_listener(&self, listener: impl Fn(&E) + 'static) -> DispatcherHandle<E> {
        self.push(Rc::new(listener), false)
    }

    /// Append a listener that unregisters itself before its first call.
    pub fn add_listener_once(&self, listener: impl Fn(&E) + 'static) -> DispatcherHandle<E> {
        self.push(Rc::new(listener), true)
    }

    /// Append a shared listener. Registering the same `Rc` twice is a usage
    /// error: it is logged and the existing registration is returned.
    pub fn add_listener_rc(&self, listener: EventListener<E>) -> DispatcherHandle<E> {
        let existing = self
            .inner
            .borrow()
            .entries
            .iter()
            .find(|entry| Rc::ptr_eq(&entry.listener, &listener))
            .map(|entry| entry.id);
        if let Some(id) = existing {
            warn!(id, "listener already registered");
            return DispatcherHandle {
                inner: Rc::downgrade(&self.inner),
                id,
            };
        }
        self.push(listener, false)
    }

    /// Unregister a listener. Returns whether it was registered here.
    pub fn remove_listener(&self, handle: &DispatcherHandle<E>) -> bool {
        let ours = handle
            .inner
            .upgrade()
            .is_some_and(|inner| Rc::ptr_eq(&inner, &self.inner));
        ours && self.inner.borrow_mut().remove(handle.id)
    }

    /// Call every listener in registration order.
    pub fn dispatch(&self, event: &E) {
        let mut index = 0;
        loop {
            let (id, listener) = {
                let mut inner = self.inner.borrow_mut();
                let Some(entry) = inner.entries.get(index) else {
                    break;
                };
                let (id, listener, once) = (entry.id, entry.listener.clone(), entry.once);
                if once {
                    inner.entries.remove(index);
                }
                (id, listener)
            };

            listener(event);

            // Stay on this slot if the entry that was here is gone.
            let still_here = self.inner.borrow().entries.get(index).map(|e| e.id) == Some(id);
            if still_here {
                index += 1;
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn clear(&self) {
        // Listeners are dropped outside the borrow.
        let entries = std::mem::take(&mut self.inner.borrow_mut().entries);
        drop(entries);
    }
}

// =============================================================================
// Named Channels
// =============================================================================

/// A set of dispatchers keyed by channel name.
pub struct Dispatchable<E> {
    channels: RefCell<HashMap<String, Dispatcher<E>>>,
}

impl<E: 'static> Default for Dispatchable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> Dispatchable<E> {
    pub fn new() -> Self {
        Self {
            channels: RefCell::new(HashMap::new()),
        }
    }

    /// Dispatcher for `channel`, created on first use.
    pub fn channel(&self, channel: &str) -> Dispatcher<E> {
        self.channels
            .borrow_mut()
            .entry(channel.to_string())
            .or_default()
            .clone()
    }

    pub fn add_listener(&self, channel: &str, listener: impl Fn(&E) + 'static) -> DispatcherHandle<E> {
        self.channel(channel).add_listener(listener)
    }

    pub fn add_listener_once(
        &self,
        channel: &str,
        listener: impl Fn(&E) + 'static,
    ) -> DispatcherHandle<E> {
        self.channel(channel).add_listener_once(listener)
    }

    pub fn remove_listener(&self, channel: &str, handle: &DispatcherHandle<E>) -> bool {
        let dispatcher = self.channels.borrow().get(channel).cloned();
        dispatcher.is_some_and(|d| d.remove_listener(handle))
    }

    /// Dispatch on `channel`. Unknown channels have no listeners.
    pub fn dispatch(&self, channel: &str, event: &E) {
        let dispatcher = self.channels.borrow().get(channel).cloned();
        if let Some(dispatcher) = dispatcher {
            dispatcher.dispatch(event);
        }
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.channels
            .borrow()
            .get(channel)
            .map_or(0, Dispatcher::listener_count)
    }

    /// Drop every listener on every channel.
    pub fn clear_listeners(&self) {
        let channels = std::mem::take(&mut *self.channels.borrow_mut());
        for dispatcher in channels.values() {
            dispatcher.clear();
        }
    }
}

// =============================================================================
// Single Active Item
// =============================================================================

type OnLose = Box<dyn FnOnce()>;

/// Tracks a single active item (selected tab, open menu, focused row).
///
/// Making an item active dispatches it to the listeners. When a different
/// item becomes active, the previous holder's `on_lose` runs exactly once.
pub struct SingleActiveElementDispatcher<T> {
    dispatcher: Dispatcher<T>,
    active: RefCell<Option<(T, Option<OnLose>)>>,
}

impl<T: Clone + PartialEq + 'static> Default for SingleActiveElementDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + 'static> SingleActiveElementDispatcher<T> {
    pub fn new() -> Self {
        Self {
            dispatcher: Dispatcher::new(),
            active: RefCell::new(None),
        }
    }

    pub fn add_listener(&self, listener: impl Fn(&T) + 'static) -> DispatcherHandle<T> {
        self.dispatcher.add_listener(listener)
    }

    pub fn active(&self) -> Option<T> {
        self.active.borrow().as_ref().map(|(item, _)| item.clone())
    }

    /// Make `item` active. Re-activating the current item is a no-op unless
    /// `force` is set. Returns whether listeners were notified.
    pub fn set_active(&self, item: T, on_lose: Option<Box<dyn FnOnce()>>, force: bool) -> bool {
        let same = self
            .active
            .borrow()
            .as_ref()
            .is_some_and(|(current, _)| *current == item);
        if same && !force {
            return false;
        }

        let previous = self.active.borrow_mut().replace((item.clone(), on_lose));
        if let Some((previous_item, previous_on_lose)) = previous {
            if previous_item != item {
                if let Some(lose) = previous_on_lose {
                    lose();
                }
            }
        }
        self.dispatcher.dispatch(&item);
        true
    }

    /// Deactivate the current item, running its `on_lose`.
    pub fn clear_active(&self) {
        let previous = self.active.borrow_mut().take();
        if let Some((_, Some(lose))) = previous {
            lose();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_dispatch_order_and_removal() {
        let dispatcher: Dispatcher<i32> = Dispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        let first = dispatcher.add_listener(move |e| l1.borrow_mut().push(("a", *e)));
        let l2 = log.clone();
        dispatcher.add_listener(move |e| l2.borrow_mut().push(("b", *e)));

        dispatcher.dispatch(&1);
        assert!(first.remove());
        assert!(!first.remove());
        dispatcher.dispatch(&2);

        assert_eq!(*log.borrow(), vec![("a", 1), ("b", 1), ("b", 2)]);
    }

    #[test]
    fn test_listener_removing_itself_does_not_skip_next() {
        let dispatcher: Dispatcher<()> = Dispatcher::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let handle: Rc<RefCell<Option<DispatcherHandle<()>>>> = Rc::new(RefCell::new(None));

        let c1 = calls.clone();
        let h1 = handle.clone();
        let self_removing = dispatcher.add_listener(move |_| {
            c1.borrow_mut().push(1);
            if let Some(h) = h1.borrow().as_ref() {
                h.remove();
            }
        });
        *handle.borrow_mut() = Some(self_removing);
        let c2 = calls.clone();
        dispatcher.add_listener(move |_| c2.borrow_mut().push(2));

        dispatcher.dispatch(&());
        dispatcher.dispatch(&());
        assert_eq!(*calls.borrow(), vec![1, 2, 2]);
    }

    #[test]
    fn test_once_listener() {
        let dispatcher: Dispatcher<u8> = Dispatcher::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        dispatcher.add_listener_once(move |_| c.set(c.get() + 1));
        let c = count.clone();
        dispatcher.add_listener(move |_| c.set(c.get() + 10));

        dispatcher.dispatch(&0);
        dispatcher.dispatch(&0);
        assert_eq!(count.get(), 21);
        assert_eq!(dispatcher.listener_count(), 1);
    }

    #[test]
    fn test_duplicate_rc_registration() {
        let dispatcher: Dispatcher<()> = Dispatcher::new();
        let listener: EventListener<()> = Rc::new(|_| {});
        let a = dispatcher.add_listener_rc(listener.clone());
        let b = dispatcher.add_listener_rc(listener);
        assert_eq!(dispatcher.listener_count(), 1);
        assert!(b.remove());
        assert!(!a.remove());
    }

    #[test]
    fn test_handle_from_other_dispatcher_is_ignored() {
        let a: Dispatcher<()> = Dispatcher::new();
        let b: Dispatcher<()> = Dispatcher::new();
        let handle = a.add_listener(|_| {});
        b.add_listener(|_| {});
        assert!(!b.remove_listener(&handle));
        assert!(a.remove_listener(&handle));
    }

    #[test]
    fn test_named_channels() {
        let events: Dispatchable<String> = Dispatchable::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let handle = events.add_listener("open", move |e: &String| s.borrow_mut().push(e.clone()));

        events.dispatch("open", &"a".to_string());
        events.dispatch("close", &"b".to_string());
        assert!(events.remove_listener("open", &handle));
        events.dispatch("open", &"c".to_string());

        assert_eq!(*seen.borrow(), vec!["a".to_string()]);
        assert_eq!(events.listener_count("open"), 0);
    }

    #[test]
    fn test_single_active_on_lose_runs_once() {
        let tabs: SingleActiveElementDispatcher<&'static str> = SingleActiveElementDispatcher::new();
        let lost = Rc::new(Cell::new(0));
        let notified = Rc::new(Cell::new(0));
        let n = notified.clone();
        tabs.add_listener(move |_| n.set(n.get() + 1));

        let l = lost.clone();
        assert!(tabs.set_active("home", Some(Box::new(move || l.set(l.get() + 1))), false));
        // Same item again without force: nothing happens.
        assert!(!tabs.set_active("home", None, false));
        assert_eq!(lost.get(), 0);

        assert!(tabs.set_active("settings", None, false));
        assert_eq!(lost.get(), 1);
        assert_eq!(tabs.active(), Some("settings"));

        assert!(tabs.set_active("settings", None, true));
        assert_eq!(lost.get(), 1);
        assert_eq!(notified.get(), 3);
    }
}
